//! Username and password rules applied at registration and password change.

use crate::error::CoreError;

/// Minimum username length in characters.
pub const USERNAME_MIN_LEN: usize = 3;

/// Maximum username length in characters.
pub const USERNAME_MAX_LEN: usize = 20;

/// Minimum password length in characters.
pub const PASSWORD_MIN_LEN: usize = 8;

/// Validate a username.
///
/// Usernames are 3-20 characters of lowercase ASCII letters, digits, `.`
/// and `_`, and may not start with a digit, `.` or `_`.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    let len = username.chars().count();
    if len < USERNAME_MIN_LEN {
        return Err(CoreError::Validation(format!(
            "Username must be at least {USERNAME_MIN_LEN} characters"
        )));
    }
    if len > USERNAME_MAX_LEN {
        return Err(CoreError::Validation(format!(
            "Username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(
            "Username must not contain spaces".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_')
    {
        return Err(CoreError::Validation(
            "Username may only contain lowercase letters, digits, '.' and '_'".into(),
        ));
    }
    match username.chars().next() {
        Some(c) if c.is_ascii_digit() => Err(CoreError::Validation(
            "Username must not start with a digit".into(),
        )),
        Some('.' | '_') => Err(CoreError::Validation(
            "Username must not start with '.' or '_'".into(),
        )),
        _ => Ok(()),
    }
}

/// Validate that a password meets minimum strength requirements.
///
/// At least [`PASSWORD_MIN_LEN`] characters with one uppercase letter, one
/// lowercase letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(CoreError::Validation(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters long"
        )));
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(has_upper && has_lower && has_digit) {
        return Err(CoreError::Validation(
            "Password must contain at least one uppercase letter, one lowercase letter, and one digit"
                .into(),
        ));
    }
    Ok(())
}
