//! Client device fingerprinting.
//!
//! A [`ClientInfo`] is the tuple of network and device attributes used to
//! tell one device of a user apart from another. The HTTP layer extracts
//! the raw IP address and user agent; this module classifies the user agent
//! into device type, browser, and operating system.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder stored when the request carried no usable value.
pub const UNKNOWN: &str = "unknown";

/// Device/network attributes identifying one client device.
///
/// Equality is field-wise, with `None == None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
}

// ---------------------------------------------------------------------------
// Classification patterns
// ---------------------------------------------------------------------------

const TEST_RUNNER_MARKERS: &[&str] = &["Jest", "Mocha", "Node.js", "jsdom"];

const DEV_TOOLS: &[(&str, &str)] = &[
    ("PostmanRuntime", "Postman"),
    ("insomnia", "Insomnia"),
    ("Thunder Client", "Thunder Client"),
    ("curl", "cURL"),
];

fn case_insensitive(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("valid regex")
}

static DEVICE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (case_insensitive(r"ipad|tablet"), "tablet"),
        (case_insensitive(r"mobile|android|iphone|ipod"), "mobile"),
        (
            case_insensitive(r"smart-tv|smarttv|hbbtv|appletv|googletv|crkey|\btv\b"),
            "smarttv",
        ),
        (case_insensitive(r"bot|crawl|spider"), "bot"),
    ]
});

// Order matters: Edge, Opera and Samsung Browser all advertise "Chrome",
// and Chrome advertises "Safari".
static BROWSER_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (case_insensitive(r"edg(e|a|ios)?/"), "Edge"),
        (case_insensitive(r"\bopr/|opera"), "Opera"),
        (case_insensitive(r"samsungbrowser"), "Samsung Browser"),
        (case_insensitive(r"chrome|chromium|crios"), "Chrome"),
        (case_insensitive(r"firefox|fxios"), "Firefox"),
        (case_insensitive(r"safari"), "Safari"),
        (case_insensitive(r"msie|trident"), "Internet Explorer"),
    ]
});

// Android and iOS user agents also mention Linux and "Mac OS X".
static OS_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (case_insensitive(r"windows nt"), "Windows"),
        (case_insensitive(r"android"), "Android"),
        (case_insensitive(r"iphone|ipad|ipod|\bios\b"), "iOS"),
        (case_insensitive(r"mac os|macintosh"), "macOS"),
        (case_insensitive(r"ubuntu"), "Ubuntu"),
        (case_insensitive(r"linux"), "Linux"),
    ]
});

fn first_match(patterns: &[(Regex, &'static str)], user_agent: &str) -> Option<&'static str> {
    patterns
        .iter()
        .find(|(re, _)| re.is_match(user_agent))
        .map(|(_, name)| *name)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

impl ClientInfo {
    /// Build a fingerprint from the raw IP address and user agent of a request.
    ///
    /// Test runners and API development tools get fixed labels so their
    /// sessions do not mix with real browsers; everything else is
    /// classified by pattern matching on the user agent.
    pub fn from_request_parts(ip_address: Option<&str>, user_agent: Option<&str>) -> Self {
        let ip = non_empty(ip_address).unwrap_or(UNKNOWN).to_string();
        let ua = non_empty(user_agent).unwrap_or(UNKNOWN);

        if TEST_RUNNER_MARKERS.iter().any(|m| ua.contains(m)) {
            return Self {
                ip_address: Some("127.0.0.1".to_string()),
                user_agent: Some(ua.to_string()),
                device_type: Some("testing".to_string()),
                browser: Some("Jest/Test".to_string()),
                os: Some("Test Environment".to_string()),
            };
        }

        if let Some((_, tool)) = DEV_TOOLS.iter().find(|(marker, _)| ua.contains(marker)) {
            return Self {
                ip_address: Some(ip),
                user_agent: Some(ua.to_string()),
                device_type: Some("development".to_string()),
                browser: Some((*tool).to_string()),
                os: Some("Development Tool".to_string()),
            };
        }

        Self {
            ip_address: Some(ip),
            user_agent: Some(ua.to_string()),
            device_type: Some(first_match(&DEVICE_PATTERNS, ua).unwrap_or("desktop").to_string()),
            browser: Some(first_match(&BROWSER_PATTERNS, ua).unwrap_or(UNKNOWN).to_string()),
            os: Some(first_match(&OS_PATTERNS, ua).unwrap_or(UNKNOWN).to_string()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
