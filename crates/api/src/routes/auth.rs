//! Route definitions for the `/auth` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST   /register  -> register
/// POST   /login     -> login
/// DELETE /logout    -> logout (requires auth)
/// PUT    /password  -> update_password (requires auth)
/// GET    /me        -> me (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", delete(auth::logout))
        .route("/password", put(auth::update_password))
        .route("/me", get(auth::me))
}
