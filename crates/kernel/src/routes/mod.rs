//! HTTP route handlers.

pub mod admin_category;
pub mod admin_user;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod helpers;
pub mod public;

use axum::Router;

use crate::state::AppState;

/// Every route of the site. Apply the session layer and state on top.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(admin_category::router())
        .merge(admin_user::router())
        .merge(public::router())
}
