//! Form support: CSRF protection for every state-changing POST.

pub mod csrf;

pub use csrf::{CSRF_FIELD, generate_csrf_token, verify_csrf_token};
