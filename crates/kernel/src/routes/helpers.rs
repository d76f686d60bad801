//! Shared route helpers: caller resolution, page rendering, and error mapping.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::flash::{FlashLevel, push_flash, take_flash};
use crate::form::csrf::{generate_csrf_token, verify_csrf_token};
use crate::permissions::Caller;
use crate::session::SESSION_USER_ID;
use crate::state::AppState;

/// Resolve the session's user into a [`Caller`].
pub async fn current_caller(state: &AppState, session: &Session) -> Result<Caller, Response> {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();
    state
        .accounts()
        .resolve_caller(user_id)
        .await
        .map_err(|e| server_error(&e))
}

/// Login URL that returns to `next` afterwards.
pub fn login_url(next: &str) -> String {
    format!("/login/?next={}", urlencoding::encode(next))
}

/// Require an authenticated caller, or redirect to login.
pub async fn require_login(
    state: &AppState,
    session: &Session,
    next: &str,
) -> Result<Caller, Response> {
    let caller = current_caller(state, session).await?;
    if caller.is_authenticated() {
        Ok(caller)
    } else {
        Err(Redirect::to(&login_url(next)).into_response())
    }
}

/// Only same-site absolute paths are accepted as post-login destinations.
pub fn safe_next(next: Option<&str>) -> String {
    safe_next_or(next, "/dashboard/")
}

/// Like [`safe_next`], with a caller-chosen fallback.
pub fn safe_next_or(next: Option<&str>, fallback: &str) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}

/// Verify the submitted CSRF token, rejecting the request otherwise.
pub async fn require_csrf(session: &Session, token: &str) -> Result<(), Response> {
    match verify_csrf_token(session, token).await {
        Ok(true) => Ok(()),
        Ok(false) => Err((
            StatusCode::FORBIDDEN,
            Html("Invalid or expired form token. Go back, reload the page, and try again."),
        )
            .into_response()),
        Err(e) => {
            tracing::error!(error = %e, "failed to verify CSRF token");
            Err(server_error_page())
        }
    }
}

/// Render a template with the site-wide context: site name, the caller,
/// pending flash messages, and a fresh CSRF token.
pub async fn render(
    state: &AppState,
    session: &Session,
    caller: &Caller,
    template: &str,
    context: tera::Context,
) -> Response {
    render_with_status(state, session, caller, StatusCode::OK, template, context).await
}

pub async fn render_with_status(
    state: &AppState,
    session: &Session,
    caller: &Caller,
    status: StatusCode,
    template: &str,
    mut context: tera::Context,
) -> Response {
    let csrf_token = match generate_csrf_token(session).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to generate CSRF token");
            return server_error_page();
        }
    };

    context.insert("site_name", state.site_name());
    context.insert("csrf_token", &csrf_token);
    context.insert("flash", &take_flash(session).await);
    context.insert("current_user", &caller.identity());
    context.insert("caps", &caller.capabilities());

    match state.theme().render(template, &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, template = %template, "failed to render template");
            server_error_page()
        }
    }
}

/// 404 page.
pub async fn render_not_found(state: &AppState, session: &Session, caller: &Caller) -> Response {
    render_with_status(
        state,
        session,
        caller,
        StatusCode::NOT_FOUND,
        "not_found.html",
        tera::Context::new(),
    )
    .await
}

/// Log an internal failure and return the generic 500 page.
pub fn server_error(err: &ServiceError) -> Response {
    match err {
        ServiceError::Internal(e) => tracing::error!(error = ?e, "internal error"),
        other => tracing::error!(error = %other, "unexpected service error"),
    }
    server_error_page()
}

fn server_error_page() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(
            r#"<!DOCTYPE html>
<html><head><title>Server error</title></head>
<body><h1>Server error</h1><p>Something went wrong. Please try again later.</p></body></html>"#,
        ),
    )
        .into_response()
}

/// Redirect with a flash message.
pub async fn redirect_with_flash(
    session: &Session,
    to: &str,
    level: FlashLevel,
    message: impl Into<String>,
) -> Response {
    push_flash(session, level, message).await;
    Redirect::to(to).into_response()
}

/// Map a failed service call onto the standard responses.
///
/// Validation failures should be handled by the caller when a form must be
/// re-rendered; here they become an error flash like `Forbidden`.
pub async fn service_error_response(
    state: &AppState,
    session: &Session,
    caller: &Caller,
    err: ServiceError,
    back_to: &str,
) -> Response {
    match err {
        ServiceError::NotFound => render_not_found(state, session, caller).await,
        ServiceError::Unauthorized => Redirect::to(&login_url(back_to)).into_response(),
        ServiceError::Forbidden(message) => {
            redirect_with_flash(session, back_to, FlashLevel::Error, message).await
        }
        ServiceError::Refused(message) => {
            redirect_with_flash(session, back_to, FlashLevel::Warning, message).await
        }
        ServiceError::Validation(messages) => {
            redirect_with_flash(session, back_to, FlashLevel::Error, messages.join(" ")).await
        }
        err @ ServiceError::Internal(_) => server_error(&err),
    }
}
