//! Authentication routes (register, login, logout).

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{AppError, AppResult, ServiceError};
use crate::flash::{FlashLevel, push_flash};
use crate::permissions::Caller;
use crate::routes::helpers::{current_caller, render, require_csrf, safe_next, server_error};
use crate::services::RegistrationForm;
use crate::session::SESSION_USER_ID;
use crate::state::AppState;

/// Login request body for the JSON endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginFormRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
    #[serde(rename = "_token", default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterFormRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(rename = "_token", default)]
    pub token: String,
}

/// Bind the session to a freshly authenticated user.
async fn start_session(session: &Session, user_id: Uuid) -> Result<(), ServiceError> {
    session
        .cycle_id()
        .await
        .map_err(|e| anyhow::anyhow!("failed to cycle session id: {e}"))?;
    session
        .insert(SESSION_USER_ID, user_id)
        .await
        .map_err(|e| anyhow::anyhow!("failed to insert user_id into session: {e}"))?;
    Ok(())
}

async fn render_login(
    state: &AppState,
    session: &Session,
    caller: &Caller,
    username: &str,
    next: Option<&str>,
    errors: &[String],
) -> Response {
    let mut context = tera::Context::new();
    context.insert("username", username);
    context.insert("next", &next.unwrap_or_default());
    context.insert("errors", errors);
    render(state, session, caller, "login.html", context).await
}

/// GET /login/
async fn login_form(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
) -> Response {
    let caller = match current_caller(&state, &session).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if caller.is_authenticated() {
        return Redirect::to(&safe_next(query.next.as_deref())).into_response();
    }
    render_login(&state, &session, &caller, "", query.next.as_deref(), &[]).await
}

/// POST /login/
async fn login_form_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginFormRequest>,
) -> Response {
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }

    match state
        .accounts()
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            if let Err(e) = start_session(&session, user.id).await {
                return server_error(&e);
            }
            Redirect::to(&safe_next(form.next.as_deref())).into_response()
        }
        Err(ServiceError::Validation(errors)) => {
            render_login(
                &state,
                &session,
                &Caller::Anonymous,
                &form.username,
                form.next.as_deref(),
                &errors,
            )
            .await
        }
        Err(e) => server_error(&e),
    }
}

/// POST /login/json/
async fn login_json(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = match state
        .accounts()
        .authenticate(&request.username, &request.password)
        .await
    {
        Ok(user) => user,
        Err(ServiceError::Validation(_)) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e.into()),
    };
    start_session(&session, user.id).await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
    }))
}

/// Logout form data.
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(rename = "_token", default)]
    pub token: String,
}

/// POST /logout/
async fn logout(session: Session, Form(form): Form<LogoutRequest>) -> Response {
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }

    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "failed to destroy session");
    }
    if let Some(user_id) = user_id {
        tracing::info!(user_id = %user_id, "user logged out");
    }

    Redirect::to("/").into_response()
}

async fn render_register(
    state: &AppState,
    session: &Session,
    username: &str,
    email: &str,
    errors: &[String],
) -> Response {
    let mut context = tera::Context::new();
    context.insert("username", username);
    context.insert("email", email);
    context.insert("errors", errors);
    render(state, session, &Caller::Anonymous, "register.html", context).await
}

/// GET /register/
async fn register_form(State(state): State<AppState>, session: Session) -> Response {
    let caller = match current_caller(&state, &session).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if caller.is_authenticated() {
        return Redirect::to("/dashboard/").into_response();
    }
    render_register(&state, &session, "", "", &[]).await
}

/// POST /register/
async fn register_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterFormRequest>,
) -> Response {
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }

    let registration = RegistrationForm {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password,
        confirm_password: form.confirm_password,
    };

    match state.accounts().register(registration).await {
        Ok(user) => {
            if let Err(e) = start_session(&session, user.id).await {
                return server_error(&e);
            }
            push_flash(
                &session,
                FlashLevel::Success,
                format!("Welcome, {}! Your account has been created.", user.username),
            )
            .await;
            Redirect::to("/dashboard/").into_response()
        }
        Err(ServiceError::Validation(errors)) => {
            render_register(&state, &session, &form.username, &form.email, &errors).await
        }
        Err(e) => server_error(&e),
    }
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register/", get(register_form).post(register_submit))
        .route("/login/", get(login_form).post(login_form_submit))
        .route("/login/json/", post(login_json))
        .route("/logout/", post(logout))
}
