//! Category administration.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::flash::FlashLevel;
use crate::permissions::Caller;
use crate::routes::dashboard::TokenForm;
use crate::routes::helpers::{
    redirect_with_flash, render, render_not_found, require_csrf, require_login,
    service_error_response,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CategoryFormData {
    #[serde(default)]
    name: String,
    #[serde(rename = "_token", default)]
    token: String,
}

async fn render_form(
    state: &AppState,
    session: &Session,
    caller: &Caller,
    action: &str,
    name: &str,
    errors: &[String],
) -> Response {
    let mut context = tera::Context::new();
    context.insert("action", action);
    context.insert("editing", &action.starts_with("/dashboard/edit-category/"));
    context.insert("name", name);
    context.insert("errors", errors);
    render(state, session, caller, "dashboard/category_form.html", context).await
}

/// Forms are only shown to callers who may submit them.
fn ensure_category_admin(caller: &Caller) -> Result<(), ServiceError> {
    if caller.capabilities().can_manage_categories {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "Only superusers can manage categories.",
        ))
    }
}

/// GET /dashboard/add-category/
async fn add_form(State(state): State<AppState>, session: Session) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/add-category/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(e) = ensure_category_admin(&caller) {
        return service_error_response(&state, &session, &caller, e, "/dashboard/").await;
    }
    render_form(&state, &session, &caller, "/dashboard/add-category/", "", &[]).await
}

/// POST /dashboard/add-category/
async fn add_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/add-category/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }

    match state.admin().add_category(&caller, &form.name).await {
        Ok(category) => {
            redirect_with_flash(
                &session,
                "/dashboard/",
                FlashLevel::Success,
                format!("Category \"{}\" added.", category.name),
            )
            .await
        }
        Err(ServiceError::Validation(errors)) => {
            render_form(
                &state,
                &session,
                &caller,
                "/dashboard/add-category/",
                &form.name,
                &errors,
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// GET /dashboard/edit-category/{id}/
async fn edit_form(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let action = format!("/dashboard/edit-category/{id}/");
    let caller = match require_login(&state, &session, &action).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.admin().find_category(&caller, id).await {
        Ok(category) => render_form(&state, &session, &caller, &action, &category.name, &[]).await,
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// POST /dashboard/edit-category/{id}/
async fn edit_submit(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let action = format!("/dashboard/edit-category/{id}/");
    let caller = match require_login(&state, &session, &action).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.admin().edit_category(&caller, id, &form.name).await {
        Ok(category) => {
            redirect_with_flash(
                &session,
                "/dashboard/",
                FlashLevel::Success,
                format!("Category \"{}\" updated.", category.name),
            )
            .await
        }
        Err(ServiceError::Validation(errors)) => {
            render_form(&state, &session, &caller, &action, &form.name, &errors).await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// POST /dashboard/delete-category/{id}/
async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<TokenForm>,
) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.admin().delete_category(&caller, id).await {
        Ok(category) => {
            redirect_with_flash(
                &session,
                "/dashboard/",
                FlashLevel::Success,
                format!("Category \"{}\" deleted.", category.name),
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// Create the category admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/add-category/", get(add_form).post(add_submit))
        .route(
            "/dashboard/edit-category/{id}/",
            get(edit_form).post(edit_submit),
        )
        .route("/dashboard/delete-category/{id}/", post(delete))
}
