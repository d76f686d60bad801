//! User account administration.

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
use crate::services::UserForm;
use crate::state::AppState;

/// User form data. Unchecked boxes are simply absent from the body.
#[derive(Debug, Deserialize)]
struct UserFormData {
    #[serde(rename = "_token", default)]
    token: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    password: String,
    is_staff: Option<String>,
    is_superuser: Option<String>,
    is_active: Option<String>,
}

impl UserFormData {
    fn into_form(self) -> (String, UserForm) {
        let form = UserForm {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password: self.password,
            is_staff: self.is_staff.is_some(),
            is_superuser: self.is_superuser.is_some(),
            is_active: self.is_active.is_some(),
        };
        (self.token, form)
    }
}

async fn render_form(
    state: &AppState,
    session: &Session,
    caller: &Caller,
    action: &str,
    values: &UserForm,
    errors: &[String],
) -> Response {
    let mut context = tera::Context::new();
    context.insert("action", action);
    context.insert("editing", &action.starts_with("/dashboard/edit-user/"));
    context.insert("values", values);
    context.insert("errors", errors);
    render(state, session, caller, "dashboard/user_form.html", context).await
}

fn ensure_user_admin(caller: &Caller) -> Result<(), ServiceError> {
    if caller.capabilities().can_manage_users {
        Ok(())
    } else {
        Err(ServiceError::forbidden("Only superusers can manage users."))
    }
}

/// GET /dashboard/users/
async fn list(State(state): State<AppState>, session: Session) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/users/").await {
        Ok(c) => c,
        Err(r) => return r,
    };

    match state.admin().list_users(&caller).await {
        Ok(users) => {
            let mut context = tera::Context::new();
            context.insert("users", &users);
            render(&state, &session, &caller, "dashboard/users.html", context).await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// GET /dashboard/add-user/
async fn add_form(State(state): State<AppState>, session: Session) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/add-user/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(e) = ensure_user_admin(&caller) {
        return service_error_response(&state, &session, &caller, e, "/dashboard/").await;
    }
    let values = UserForm {
        is_active: true,
        ..UserForm::default()
    };
    render_form(&state, &session, &caller, "/dashboard/add-user/", &values, &[]).await
}

/// POST /dashboard/add-user/
async fn add_submit(
    State(state): State<AppState>,
    session: Session,
    Form(data): Form<UserFormData>,
) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/add-user/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    let (token, form) = data.into_form();
    if let Err(r) = require_csrf(&session, &token).await {
        return r;
    }

    let values = form.clone();
    match state.admin().create_user(&caller, form).await {
        Ok(user) => {
            redirect_with_flash(
                &session,
                "/dashboard/users/",
                FlashLevel::Success,
                format!("User \"{}\" created.", user.username),
            )
            .await
        }
        Err(ServiceError::Validation(errors)) => {
            render_form(
                &state,
                &session,
                &caller,
                "/dashboard/add-user/",
                &values,
                &errors,
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// GET /dashboard/edit-user/{id}/
async fn edit_form(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let action = format!("/dashboard/edit-user/{id}/");
    let caller = match require_login(&state, &session, &action).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.admin().find_user(&caller, id).await {
        Ok(user) => {
            render_form(
                &state,
                &session,
                &caller,
                &action,
                &UserForm::from_user(&user),
                &[],
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// POST /dashboard/edit-user/{id}/
async fn edit_submit(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(data): Form<UserFormData>,
) -> Response {
    let action = format!("/dashboard/edit-user/{id}/");
    let caller = match require_login(&state, &session, &action).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    let (token, form) = data.into_form();
    if let Err(r) = require_csrf(&session, &token).await {
        return r;
    }
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    let values = form.clone();
    match state.admin().edit_user(&caller, id, form).await {
        Ok(user) => {
            redirect_with_flash(
                &session,
                "/dashboard/users/",
                FlashLevel::Success,
                format!("User \"{}\" updated.", user.username),
            )
            .await
        }
        Err(ServiceError::Validation(errors)) => {
            render_form(&state, &session, &caller, &action, &values, &errors).await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// POST /dashboard/delete-user/{id}/
async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<TokenForm>,
) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/users/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    // Refusals go back to the list; a non-superuser has no business there.
    let back_to = if caller.capabilities().can_manage_users {
        "/dashboard/users/"
    } else {
        "/dashboard/"
    };
    match state.admin().delete_user(&caller, id).await {
        Ok(user) => {
            redirect_with_flash(
                &session,
                "/dashboard/users/",
                FlashLevel::Success,
                format!("User \"{}\" deleted.", user.username),
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, back_to).await,
    }
}

/// Create the user admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/users/", get(list))
        .route("/dashboard/add-user/", get(add_form).post(add_submit))
        .route("/dashboard/edit-user/{id}/", get(edit_form).post(edit_submit))
        .route("/dashboard/delete-user/{id}/", post(delete))
}
