//! Dashboard: overview and post management.

use axum::Router;
use axum::extract::{DefaultBodyLimit, Form, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::file::MAX_IMAGE_SIZE;
use crate::flash::FlashLevel;
use crate::form::CSRF_FIELD;
use crate::permissions::Caller;
use crate::routes::helpers::{
    redirect_with_flash, render, render_not_found, require_csrf, require_login, server_error,
    service_error_response,
};
use crate::services::{PostForm, Upload};
use crate::state::AppState;

/// A form whose only field is the CSRF token.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(rename = "_token", default)]
    pub token: String,
}

/// A parsed multipart post submission.
struct PostSubmission {
    form: PostForm,
    token: String,
    image: Option<Upload>,
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

async fn read_post_submission(mut multipart: Multipart) -> Result<PostSubmission, Response> {
    let bad_request = |e: axum::extract::multipart::MultipartError| {
        tracing::warn!(error = %e, "malformed post form");
        (StatusCode::BAD_REQUEST, Html("Malformed form submission.")).into_response()
    };

    let mut form = PostForm::default();
    let mut token = String::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "featured_image" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(bad_request)?;
            // Browsers send an empty part when no file was chosen.
            if !filename.is_empty() && !data.is_empty() {
                image = Some(Upload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(bad_request)?;
        match name.as_str() {
            CSRF_FIELD => token = value,
            "title" => form.title = value,
            "category" => form.category = value,
            "short_description" => form.short_description = value,
            "body" => form.body = value,
            "status" => form.status = value,
            "is_featured" => form.is_featured = is_checked(&value),
            _ => {}
        }
    }

    Ok(PostSubmission { form, token, image })
}

async fn render_post_form(
    state: &AppState,
    session: &Session,
    caller: &Caller,
    action: &str,
    values: &PostForm,
    current_image: Option<&str>,
    errors: &[String],
) -> Response {
    let categories = match state.authoring().form_categories(caller).await {
        Ok(categories) => categories,
        Err(e) => return server_error(&e),
    };

    let mut context = tera::Context::new();
    context.insert("action", action);
    context.insert("editing", &action.starts_with("/dashboard/edit-post/"));
    context.insert("values", values);
    context.insert("current_image", &current_image);
    context.insert("categories", &categories);
    context.insert("errors", errors);
    render(state, session, caller, "dashboard/post_form.html", context).await
}

/// GET /dashboard/
async fn overview(State(state): State<AppState>, session: Session) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/").await {
        Ok(c) => c,
        Err(r) => return r,
    };

    match state.authoring().dashboard_overview(&caller).await {
        Ok(overview) => {
            let mut context = tera::Context::new();
            context.insert("posts", &overview.posts);
            context.insert("categories", &overview.categories);
            render(&state, &session, &caller, "dashboard/index.html", context).await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/").await,
    }
}

/// GET /dashboard/posts/
async fn list_posts(State(state): State<AppState>, session: Session) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/posts/").await {
        Ok(c) => c,
        Err(r) => return r,
    };

    match state.authoring().list_my_posts(&caller).await {
        Ok(posts) => {
            let mut context = tera::Context::new();
            context.insert("posts", &posts);
            render(&state, &session, &caller, "dashboard/posts.html", context).await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/").await,
    }
}

/// GET /dashboard/add-post/
async fn add_post_form(State(state): State<AppState>, session: Session) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/add-post/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    render_post_form(
        &state,
        &session,
        &caller,
        "/dashboard/add-post/",
        &PostForm::default(),
        None,
        &[],
    )
    .await
}

/// POST /dashboard/add-post/
async fn add_post_submit(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/add-post/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    let submission = match read_post_submission(multipart).await {
        Ok(s) => s,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &submission.token).await {
        return r;
    }

    let values = submission.form.clone();
    match state
        .authoring()
        .create_post(&caller, submission.form, submission.image)
        .await
    {
        Ok(post) => {
            redirect_with_flash(
                &session,
                "/dashboard/posts/",
                FlashLevel::Success,
                format!("Post \"{}\" created.", post.title),
            )
            .await
        }
        Err(ServiceError::Validation(errors)) => {
            render_post_form(
                &state,
                &session,
                &caller,
                "/dashboard/add-post/",
                &values,
                None,
                &errors,
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/posts/").await,
    }
}

/// GET /dashboard/edit-post/{id}/
async fn edit_post_form(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let action = format!("/dashboard/edit-post/{id}/");
    let caller = match require_login(&state, &session, &action).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.authoring().post_for_edit(&caller, id).await {
        Ok(post) => {
            render_post_form(
                &state,
                &session,
                &caller,
                &action,
                &PostForm::from_post(&post),
                post.featured_image.as_deref(),
                &[],
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/posts/").await,
    }
}

/// POST /dashboard/edit-post/{id}/
async fn edit_post_submit(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let action = format!("/dashboard/edit-post/{id}/");
    let caller = match require_login(&state, &session, &action).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    let submission = match read_post_submission(multipart).await {
        Ok(s) => s,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &submission.token).await {
        return r;
    }
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    let values = submission.form.clone();
    match state
        .authoring()
        .edit_post(&caller, id, submission.form, submission.image)
        .await
    {
        Ok(post) => {
            redirect_with_flash(
                &session,
                "/dashboard/posts/",
                FlashLevel::Success,
                format!("Post \"{}\" updated.", post.title),
            )
            .await
        }
        Err(ServiceError::Validation(errors)) => {
            let current_image = state
                .store()
                .find_post(id)
                .await
                .ok()
                .flatten()
                .and_then(|p| p.featured_image);
            render_post_form(
                &state,
                &session,
                &caller,
                &action,
                &values,
                current_image.as_deref(),
                &errors,
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/posts/").await,
    }
}

/// POST /dashboard/delete-post/{id}/
async fn delete_post(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<TokenForm>,
) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/posts/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.authoring().delete_post(&caller, id).await {
        Ok(post) => {
            redirect_with_flash(
                &session,
                "/dashboard/posts/",
                FlashLevel::Success,
                format!("Post \"{}\" deleted.", post.title),
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/posts/").await,
    }
}

/// POST /dashboard/toggle-featured/{id}/
async fn toggle_featured(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<TokenForm>,
) -> Response {
    let caller = match require_login(&state, &session, "/dashboard/posts/").await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.authoring().toggle_featured(&caller, id).await {
        Ok(post) => {
            let message = if post.is_featured {
                format!("\"{}\" is now featured.", post.title)
            } else {
                format!("\"{}\" is no longer featured.", post.title)
            };
            redirect_with_flash(&session, "/dashboard/posts/", FlashLevel::Success, message).await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/dashboard/posts/").await,
    }
}

/// GET /dashboard (no trailing slash) lands on the overview.
async fn overview_redirect() -> Response {
    Redirect::permanent("/dashboard/").into_response()
}

/// Create the dashboard router.
pub fn router() -> Router<AppState> {
    // Leave headroom above the image limit for the text fields.
    let upload_limit = DefaultBodyLimit::max(MAX_IMAGE_SIZE + 1024 * 1024);

    Router::new()
        .route("/dashboard", get(overview_redirect))
        .route("/dashboard/", get(overview))
        .route("/dashboard/posts/", get(list_posts))
        .route(
            "/dashboard/add-post/",
            get(add_post_form)
                .post(add_post_submit)
                .layer(upload_limit),
        )
        .route(
            "/dashboard/edit-post/{id}/",
            get(edit_post_form)
                .post(edit_post_submit)
                .layer(upload_limit),
        )
        .route("/dashboard/delete-post/{id}/", post(delete_post))
        .route("/dashboard/toggle-featured/{id}/", post(toggle_featured))
}
