//! Public pages: home feed, categories, search, single posts, and comments.

use axum::Router;
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::flash::FlashLevel;
use crate::permissions::Caller;
use crate::routes::helpers::{
    current_caller, login_url, redirect_with_flash, render, render_not_found, render_with_status,
    require_csrf, require_login, safe_next_or, server_error, service_error_response,
};
use crate::services::PostPage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "_token", default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentRequest {
    /// Page to return to if the deletion is refused.
    pub next: Option<String>,
    #[serde(rename = "_token", default)]
    pub token: String,
}

/// GET /
async fn home(State(state): State<AppState>, session: Session) -> Response {
    let caller = match current_caller(&state, &session).await {
        Ok(c) => c,
        Err(r) => return r,
    };

    match state.browse().home().await {
        Ok(page) => {
            let mut context = tera::Context::new();
            context.insert("categories", &page.categories);
            context.insert("featured_posts", &page.featured_posts);
            context.insert("posts", &page.posts);
            context.insert("about", &page.about);
            context.insert("social_links", &page.social_links);
            render(&state, &session, &caller, "home.html", context).await
        }
        Err(e) => server_error(&e),
    }
}

/// GET /category/{id}/
async fn posts_by_category(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let caller = match current_caller(&state, &session).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.browse().posts_by_category(id).await {
        Ok(page) => {
            let mut context = tera::Context::new();
            context.insert("category", &page.category);
            context.insert("posts", &page.posts);
            context.insert("categories", &page.categories);
            render(&state, &session, &caller, "posts_by_category.html", context).await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, "/").await,
    }
}

/// GET /search/?keyword=
async fn search(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Response {
    let caller = match current_caller(&state, &session).await {
        Ok(c) => c,
        Err(r) => return r,
    };

    match state.browse().search(query.keyword.as_deref()).await {
        Ok(results) => {
            let mut context = tera::Context::new();
            context.insert("keyword", &results.keyword);
            context.insert("posts", &results.posts);
            render(&state, &session, &caller, "search.html", context).await
        }
        Err(e) => server_error(&e),
    }
}

/// GET /categories/
async fn categories(State(state): State<AppState>, session: Session) -> Response {
    let caller = match current_caller(&state, &session).await {
        Ok(c) => c,
        Err(r) => return r,
    };

    match state.browse().categories().await {
        Ok(categories) => {
            let mut context = tera::Context::new();
            context.insert("categories", &categories);
            render(&state, &session, &caller, "categories.html", context).await
        }
        Err(e) => server_error(&e),
    }
}

async fn render_post(
    state: &AppState,
    session: &Session,
    caller: &Caller,
    status: StatusCode,
    page: PostPage,
    comment: &str,
    errors: &[String],
) -> Response {
    let mut context = tera::Context::new();
    context.insert("post", &page.post);
    context.insert("comments", &page.comments);
    context.insert("comment_count", &page.comment_count);
    context.insert("comment", comment);
    context.insert("errors", errors);
    render_with_status(state, session, caller, status, "post.html", context).await
}

/// GET /{slug}/
async fn post_detail(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Response {
    let caller = match current_caller(&state, &session).await {
        Ok(c) => c,
        Err(r) => return r,
    };

    match state.browse().post_by_slug(&slug).await {
        Ok(page) => render_post(&state, &session, &caller, StatusCode::OK, page, "", &[]).await,
        Err(e) => service_error_response(&state, &session, &caller, e, "/").await,
    }
}

/// POST /{slug}/
async fn submit_comment(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    Form(form): Form<CommentRequest>,
) -> Response {
    let post_path = format!("/{slug}/");
    let caller = match current_caller(&state, &session).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if !caller.is_authenticated() {
        return Redirect::to(&login_url(&post_path)).into_response();
    }
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }

    match state
        .authoring()
        .submit_comment(&caller, &slug, &form.comment)
        .await
    {
        Ok(_) => {
            redirect_with_flash(&session, &post_path, FlashLevel::Success, "Comment added.").await
        }
        Err(ServiceError::Validation(errors)) => match state.browse().post_by_slug(&slug).await {
            Ok(page) => {
                render_post(
                    &state,
                    &session,
                    &caller,
                    StatusCode::OK,
                    page,
                    &form.comment,
                    &errors,
                )
                .await
            }
            Err(e) => service_error_response(&state, &session, &caller, e, "/").await,
        },
        Err(e) => service_error_response(&state, &session, &caller, e, &post_path).await,
    }
}

/// POST /delete-comment/{id}/
async fn delete_comment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<DeleteCommentRequest>,
) -> Response {
    let back_to = safe_next_or(form.next.as_deref(), "/");
    let caller = match require_login(&state, &session, &back_to).await {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = require_csrf(&session, &form.token).await {
        return r;
    }
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found(&state, &session, &caller).await;
    };

    match state.authoring().delete_comment(&caller, id).await {
        Ok(post) => {
            redirect_with_flash(
                &session,
                &format!("/{}/", post.slug),
                FlashLevel::Success,
                "Comment deleted.",
            )
            .await
        }
        Err(e) => service_error_response(&state, &session, &caller, e, &back_to).await,
    }
}

/// Create the public router. The `/{slug}/` catch-all must be merged last.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/category/{id}/", get(posts_by_category))
        .route("/search/", get(search))
        .route("/categories/", get(categories))
        .route("/delete-comment/{id}/", post(delete_comment))
        .route("/{slug}/", get(post_detail).post(submit_comment))
}
