#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Public browsing: home feed, category pages, single posts, and search.

mod common;

use axum::http::StatusCode;
use common::{Role, TestApp};
use scriba_kernel::models::PostStatus;
use scriba_kernel::store::ContentStore;

#[tokio::test]
async fn home_lists_published_posts_and_featured_separately() {
    let app = TestApp::new();
    let author = app.create_user("alice", Role::Author).await;
    let rust = app.create_category("Rust").await;

    let published = app
        .create_post(&author, &rust, "Ownership Explained", PostStatus::Published)
        .await;
    app.create_post(&author, &rust, "Secret Draft", PostStatus::Draft)
        .await;
    let featured = app
        .create_post(&author, &rust, "Async in Depth", PostStatus::Published)
        .await;
    app.store.set_featured(featured.id, true).await.unwrap();
    app.store.add_about("About us", "A blog about systems.");
    app.store.add_social_link("Mastodon", "https://example.social/@scriba");

    let (status, body) = app.browser().page("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&published.title));
    assert!(body.contains("Async in Depth"));
    assert!(!body.contains("Secret Draft"));
    assert!(body.contains("Featured"));
    assert!(body.contains("A blog about systems."));
    assert!(body.contains("Mastodon"));

    // Newest first.
    let recent = &body[body.find("Recent posts").unwrap()..];
    assert!(recent.find("Async in Depth").unwrap() < recent.find("Ownership Explained").unwrap());
}

#[tokio::test]
async fn draft_posts_are_not_reachable_by_slug() {
    let app = TestApp::new();
    let author = app.create_user("alice", Role::Author).await;
    let rust = app.create_category("Rust").await;
    let draft = app
        .create_post(&author, &rust, "Work in Progress", PostStatus::Draft)
        .await;

    let (status, body) = app.browser().page(&format!("/{}/", draft.slug)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Page not found"));

    let (status, _) = app.browser().page("/no-such-post/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_page_shows_sanitized_body_and_comments_in_order() {
    let app = TestApp::new();
    let author = app.create_user("alice", Role::Author).await;
    let reader = app.create_user("bob", Role::Author).await;
    let rust = app.create_category("Rust").await;

    let post = app
        .store
        .create_post(scriba_kernel::models::NewPost {
            title: "Unsafe Code".to_string(),
            slug: "unsafe-code".to_string(),
            category_id: rust.id,
            author_id: author.id,
            short_description: "When to reach for unsafe".to_string(),
            body: "<p>Careful now</p><script>alert('x')</script>".to_string(),
            status: PostStatus::Published,
            is_featured: false,
            featured_image: None,
        })
        .await
        .unwrap();

    for body in ["First comment", "Second comment"] {
        app.store
            .create_comment(scriba_kernel::models::NewComment {
                post_id: post.id,
                author_id: reader.id,
                body: body.to_string(),
            })
            .await
            .unwrap();
    }

    let (status, body) = app.browser().page("/unsafe-code/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<p>Careful now</p>"));
    assert!(!body.contains("<script>"));
    assert!(body.contains("2 comments"));
    let first = body.find("First comment").unwrap();
    let second = body.find("Second comment").unwrap();
    assert!(first < second);
    assert!(body.contains("Log in</a> to leave a comment"));
}

#[tokio::test]
async fn category_page_lists_only_its_published_posts() {
    let app = TestApp::new();
    let author = app.create_user("alice", Role::Author).await;
    let rust = app.create_category("Rust").await;
    let go = app.create_category("Go").await;

    app.create_post(&author, &rust, "Borrowing Rules", PostStatus::Published)
        .await;
    app.create_post(&author, &rust, "Unfinished Macros", PostStatus::Draft)
        .await;
    app.create_post(&author, &go, "Goroutines", PostStatus::Published)
        .await;

    let (status, body) = app.browser().page(&format!("/category/{}/", rust.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Borrowing Rules"));
    assert!(!body.contains("Unfinished Macros"));
    assert!(!body.contains("Goroutines"));
    // Sidebar still lists every category.
    assert!(body.contains("Go</a>"));
}

#[tokio::test]
async fn unknown_or_malformed_category_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app
        .browser()
        .page(&format!("/category/{}/", uuid::Uuid::now_v7()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.browser().page("/category/not-a-uuid/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_matches_published_posts_ignoring_case() {
    let app = TestApp::new();
    let author = app.create_user("alice", Role::Author).await;
    let rust = app.create_category("Rust").await;

    app.create_post(&author, &rust, "Tokio Runtime Internals", PostStatus::Published)
        .await;
    app.create_post(&author, &rust, "Tokio Draft Notes", PostStatus::Draft)
        .await;
    app.create_post(&author, &rust, "Serde Tricks", PostStatus::Published)
        .await;

    let (status, body) = app.browser().page("/search/?keyword=tOkIo").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Tokio Runtime Internals"));
    assert!(!body.contains("Tokio Draft Notes"));
    assert!(!body.contains("Serde Tricks"));

    let (_, body) = app.browser().page("/search/?keyword=nothing-matches").await;
    assert!(body.contains("No posts match your search."));
}

#[tokio::test]
async fn blank_search_returns_nothing() {
    let app = TestApp::new();
    let author = app.create_user("alice", Role::Author).await;
    let rust = app.create_category("Rust").await;
    app.create_post(&author, &rust, "Anything", PostStatus::Published)
        .await;

    let (status, body) = app.browser().page("/search/?keyword=%20%20").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Enter a keyword to search posts."));
    assert!(!body.contains("Anything</a>"));

    let (status, _) = app.browser().page("/search/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn categories_page_lists_all_categories() {
    let app = TestApp::new();
    app.create_category("Rust").await;
    app.create_category("Databases").await;

    let (status, body) = app.browser().page("/categories/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Rust"));
    assert!(body.contains("Databases"));
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = TestApp::new();
    let response = app.browser().get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_text(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["store"], true);
}
