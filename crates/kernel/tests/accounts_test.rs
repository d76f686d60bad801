#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Registration, login, and logout.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{PASSWORD, Role, TestApp, body_text, location};
use scriba_kernel::store::ContentStore;

#[tokio::test]
async fn registration_creates_an_author_and_logs_in() {
    let app = TestApp::new();

    let mut browser = app.browser();
    let response = browser
        .post_form(
            "/register/",
            "/register/",
            &[
                ("username", "writer"),
                ("email", "writer@example.com"),
                ("password", "plenty-long"),
                ("confirm_password", "plenty-long"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/");

    let user = app
        .store
        .find_user_by_username("writer")
        .await
        .unwrap()
        .expect("registered");
    assert!(user.is_active);
    assert!(!user.is_staff);
    assert!(!user.is_superuser);

    let (status, body) = browser.page("/dashboard/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Welcome, writer! Your account has been created."));
}

#[tokio::test]
async fn registration_reports_every_problem() {
    let app = TestApp::new();
    app.create_user("writer", Role::Author).await;

    let response = app
        .browser()
        .post_form(
            "/register/",
            "/register/",
            &[
                ("username", "Writer"),
                ("email", "not-an-email"),
                ("password", "short"),
                ("confirm_password", "different"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("A user with that username already exists."));
    assert!(body.contains("Enter a valid email address."));
    assert!(body.contains("Password must be at least 8 characters."));
    assert!(body.contains("Passwords do not match."));
    assert_eq!(app.store.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn login_rejects_bad_credentials_without_detail() {
    let app = TestApp::new();
    app.create_user("alice", Role::Author).await;

    for (username, password) in [("alice", "wrong-password"), ("nobody", PASSWORD)] {
        let response = app
            .browser()
            .post_form(
                "/login/",
                "/login/",
                &[("username", username), ("password", password)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Invalid username or password."));
        assert!(body.contains(&format!("value=\"{username}\"")));
    }
}

#[tokio::test]
async fn login_returns_to_next_and_records_last_login() {
    let app = TestApp::new();
    let alice = app.create_user("alice", Role::Author).await;
    assert!(alice.last_login.is_none());

    let mut browser = app.browser();
    let response = browser
        .post_form(
            "/login/",
            "/login/",
            &[
                ("username", "ALICE"),
                ("password", PASSWORD),
                ("next", "/dashboard/posts/"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/posts/");

    let alice = app.store.find_user(alice.id).await.unwrap().unwrap();
    assert!(alice.last_login.is_some());

    // Off-site targets fall back to the dashboard.
    let response = app
        .browser()
        .post_form(
            "/login/",
            "/login/",
            &[
                ("username", "alice"),
                ("password", PASSWORD),
                ("next", "https://evil.example/"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/dashboard/");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    app.create_user("alice", Role::Author).await;

    let mut browser = app.logged_in("alice").await;
    let (status, _) = browser.page("/dashboard/").await;
    assert_eq!(status, StatusCode::OK);

    let response = browser.post_form("/", "/logout/", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = browser.get("/dashboard/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login/"));
}

#[tokio::test]
async fn json_login_issues_a_session() {
    let app = TestApp::new();
    app.create_user("alice", Role::Author).await;

    let request = |password: &str| {
        Request::post("/login/json/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "username": "alice", "password": password }).to_string(),
            ))
            .unwrap()
    };

    let response = app.request(request("wrong-password")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.request(request(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = common::extract_cookies(&response);
    assert!(!cookies.is_empty());
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["success"], true);

    let response = app
        .request(
            Request::get("/dashboard/")
                .header(header::COOKIE, cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logged_in_users_skip_login_and_register_pages() {
    let app = TestApp::new();
    app.create_user("alice", Role::Author).await;

    let mut browser = app.logged_in("alice").await;
    let response = browser.get("/login/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/");

    let response = browser.get("/register/").await;
    assert_eq!(location(&response), "/dashboard/");
}
