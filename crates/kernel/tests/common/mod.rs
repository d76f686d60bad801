#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] wires the real services, routes, and templates to an
//! in-memory content store, an in-memory session store, and a throwaway
//! uploads directory, so tests need neither PostgreSQL nor Redis.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use uuid::Uuid;

use scriba_kernel::AppState;
use scriba_kernel::file::LocalFileStorage;
use scriba_kernel::models::{Category, NewPost, Post, PostStatus, User};
use scriba_kernel::store::{ContentStore, MemoryContentStore};

pub const PASSWORD: &str = "correct-horse-battery";

/// Account roles used by the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Author,
    Staff,
    Superuser,
}

/// Test application wrapper using the real kernel routes and state.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryContentStore>,
    pub state: AppState,
    pub uploads_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.uploads_dir);
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryContentStore::new());
        let uploads_dir = std::env::temp_dir().join(format!("scriba-test-{}", Uuid::now_v7()));
        let files = Arc::new(LocalFileStorage::new(&uploads_dir, "/media"));

        let state = AppState::from_parts(store.clone(), files, None, "Scriba Test")
            .expect("Failed to build AppState");

        let session_layer =
            scriba_kernel::session::session_layer(MemoryStore::default(), "lax", false);

        // Must match main.rs
        let router = scriba_kernel::routes::router()
            .layer(session_layer)
            .with_state(state.clone());

        Self {
            router,
            store,
            state,
            uploads_dir,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// A browser with an empty cookie jar.
    pub fn browser(&self) -> Browser<'_> {
        Browser {
            app: self,
            cookies: String::new(),
        }
    }

    /// A browser already logged in as `username`.
    pub async fn logged_in(&self, username: &str) -> Browser<'_> {
        let mut browser = self.browser();
        browser.login(username, PASSWORD).await;
        browser
    }

    /// Create a user directly in the store with a cheap password hash.
    pub async fn create_user(&self, username: &str, role: Role) -> User {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        // Minimal Argon2 params keep the suite fast; verification reads the
        // params back from the hash string.
        let password_hash = tokio::task::spawn_blocking(|| {
            let salt = SaltString::generate(&mut OsRng);
            let params = argon2::Params::new(4 * 1024, 1, 1, None).expect("valid params");
            Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
                .hash_password(PASSWORD.as_bytes(), &salt)
                .expect("Failed to hash password")
                .to_string()
        })
        .await
        .expect("Argon2 hashing task panicked");

        self.store
            .create_user(scriba_kernel::models::NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: String::new(),
                last_name: String::new(),
                password_hash,
                is_staff: role != Role::Author,
                is_superuser: role == Role::Superuser,
                is_active: true,
            })
            .await
            .expect("Failed to create test user")
    }

    pub async fn create_category(&self, name: &str) -> Category {
        self.store
            .create_category(name)
            .await
            .expect("Failed to create category")
    }

    /// Insert a post directly, bypassing validation.
    pub async fn create_post(
        &self,
        author: &User,
        category: &Category,
        title: &str,
        status: PostStatus,
    ) -> Post {
        let slug = scriba_kernel::services::slug::slugify(title);
        self.store
            .create_post(NewPost {
                title: title.to_string(),
                slug,
                category_id: category.id,
                author_id: author.id,
                short_description: format!("About {title}"),
                body: format!("<p>{title} body</p>"),
                status,
                is_featured: false,
                featured_image: None,
            })
            .await
            .expect("Failed to create post")
    }

    pub async fn post(&self, id: Uuid) -> Option<Post> {
        self.store.find_post(id).await.expect("store read failed")
    }
}

/// A cookie-carrying client for one simulated visitor.
pub struct Browser<'a> {
    app: &'a TestApp,
    cookies: String,
}

impl Browser<'_> {
    async fn send(&mut self, mut request: Request<Body>) -> Response {
        if !self.cookies.is_empty() {
            request
                .headers_mut()
                .insert(header::COOKIE, self.cookies.parse().expect("Invalid cookie"));
        }
        let response = self.app.request(request).await;
        let cookies = extract_cookies(&response);
        if !cookies.is_empty() {
            self.cookies = cookies;
        }
        response
    }

    pub async fn get(&mut self, path: &str) -> Response {
        self.send(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// GET a page and return its status and body.
    pub async fn page(&mut self, path: &str) -> (StatusCode, String) {
        let response = self.get(path).await;
        let status = response.status();
        (status, body_text(response).await)
    }

    /// Fetch a fresh CSRF token by loading `path`.
    pub async fn csrf_token(&mut self, path: &str) -> String {
        let (_, body) = self.page(path).await;
        extract_csrf_token(&body).unwrap_or_else(|| panic!("no CSRF token on {path}"))
    }

    /// POST a urlencoded form without touching the token.
    pub async fn post_form_raw(&mut self, path: &str, fields: &[(&str, &str)]) -> Response {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// POST a urlencoded form with a token taken from `token_page`.
    pub async fn post_form(
        &mut self,
        token_page: &str,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Response {
        let token = self.csrf_token(token_page).await;
        let mut fields = fields.to_vec();
        fields.push(("_token", &token));
        self.post_form_raw(path, &fields).await
    }

    /// POST a multipart form with a token taken from `token_page`.
    pub async fn post_multipart(
        &mut self,
        token_page: &str,
        path: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> Response {
        let token = self.csrf_token(token_page).await;
        let boundary = "scribaTestBoundary7MA4YWxkTrZu0gW";
        let mut body: Vec<u8> = Vec::new();

        let mut text_part = |name: &str, value: &str| {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        };
        text_part("_token", &token);
        for (name, value) in fields {
            text_part(name, value);
        }
        if let Some((filename, content_type, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"featured_image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        self.send(
            Request::post(path)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Log in through the HTML form.
    pub async fn login(&mut self, username: &str, password: &str) -> Response {
        let response = self
            .post_form(
                "/login/",
                "/login/",
                &[("username", username), ("password", password)],
            )
            .await;
        assert_eq!(
            response.status(),
            StatusCode::SEE_OTHER,
            "login failed for {username}"
        );
        response
    }
}

/// Extract Set-Cookie headers from a response for use in subsequent requests.
pub fn extract_cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn extract_csrf_token(html: &str) -> Option<String> {
    let marker = "name=\"_token\" value=\"";
    let start = html.find(marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8_lossy(&body_bytes(response).await).into_owned()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
