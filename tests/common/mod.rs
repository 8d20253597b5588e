//! Shared setup for the router tests: an in-memory platform with a known
//! owner, and helpers to sign in and seed posts.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::HeaderName;
use axum_test::TestServer;
use pixelblog::auth::SESSION_COOKIE;
use pixelblog::models::post::{NewPost, Post};
use pixelblog::render::{Templates, TEMPLATE_DIR};
use pixelblog::routes::AppState;
use pixelblog::services::{AuthService, Credential, MemoryPlatform, PostService};

pub const OWNER_EMAIL: &str = "owner@example.com";
pub const OWNER_PASSWORD: &str = "correct horse battery staple";
pub const POST_SECRET: &str = "let-me-post";

pub struct Harness {
    pub server: TestServer,
    pub platform: Arc<MemoryPlatform>,
}

pub fn hx() -> HeaderName {
    HeaderName::from_static("hx-request")
}

/// Router over a fresh in-memory platform.
pub fn harness_with_secret(secret: Option<&str>) -> Harness {
    let platform = Arc::new(MemoryPlatform::new().with_owner(OWNER_EMAIL, OWNER_PASSWORD));
    let templates = Templates::load(TEMPLATE_DIR).expect("templates load");
    let state = AppState::new(platform.clone(), templates, secret);
    let app = pixelblog::app(state, "./dist/", &[]);

    Harness {
        server: TestServer::new(app).expect("Failed to create test server"),
        platform,
    }
}

pub fn harness() -> Harness {
    harness_with_secret(Some(POST_SECRET))
}

/// A `Cookie` header value carrying a live owner session.
pub async fn owner_cookie(platform: &MemoryPlatform) -> String {
    let session = platform
        .sign_in(OWNER_EMAIL, OWNER_PASSWORD)
        .await
        .expect("owner signs in");
    format!("{SESSION_COOKIE}={}", session.access_token)
}

pub async fn seed_post(platform: &MemoryPlatform, title: &str, content: &str) -> Post {
    let rows = platform
        .insert_post(
            Credential::Service,
            &NewPost {
                post_type: Some("text".into()),
                title: Some(title.into()),
                content: Some(content.into()),
                ..Default::default()
            },
        )
        .await
        .expect("seed insert");
    rows.into_iter().next().expect("one row")
}

pub async fn seed_posts(platform: &MemoryPlatform, count: usize) {
    for n in 1..=count {
        seed_post(platform, &format!("Post number {n}"), "Some words").await;
    }
}

pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}
