//! Posts endpoint tests: listing, secret-gated inserts and method handling.

mod common;

use axum::http::header::COOKIE;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{harness, harness_with_secret, owner_cookie, seed_post, POST_SECRET};

#[tokio::test]
async fn get_on_empty_table_returns_empty_array() {
    let h = harness();

    let response = h.server.get("/api/posts").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn get_lists_newest_first() {
    let h = harness();
    seed_post(&h.platform, "older", "a").await;
    seed_post(&h.platform, "newer", "b").await;

    let posts = h.server.get("/api/posts").await.json::<Value>();

    let titles: Vec<&str> = posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["newer", "older"]);
    assert_eq!(posts[0]["type"], "text");
    assert!(posts[0]["created_at"].is_string());
}

#[tokio::test]
async fn post_with_wrong_secret_is_unauthorized() {
    let h = harness();

    for body in [
        json!({ "secret": "guess", "type": "text", "content": "hi" }),
        json!({ "type": "text", "content": "hi" }),
        json!({ "secret": 12345 }),
        json!([1, 2, 3]),
    ] {
        let response = h.server.post("/api/posts").json(&body).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "Unauthorized");
    }

    let response = h.server.post("/api/posts").text("definitely not json").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(h.server.get("/api/posts").await.json::<Value>(), json!([]));
}

#[tokio::test]
async fn post_with_secret_inserts_row() {
    let h = harness();

    let response = h
        .server
        .post("/api/posts")
        .json(&json!({
            "secret": POST_SECRET,
            "type": "note",
            "content": "posted from a script",
            "images": ["https://cdn.example.com/a.png"]
        }))
        .await;

    response.assert_status_ok();
    let rows = response.json::<Value>();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["type"], "note");
    assert_eq!(rows[0]["content"], "posted from a script");
    assert_eq!(rows[0]["images"], json!(["https://cdn.example.com/a.png"]));

    let listed = h.server.get("/api/posts").await.json::<Value>();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn session_state_does_not_matter_to_the_endpoint() {
    let h = harness();
    let cookie = owner_cookie(&h.platform).await;

    // an owner session does not stand in for the secret
    h.server
        .post("/api/posts")
        .add_header(COOKIE, cookie.clone())
        .json(&json!({ "type": "text", "content": "x" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // and the secret works with no session at all
    h.server
        .post("/api/posts")
        .json(&json!({ "secret": POST_SECRET, "type": "text", "content": "x" }))
        .await
        .assert_status_ok();

    h.server
        .get("/api/posts")
        .add_header(COOKIE, cookie)
        .await
        .assert_status_ok();
    h.server.get("/api/posts").await.assert_status_ok();
}

#[tokio::test]
async fn unconfigured_secret_refuses_everything() {
    let h = harness_with_secret(None);

    h.server
        .post("/api/posts")
        .json(&json!({ "type": "text", "content": "x" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    h.server
        .post("/api/posts")
        .json(&json!({ "secret": "", "type": "text", "content": "x" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let h = harness();

    let response = h.server.put("/api/posts").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.text(), "Method Not Allowed");

    h.server
        .delete("/api/posts")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    h.server
        .patch("/api/posts")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn data_errors_become_500_with_error_body() {
    let h = harness();
    h.platform.set_unavailable(true);

    let response = h.server.get("/api/posts").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>(),
        json!({ "message": "service unavailable" })
    );

    let response = h
        .server
        .post("/api/posts")
        .json(&json!({ "secret": POST_SECRET, "type": "text", "content": "x" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}
