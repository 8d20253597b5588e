//! JSON posts endpoint for scripts and other sites. It authorizes writes
//! with the shared post secret rather than a browser session.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::Publisher;
use crate::models::post::NewPost;
use crate::services::{Credential, PlatformError, PostService};

use super::AppState;

#[derive(Deserialize)]
struct SecretOnly {
    secret: Option<String>,
}

#[derive(Deserialize)]
struct EndpointPost {
    #[serde(rename = "type")]
    post_type: Option<String>,
    content: Option<String>,
    images: Option<Value>,
}

fn platform_failure(e: PlatformError) -> Response {
    tracing::error!(error = %e, "posts endpoint data error");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(e.to_json())).into_response()
}

async fn list(State(state): State<AppState>) -> Response {
    match state.platform.list_posts(Credential::Service).await {
        Ok(posts) => Json(posts).into_response(),
        Err(e) => platform_failure(e),
    }
}

async fn create(State(state): State<AppState>, body: Bytes) -> Response {
    // the secret is checked before anything else about the body
    let provided = serde_json::from_slice::<SecretOnly>(&body)
        .ok()
        .and_then(|b| b.secret);
    let Ok(publisher) = Publisher::from_secret(provided.as_deref(), state.post_secret.as_deref())
    else {
        tracing::warn!("posts endpoint: secret mismatch");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };

    let fields: EndpointPost = match serde_json::from_slice(&body) {
        Ok(fields) => fields,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": e.to_string() })),
            )
                .into_response()
        }
    };

    let row = NewPost {
        post_type: fields.post_type,
        content: fields.content,
        images: fields.images,
        ..Default::default()
    };
    match state.platform.insert_post(publisher.credential(), &row).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => platform_failure(e),
    }
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response()
}

pub fn router() -> MethodRouter<AppState> {
    get(list).post(create).fallback(method_not_allowed)
}
