pub mod memory;
pub mod supabase;

use axum::async_trait;
use axum::body::Bytes;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::post::{NewPost, Post, PostId};
use crate::models::user::{Session, User};

pub use memory::MemoryPlatform;
pub use supabase::SupabaseClient;

/// Marker for services that can live in shared router state.
pub trait Svc: Send + Sync + 'static {}

/// Which key a platform call is made with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Credential<'a> {
    /// The public anon key; reads only.
    Anon,
    /// A signed-in user's access token.
    User(&'a str),
    /// The service-role key held by the server.
    Service,
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        body: Value,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Rejected(String),
}

impl PlatformError {
    /// Build an API error from a response body, picking the most useful message field.
    pub fn api(status: u16, body: Value) -> Self {
        let message = ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .map(str::to_owned)
            .unwrap_or_else(|| format!("platform returned status {status}"));
        Self::Api {
            status,
            message,
            body,
        }
    }

    /// JSON shape handed back to endpoint callers.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Api { body, .. } => body.clone(),
            other => json!({ "message": other.to_string() }),
        }
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

#[async_trait]
pub trait AuthService: Svc {
    async fn sign_in(&self, email: &str, password: &str) -> PlatformResult<Session>;
    async fn sign_out(&self, access_token: &str) -> PlatformResult<()>;
    /// `Ok(None)` when the token is unknown or expired.
    async fn current_user(&self, access_token: &str) -> PlatformResult<Option<User>>;
}

#[async_trait]
pub trait PostService: Svc {
    /// All posts, newest first.
    async fn list_posts(&self, cred: Credential<'_>) -> PlatformResult<Vec<Post>>;
    async fn get_post(&self, cred: Credential<'_>, id: &PostId) -> PlatformResult<Post>;
    async fn insert_post(&self, cred: Credential<'_>, post: &NewPost) -> PlatformResult<Vec<Post>>;
    async fn delete_post(&self, cred: Credential<'_>, id: &PostId) -> PlatformResult<()>;
}

#[async_trait]
pub trait ImageStorage: Svc {
    async fn upload(
        &self,
        cred: Credential<'_>,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> PlatformResult<()>;
    fn public_url(&self, path: &str) -> String;
}

/// Everything the app needs from the backing platform.
pub trait Platform: AuthService + PostService + ImageStorage {}

impl<T> Platform for T where T: AuthService + PostService + ImageStorage {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_prefers_message_fields() {
        let err = PlatformError::api(400, json!({ "code": "PGRST116", "message": "no rows" }));
        assert_eq!(err.to_string(), "no rows");

        let err = PlatformError::api(
            400,
            json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
        );
        assert_eq!(err.to_string(), "Invalid login credentials");

        let err = PlatformError::api(502, Value::Null);
        assert_eq!(err.to_string(), "platform returned status 502");
    }

    #[test]
    fn api_error_json_is_the_raw_body() {
        let body = json!({ "code": "42P01", "message": "relation does not exist" });
        assert_eq!(PlatformError::api(404, body.clone()).to_json(), body);
        assert_eq!(
            PlatformError::NotFound("post 7".into()).to_json(),
            json!({ "message": "post 7 not found" })
        );
    }
}
