use std::sync::Arc;

use axum::Router;
use tower_http::cors::{self, CorsLayer};

pub trait CorsExt<S> {
    fn with_cors(self, origins: &[String]) -> Router<S>;
}

/// Exact origins, or `*.suffix` entries to allow any subdomain.
fn origin_allowed(allowed: &[String], origin: &[u8]) -> bool {
    allowed.iter().any(|a| match a.strip_prefix('*') {
        Some(suffix) => origin.ends_with(suffix.as_bytes()),
        None => origin == a.as_bytes(),
    })
}

impl<S> CorsExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Add CORS to Router; the JSON endpoint is meant to be called from other sites.
    fn with_cors(self, origins: &[String]) -> Router<S> {
        if origins.is_empty() {
            return self;
        }
        let allowed: Arc<[String]> = origins.into();
        let cors_layer = CorsLayer::new()
            .allow_origin(cors::AllowOrigin::predicate(move |origin, _| {
                origin_allowed(&allowed, origin.as_bytes())
            }))
            .allow_methods(cors::Any)
            .allow_headers(cors::Any);

        self.layer(cors_layer)
    }
}
