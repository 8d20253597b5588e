pub mod auth;
pub mod authoring;
pub mod components;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod render;
pub mod routes;
pub mod services;

use axum::http::header;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::middleware::cors::CorsExt;
use crate::middleware::logging::HttpLoggingExt;
use crate::routes::AppState;

pub use error::AppError;

/// Every route of the blog: pages, htmx fragments, the JSON endpoint and static assets.
pub fn app(state: AppState, static_dir: &str, cors_origins: &[String]) -> Router {
    Router::new()
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    header::HeaderValue::from_static("max-age=13420"),
                ))
                .layer(CompressionLayer::new())
                .service(tower_http::services::ServeDir::new(static_dir)),
        )
        .merge(routes::pages::router())
        .merge(routes::session::router())
        .merge(routes::posts::router())
        .route("/api/posts", routes::endpoint::router())
        .with_cors(cors_origins)
        .with_http_logging()
        .with_state(state)
}
