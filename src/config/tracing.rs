use tracing_forest::ForestLayer;
use tracing_subscriber::{filter, prelude::*, EnvFilter};

/// `RUST_LOG` when set, otherwise the configured filter.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

pub trait HttpTracingExt: tracing::Subscriber {
    /// Cap `tower_http` at info: the request/response lines from the logging
    /// middleware stay, its debug-level span chatter goes.
    fn with_http_tracing(self) -> tracing_subscriber::layer::Layered<filter::Targets, Self>
    where
        Self: Sized,
    {
        self.with(
            filter::Targets::new()
                .with_target("tower_http", tracing::Level::INFO)
                .with_default(tracing::Level::TRACE),
        )
    }
}

impl<S: tracing::Subscriber> HttpTracingExt for S {}

pub fn init(fallback_filter: &str) {
    tracing_subscriber::registry()
        .with_http_tracing()
        .with(env_filter(fallback_filter))
        .with(ForestLayer::default())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_filter_is_used() {
        // RUST_LOG is not set under cargo test unless the caller sets it
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter("pixelblog=debug").to_string(), "pixelblog=debug");
        }
    }
}
