use std::sync::Arc;

use tracing::*;

use pixelblog::config::{self, AppCfg, Backend};
use pixelblog::render::Templates;
use pixelblog::routes::AppState;
use pixelblog::services::{MemoryPlatform, Platform, SupabaseClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppCfg::load()?;

    config::tracing::init(&cfg.log_filter);

    let platform: Arc<dyn Platform> = match cfg.backend {
        Backend::Supabase => {
            info!(url = %cfg.supabase_url, "using hosted platform");
            Arc::new(SupabaseClient::new(
                &cfg.supabase_url,
                &cfg.supabase_anon_key,
                cfg.service_key(),
                &cfg.storage_bucket,
            )?)
        }
        Backend::Memory => {
            warn!("using in-memory platform, nothing will be persisted");
            let mut memory = MemoryPlatform::new();
            if let (Some(email), Some(password)) = (&cfg.owner_email, &cfg.owner_password) {
                memory = memory.with_owner(email, password);
            }
            Arc::new(memory)
        }
    };

    if cfg.post_secret.as_deref().unwrap_or_default().is_empty() {
        warn!("POST_SECRET is not set, the posts endpoint will refuse every insert");
    }

    let templates = Templates::load(&cfg.templates_dir)?;
    let _watcher = if cfg.templates_reload {
        info!("watching {} for template changes", cfg.templates_dir);
        Some(templates.watch(&cfg.templates_dir)?)
    } else {
        None
    };

    let state = AppState::new(platform, templates, cfg.post_secret.as_deref());
    let app = pixelblog::app(state, &cfg.static_dir, &cfg.cors_origins);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!("starting listening at {}", cfg.bind_addr);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
