use std::path::Path;
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tera::{Context, Tera};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Default template directory, relative to the working directory.
pub const TEMPLATE_DIR: &str = "src/templates";

/// Shared tera instance; reloadable while the server runs.
#[derive(Clone)]
pub struct Templates {
    inner: Arc<RwLock<Tera>>,
}

impl Templates {
    pub fn load(dir: impl AsRef<Path>) -> tera::Result<Self> {
        let glob = format!("{}/**/*.html", dir.as_ref().display());
        let tera = Tera::new(&glob)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(tera)),
        })
    }

    pub async fn render(&self, name: &str, ctx: &Context) -> tera::Result<String> {
        self.inner.read().await.render(name, ctx)
    }

    /// Re-parse all templates whenever something under `dir` changes.
    ///
    /// The returned watcher must be kept alive for reloading to continue.
    pub fn watch(&self, dir: impl AsRef<Path>) -> notify::Result<RecommendedWatcher> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if !event.kind.is_access() => {
                    let _ = tx.send(());
                }
                Ok(_) => (),
                Err(e) => warn!(error = %e, "template watcher error"),
            }
        })?;
        watcher.watch(dir.as_ref(), RecursiveMode::Recursive)?;

        let inner = self.inner.clone();
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // collapse bursts from editors writing several events per save
                while rx.try_recv().is_ok() {}
                match inner.write().await.full_reload() {
                    Ok(()) => info!("templates reloaded"),
                    Err(e) => warn!(error = %e, "template reload failed"),
                }
            }
        });

        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bundled_templates_parse() {
        let templates = Templates::load(TEMPLATE_DIR).unwrap();
        let names: Vec<String> = templates
            .inner
            .read()
            .await
            .get_template_names()
            .map(str::to_owned)
            .collect();
        for expected in [
            "page.html",
            "partials/recent_posts.html",
            "partials/image_field.html",
            "views/post_detail.html",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
