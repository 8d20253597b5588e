pub mod tracing;

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "appsettings.json";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Supabase,
    /// Keep everything in process; for local development.
    Memory,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AppCfg {
    pub bind_addr: String,
    pub backend: Backend,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub post_secret: Option<String>,
    pub storage_bucket: String,
    pub static_dir: String,
    /// Relative paths resolve against the working directory.
    pub templates_dir: String,
    pub templates_reload: bool,
    pub cors_origins: Vec<String>,
    pub log_filter: String,
    pub owner_email: Option<String>,
    pub owner_password: Option<String>,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            backend: Backend::default(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: None,
            post_secret: None,
            storage_bucket: "blog-images".into(),
            static_dir: "./dist/".into(),
            templates_dir: crate::render::TEMPLATE_DIR.into(),
            templates_reload: false,
            cors_origins: Vec::new(),
            log_filter: "info".into(),
            owner_email: None,
            owner_password: None,
        }
    }
}

/// Hosting platforms hand these over under their own names.
const PLATFORM_VARS: [&str; 4] = [
    "SUPABASE_URL",
    "SUPABASE_KEY",
    "SUPABASE_SERVICE_ROLE_KEY",
    "POST_SECRET",
];

impl AppCfg {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppCfg::default()))
            .merge(Json::file(SETTINGS_FILE))
            .merge(Env::prefixed("APP_"))
            .merge(Env::raw().only(&PLATFORM_VARS).map(|key| {
                if key.as_str().eq_ignore_ascii_case("SUPABASE_KEY") {
                    "supabase_anon_key".into()
                } else {
                    key.as_str().to_ascii_lowercase().into()
                }
            }))
    }

    pub fn load() -> anyhow::Result<Self> {
        let cfg: Self = Self::figment().extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.backend == Backend::Supabase
            && (self.supabase_url.is_empty() || self.supabase_anon_key.is_empty())
        {
            anyhow::bail!("supabase backend needs SUPABASE_URL and SUPABASE_KEY");
        }
        Ok(())
    }

    /// The key used for server-side writes; the anon key when none is set.
    pub fn service_key(&self) -> &str {
        match self.supabase_service_role_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => {
                ::tracing::warn!("no service role key configured, using the anon key");
                &self.supabase_anon_key
            }
        }
    }
}
