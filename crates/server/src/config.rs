use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// HTTP server bind configuration.
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum time to wait for in-flight work during shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    10
}

/// Authentication configuration.
#[derive(Debug, Deserialize)]
pub struct AuthFileConfig {
    /// Shared HS256 secret; must match every cooperating service.
    /// Overridable via `COPYDESK_JWT_SECRET`.
    #[serde(default)]
    pub jwt_secret: String,
    /// Platform root identity used as issuer on internal tokens.
    #[serde(default = "default_root_issuer")]
    pub root_issuer: String,
    /// This service's own name.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Admin secret gating the dev mint endpoint; absent disables it.
    /// Overridable via `COPYDESK_DEV_ADMIN_SECRET`.
    #[serde(default)]
    pub dev_admin_secret: Option<String>,
}

impl Default for AuthFileConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            root_issuer: default_root_issuer(),
            service_name: default_service_name(),
            dev_admin_secret: None,
        }
    }
}

fn default_root_issuer() -> String {
    "copydesk".to_owned()
}

fn default_service_name() -> String {
    "copydesk-writer".to_owned()
}

/// Task store backend selection.
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// `"memory"` or `"postgres"`.
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Postgres connection URL. Overridable via `DATABASE_URL`.
    #[serde(default)]
    pub url: Option<String>,
    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: None,
            pool_size: default_pool_size(),
        }
    }
}

fn default_store_backend() -> String {
    "memory".to_owned()
}

fn default_pool_size() -> u32 {
    5
}

/// Queue configuration. An absent Redis URL disables the queue and the
/// worker; submissions then fall back to external triggering.
#[derive(Debug, Default, Deserialize)]
pub struct QueueFileConfig {
    /// Redis connection URL. Overridable via `REDIS_URL`.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Queue name override.
    #[serde(default)]
    pub queue_name: Option<String>,
    /// Base URL the worker uses to re-enter the run endpoint; defaults to
    /// `http://localhost:{port}`.
    #[serde(default)]
    pub self_url: Option<String>,
}

/// Base URLs of the cooperating services.
#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    pub generation_url: String,
    pub profile_url: String,
    pub insights_url: String,
    pub events_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            generation_url: "http://localhost:8801".to_owned(),
            profile_url: "http://localhost:8802".to_owned(),
            insights_url: "http://localhost:8803".to_owned(),
            events_url: "http://localhost:8804".to_owned(),
        }
    }
}

/// Generation model selection.
#[derive(Debug, Deserialize)]
pub struct GenerationFileConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for GenerationFileConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
        }
    }
}

fn default_provider() -> String {
    "anthropic".to_owned()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_owned()
}

/// Top-level configuration, loaded from a TOML file with environment
/// overrides for secrets and connection URLs.
#[derive(Debug, Default, Deserialize)]
pub struct CopydeskConfig {
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub auth: AuthFileConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueFileConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub generation: GenerationFileConfig,
}

impl CopydeskConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw).map_err(|e| ServerError::Config(e.to_string()))?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var("COPYDESK_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(secret) = std::env::var("COPYDESK_DEV_ADMIN_SECRET") {
            self.auth.dev_admin_secret = Some(secret);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.store.url = Some(url);
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.queue.redis_url = Some(url);
        }
    }

    fn validate(&self) -> Result<(), ServerError> {
        if self.auth.jwt_secret.len() < 16 {
            return Err(ServerError::Config(
                "auth.jwt_secret must be at least 16 characters (set COPYDESK_JWT_SECRET)".into(),
            ));
        }
        if self.store.backend == "postgres" && self.store.url.is_none() {
            return Err(ServerError::Config(
                "store.backend = \"postgres\" requires store.url or DATABASE_URL".into(),
            ));
        }
        if !matches!(self.store.backend.as_str(), "memory" | "postgres") {
            return Err(ServerError::Config(format!(
                "unknown store backend '{}'",
                self.store.backend
            )));
        }
        Ok(())
    }
}
