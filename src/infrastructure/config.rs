use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Bearer token required for plan changes. Empty disables the endpoint.
    pub admin_token: String,
    pub store_path: String,
    pub cors_allowed_origin: Option<String>,

    // Hosted language model
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,

    pub profile_timeout_ms: u64,

    // Live sessions
    pub plan_refresh_secs: u64,
    pub plan_retry_secs: u64,
    pub session_idle_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("MAESTRO")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 8080)?
            .set_default("admin_token", "")?
            .set_default("store_path", "data/store.json")?
            .set_default("llm_base_url", "https://api.openai.com/v1")?
            .set_default("llm_model", "gpt-4o-mini")?
            .set_default("llm_timeout_secs", 60)?
            .set_default("profile_timeout_ms", 3000)?
            .set_default("plan_refresh_secs", 300)?
            .set_default("plan_retry_secs", 30)?
            .set_default("session_idle_secs", 1800)?
            .build()?;

        config.try_deserialize()
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn profile_timeout(&self) -> Duration {
        Duration::from_millis(self.profile_timeout_ms)
    }

    pub fn plan_refresh(&self) -> Duration {
        Duration::from_secs(self.plan_refresh_secs)
    }

    pub fn plan_retry(&self) -> Duration {
        Duration::from_secs(self.plan_retry_secs)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}
