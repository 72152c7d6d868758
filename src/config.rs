use std::path::PathBuf;
use std::str::FromStr;

use crate::schema::SchemaVariant;

/// What to do when the model artifact cannot be loaded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailurePolicy {
    /// Log the error and exit before serving anything.
    Halt,
    /// Keep serving, showing the error on every form and prediction route.
    ServeError,
}

impl FromStr for LoadFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "halt" => Ok(LoadFailurePolicy::Halt),
            "serve-error" | "serve_error" => Ok(LoadFailurePolicy::ServeError),
            other => Err(format!(
                "unknown load failure policy '{}' (expected 'halt' or 'serve-error')",
                other
            )),
        }
    }
}

/// Per-IP limit on the prediction routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests allowed per second once the burst is spent.
    pub per_second: u64,
    pub burst: u32,
}

impl RateLimit {
    /// Time the governor waits before restoring one request of quota.
    pub fn replenish_interval_ns(&self) -> u64 {
        (1_000_000_000 / self.per_second.max(1)).max(1)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub model_path: PathBuf,
    pub schema: SchemaVariant,
    pub on_load_failure: LoadFailurePolicy,
    pub app_title: String,
    /// `None` disables rate limiting.
    pub rate_limit: Option<RateLimit>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            model_path: PathBuf::from("model.json"),
            schema: SchemaVariant::Full,
            on_load_failure: LoadFailurePolicy::ServeError,
            app_title: "Telco Customer Churn Prediction".to_string(),
            rate_limit: Some(RateLimit {
                per_second: 10,
                burst: 20,
            }),
        }
    }
}

/// Reads a variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let port = match env_var("PORT") {
            Some(port) => port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            None => defaults.port,
        };

        let model_path = env_var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let schema = match env_var("CHURN_SCHEMA") {
            Some(value) => value
                .parse::<SchemaVariant>()
                .map_err(|e| anyhow::anyhow!("CHURN_SCHEMA: {}", e))?,
            None => defaults.schema,
        };

        let on_load_failure = match env_var("MODEL_LOAD_FAILURE") {
            Some(value) => value
                .parse::<LoadFailurePolicy>()
                .map_err(|e| anyhow::anyhow!("MODEL_LOAD_FAILURE: {}", e))?,
            None => defaults.on_load_failure,
        };

        let app_title = env_var("APP_TITLE").unwrap_or(defaults.app_title);

        let per_second = match env_var("RATE_LIMIT_PER_SECOND") {
            Some(value) => value.parse::<u64>().map_err(|_| {
                anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a non-negative number")
            })?,
            None => 10,
        };
        let burst = match env_var("RATE_LIMIT_BURST") {
            Some(value) => value
                .parse::<u32>()
                .ok()
                .filter(|b| *b > 0)
                .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_BURST must be a positive number"))?,
            None => 20,
        };
        // A rate of zero turns the limiter off.
        let rate_limit = (per_second > 0).then_some(RateLimit { per_second, burst });

        let config = Self {
            port,
            model_path,
            schema,
            on_load_failure,
            app_title,
            rate_limit,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Model path: {}", config.model_path.display());
        tracing::debug!("Schema: {}", config.schema);
        tracing::debug!("Load failure policy: {:?}", config.on_load_failure);
        match config.rate_limit {
            Some(limit) => tracing::debug!(
                "Rate limit: {}/s, burst {}",
                limit.per_second,
                limit.burst
            ),
            None => tracing::warn!("Rate limiting disabled"),
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
