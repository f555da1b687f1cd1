//! Application configuration loading from environment variables.
//!
//! All configuration is read once at startup through `std::env::var`, after
//! `dotenvy` has loaded any `.env` file.
//!
//! # Environment Variables
//!
//! ## Required Variables
//! - `JWT_SECRET`: HS256 secret for admin and service tokens
//! - `DATABASE_URL`: PostgreSQL connection string (only with the postgres backend)
//!
//! ## Optional Variables
//! - `RUST_LOG`: Logging level (default: "info,moderation=debug,tower_http=debug")
//! - `STORAGE_BACKEND`: `postgres` or `memory` (default: postgres)
//! - `HOST`: Server bind address (default: "0.0.0.0")
//! - `PORT`: Server port (default: 3000)
//! - `DATABASE_MAX_CONNECTIONS`: DB pool size (default: 20)
//! - `ANALYZER_API_URL`: Chat completions endpoint (default: OpenAI)
//! - `ANALYZER_API_KEY`: Analyzer credential; the local heuristic analyzer is used when unset
//! - `ANALYZER_MODEL`: Model name sent to the analyzer (default: "gpt-4o-mini")
//! - `ANALYZER_TIMEOUT_SECONDS`: HTTP timeout for one analyzer call (default: 45)
//! - `MODERATION_BATCH_SIZE`: Items per cycle (default: 10)
//! - `MODERATION_INTERVAL_SECONDS`: Scheduler tick (default: 60)
//! - `MODERATION_MAX_RETRIES`: Failed analyses before dead-lettering (default: 3)
//! - `MODERATION_SCHEDULED_BUDGET_SECONDS`: Analysis budget for scheduled cycles (default: 540)
//! - `MODERATION_MANUAL_BUDGET_SECONDS`: Analysis budget for the HTTP trigger (default: 30)
//! - `MODERATION_STALE_CLAIM_MINUTES`: Age after which a claim is released (default: 15)
//! - `ENABLE_MODERATION_SCHEDULER`: Run the scheduled processor (default: true)
//! - `SUSPENSION_SEVERITY`: Minimum severity for account suspension (default: HIGH)
//! - `PRECHECK_KEYWORD_CATEGORY`: Category tag of keyword pre-check blocks (default: harassment)
//! - `ENABLE_REPUTATION_SWEEP`: Run the periodic reputation recompute (default: true)
//! - `REPUTATION_SWEEP_INTERVAL_SECONDS`: Sweep interval (default: 3600)
//! - `IGNORE_MISSING_MIGRATIONS`: Skip missing migrations (default: true)

use crate::domain::moderation::entity::Severity;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local stores; state is lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Postgres => f.write_str("postgres"),
            StorageBackend::Memory => f.write_str("memory"),
        }
    }
}

/// Complete server configuration loaded from environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage_backend: StorageBackend,

    /// PostgreSQL connection string; `None` only with the memory backend
    pub database_url: Option<String>,

    /// Maximum number of concurrent database connections
    pub database_max_connections: u32,

    pub host: String,
    pub port: u16,

    /// Secret key for JWT verification
    pub jwt_secret: String,

    pub analyzer_api_url: String,
    pub analyzer_api_key: Option<String>,
    pub analyzer_model: String,
    pub analyzer_timeout_seconds: u64,

    pub moderation_batch_size: usize,
    pub moderation_interval_seconds: u64,
    pub moderation_max_retries: i32,
    pub moderation_scheduled_budget_seconds: u64,
    pub moderation_manual_budget_seconds: u64,
    pub moderation_stale_claim_minutes: i64,
    pub enable_moderation_scheduler: bool,

    /// Blocks and bans at or above this severity also suspend the author
    pub suspension_severity: Severity,

    pub precheck_keyword_category: String,

    pub enable_reputation_sweep: bool,
    pub reputation_sweep_interval_seconds: u64,

    /// Skip missing migrations during startup
    pub ignore_missing_migrations: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Postgres,
            database_url: None,
            database_max_connections: 20,
            host: "0.0.0.0".to_string(),
            port: 3000,
            jwt_secret: String::new(),
            analyzer_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            analyzer_api_key: None,
            analyzer_model: "gpt-4o-mini".to_string(),
            analyzer_timeout_seconds: 45,
            moderation_batch_size: 10,
            moderation_interval_seconds: 60,
            moderation_max_retries: 3,
            moderation_scheduled_budget_seconds: 540,
            moderation_manual_budget_seconds: 30,
            moderation_stale_claim_minutes: 15,
            enable_moderation_scheduler: true,
            suspension_severity: Severity::High,
            precheck_keyword_category: "harassment".to_string(),
            enable_reputation_sweep: true,
            reputation_sweep_interval_seconds: 3600,
            ignore_missing_migrations: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a set variable
    /// cannot be parsed to the expected type.
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();
        let storage_backend: StorageBackend = env_or("STORAGE_BACKEND", d.storage_backend)?;
        let database_url = match storage_backend {
            StorageBackend::Postgres => Some(env_required("DATABASE_URL")?),
            StorageBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };

        Ok(Self {
            storage_backend,
            database_url,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", d.database_max_connections)?,
            host: env_or("HOST", d.host)?,
            port: env_or("PORT", d.port)?,
            jwt_secret: env_required("JWT_SECRET")?,
            analyzer_api_url: env_or("ANALYZER_API_URL", d.analyzer_api_url)?,
            analyzer_api_key: std::env::var("ANALYZER_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            analyzer_model: env_or("ANALYZER_MODEL", d.analyzer_model)?,
            analyzer_timeout_seconds: env_or("ANALYZER_TIMEOUT_SECONDS", d.analyzer_timeout_seconds)?,
            moderation_batch_size: env_or("MODERATION_BATCH_SIZE", d.moderation_batch_size)?,
            moderation_interval_seconds: env_or(
                "MODERATION_INTERVAL_SECONDS",
                d.moderation_interval_seconds,
            )?,
            moderation_max_retries: env_or("MODERATION_MAX_RETRIES", d.moderation_max_retries)?,
            moderation_scheduled_budget_seconds: env_or(
                "MODERATION_SCHEDULED_BUDGET_SECONDS",
                d.moderation_scheduled_budget_seconds,
            )?,
            moderation_manual_budget_seconds: env_or(
                "MODERATION_MANUAL_BUDGET_SECONDS",
                d.moderation_manual_budget_seconds,
            )?,
            moderation_stale_claim_minutes: env_or(
                "MODERATION_STALE_CLAIM_MINUTES",
                d.moderation_stale_claim_minutes,
            )?,
            enable_moderation_scheduler: env_or(
                "ENABLE_MODERATION_SCHEDULER",
                d.enable_moderation_scheduler,
            )?,
            suspension_severity: env_or("SUSPENSION_SEVERITY", d.suspension_severity)?,
            precheck_keyword_category: env_or(
                "PRECHECK_KEYWORD_CATEGORY",
                d.precheck_keyword_category,
            )?,
            enable_reputation_sweep: env_or("ENABLE_REPUTATION_SWEEP", d.enable_reputation_sweep)?,
            reputation_sweep_interval_seconds: env_or(
                "REPUTATION_SWEEP_INTERVAL_SECONDS",
                d.reputation_sweep_interval_seconds,
            )?,
            ignore_missing_migrations: env_or("IGNORE_MISSING_MIGRATIONS", d.ignore_missing_migrations)?,
        })
    }
}

/// Load a required environment variable.
///
/// # Errors
///
/// Returns an error if the variable is not set.
fn env_required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("Missing required environment variable: {}", key))
}

/// Load an environment variable with a default value.
///
/// # Errors
///
/// Returns an error if the variable is set but cannot be parsed.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
