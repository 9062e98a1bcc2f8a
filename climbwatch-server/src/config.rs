//! Startup configuration
//!
//! Every setting can be given as a command-line flag or through the
//! environment variable named on its `#[arg]`. `Args` is the raw parse;
//! [`Args::into_config`] validates it into a [`Config`]. Validation failures
//! are fatal at startup.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use reqwest::Url;
use thiserror::Error;

/// Upstream endpoint for current occupancy, branch id appended
pub const DEFAULT_OCCUPANCY_URL: &str =
    "https://portal.urbanclimb.com.au/uc-services/ajax/gym/occupancy.ashx?branch=";

/// Upstream endpoint for the expected-attendance trend line, branch id appended
pub const DEFAULT_ATTENDANCE_URL: &str =
    "https://api-prod.urbanclimb.com.au/widgets/trendline-data?branch=";

/// Configuration errors (fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> &'static str {
        "config"
    }
}

/// Which [`crate::store::BranchStore`] implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Memory,
    Database,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    /// One JSON object per line, for Cloud Logging
    Json,
}

/// Command-line arguments for climbwatch-server
#[derive(Parser, Debug, Clone)]
#[command(name = "climbwatch-server")]
#[command(about = "Gym occupancy ingestion and query service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Google Cloud project id (looked up from the metadata server if unset)
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project_id: Option<String>,

    /// Storage backend
    #[arg(long, value_enum, default_value = "memory", env = "STORE_BACKEND")]
    pub store_backend: BackendKind,

    /// Full sqlx connection URL, overrides the DB_* variables
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Cloud SQL instance, `project:region:instance`
    #[arg(long, env = "INSTANCE_CONNECTION_NAME")]
    pub instance_connection_name: Option<String>,

    /// Private IP of the instance; when set, connect over TCP instead of the
    /// Cloud SQL unix socket
    #[arg(long, env = "PRIVATE_IP")]
    pub private_ip: Option<String>,

    #[arg(long, default_value = DEFAULT_OCCUPANCY_URL, env = "OCCUPANCY_URL")]
    pub occupancy_url: String,

    #[arg(long, default_value = DEFAULT_ATTENDANCE_URL, env = "ATTENDANCE_URL")]
    pub attendance_url: String,

    /// Per-request timeout for upstream calls
    #[arg(long, default_value = "10", env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: u64,

    /// Deadline for a whole ingestion cycle
    #[arg(long, default_value = "30", env = "CYCLE_TIMEOUT_SECS")]
    pub cycle_timeout_secs: u64,

    /// Hours added to upstream timestamps before they are stored
    #[arg(long, default_value = "0", allow_hyphen_values = true, env = "TIMESTAMP_OFFSET_HOURS")]
    pub timestamp_offset_hours: i64,

    /// How long in-flight requests may run after a shutdown signal
    #[arg(long, default_value = "10", env = "SHUTDOWN_GRACE_SECS")]
    pub shutdown_grace_secs: u64,

    #[arg(long, value_enum, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Where readings are kept
#[derive(Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Database { url: String },
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Memory => f.write_str("Memory"),
            StoreConfig::Database { .. } => f.write_str("Database { url: <redacted> }"),
        }
    }
}

/// Upstream client settings
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub occupancy_url: String,
    pub attendance_url: String,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            occupancy_url: DEFAULT_OCCUPANCY_URL.to_string(),
            attendance_url: DEFAULT_ATTENDANCE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Validated service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub project_id: Option<String>,
    pub store: StoreConfig,
    pub upstream: UpstreamConfig,
    pub cycle_timeout: Duration,
    pub timestamp_offset_hours: i64,
    pub shutdown_grace: Duration,
    pub log_format: LogFormat,
}

impl Args {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        if self.upstream_timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream timeout must be positive".to_string()));
        }
        if self.cycle_timeout_secs == 0 {
            return Err(ConfigError::Invalid("cycle timeout must be positive".to_string()));
        }
        if !(-24..=24).contains(&self.timestamp_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "timestamp offset {}h is outside -24..=24",
                self.timestamp_offset_hours
            )));
        }

        let store = match self.store_backend {
            BackendKind::Memory => StoreConfig::Memory,
            BackendKind::Database => StoreConfig::Database {
                url: self.database_url()?,
            },
        };

        Ok(Config {
            port: self.port,
            project_id: self.project_id.filter(|p| !p.trim().is_empty()),
            store,
            upstream: UpstreamConfig {
                occupancy_url: self.occupancy_url,
                attendance_url: self.attendance_url,
                timeout: Duration::from_secs(self.upstream_timeout_secs),
            },
            cycle_timeout: Duration::from_secs(self.cycle_timeout_secs),
            timestamp_offset_hours: self.timestamp_offset_hours,
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            log_format: self.log_format,
        })
    }

    /// Resolve the database URL: `DATABASE_URL` wins, otherwise a MySQL URL is
    /// assembled from the Cloud SQL variables.
    fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = self.database_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }

        let user = required(&self.db_user, "DB_USER")?;
        let pass = required(&self.db_pass, "DB_PASS")?;
        let name = required(&self.db_name, "DB_NAME")?;
        let instance = required(&self.instance_connection_name, "INSTANCE_CONNECTION_NAME")?;

        let host = self
            .private_ip
            .as_deref()
            .filter(|ip| !ip.trim().is_empty())
            .unwrap_or("localhost");

        let mut url = Url::parse(&format!("mysql://{}:3306", host))
            .map_err(|e| ConfigError::Invalid(format!("database host {}: {}", host, e)))?;
        url.set_username(user)
            .and_then(|_| url.set_password(Some(pass)))
            .map_err(|_| ConfigError::Invalid("database credentials".to_string()))?;
        url.set_path(name);

        if self.private_ip.as_deref().map_or(true, |ip| ip.trim().is_empty()) {
            // Cloud SQL Auth Proxy socket mounted by Cloud Run
            url.query_pairs_mut()
                .append_pair("socket", &format!("/cloudsql/{}", instance));
        }

        Ok(url.to_string())
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(name))
}
