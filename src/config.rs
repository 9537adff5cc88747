use crate::core::{OrmError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: PoolConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

/// Connection pool configuration.
///
/// `user`, `password` and `database` are required; everything else falls
/// back to its default. For the SQLite backend `database` is the path of the
/// database file and the credentials are only validated and logged.
#[derive(Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_true")]
    pub autocommit: bool,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    /// Upper bound on waiting for a free connection; `None` waits forever.
    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Turn affected-row mismatches in save/update/remove into errors.
    #[serde(default)]
    pub strict_writes: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_size() -> usize {
    10
}

fn default_min_size() -> usize {
    1
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
            database: None,
            charset: default_charset(),
            autocommit: true,
            max_size: default_max_size(),
            min_size: default_min_size(),
            acquire_timeout_ms: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            strict_writes: false,
        }
    }
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("autocommit", &self.autocommit)
            .field("max_size", &self.max_size)
            .field("min_size", &self.min_size)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .field("strict_writes", &self.strict_writes)
            .finish()
    }
}

impl PoolConfig {
    /// Creates a configuration with the three required options set.
    pub fn new(user: &str, password: &str, database: &str) -> Self {
        PoolConfig {
            user: Some(user.to_string()),
            password: Some(password.to_string()),
            database: Some(database.to_string()),
            ..PoolConfig::default()
        }
    }

    /// Checks required options and size bounds.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ] {
            if value.is_none() {
                return Err(OrmError::Config(format!(
                    "missing required option `{}`",
                    name
                )));
            }
        }
        if self.max_size == 0 {
            return Err(OrmError::Config("max_size must be at least 1".to_string()));
        }
        if self.min_size > self.max_size {
            return Err(OrmError::Config(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.is_in_memory() && self.max_size > 1 {
            return Err(OrmError::Config(format!(
                "in-memory database requires max_size = 1 (got {}); each connection opens its own copy",
                self.max_size
            )));
        }
        self.encoding()?;
        Ok(())
    }

    /// True when `database` names SQLite's private in-memory database.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.database.as_deref(), Some(":memory:") | Some(""))
    }

    /// The database file path. Only meaningful after `validate`.
    pub fn database_path(&self) -> &str {
        self.database.as_deref().unwrap_or_default()
    }

    /// Maps the configured charset to an SQLite `PRAGMA encoding` value.
    pub fn encoding(&self) -> Result<&'static str> {
        match self.charset.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "utf8mb4" => Ok("UTF-8"),
            "utf16" | "utf-16" => Ok("UTF-16"),
            other => Err(OrmError::Config(format!("unsupported charset `{}`", other))),
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = blogorm::config::load_config("blogorm.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    config.database.validate()?;
    Ok(config)
}
