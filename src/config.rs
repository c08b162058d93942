//! Configuration loading and validation
//!
//! Configuration comes from a TOML file; the path resolves in priority
//! order: command-line argument, `PUNCHD_CONFIG`, then the platform config
//! directory (`~/.config/punchd/config.toml`, falling back to
//! `/etc/punchd/config.toml` on Linux). API credentials may be overridden
//! through `PUNCHD_API_EMAIL` / `PUNCHD_API_PASSWORD` so they can stay out
//! of the file. A missing or malformed `execution_time` is fatal at launch.

use chrono::NaiveTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Daily trigger minute, "HH:MM"
    pub execution_time: String,

    /// Scheduler poll interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Where the queue database, documents, and snapshots live
    pub data_dir: Option<PathBuf>,

    pub device: DeviceConfig,
    pub api: ApiConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub time: TimeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceBackend {
    /// File-backed device state (development and tests)
    Fixture,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub backend: DeviceBackend,

    /// Directory holding device.json / users.json / punches.json
    pub fixture_dir: PathBuf,

    /// Bound on device session establishment
    #[serde(default = "default_device_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub token_path: String,
    pub attendance_path: String,
    pub device_path: String,
    pub email: String,
    pub password: String,

    #[serde(default = "default_api_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Seconds between queue drain passes
    #[serde(default = "default_retry_interval")]
    pub interval_secs: u64,

    /// Attempt ceiling before an entry moves to the expired store
    #[serde(default = "default_retry_ceiling")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_retry_interval(),
            max_attempts: default_retry_ceiling(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeConfig {
    /// Network time endpoint; local clock only when unset
    pub api_url: Option<String>,

    #[serde(default = "default_time_timeout")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_device_timeout() -> u64 {
    5
}

fn default_api_timeout() -> u64 {
    30
}

fn default_retry_interval() -> u64 {
    60
}

fn default_retry_ceiling() -> u32 {
    12
}

fn default_time_timeout() -> u64 {
    5
}

impl Config {
    /// Load and validate configuration, preferring `explicit` when given.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let path = resolve_config_path(explicit)?;
        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;

        if let Ok(email) = std::env::var("PUNCHD_API_EMAIL") {
            config.api.email = email;
        }
        if let Ok(password) = std::env::var("PUNCHD_API_PASSWORD") {
            config.api.password = password;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string and validate it.
    pub fn from_toml(text: &str) -> Result<Config> {
        let config: Config =
            toml::from_str(text).map_err(|e| Error::Config(format!("cannot parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        NaiveTime::parse_from_str(&self.execution_time, "%H:%M").map_err(|_| {
            Error::Config(format!(
                "execution_time must be \"HH:MM\", got \"{}\"",
                self.execution_time
            ))
        })?;

        if self.poll_interval_secs == 0 {
            return Err(Error::Config("poll_interval_secs must be at least 1".to_string()));
        }
        if self.retry.interval_secs == 0 {
            return Err(Error::Config("retry.interval_secs must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url must not be empty".to_string()));
        }

        Ok(())
    }

    /// Effective data directory, with the platform default as fallback.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("punchd").join("config.toml")) {
        if user_config.exists() {
            return Ok(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/punchd/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config(
        "no config file found; pass --config or create ~/.config/punchd/config.toml".to_string(),
    ))
}

/// Default data directory when none is configured.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("punchd"))
        .unwrap_or_else(|| PathBuf::from("./punchd_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MINIMAL: &str = r#"
        execution_time = "17:10"

        [device]
        backend = "fixture"
        fixture_dir = "/var/lib/punchd/fixtures"

        [api]
        base_url = "https://hr.example.com"
        token_path = "/api/token"
        attendance_path = "/api/attendance"
        device_path = "/api/device"
        email = "agent@example.com"
        password = "secret"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();

        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.retry.interval_secs, 60);
        assert_eq!(config.retry.max_attempts, 12);
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.device.backend, DeviceBackend::Fixture);
        assert!(config.time.api_url.is_none());
    }

    #[test]
    fn malformed_execution_time_is_fatal() {
        let text = MINIMAL.replace("17:10", "25:99");
        assert!(matches!(Config::from_toml(&text), Err(Error::Config(_))));

        let text = MINIMAL.replace("17:10", "late afternoon");
        assert!(matches!(Config::from_toml(&text), Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn environment_overrides_api_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        std::env::set_var("PUNCHD_API_EMAIL", "ops@example.com");
        std::env::set_var("PUNCHD_API_PASSWORD", "rotated");
        let config = Config::load(Some(path.as_path())).unwrap();
        std::env::remove_var("PUNCHD_API_EMAIL");
        std::env::remove_var("PUNCHD_API_PASSWORD");

        assert_eq!(config.api.email, "ops@example.com");
        assert_eq!(config.api.password, "rotated");
    }

    #[test]
    fn zero_retry_ceiling_is_rejected() {
        let text = format!("{MINIMAL}\n[retry]\nmax_attempts = 0\n");
        assert!(matches!(Config::from_toml(&text), Err(Error::Config(_))));
    }

    #[test]
    fn overrides_are_honored() {
        let text = r#"
            execution_time = "06:05"
            poll_interval_secs = 30

            [device]
            backend = "fixture"
            fixture_dir = "/var/lib/punchd/fixtures"

            [api]
            base_url = "https://hr.example.com"
            token_path = "/api/token"
            attendance_path = "/api/attendance"
            device_path = "/api/device"
            email = "agent@example.com"
            password = "secret"

            [retry]
            interval_secs = 120
            max_attempts = 3

            [time]
            api_url = "https://worldtimeapi.org/api/ip"
        "#;
        let config = Config::from_toml(text).unwrap();

        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.retry.interval_secs, 120);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.time.api_url.as_deref(), Some("https://worldtimeapi.org/api/ip"));
    }
}
