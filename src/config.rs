//! Service configuration: a YAML file with env-var overrides applied
//! on top. Machine records are handed to the registry unvalidated;
//! validation is the registry's job.

use crate::machine::Machine;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/lanwake/lanwake.yaml";
const DEFAULT_PORT: u16 = 8080;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file")]
    Parse(#[from] serde_yaml::Error),
    #[error("{var} must be a port number, got '{value}'")]
    InvalidPort { var: String, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub authentication: AuthenticationConfig,
    pub machines: Vec<Machine>,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: DEFAULT_PORT,
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// "json" or "text".
    pub format: String,
    /// "debug", "info", "warn" or "error".
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: "text".to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub health_check: ToggleConfig,
    pub metrics: ToggleConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        ObservabilityConfig {
            health_check: ToggleConfig { enabled: true },
            metrics: ToggleConfig { enabled: true },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    pub enabled: bool,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        ToggleConfig { enabled: true }
    }
}

impl Config {
    /// Parses configuration from YAML text. Missing sections fall back
    /// to defaults; env overrides are not applied here.
    pub fn from_yaml(text: &str) -> Result<Config, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Loads configuration from a file and applies `LANWAKE_*` env
    /// overrides on top.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Config::from_yaml(&text)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Overrides individual settings from the environment. Unset or
    /// empty variables leave the file values untouched.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(port) = non_empty_env("LANWAKE_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidPort {
                var: "LANWAKE_PORT".to_string(),
                value: port,
            })?;
        }
        if let Some(level) = non_empty_env("LANWAKE_LOG_LEVEL") {
            self.server.log.level = level;
        }
        if let Some(format) = non_empty_env("LANWAKE_LOG_FORMAT") {
            self.server.log.format = format;
        }
        if let Some(api_key) = non_empty_env("LANWAKE_API_KEY") {
            self.authentication.api_key = api_key;
        }
        Ok(())
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
server:
  port: 9090
  log:
    format: json
    level: debug
authentication:
  api_key: secret
machines:
  - id: saruman
    name: Saruman Server
    mac: "AA:BB:CC:DD:EE:FF"
    broadcast: "192.168.1.255"
  - id: gandalf
    name: Gandalf NAS
    mac: "11-22-33-44-55-66"
    broadcast: "10.0.0.255"
observability:
  health_check:
    enabled: false
  metrics:
    enabled: true
"#;

    #[test]
    fn parses_full_config() {
        let cfg = Config::from_yaml(EXAMPLE).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.log.format, "json");
        assert_eq!(cfg.server.log.level, "debug");
        assert_eq!(cfg.authentication.api_key, "secret");
        assert_eq!(cfg.machines.len(), 2);
        assert_eq!(cfg.machines[0].id, "saruman");
        assert_eq!(cfg.machines[1].mac, "11-22-33-44-55-66");
        assert!(!cfg.observability.health_check.enabled);
        assert!(cfg.observability.metrics.enabled);
    }

    #[test]
    fn empty_config_gets_defaults() {
        let cfg = Config::from_yaml("").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.log.format, "text");
        assert_eq!(cfg.server.log.level, "info");
        assert!(cfg.authentication.api_key.is_empty());
        assert!(cfg.machines.is_empty());
        assert!(cfg.observability.health_check.enabled);
        assert!(cfg.observability.metrics.enabled);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let cfg = Config::from_yaml("server:\n  port: 1234\n").unwrap();
        assert_eq!(cfg.server.port, 1234);
        assert_eq!(cfg.server.log.level, "info");
        assert!(cfg.observability.metrics.enabled);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            Config::from_yaml("machines: [unclosed"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load("/nonexistent/lanwake.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reads_file_and_applies_env() {
        // The only test that touches LANWAKE_* env vars, to keep
        // parallel test runs from stepping on each other.
        let path = env::temp_dir().join(format!("lanwake-config-{}.yaml", std::process::id()));
        fs::write(&path, EXAMPLE).unwrap();

        env::set_var("LANWAKE_PORT", "7070");
        env::set_var("LANWAKE_LOG_LEVEL", "warn");
        env::set_var("LANWAKE_LOG_FORMAT", "");
        env::set_var("LANWAKE_API_KEY", "env-key");
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.server.port, 7070);
        assert_eq!(cfg.server.log.level, "warn");
        // Empty override keeps the file value.
        assert_eq!(cfg.server.log.format, "json");
        assert_eq!(cfg.authentication.api_key, "env-key");

        // A non-numeric port override is a hard error.
        env::set_var("LANWAKE_PORT", "not-a-number");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));

        env::remove_var("LANWAKE_PORT");
        env::remove_var("LANWAKE_LOG_LEVEL");
        env::remove_var("LANWAKE_LOG_FORMAT");
        env::remove_var("LANWAKE_API_KEY");
        fs::remove_file(&path).unwrap();
    }
}
