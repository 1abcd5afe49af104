//! Configuration with defaults, TOML loading and environment overrides
//!
//! Resolution order: defaults, then the TOML file given to `ConfigLoader`,
//! then `FAIRSEED_*` environment variables, then validation.

use crate::errors::{ConfigurationError, FairseedResult};
use crate::games::dice::{validate_house_edge, DEFAULT_HOUSE_EDGE_PERCENT};
use crate::session::{SeedLengths, DEFAULT_CLIENT_SEED_BYTES, DEFAULT_SERVER_SEED_BYTES};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_SERVER_SEED_BYTES: usize = 16;
pub const MIN_CLIENT_SEED_BYTES: usize = 8;
pub const DEFAULT_LOG_FILTER: &str = "fairseed=info,tower_http=info";

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FairseedConfig {
    pub games: GameConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Engine parameters shared by every session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub house_edge_percent: f64,
    pub max_plinko_balls: u32,
    pub server_seed_bytes: usize,
    pub client_seed_bytes: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            house_edge_percent: DEFAULT_HOUSE_EDGE_PERCENT,
            max_plinko_balls: 100,
            server_seed_bytes: DEFAULT_SERVER_SEED_BYTES,
            client_seed_bytes: DEFAULT_CLIENT_SEED_BYTES,
        }
    }
}

impl GameConfig {
    pub fn seed_lengths(&self) -> SeedLengths {
        SeedLengths {
            server_bytes: self.server_seed_bytes,
            client_bytes: self.client_seed_bytes,
        }
    }
}

/// HTTP server settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Sessions untouched this long are evicted; 0 keeps them forever
    pub session_idle_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            session_idle_timeout_secs: 3600,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_idle_timeout(&self) -> Option<Duration> {
        (self.session_idle_timeout_secs > 0).then(|| Duration::from_secs(self.session_idle_timeout_secs))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl FairseedConfig {
    /// Local development: loopback only, verbose logs
    pub fn development() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                ..Default::default()
            },
            logging: LoggingConfig {
                filter: "fairseed=debug,tower_http=debug".to_string(),
            },
            ..Default::default()
        }
    }

    /// Production deployment: explicit origins, shorter timeout, fewer balls per request
    pub fn production() -> Self {
        Self {
            games: GameConfig {
                max_plinko_balls: 50,
                ..Default::default()
            },
            api: ApiConfig {
                allowed_origins: vec![],
                request_timeout_secs: 10,
                session_idle_timeout_secs: 1800,
                ..Default::default()
            },
            logging: LoggingConfig {
                filter: "fairseed=info,tower_http=warn".to_string(),
            },
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if validate_house_edge(self.games.house_edge_percent).is_err() {
            return Err(invalid(
                "games.house_edge_percent",
                self.games.house_edge_percent,
                "must be within [0, 100)",
            ));
        }
        if self.games.max_plinko_balls == 0 {
            return Err(invalid("games.max_plinko_balls", 0, "must be greater than zero"));
        }
        if self.games.server_seed_bytes < MIN_SERVER_SEED_BYTES {
            return Err(invalid(
                "games.server_seed_bytes",
                self.games.server_seed_bytes,
                "server seeds need at least 16 bytes of entropy",
            ));
        }
        if self.games.client_seed_bytes < MIN_CLIENT_SEED_BYTES {
            return Err(invalid(
                "games.client_seed_bytes",
                self.games.client_seed_bytes,
                "client seeds need at least 8 bytes of entropy",
            ));
        }
        if self.api.port == 0 {
            return Err(invalid("api.port", 0, "port cannot be zero"));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(invalid("api.request_timeout_secs", 0, "timeout cannot be zero"));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(invalid("logging.filter", "", "filter cannot be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> FairseedResult<FairseedConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as `load`, reading overrides through `lookup`
    pub fn load_with<F>(&self, lookup: F) -> FairseedResult<FairseedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config_path {
            Some(path) => Self::load_from_file(path)?,
            None => FairseedConfig::default(),
        };

        apply_overrides(&mut config, lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> FairseedResult<FairseedConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }
}

fn apply_overrides<F>(config: &mut FairseedConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(edge) = lookup("FAIRSEED_HOUSE_EDGE") {
        config.games.house_edge_percent = edge
            .parse()
            .map_err(|_| invalid("FAIRSEED_HOUSE_EDGE", &edge, "invalid number"))?;
    }
    if let Some(host) = lookup("FAIRSEED_API_HOST") {
        config.api.host = host;
    }
    if let Some(port) = lookup("FAIRSEED_API_PORT") {
        config.api.port = port
            .parse()
            .map_err(|_| invalid("FAIRSEED_API_PORT", &port, "invalid port number"))?;
    }
    if let Some(filter) = lookup("FAIRSEED_LOG") {
        config.logging.filter = filter;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FairseedError;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FairseedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.games.house_edge_percent, 1.0);
        assert_eq!(config.games.server_seed_bytes, 32);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(FairseedConfig::development().validate().is_ok());
        assert!(FairseedConfig::production().validate().is_ok());
    }

    #[test]
    fn test_invalid_house_edge() {
        let mut config = FairseedConfig::default();
        config.games.house_edge_percent = 100.0;
        match config.validate() {
            Err(ConfigurationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "games.house_edge_percent")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_session_idle_timeout() {
        let mut api = ApiConfig::default();
        assert_eq!(api.session_idle_timeout(), Some(Duration::from_secs(3600)));
        api.session_idle_timeout_secs = 0;
        assert_eq!(api.session_idle_timeout(), None);
    }

    #[test]
    fn test_short_seeds_rejected() {
        let mut config = FairseedConfig::default();
        config.games.server_seed_bytes = 8;
        assert!(config.validate().is_err());

        let mut config = FairseedConfig::default();
        config.games.client_seed_bytes = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[games]\nhouse_edge_percent = 2.5\n\n[api]\nport = 9090\n"
        )
        .unwrap();

        let config = ConfigLoader::new().with_path(file.path()).load_with(no_env).unwrap();
        assert_eq!(config.games.house_edge_percent, 2.5);
        assert_eq!(config.games.max_plinko_balls, 100);
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FAIRSEED_HOUSE_EDGE", "1.5"),
            ("FAIRSEED_API_PORT", "4000"),
            ("FAIRSEED_LOG", "fairseed=trace"),
        ]
        .into_iter()
        .collect();

        let config = ConfigLoader::new()
            .load_with(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.games.house_edge_percent, 1.5);
        assert_eq!(config.api.port, 4000);
        assert_eq!(config.logging.filter, "fairseed=trace");
    }

    #[test]
    fn test_bad_env_value() {
        let err = ConfigLoader::new()
            .load_with(|key| (key == "FAIRSEED_API_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            FairseedError::Configuration(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .with_path("/definitely/not/here.toml")
            .load_with(no_env)
            .unwrap_err();
        assert!(matches!(
            err,
            FairseedError::Configuration(ConfigurationError::LoadFailed(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[games\nhouse_edge_percent = ").unwrap();
        let err = ConfigLoader::new().with_path(file.path()).load_with(no_env).unwrap_err();
        assert!(matches!(err, FairseedError::Toml(_)));
    }
}
