//! Server configuration.
//!
//! Settings are layered: serde defaults, then an optional TOML file
//! (`analysis.toml` unless another path is given), then environment
//! variables. `main` loads `.env` into the environment first and applies
//! CLI flags last.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use chess_analysis::{CommentaryConfig, EngineConfig, ReplayConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A setting had a value that could not be used.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Send a test prompt to the commentary generator at startup.
    #[serde(default = "default_probe_on_startup")]
    pub probe_on_startup: bool,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub commentary: CommentaryConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_probe_on_startup() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            probe_on_startup: default_probe_on_startup(),
            engine: EngineConfig::default(),
            commentary: CommentaryConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the default configuration file path, `analysis.toml` in the
    /// current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("analysis.toml")
    }

    /// Loads the configuration file at `path`, or at [`Self::config_path`]
    /// when `path` is `None`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Overrides settings from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Overrides settings from `lookup`, which maps a variable name to its
    /// value. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(bind) = var("ANALYSIS_BIND") {
            self.bind = bind;
        }
        if let Some(port) = var("PORT") {
            self.port = parse_value("PORT", &port)?;
        }
        if let Some(path) = var("STOCKFISH_PATH") {
            self.engine.path = path;
        }
        if let Some(depth) = var("STOCKFISH_DEPTH") {
            self.engine.depth = parse_value("STOCKFISH_DEPTH", &depth)?;
        }
        if let Some(n) = var("STOCKFISH_POOL_SIZE") {
            self.engine.pool_size = parse_value("STOCKFISH_POOL_SIZE", &n)?;
        }
        if let Some(secs) = var("STOCKFISH_TIMEOUT_SECS") {
            self.engine.timeout_secs = Some(parse_value("STOCKFISH_TIMEOUT_SECS", &secs)?);
        }
        if let Some(key) = var("GROQ_API_KEY") {
            self.commentary.api_key = Some(key);
        }
        if let Some(url) = var("COMMENTARY_API_URL") {
            self.commentary.api_url = url;
        }
        if let Some(model) = var("COMMENTARY_MODEL") {
            self.commentary.model = model;
        }
        if let Some(n) = var("COMMENTARY_MAX_CONCURRENCY") {
            self.commentary.max_concurrency = parse_value("COMMENTARY_MAX_CONCURRENCY", &n)?;
        }
        if let Some(secs) = var("COMMENTARY_TIMEOUT_SECS") {
            self.commentary.timeout_secs = Some(parse_value("COMMENTARY_TIMEOUT_SECS", &secs)?);
        }
        Ok(())
    }

    /// The address to bind the listener to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = parse_value("bind", &self.bind)?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Masks a secret for logging, keeping only its first and last four
/// characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert!(config.probe_on_startup);
        assert_eq!(config.engine.depth, 15);
        assert_eq!(config.commentary.api_key, None);
        assert_eq!(config.commentary.model, "llama-3.3-70b-versatile");
        assert_eq!(config.commentary.max_concurrency, 4);
        assert_eq!(config.replay.commentary_interval, 5);
        assert_eq!(config.replay.context_window, 5);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_content = r#"
port = 8080
probe_on_startup = false

[engine]
path = "/usr/local/bin/stockfish"
depth = 12

[commentary]
model = "llama-3.1-8b-instant"
timeout_secs = 20

[replay]
commentary_interval = 3
"#;
        let config: ServerConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(!config.probe_on_startup);
        assert_eq!(config.engine.path, "/usr/local/bin/stockfish");
        assert_eq!(config.engine.depth, 12);
        assert_eq!(config.commentary.model, "llama-3.1-8b-instant");
        assert_eq!(config.commentary.timeout_secs, Some(20));
        assert_eq!(config.commentary.max_concurrency, 4);
        assert_eq!(config.replay.commentary_interval, 3);
        assert_eq!(config.replay.context_window, 5);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = ServerConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"0.0.0.0\"\n[engine]\ndepth = 20").unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.engine.depth, 20);
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let result = ServerConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: ServerConfig = toml::from_str("port = 8080").unwrap();
        config
            .apply_env(env(&[
                ("PORT", "9000"),
                ("STOCKFISH_PATH", "/opt/stockfish"),
                ("STOCKFISH_DEPTH", "18"),
                ("STOCKFISH_POOL_SIZE", "3"),
                ("STOCKFISH_TIMEOUT_SECS", "30"),
                ("GROQ_API_KEY", "gsk_abcdef123456"),
                ("COMMENTARY_TIMEOUT_SECS", "45"),
            ]))
            .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.engine.path, "/opt/stockfish");
        assert_eq!(config.engine.depth, 18);
        assert_eq!(config.engine.pool_size, 3);
        assert_eq!(config.engine.timeout_secs, Some(30));
        assert_eq!(config.commentary.api_key.as_deref(), Some("gsk_abcdef123456"));
        assert_eq!(config.commentary.timeout_secs, Some(45));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[("GROQ_API_KEY", ""), ("PORT", "  ")]))
            .unwrap();
        assert_eq!(config.commentary.api_key, None);
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(env(&[("STOCKFISH_DEPTH", "deep")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, "STOCKFISH_DEPTH");
                assert_eq!(value, "deep");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:5000");

        let config = ServerConfig {
            bind: "localhost".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("gsk_abcdef123456wxyz"), "gsk_...wxyz");
        assert_eq!(mask_secret("short"), "****");
    }
}
