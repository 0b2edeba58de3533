//! Server configuration loaded from `confidence.toml`.

use std::path::{Path, PathBuf};

use analysis_queue::{EngineSettings, QueueConfig};
use confidence_tree::BuildConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Top-level server configuration.
///
/// Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub build: BuildSection,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            engine: EngineSettings::default(),
            queue: QueueConfig::default(),
            build: BuildSection::default(),
        }
    }
}

/// The `[build]` table: tree-shaping knobs plus per-request defaults.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct BuildSection {
    #[serde(flatten)]
    pub tree: BuildConfig,
    #[serde(flatten)]
    pub defaults: RequestDefaults,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            tree: BuildConfig::default(),
            defaults: RequestDefaults::default(),
        }
    }
}

/// Values used when a request leaves a build parameter out.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct RequestDefaults {
    #[serde(default = "default_target_confidence")]
    pub default_target_confidence: u8,
    #[serde(default = "default_max_ply")]
    pub default_max_ply: u32,
    #[serde(default = "default_max_iterations")]
    pub default_max_iterations: u32,
}

fn default_target_confidence() -> u8 {
    80
}

fn default_max_ply() -> u32 {
    18
}

fn default_max_iterations() -> u32 {
    12
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            default_target_confidence: default_target_confidence(),
            default_max_ply: default_max_ply(),
            default_max_iterations: default_max_iterations(),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration at `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Default location: `confidence.toml` in the working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("confidence.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
listen = "0.0.0.0:8080"

[engine]
path = "/usr/games/stockfish"
threads = 4
hash_mb = 256

[queue]
max_pending = 16
max_attempts = 2
engine_timeout_ms = 5000
submit_timeout_ms = 60000

[build]
seed_depth = 12
extension_depth = 18
branch_count = 3
recolor_margin_cp = 50
default_target_confidence = 90
default_max_ply = 10
default_max_iterations = 4
"#;

        let config: ServerConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.engine.path, "/usr/games/stockfish");
        assert_eq!(config.engine.threads, 4);
        assert_eq!(config.engine.hash_mb, 256);
        assert_eq!(config.queue.max_pending, 16);
        assert_eq!(config.queue.max_attempts, 2);
        assert_eq!(config.build.tree.seed_depth, 12);
        assert_eq!(config.build.tree.extension_depth, 18);
        assert_eq!(config.build.tree.branch_count, 3);
        assert_eq!(config.build.tree.recolor_margin_cp, 50);
        // Unset keys in a present table keep their defaults
        assert_eq!(config.build.tree.revisit_depth_step, 4);
        assert_eq!(config.build.defaults.default_target_confidence, 90);
        assert_eq!(config.build.defaults.default_max_ply, 10);
        assert_eq!(config.build.defaults.default_max_iterations, 4);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listen, "127.0.0.1:3000");
        assert_eq!(config.engine.path, "stockfish");
        assert_eq!(config.queue.max_pending, 64);
        assert_eq!(config.build, BuildSection::default());
        assert_eq!(config.build.defaults.default_target_confidence, 80);
        assert_eq!(config.build.defaults.default_max_ply, 18);
        assert_eq!(config.build.defaults.default_max_iterations, 12);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.listen, "127.0.0.1:3000");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let path = std::env::temp_dir().join(format!(
            "confidence-server-invalid-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "listen = [").unwrap();
        let err = ServerConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_config_path() {
        assert_eq!(ServerConfig::config_path(), PathBuf::from("confidence.toml"));
    }
}
