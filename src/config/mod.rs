//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object is a complete config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collaborator: CollaboratorConfig,
    pub session: SessionConfig,
}

/// Model and sampling parameters for the two request kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub model: String,
    pub chat_max_tokens: u32,
    pub chat_temperature: f32,
    pub apply_max_tokens: u32,
    pub apply_temperature: f32,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            chat_max_tokens: 1500,
            chat_temperature: 0.7,
            apply_max_tokens: 2000,
            apply_temperature: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub key: String,
    pub duration_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: "document-chat-authenticated".to_string(),
            duration_ms: 24 * 60 * 60 * 1000,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), model = %config.collaborator.model, "loaded config");
        Ok(config)
    }
}
