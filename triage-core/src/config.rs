//! Runtime configuration.
//!
//! Defaults are baked in, a TOML file can override them, and a small set of
//! environment variables overrides both. The Gemini API key is only ever
//! read from the environment, never from a file on disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use triage_embed::EmbedConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Directory holding the persisted index snapshot.
    pub store_dir: PathBuf,
    /// Directory of documentation files to ingest.
    pub docs_dir: PathBuf,
    /// SQLite database for triage logs.
    pub db_path: PathBuf,
    /// Classification model name.
    pub classifier_model: String,
    /// Retrieval depth for ticket responses.
    pub top_k: usize,
    /// Chunking window size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub overlap: usize,
    pub embedding: EmbedConfig,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("data/vector_store"),
            docs_dir: PathBuf::from("data/docs"),
            db_path: PathBuf::from("data/triage.db"),
            classifier_model: "gemini-1.5-flash".to_string(),
            top_k: 4,
            chunk_size: 800,
            overlap: 150,
            embedding: EmbedConfig::default(),
        }
    }
}

impl TriageConfig {
    /// Load configuration: defaults, then the TOML file if given, then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("TRIAGE_STORE_DIR") {
            self.store_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("TRIAGE_DOCS_DIR") {
            self.docs_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("TRIAGE_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            self.classifier_model = model;
        }
    }

    /// The Gemini API key, if present in the environment.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = TriageConfig::default();
        assert_eq!(config.store_dir, PathBuf::from("data/vector_store"));
        assert_eq!(config.classifier_model, "gemini-1.5-flash");
        assert_eq!(config.top_k, 4);
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.overlap, 150);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let raw = r#"
            top_k = 6
            chunk_size = 400

            [embedding]
            dimension = 128
        "#;
        let config: TriageConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.top_k, 6);
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.embedding.dimension, 128);
        // Untouched fields keep their defaults.
        assert_eq!(config.overlap, 150);
        assert_eq!(config.db_path, PathBuf::from("data/triage.db"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = TriageConfig::load(Some(Path::new("/nonexistent/triage.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
