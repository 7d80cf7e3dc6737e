//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for an embedding model.
///
/// The `model_id` is the string tag recorded in index snapshot metadata; the
/// index rejects queries from an embedder whose tag does not match the one
/// used at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Identifier of the embedding model (e.g., "all-MiniLM-L6-v2")
    pub model_id: String,
    /// Dimension of the embedding vectors
    pub dimension: usize,
}

impl EmbedConfig {
    /// Create a configuration for the given model tag and dimension.
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
        }
    }

    /// Override the model tag.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Override the vector dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(EmbedError::invalid_config("model_id must not be empty"));
        }
        if self.dimension == 0 {
            return Err(EmbedError::invalid_config("dimension must be positive"));
        }
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_id: "feature-hash-v1".to_string(),
            dimension: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EmbedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model_id, "feature-hash-v1");
        assert_eq!(config.dimension, 256);
    }

    #[test]
    fn builders_override_fields() {
        let config = EmbedConfig::default()
            .with_model_id("all-MiniLM-L6-v2")
            .with_dimension(384);
        assert_eq!(config.model_id, "all-MiniLM-L6-v2");
        assert_eq!(config.dimension, 384);
    }

    #[test]
    fn partial_config_fills_missing_fields_from_defaults() {
        let config: EmbedConfig = serde_json::from_str(r#"{"dimension": 128}"#).unwrap();
        assert_eq!(config.model_id, "feature-hash-v1");
        assert_eq!(config.dimension, 128);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(EmbedConfig::new("", 256).validate().is_err());
        assert!(EmbedConfig::new("m", 0).validate().is_err());
    }
}
