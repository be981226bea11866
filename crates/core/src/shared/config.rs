use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::constants::{CLASSIFIER_IMAGE_SIZE, FRAME_LENGTH, HOP_LENGTH};
use super::error::ConfigError;

/// Engine-wide settings. Every field has a default, so partial JSON files
/// are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit classifier model file. When unset the model resolver
    /// searches the cache and bundled directories.
    pub model_path: Option<PathBuf>,
    /// JSON array of label strings overriding the built-in label table.
    pub labels_path: Option<PathBuf>,
    /// Load the classifier when the engine is built instead of on first use.
    pub eager_model_load: bool,
    /// Run the classifier alongside transformations.
    pub classify: bool,
    pub image_size: u32,
    pub frame_length: usize,
    pub hop_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            labels_path: None,
            eager_model_load: false,
            classify: true,
            image_size: CLASSIFIER_IMAGE_SIZE,
            frame_length: FRAME_LENGTH,
            hop_length: HOP_LENGTH,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_size == 0 {
            return Err(ConfigError::Invalid {
                field: "image_size",
                reason: "must be positive".into(),
            });
        }
        if self.frame_length < 16 || !self.frame_length.is_power_of_two() {
            return Err(ConfigError::Invalid {
                field: "frame_length",
                reason: format!("must be a power of two >= 16, got {}", self.frame_length),
            });
        }
        if self.hop_length == 0 || self.hop_length > self.frame_length / 2 {
            return Err(ConfigError::Invalid {
                field: "hop_length",
                reason: format!(
                    "must be in 1..={}, got {}",
                    self.frame_length / 2,
                    self.hop_length
                ),
            });
        }
        Ok(())
    }

    /// Read a label table override: a JSON array of strings.
    pub fn load_labels(path: &Path) -> Result<Vec<String>, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let labels: Vec<String> = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        if labels.is_empty() {
            return Err(ConfigError::Invalid {
                field: "labels",
                reason: "label table is empty".into(),
            });
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_matches_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.frame_length, 2048);
        assert_eq!(config.hop_length, 512);
        assert_eq!(config.image_size, 128);
        assert!(config.classify);
        assert!(!config.eager_model_load);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("engine.json");
        fs::write(&path, r#"{ "classify": false, "hop_length": 256 }"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert!(!config.classify);
        assert_eq!(config.hop_length, 256);
        assert_eq!(config.frame_length, 2048);
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_invalid_hop_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("engine.json");
        fs::write(&path, r#"{ "hop_length": 4096 }"#).unwrap();

        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "hop_length", .. }));
    }

    #[test]
    fn test_non_power_of_two_frame_rejected() {
        let config = EngineConfig {
            frame_length: 1000,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_reports_read_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_json_reports_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("engine.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_load_labels() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("labels.json");
        fs::write(&path, r#"["rock", "jazz"]"#).unwrap();
        assert_eq!(
            EngineConfig::load_labels(&path).unwrap(),
            vec!["rock".to_string(), "jazz".to_string()]
        );
    }

    #[test]
    fn test_empty_labels_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("labels.json");
        fs::write(&path, "[]").unwrap();
        assert!(EngineConfig::load_labels(&path).is_err());
    }
}
