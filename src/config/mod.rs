//! Application Configuration
//!
//! Settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::vision::{CropRatios, VisionConfig};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Text strip location
    pub crop: CropRatios,
    /// Recognition settings
    pub recognition: RecognitionSettings,
    /// OCR engine settings
    pub engine: EngineSettings,
}

impl AppConfig {
    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.crop
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [crop] section: {}", e))?;
        let threshold = self.recognition.default_ignore_threshold;
        if !threshold.is_finite() {
            anyhow::bail!("default_ignore_threshold must be a number, got {}", threshold);
        }
        Ok(())
    }

    /// Pipeline configuration derived from these settings
    pub fn vision_config(&self) -> VisionConfig {
        VisionConfig {
            crop: self.crop,
            default_ignore_threshold: self.recognition.default_ignore_threshold,
            dump_crop_dir: None,
        }
    }
}

/// Recognition-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Threshold applied when a request does not specify `visionIgnoreThreshold`
    pub default_ignore_threshold: f32,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            default_ignore_threshold: 0.0,
        }
    }
}

/// Tesseract engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Tesseract language code
    pub language: String,
    /// Page segmentation mode (7 = single text line)
    pub psm: i32,
    /// OCR engine mode (1 = LSTM only)
    pub oem: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            psm: 7,
            oem: 1,
        }
    }
}

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "strip-ocr", "strip-ocr")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Load configuration from `path`, or the default location, or fall back to defaults
///
/// An explicit path must exist; the default location is optional.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        let config = load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(dir) = config_dir() {
        let default_path = dir.join("config.toml");
        if default_path.exists() {
            let config = load_config(&default_path)?;
            info!("Loaded configuration from {:?}", default_path);
            return Ok(config);
        }
    }

    info!("Using default configuration");
    Ok(AppConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.crop, CropRatios::default());
        assert_eq!(config.recognition.default_ignore_threshold, 0.0);
        assert_eq!(config.engine.language, "eng");
        assert_eq!(config.engine.psm, 7);
        assert_eq!(config.engine.oem, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.crop.top = 0.55;
        config.engine.language = "deu".to_string();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[recognition]\ndefault_ignore_threshold = 0.3\n").unwrap();
        assert!((parsed.recognition.default_ignore_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(parsed.crop, CropRatios::default());
        assert_eq!(parsed.engine, EngineSettings::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig::default();

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_rejects_bad_crop() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            "[crop]\nleft = 0.5\ntop = 0.4\nwidth = 0.8\nheight = 0.15"
        )
        .unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("crop"));
    }

    #[test]
    fn test_load_or_default_explicit_missing_path() {
        assert!(load_or_default(Some(Path::new("/nonexistent/config.toml"))).is_err());
    }

    #[test]
    fn test_vision_config_from_app_config() {
        let mut config = AppConfig::default();
        config.recognition.default_ignore_threshold = 0.25;
        let vision = config.vision_config();
        assert_eq!(vision.crop, config.crop);
        assert_eq!(vision.default_ignore_threshold, 0.25);
        assert!(vision.dump_crop_dir.is_none());
    }
}
