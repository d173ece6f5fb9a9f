// src/config.rs - Batch run configuration loaded from TOML

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::errors::{MaskError, Result};
use crate::mask2d::Mask2D;
use crate::scale::Scaling;

/// Configuration for the mask report CLI
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_input_path")]
    pub input_path: String,

    #[serde(default = "default_output_base_dir")]
    pub output_base_dir: String,

    /// Channel that decides which pixels become mask cells
    #[serde(default)]
    pub foreground: ForegroundRule,

    #[serde(default = "default_foreground_threshold")]
    pub foreground_threshold: u8,

    // >0 upscales that many times, <0 downscales
    #[serde(default)]
    pub scale_steps: i32,

    #[serde(default = "default_downscale_threshold")]
    pub downscale_threshold: u8,

    #[serde(default = "default_min_component_size")]
    pub min_component_size: usize,

    #[serde(default = "default_true")]
    pub export_contours: bool,

    #[serde(default = "default_true")]
    pub export_components: bool,

    #[serde(default = "default_true")]
    pub use_parallel: bool,
}

/// Pixel channel compared against `foreground_threshold`
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ForegroundRule {
    /// Alpha channel, for images with a transparent background
    #[default]
    Alpha,
    /// Luminance, for opaque black and white masks
    Luma,
}

fn default_input_path() -> String {
    "./input".to_string()
}

fn default_output_base_dir() -> String {
    "./output".to_string()
}

fn default_foreground_threshold() -> u8 {
    128
}

fn default_downscale_threshold() -> u8 {
    Mask2D::DEFAULT_THRESHOLD
}

fn default_min_component_size() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_base_dir: default_output_base_dir(),
            foreground: ForegroundRule::Alpha,
            foreground_threshold: default_foreground_threshold(),
            scale_steps: 0,
            downscale_threshold: default_downscale_threshold(),
            min_component_size: default_min_component_size(),
            export_contours: true,
            export_components: true,
            use_parallel: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MaskError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| MaskError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Check value ranges, then make sure the input exists and the report
    /// directories can be created.
    pub fn validate(&self) -> Result<()> {
        self.check_values()?;

        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(MaskError::InvalidPath(input_path));
        }

        let base_dir = PathBuf::from(&self.output_base_dir);
        for dir in [base_dir.join("contours"), base_dir.join("components")] {
            fs::create_dir_all(&dir).map_err(|e| {
                MaskError::Io(io::Error::new(
                    ErrorKind::Other,
                    format!("Failed to create output directory {}: {}", dir.display(), e),
                ))
            })?;
        }

        Ok(())
    }

    /// Value checks that do not touch the file system
    pub fn check_values(&self) -> Result<()> {
        if self.foreground_threshold == 0 {
            return Err(MaskError::Config(
                "foreground_threshold must be >= 1".to_string(),
            ));
        }

        if self.downscale_threshold == 0 || self.downscale_threshold > Mask2D::MAX_THRESHOLD {
            return Err(MaskError::Config(format!(
                "downscale_threshold must be between 1 and {}",
                Mask2D::MAX_THRESHOLD
            )));
        }

        // Each step doubles or halves both sides
        if self.scale_steps.abs() > 8 {
            return Err(MaskError::Config(
                "scale_steps must be between -8 and 8".to_string(),
            ));
        }

        if self.min_component_size == 0 {
            return Err(MaskError::Config(
                "min_component_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            MaskError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            input_path = "./masks"
            foreground = "LUMA"
            scale_steps = -1
            "#,
        )
        .unwrap();

        assert_eq!(config.input_path, "./masks");
        assert_eq!(config.foreground, ForegroundRule::Luma);
        assert_eq!(config.scale_steps, -1);
        assert_eq!(config.foreground_threshold, 128);
        assert_eq!(config.downscale_threshold, 2);
        assert!(config.export_contours);
        assert!(config.use_parallel);
    }

    #[test]
    fn test_empty_file_equals_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_value_checks() {
        assert!(Config::default().check_values().is_ok());

        let bad = Config {
            downscale_threshold: 5,
            ..Config::default()
        };
        assert!(matches!(bad.check_values(), Err(MaskError::Config(_))));

        let bad = Config {
            foreground_threshold: 0,
            ..Config::default()
        };
        assert!(bad.check_values().is_err());

        let bad = Config {
            min_component_size: 0,
            ..Config::default()
        };
        assert!(bad.check_values().is_err());
    }

    #[test]
    fn test_unknown_foreground_is_load_error() {
        let result: std::result::Result<Config, _> = toml::from_str(r#"foreground = "RED""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("roi_mask_config_{}.toml", std::process::id()));
        let config = Config {
            scale_steps: 2,
            export_components: false,
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_input_fails_validation() {
        let config = Config {
            input_path: "./definitely/not/here".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(MaskError::InvalidPath(_))));
    }
}
