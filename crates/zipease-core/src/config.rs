//! Configuration module

use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Highest Deflate level, used by default
pub const BEST_COMPRESSION: i64 = 9;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Settings applied when creating archives
    #[serde(default)]
    pub writer: WriterConfig,
    /// Settings applied when extracting archives
    #[serde(default)]
    pub reader: ReaderConfig,
}

/// Compression method for new entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Deflate
    Deflated,
    /// No compression
    Stored,
}

/// Archive creation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Compression method
    pub compression: Compression,
    /// Deflate level (1-9); ignored for stored entries
    pub level: Option<i64>,
    /// Unix permissions recorded for every entry
    pub unix_permissions: u32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Deflated,
            level: Some(BEST_COMPRESSION),
            unix_permissions: 0o644,
        }
    }
}

impl WriterConfig {
    /// Check that the level is usable with the selected method
    pub fn validate(&self) -> Result<()> {
        if self.compression == Compression::Deflated {
            if let Some(level) = self.level {
                if !(1..=BEST_COMPRESSION).contains(&level) {
                    return Err(Error::Config(format!(
                        "Deflate level must be between 1 and {}, got {}",
                        BEST_COMPRESSION, level
                    )));
                }
            }
        }
        if self.unix_permissions > 0o7777 {
            return Err(Error::Config(format!(
                "Invalid unix permissions: {:o}",
                self.unix_permissions
            )));
        }
        Ok(())
    }
}

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Replace files that already exist at the destination
    pub overwrite: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| Error::Config("Unable to determine config directory".to_string()))?;

        Ok(config_dir.join("zipease").join("config.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::from_file(path)
    }

    /// Save configuration to a file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Load configuration or use defaults if loading fails
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.writer.validate()
    }
}
