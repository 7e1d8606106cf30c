use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for a migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project directory to scan and migrate
    pub target_dir: PathBuf,

    /// Whether to run without writing or deleting anything
    pub dry_run: bool,

    /// WebP quality (0-100)
    pub quality: u8,

    /// Whether to delete converted originals and unused images
    pub delete_originals: bool,

    /// Emit the normalized path sets used for classification
    pub verbose: bool,

    /// Maximum directory depth for scanning
    pub max_depth: Option<usize>,

    /// Directory names skipped in addition to the built-in list
    pub extra_ignored_dirs: Vec<String>,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("."),
            dry_run: false,
            quality: 80,
            delete_originals: false,
            verbose: false,
            max_depth: None,
            extra_ignored_dirs: Vec::new(),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Create a default configuration for the given project directory
    pub fn for_dir(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(Error::Configuration(
                "Quality must be between 0 and 100".to_string(),
            ));
        }

        if !self.target_dir.is_dir() {
            return Err(Error::FileNotFound(self.target_dir.clone()));
        }

        Ok(())
    }
}
