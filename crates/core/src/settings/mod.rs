//! Persisted user preferences.
//!
//! A flat JSON object in the platform config directory. Keys that are
//! missing from the file read as `0.0`; a missing or unreadable file reads
//! as all-zero settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{APP_DIR_NAME, SETTINGS_FILE_NAME};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub iou_threshold: f64,
    pub confidence_threshold: f64,
}

impl Settings {
    /// `<config dir>/camdetect/settings.json`.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Strict load: a missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Lenient load used on the inference path. Never fails.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(settings) => settings,
            Err(SettingsError::Read { .. }) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring settings file: {e}");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("iouThreshold", self.iou_threshold),
            ("confidenceThreshold", self.confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::OutOfRange { name, value });
            }
        }
        Ok(())
    }
}
