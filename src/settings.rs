use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SETTINGS_DIR: &str = "flux";
const SETTINGS_FILE: &str = "settings.json";

/// Recorder and clip settings shared with the settings window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_clip_length")]
    pub clip_length: u32,
    #[serde(default = "default_clip_hotkey")]
    pub clip_hotkey: Vec<String>,
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    #[serde(default = "default_replay_time")]
    pub replay_time: u32,
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default = "default_framerate_mode")]
    pub framerate_mode: String,
    #[serde(default = "default_bitrate_mode")]
    pub bitrate_mode: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            clip_length: default_clip_length(),
            clip_hotkey: default_clip_hotkey(),
            window: default_window(),
            framerate: default_framerate(),
            replay_time: default_replay_time(),
            container: default_container(),
            output: default_output(),
            codec: default_codec(),
            quality: default_quality(),
            framerate_mode: default_framerate_mode(),
            bitrate_mode: default_bitrate_mode(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not find config directory")]
    NoConfigDirectory,
    #[error("Failed to create config directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse settings {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write settings file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

impl Settings {
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let base = BaseDirs::new().ok_or(SettingsError::NoConfigDirectory)?;
        Ok(base.config_dir().join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

fn default_backend() -> String {
    "gpu-screen-recorder".to_string()
}

const fn default_clip_length() -> u32 {
    30
}

fn default_clip_hotkey() -> Vec<String> {
    vec!["KEY_LEFTALT".to_string(), "KEY_Z".to_string()]
}

fn default_window() -> String {
    "screen".to_string()
}

const fn default_framerate() -> u32 {
    60
}

const fn default_replay_time() -> u32 {
    30
}

fn default_container() -> String {
    "mp4".to_string()
}

fn default_output() -> String {
    "~/Videos/clip".to_string()
}

fn default_codec() -> String {
    "h264".to_string()
}

const fn default_quality() -> u32 {
    20
}

fn default_framerate_mode() -> String {
    "vfr".to_string()
}

fn default_bitrate_mode() -> String {
    "cqp".to_string()
}
