//! Replay recorder launched from the clip settings.

use std::path::Path;
use std::process::ExitStatus;

use directories::BaseDirs;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

use crate::settings::Settings;

pub const GPU_SCREEN_RECORDER: &str = "gpu-screen-recorder";

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Backend {0} not supported")]
    UnsupportedBackend(String),
    #[error("could not determine home directory")]
    NoHomeDirectory,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RecorderCommand {
    pub fn from_settings(settings: &Settings) -> Result<Self, RecorderError> {
        let base = BaseDirs::new().ok_or(RecorderError::NoHomeDirectory)?;
        Self::with_home(settings, base.home_dir())
    }

    pub fn with_home(settings: &Settings, home: &Path) -> Result<Self, RecorderError> {
        if settings.backend != GPU_SCREEN_RECORDER {
            return Err(RecorderError::UnsupportedBackend(settings.backend.clone()));
        }

        let args = [
            ("-w", settings.window.clone()),
            ("-f", settings.framerate.to_string()),
            ("-r", settings.replay_time.to_string()),
            ("-c", settings.container.clone()),
            ("-o", expand_home(&settings.output, home)),
            ("-a", "default_output".to_string()),
            ("-k", settings.codec.clone()),
            ("-q", settings.quality.to_string()),
            ("-fm", settings.framerate_mode.clone()),
            ("-bm", settings.bitrate_mode.clone()),
        ]
        .into_iter()
        .flat_map(|(flag, value)| [flag.to_string(), value])
        .collect();

        Ok(Self {
            program: GPU_SCREEN_RECORDER.to_string(),
            args,
        })
    }

    /// Start the recorder and wait for it to exit.
    pub async fn run(&self) -> Result<ExitStatus, RecorderError> {
        info!("starting recorder with command: {} {:?}", self.program, self.args);
        Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|source| RecorderError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

fn expand_home(path: &str, home: &Path) -> String {
    if path == "~" {
        return home.display().to_string();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest).display().to_string(),
        None => path.to_string(),
    }
}
