//! Command invocation channel and the local backend that serves it.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::settings::{Settings, SettingsError};

pub const NOTIFY_COMMAND: &str = "run_terminal_command";
pub const NOTIFY_ARGUMENT: &str = "notify-send hi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Map::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// The request fired by the clip hotkey.
    pub fn notify() -> Self {
        Self::new(NOTIFY_COMMAND).arg("command", NOTIFY_ARGUMENT)
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid arguments for {command}: {reason}")]
    InvalidArgs { command: String, reason: String },
    #[error("Failed to execute command: {0}")]
    Spawn(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn invoke(&self, request: CommandRequest) -> Result<Value, InvokeError>;
}

#[derive(Deserialize)]
struct GreetArgs {
    name: String,
}

#[derive(Deserialize)]
struct TerminalArgs {
    command: String,
}

#[derive(Deserialize)]
struct SaveSettingsArgs {
    backend: String,
    clip_length: u32,
    clip_hotkey: Vec<String>,
}

/// Serves the privileged commands: shell execution and settings persistence.
pub struct Backend {
    shell: String,
    settings_path: PathBuf,
}

impl Backend {
    pub fn new(shell: impl Into<String>, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            settings_path: settings_path.into(),
        }
    }

    pub fn greet(&self, name: &str) -> String {
        format!("Hello, {}! You've been greeted from Rust!", name)
    }

    /// Run `command` through the configured shell, returning stdout.
    pub async fn run_terminal_command(&self, command: &str) -> Result<String, InvokeError> {
        info!("running terminal command: {}", command);
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| InvokeError::Spawn(e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            debug!("command exited with {}", output.status);
            Err(InvokeError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ))
        }
    }

    pub fn load_settings(&self) -> Result<Settings, InvokeError> {
        Ok(Settings::load_from(&self.settings_path)?)
    }

    /// Update the fields owned by the settings window, keeping recorder tuning.
    /// An unreadable settings file is reported rather than overwritten.
    pub fn save_settings(
        &self,
        backend: String,
        clip_length: u32,
        clip_hotkey: Vec<String>,
    ) -> Result<(), InvokeError> {
        let mut settings = Settings::load_from(&self.settings_path)?;
        settings.backend = backend;
        settings.clip_length = clip_length;
        settings.clip_hotkey = clip_hotkey;
        settings.save_to(&self.settings_path)?;
        Ok(())
    }
}

#[async_trait]
impl CommandChannel for Backend {
    async fn invoke(&self, request: CommandRequest) -> Result<Value, InvokeError> {
        debug!("invoke {}", request.command);
        match request.command.as_str() {
            "greet" => {
                let args: GreetArgs = parse_args(&request)?;
                Ok(Value::String(self.greet(&args.name)))
            }
            NOTIFY_COMMAND => {
                let args: TerminalArgs = parse_args(&request)?;
                let stdout = self.run_terminal_command(&args.command).await?;
                Ok(Value::String(stdout))
            }
            "save_settings" => {
                let args: SaveSettingsArgs = parse_args(&request)?;
                self.save_settings(args.backend, args.clip_length, args.clip_hotkey)?;
                Ok(Value::Null)
            }
            "load_settings" => Ok(serde_json::to_value(self.load_settings()?)?),
            other => Err(InvokeError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_args<T: DeserializeOwned>(request: &CommandRequest) -> Result<T, InvokeError> {
    serde_json::from_value(Value::Object(request.args.clone())).map_err(|e| {
        InvokeError::InvalidArgs {
            command: request.command.clone(),
            reason: e.to_string(),
        }
    })
}
