use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod backend;
pub mod config;
pub mod hotkeys;
pub mod recorder;
pub mod registrar;
pub mod settings;
pub mod shortcut;
pub mod storage;

pub use backend::{Backend, CommandChannel, CommandRequest, InvokeError};
pub use config::Config;
pub use hotkeys::NativeShortcutService;
pub use recorder::{RecorderCommand, RecorderError};
pub use registrar::{SetupOutcome, ShortcutRegistrar, DEFAULT_SHORTCUT, HOTKEY_STORAGE_KEY};
pub use settings::{Settings, SettingsError};
pub use shortcut::{GlobalShortcutService, ShortcutError, ShortcutEvent, ShortcutState};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

/// Backend wired to the configured shell and settings file.
pub fn backend_from_config(config: &Config) -> Result<Backend> {
    Ok(Backend::new(config.shell.clone(), config.settings_path()?))
}

/// Register the clip hotkey and serve it until Ctrl+C.
pub async fn run_daemon(config: &Config) -> Result<()> {
    let shortcuts = Arc::new(
        NativeShortcutService::new(Handle::current())
            .context("Failed to start global shortcut service")?,
    );
    let channel = Arc::new(backend_from_config(config)?);
    let storage = Arc::new(FileStore::new(config.storage_path()?));

    let registrar = ShortcutRegistrar::new(shortcuts.clone(), channel, storage);
    if let SetupOutcome::Failed = registrar.setup_global_shortcut().await {
        warn!("running without a clip hotkey");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("Failed to install Ctrl+C handler")?;

    info!("flux is running, press Ctrl+C to exit");
    rx.recv().await;

    info!("shutting down");
    if let Err(e) = shortcuts.unregister_all().await {
        warn!("failed to release shortcuts: {}", e);
    }
    Ok(())
}
