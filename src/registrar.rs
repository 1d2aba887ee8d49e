//! Owns the single clip hotkey registration.
//!
//! Setup is best-effort: every failure is logged and swallowed so a broken
//! hotkey never takes the daemon down.

use std::sync::Arc;

use tracing::{error, info};

use crate::backend::{CommandChannel, CommandRequest};
use crate::shortcut::{
    BoxFuture, GlobalShortcutService, ShortcutError, ShortcutEvent, ShortcutHandler,
    ShortcutState,
};
use crate::storage::KeyValueStore;

pub const DEFAULT_SHORTCUT: &str = "Alt+Z";
pub const HOTKEY_STORAGE_KEY: &str = "clipHotkey";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Registered(String),
    Failed,
}

pub struct ShortcutRegistrar {
    shortcuts: Arc<dyn GlobalShortcutService>,
    channel: Arc<dyn CommandChannel>,
    storage: Arc<dyn KeyValueStore>,
}

impl ShortcutRegistrar {
    pub fn new(
        shortcuts: Arc<dyn GlobalShortcutService>,
        channel: Arc<dyn CommandChannel>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            shortcuts,
            channel,
            storage,
        }
    }

    pub fn resolve_shortcut(&self) -> String {
        resolve_shortcut(self.storage.as_ref())
    }

    /// Replace whatever is bound with the stored clip hotkey. Never fails.
    pub async fn setup_global_shortcut(&self) -> SetupOutcome {
        match self.try_setup().await {
            Ok(spec) => {
                info!("shortcut registered: {}", spec);
                SetupOutcome::Registered(spec)
            }
            Err(e) => {
                error!("failed to register shortcut: {}", e);
                SetupOutcome::Failed
            }
        }
    }

    async fn try_setup(&self) -> Result<String, ShortcutError> {
        self.shortcuts.unregister_all().await?;

        let spec = self.resolve_shortcut();
        self.shortcuts
            .register(&spec, press_handler(Arc::clone(&self.channel)))
            .await?;
        Ok(spec)
    }
}

/// Stored `clipHotkey`, or the default when it is missing or empty.
pub fn resolve_shortcut(storage: &dyn KeyValueStore) -> String {
    storage
        .get_item(HOTKEY_STORAGE_KEY)
        .filter(|spec| !spec.is_empty())
        .unwrap_or_else(|| DEFAULT_SHORTCUT.to_string())
}

/// Handler that sends the notify request on every press.
pub fn press_handler(channel: Arc<dyn CommandChannel>) -> ShortcutHandler {
    Arc::new(move |event: ShortcutEvent| -> BoxFuture {
        let channel = Arc::clone(&channel);
        Box::pin(async move {
            if event.state != ShortcutState::Pressed {
                return;
            }

            info!("shortcut triggered: {}", event.shortcut);
            if let Err(e) = channel.invoke(CommandRequest::notify()).await {
                error!("failed to send notification: {}", e);
            }
        })
    })
}
