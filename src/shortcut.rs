//! Global shortcut abstractions
//!
//! The registrar talks to the host through [`GlobalShortcutService`]; the
//! native implementation lives in [`crate::hotkeys`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether the key combination went down or came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortcutState {
    Pressed,
    Released,
}

/// Event delivered by the shortcut service for a registered combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutEvent {
    pub state: ShortcutState,
    pub shortcut: String,
}

impl ShortcutEvent {
    pub fn pressed(shortcut: impl Into<String>) -> Self {
        Self {
            state: ShortcutState::Pressed,
            shortcut: shortcut.into(),
        }
    }

    pub fn released(shortcut: impl Into<String>) -> Self {
        Self {
            state: ShortcutState::Released,
            shortcut: shortcut.into(),
        }
    }
}

impl fmt::Display for ShortcutEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.shortcut, self.state)
    }
}

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Callback stored by the shortcut service. The returned future is driven by
/// the service's runtime, so handlers must not block.
pub type ShortcutHandler = Arc<dyn Fn(ShortcutEvent) -> BoxFuture + Send + Sync>;

#[derive(Debug, Error)]
pub enum ShortcutError {
    #[error("invalid shortcut {spec:?}: {reason}")]
    InvalidShortcut { spec: String, reason: String },
    #[error("shortcut {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("global shortcut service unavailable: {0}")]
    Unavailable(String),
    #[error("failed to register {spec:?}: {reason}")]
    Register { spec: String, reason: String },
    #[error("failed to unregister shortcuts: {0}")]
    Unregister(String),
}

#[async_trait]
pub trait GlobalShortcutService: Send + Sync {
    /// Bind `spec` and deliver its press/release events to `handler`.
    async fn register(&self, spec: &str, handler: ShortcutHandler) -> Result<(), ShortcutError>;

    /// Drop every binding this service holds.
    async fn unregister_all(&self) -> Result<(), ShortcutError>;
}
