//! Native global shortcut service backed by the `global-hotkey` crate.
//!
//! One dispatcher thread drains `GlobalHotKeyEvent::receiver()` and hands each
//! event to the handler stored for its hotkey id. Handler futures are spawned
//! onto the tokio runtime captured at construction.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use async_trait::async_trait;
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::shortcut::{
    GlobalShortcutService, ShortcutError, ShortcutEvent, ShortcutHandler, ShortcutState,
};

struct Binding {
    hotkey: HotKey,
    spec: String,
    handler: ShortcutHandler,
}

type Bindings = Arc<Mutex<HashMap<u32, Binding>>>;

pub struct NativeShortcutService {
    manager: Mutex<GlobalHotKeyManager>,
    bindings: Bindings,
}

impl NativeShortcutService {
    /// Create the OS hotkey manager and start the dispatcher thread.
    ///
    /// The event receiver is process-global, so only one service should exist.
    pub fn new(runtime: Handle) -> Result<Self, ShortcutError> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| ShortcutError::Unavailable(e.to_string()))?;
        let bindings: Bindings = Arc::new(Mutex::new(HashMap::new()));

        spawn_dispatcher(Arc::clone(&bindings), runtime)?;

        Ok(Self {
            manager: Mutex::new(manager),
            bindings,
        })
    }

    fn manager(&self) -> Result<MutexGuard<'_, GlobalHotKeyManager>, ShortcutError> {
        self.manager
            .lock()
            .map_err(|_| ShortcutError::Unavailable("hotkey manager lock poisoned".into()))
    }
}

#[async_trait]
impl GlobalShortcutService for NativeShortcutService {
    async fn register(&self, spec: &str, handler: ShortcutHandler) -> Result<(), ShortcutError> {
        let hotkey = parse_shortcut(spec)?;
        let id = hotkey.id();

        let mut bindings = lock_bindings(&self.bindings);
        if bindings.contains_key(&id) {
            return Err(ShortcutError::AlreadyRegistered(spec.to_string()));
        }

        self.manager()?.register(hotkey).map_err(|e| match e {
            global_hotkey::Error::AlreadyRegistered(_) => {
                ShortcutError::AlreadyRegistered(spec.to_string())
            }
            other => ShortcutError::Register {
                spec: spec.to_string(),
                reason: other.to_string(),
            },
        })?;

        debug!("bound hotkey id {} to {}", id, spec);
        bindings.insert(
            id,
            Binding {
                hotkey,
                spec: spec.to_string(),
                handler,
            },
        );
        Ok(())
    }

    async fn unregister_all(&self) -> Result<(), ShortcutError> {
        let mut bindings = lock_bindings(&self.bindings);
        if bindings.is_empty() {
            return Ok(());
        }

        let hotkeys: Vec<HotKey> = bindings.values().map(|b| b.hotkey).collect();
        self.manager()?
            .unregister_all(&hotkeys)
            .map_err(|e| ShortcutError::Unregister(e.to_string()))?;

        for binding in bindings.values() {
            debug!("unbound {}", binding.spec);
        }
        bindings.clear();
        Ok(())
    }
}

/// Parse a combination such as `Alt+Z` or `Ctrl+Shift+X`.
pub fn parse_shortcut(spec: &str) -> Result<HotKey, ShortcutError> {
    HotKey::from_str(spec).map_err(|e| ShortcutError::InvalidShortcut {
        spec: spec.to_string(),
        reason: e.to_string(),
    })
}

fn to_event(state: HotKeyState, spec: &str) -> ShortcutEvent {
    let state = match state {
        HotKeyState::Pressed => ShortcutState::Pressed,
        HotKeyState::Released => ShortcutState::Released,
    };
    ShortcutEvent {
        state,
        shortcut: spec.to_string(),
    }
}

fn lock_bindings(bindings: &Bindings) -> MutexGuard<'_, HashMap<u32, Binding>> {
    bindings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn spawn_dispatcher(bindings: Bindings, runtime: Handle) -> Result<(), ShortcutError> {
    thread::Builder::new()
        .name("flux-hotkeys".into())
        .spawn(move || {
            info!("starting global hotkey event listener thread");
            let receiver = GlobalHotKeyEvent::receiver();
            loop {
                let event = match receiver.recv() {
                    Ok(event) => event,
                    Err(e) => {
                        error!("hotkey event channel closed: {}", e);
                        break;
                    }
                };

                let dispatch = {
                    let bindings = lock_bindings(&bindings);
                    bindings
                        .get(&event.id)
                        .map(|b| (Arc::clone(&b.handler), to_event(event.state, &b.spec)))
                };

                match dispatch {
                    Some((handler, shortcut_event)) => {
                        debug!("hotkey event: {}", shortcut_event);
                        runtime.spawn(handler(shortcut_event));
                    }
                    None => warn!("event for unknown hotkey id {}", event.id),
                }
            }
        })
        .map(|_| ())
        .map_err(|e| ShortcutError::Unavailable(format!("failed to spawn dispatcher: {e}")))
}
