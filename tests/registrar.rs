use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::subscriber::DefaultGuard;
use tracing::Level;

use flux_lib::shortcut::ShortcutHandler;
use flux_lib::{
    CommandChannel, CommandRequest, GlobalShortcutService, InvokeError, MemoryStore,
    SetupOutcome, ShortcutError, ShortcutEvent, ShortcutRegistrar, HOTKEY_STORAGE_KEY,
};

#[derive(Default)]
struct FakeShortcuts {
    bindings: Mutex<Vec<(String, ShortcutHandler)>>,
    calls: Mutex<Vec<String>>,
    fail_unregister: bool,
}

impl FakeShortcuts {
    fn failing_unregister() -> Self {
        Self {
            fail_unregister: true,
            ..Self::default()
        }
    }

    fn bound(&self) -> Vec<String> {
        self.bindings
            .lock()
            .unwrap()
            .iter()
            .map(|(spec, _)| spec.clone())
            .collect()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn handler_for(&self, spec: &str) -> ShortcutHandler {
        self.bindings
            .lock()
            .unwrap()
            .iter()
            .find(|(bound, _)| bound == spec)
            .map(|(_, handler)| Arc::clone(handler))
            .expect("shortcut is bound")
    }
}

#[async_trait]
impl GlobalShortcutService for FakeShortcuts {
    async fn register(&self, spec: &str, handler: ShortcutHandler) -> Result<(), ShortcutError> {
        self.calls.lock().unwrap().push(format!("register {spec}"));
        if spec.is_empty() || spec.ends_with('+') {
            return Err(ShortcutError::InvalidShortcut {
                spec: spec.to_string(),
                reason: "empty key".to_string(),
            });
        }

        let mut bindings = self.bindings.lock().unwrap();
        if bindings.iter().any(|(bound, _)| bound == spec) {
            return Err(ShortcutError::AlreadyRegistered(spec.to_string()));
        }
        bindings.push((spec.to_string(), handler));
        Ok(())
    }

    async fn unregister_all(&self) -> Result<(), ShortcutError> {
        self.calls.lock().unwrap().push("unregister_all".to_string());
        if self.fail_unregister {
            return Err(ShortcutError::Unavailable("no display".to_string()));
        }
        self.bindings.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
struct FakeChannel {
    requests: Mutex<Vec<CommandRequest>>,
    fail: bool,
}

impl FakeChannel {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<CommandRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandChannel for FakeChannel {
    async fn invoke(&self, request: CommandRequest) -> Result<Value, InvokeError> {
        self.requests.lock().unwrap().push(request);
        if self.fail {
            return Err(InvokeError::CommandFailed("notify-send: not found".to_string()));
        }
        Ok(Value::String(String::new()))
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn lines_at(&self, level: &str) -> usize {
        let raw = self.0.lock().unwrap().clone();
        String::from_utf8_lossy(&raw)
            .lines()
            .filter(|line| line.contains(level))
            .count()
    }
}

fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

fn registrar(
    shortcuts: &Arc<FakeShortcuts>,
    channel: &Arc<FakeChannel>,
    store: MemoryStore,
) -> ShortcutRegistrar {
    ShortcutRegistrar::new(shortcuts.clone(), channel.clone(), Arc::new(store))
}

#[tokio::test]
async fn registers_default_hotkey_when_nothing_stored() {
    let shortcuts = Arc::new(FakeShortcuts::default());
    let channel = Arc::new(FakeChannel::default());

    let outcome = registrar(&shortcuts, &channel, MemoryStore::new())
        .setup_global_shortcut()
        .await;

    assert_eq!(outcome, SetupOutcome::Registered("Alt+Z".to_string()));
    assert_eq!(shortcuts.calls(), ["unregister_all", "register Alt+Z"]);
    assert_eq!(shortcuts.bound(), ["Alt+Z"]);
}

#[tokio::test]
async fn registers_stored_hotkey() {
    let shortcuts = Arc::new(FakeShortcuts::default());
    let channel = Arc::new(FakeChannel::default());
    let store = MemoryStore::with_item(HOTKEY_STORAGE_KEY, "Ctrl+Shift+X");

    let outcome = registrar(&shortcuts, &channel, store)
        .setup_global_shortcut()
        .await;

    assert_eq!(outcome, SetupOutcome::Registered("Ctrl+Shift+X".to_string()));
    assert_eq!(shortcuts.bound(), ["Ctrl+Shift+X"]);
}

#[tokio::test]
async fn repeated_setup_leaves_one_registration() {
    let shortcuts = Arc::new(FakeShortcuts::default());
    let channel = Arc::new(FakeChannel::default());
    shortcuts
        .register("Ctrl+Q", flux_lib::registrar::press_handler(channel.clone()))
        .await
        .unwrap();

    let registrar = registrar(&shortcuts, &channel, MemoryStore::new());
    for _ in 0..3 {
        assert_eq!(
            registrar.setup_global_shortcut().await,
            SetupOutcome::Registered("Alt+Z".to_string())
        );
    }

    assert_eq!(shortcuts.bound(), ["Alt+Z"]);
}

#[tokio::test]
async fn press_sends_one_notify_request() {
    let shortcuts = Arc::new(FakeShortcuts::default());
    let channel = Arc::new(FakeChannel::default());
    registrar(&shortcuts, &channel, MemoryStore::new())
        .setup_global_shortcut()
        .await;

    let handler = shortcuts.handler_for("Alt+Z");
    handler(ShortcutEvent::pressed("Alt+Z")).await;

    let requests = channel.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        serde_json::to_value(&requests[0]).unwrap(),
        json!({"command": "run_terminal_command", "args": {"command": "notify-send hi"}})
    );
}

#[tokio::test]
async fn release_sends_nothing() {
    let shortcuts = Arc::new(FakeShortcuts::default());
    let channel = Arc::new(FakeChannel::default());
    registrar(&shortcuts, &channel, MemoryStore::new())
        .setup_global_shortcut()
        .await;

    let handler = shortcuts.handler_for("Alt+Z");
    handler(ShortcutEvent::released("Alt+Z")).await;

    assert!(channel.requests().is_empty());
}

#[tokio::test]
async fn overlapping_presses_each_send_a_request() {
    let shortcuts = Arc::new(FakeShortcuts::default());
    let channel = Arc::new(FakeChannel::default());
    registrar(&shortcuts, &channel, MemoryStore::new())
        .setup_global_shortcut()
        .await;

    let handler = shortcuts.handler_for("Alt+Z");
    let first = handler(ShortcutEvent::pressed("Alt+Z"));
    let second = handler(ShortcutEvent::pressed("Alt+Z"));
    tokio::join!(first, second);

    assert_eq!(channel.requests().len(), 2);
}

#[tokio::test]
async fn invocation_failure_is_logged_and_registration_survives() {
    let (logs, _guard) = capture_logs();
    let shortcuts = Arc::new(FakeShortcuts::default());
    let channel = Arc::new(FakeChannel::failing());

    let outcome = registrar(&shortcuts, &channel, MemoryStore::new())
        .setup_global_shortcut()
        .await;
    assert_eq!(outcome, SetupOutcome::Registered("Alt+Z".to_string()));

    let handler = shortcuts.handler_for("Alt+Z");
    handler(ShortcutEvent::pressed("Alt+Z")).await;
    assert_eq!(logs.lines_at("ERROR"), 1);

    // still bound, next press is attempted again
    handler(ShortcutEvent::pressed("Alt+Z")).await;
    assert_eq!(channel.requests().len(), 2);
    assert_eq!(shortcuts.bound(), ["Alt+Z"]);
}

#[tokio::test]
async fn unregister_failure_skips_registration() {
    let (logs, _guard) = capture_logs();
    let shortcuts = Arc::new(FakeShortcuts::failing_unregister());
    let channel = Arc::new(FakeChannel::default());

    let outcome = registrar(&shortcuts, &channel, MemoryStore::new())
        .setup_global_shortcut()
        .await;

    assert_eq!(outcome, SetupOutcome::Failed);
    assert_eq!(shortcuts.calls(), ["unregister_all"]);
    assert!(shortcuts.bound().is_empty());
    assert_eq!(logs.lines_at("ERROR"), 1);
}

#[tokio::test]
async fn malformed_hotkey_is_logged_not_raised() {
    let (logs, _guard) = capture_logs();
    let shortcuts = Arc::new(FakeShortcuts::default());
    let channel = Arc::new(FakeChannel::default());
    let store = MemoryStore::with_item(HOTKEY_STORAGE_KEY, "Alt+");

    let outcome = registrar(&shortcuts, &channel, store)
        .setup_global_shortcut()
        .await;

    assert_eq!(outcome, SetupOutcome::Failed);
    assert_eq!(shortcuts.calls(), ["unregister_all", "register Alt+"]);
    assert_eq!(logs.lines_at("ERROR"), 1);
}
