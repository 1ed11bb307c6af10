//! Mock Input Backend
//!
//! An in-process [`InputBackend`] that needs no display server. It is used
//! by the test suite and for dry runs of a macro.
//!
//! # Features
//!
//! - **Synthetic input**: `emit_*` methods deliver notifications to every
//!   subscribed listener, in call order
//! - **Injection log**: every successful `inject_*` call is recorded with
//!   the instant it happened, so tests can check ordering and timing
//! - **Failure simulation**: mark the backend unavailable, refuse
//!   subscriptions, or fail injection for chosen event kinds
//!
//! Key injection fails closed: [`KeySymbol::Unknown`] symbols are rejected
//! with [`MacroError::KeySymbolUnknown`], like a real backend would for a
//! key it cannot resolve.
//!
//! # Example
//!
//! ```ignore
//! use macrotape::backend::{InputBackend, MockBackend};
//!
//! let backend = MockBackend::new();
//! backend.inject_pointer_move(5, 5)?;
//! assert_eq!(backend.injected_count(), 1);
//! ```

use super::{InputBackend, InputListener, KeyInput, PointerInput, SubscriptionId};
use crate::error::{MacroError, Result};
use crate::keys::KeySymbol;
use crate::types::{EventKind, MouseButton};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// An injection performed against the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedInput {
    PointerMove { x: i32, y: i32 },
    PointerButton { button: MouseButton, pressed: bool },
    Scroll { dx: f64, dy: f64 },
    Key { key: KeySymbol, pressed: bool },
}

impl InjectedInput {
    /// Event kind this injection corresponds to
    pub fn kind(&self) -> EventKind {
        match self {
            InjectedInput::PointerMove { .. } => EventKind::PointerMove,
            InjectedInput::PointerButton { .. } => EventKind::PointerButton,
            InjectedInput::Scroll { .. } => EventKind::Scroll,
            InjectedInput::Key { pressed: true, .. } => EventKind::KeyDown,
            InjectedInput::Key { pressed: false, .. } => EventKind::KeyUp,
        }
    }
}

/// An injection together with when it happened
#[derive(Debug, Clone)]
pub struct InjectionRecord {
    pub input: InjectedInput,
    pub at: Instant,
}

/// Mock backend for tests and dry runs
pub struct MockBackend {
    available: AtomicBool,
    refuse_subscriptions: AtomicBool,
    failing_kinds: Mutex<HashSet<EventKind>>,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn InputListener>)>>,
    next_id: AtomicU64,
    injected: Mutex<Vec<InjectionRecord>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an available mock backend
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            refuse_subscriptions: AtomicBool::new(false),
            failing_kinds: Mutex::new(HashSet::new()),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            injected: Mutex::new(Vec::new()),
        }
    }

    /// Create a backend that reports no input capability
    pub fn unavailable() -> Self {
        let backend = Self::new();
        backend.set_available(false);
        backend
    }

    /// Set whether the backend reports capability
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make subscriptions fail even though capability is reported
    pub fn set_refuse_subscriptions(&self, refuse: bool) {
        self.refuse_subscriptions.store(refuse, Ordering::SeqCst);
    }

    /// Make injection fail for the given event kind
    pub fn fail_injections_for(&self, kind: EventKind) {
        self.failing_kinds.lock().insert(kind);
    }

    /// Number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Snapshot of all injections so far
    pub fn injected(&self) -> Vec<InjectionRecord> {
        self.injected.lock().clone()
    }

    /// Injected inputs without timing
    pub fn injected_inputs(&self) -> Vec<InjectedInput> {
        self.injected.lock().iter().map(|r| r.input.clone()).collect()
    }

    /// Number of injections so far
    pub fn injected_count(&self) -> usize {
        self.injected.lock().len()
    }

    /// Forget recorded injections
    pub fn clear_injected(&self) {
        self.injected.lock().clear();
    }

    /// Deliver a pointer move to all listeners
    pub fn emit_pointer_move(&self, x: i32, y: i32) {
        self.emit_pointer(PointerInput::Moved { x, y });
    }

    /// Deliver a button press/release to all listeners
    pub fn emit_button(&self, x: i32, y: i32, button: MouseButton, pressed: bool) {
        self.emit_pointer(PointerInput::Button {
            x,
            y,
            button,
            pressed,
        });
    }

    /// Deliver a scroll to all listeners
    pub fn emit_scroll(&self, x: i32, y: i32, dx: f64, dy: f64) {
        self.emit_pointer(PointerInput::Scrolled { x, y, dx, dy });
    }

    /// Deliver a key press/release to all listeners
    pub fn emit_key(&self, key: impl Into<KeySymbol>, pressed: bool) {
        let input = KeyInput {
            key: key.into(),
            pressed,
        };
        for listener in self.snapshot_listeners() {
            listener.on_key(input.clone());
        }
    }

    /// Report a fatal input source error to all listeners
    pub fn emit_backend_error(&self, message: &str) {
        for listener in self.snapshot_listeners() {
            listener.on_backend_error(message);
        }
    }

    fn emit_pointer(&self, input: PointerInput) {
        for listener in self.snapshot_listeners() {
            listener.on_pointer(input);
        }
    }

    // Listeners are called without holding the lock so they can unsubscribe
    // or stop a capture from inside a callback.
    fn snapshot_listeners(&self) -> Vec<Arc<dyn InputListener>> {
        self.listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    fn record(&self, input: InjectedInput) -> Result<()> {
        let kind = input.kind();
        if self.failing_kinds.lock().contains(&kind) {
            return Err(MacroError::dispatch(kind.tag(), "simulated injection failure"));
        }
        self.injected.lock().push(InjectionRecord {
            input,
            at: Instant::now(),
        });
        Ok(())
    }
}

impl InputBackend for MockBackend {
    fn probe_capability(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn subscribe(&self, listener: Arc<dyn InputListener>) -> Result<SubscriptionId> {
        if !self.probe_capability() {
            return Err(MacroError::BackendUnavailable(
                "mock backend marked unavailable".to_string(),
            ));
        }
        if self.refuse_subscriptions.load(Ordering::SeqCst) {
            return Err(MacroError::BackendUnavailable(
                "mock backend refused subscription".to_string(),
            ));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().push((id, listener));
        tracing::debug!("Mock backend subscription {:?} added", id);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }

    fn inject_pointer_move(&self, x: i32, y: i32) -> Result<()> {
        self.record(InjectedInput::PointerMove { x, y })
    }

    fn inject_pointer_button(&self, button: MouseButton, pressed: bool) -> Result<()> {
        self.record(InjectedInput::PointerButton { button, pressed })
    }

    fn inject_scroll(&self, dx: f64, dy: f64) -> Result<()> {
        self.record(InjectedInput::Scroll { dx, dy })
    }

    fn inject_key(&self, key: &KeySymbol, pressed: bool) -> Result<()> {
        if let KeySymbol::Unknown(raw) = key {
            return Err(MacroError::KeySymbolUnknown(raw.clone()));
        }
        self.record(InjectedInput::Key {
            key: key.clone(),
            pressed,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
