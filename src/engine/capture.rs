//! Capture engine
//!
//! Turns a live backend subscription into an [`EventLog`].
//!
//! # Lifecycle
//!
//! [`CaptureEngine::start`] resets the buffer, records the capture epoch,
//! subscribes to the backend and then blocks until a stop is signalled
//! through a [`CaptureHandle`] (or the stop hot-key, or a fatal backend
//! error). It then unsubscribes and returns the finished log.
//!
//! # Filtering
//!
//! Pointer moves are kept only when they are at least
//! `movement_threshold` pixels (Chebyshev distance) away from the last
//! *recorded* move. The first move is always kept. With `record_moves`
//! off, moves are dropped entirely.
//!
//! # Stop semantics
//!
//! The capturing flag lives under the same lock as the buffer, so once
//! [`CaptureHandle::stop`] returns no further event is appended. A late
//! notification racing with stop is silently dropped. Stopping twice, or
//! before a capture started, has no effect.

use crate::backend::{InputBackend, InputListener, KeyInput, PointerInput, SubscriptionId};
use crate::config::CaptureSettings;
use crate::error::{MacroError, Result};
use crate::keys::KeySymbol;
use crate::types::{EventLog, InputAction, InputEvent};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Instant;

/// Pointer-move threshold filter
///
/// Compares against the last position it accepted, not the last position
/// it saw, so slow continuous motion is still recorded once it adds up.
#[derive(Debug, Clone)]
pub struct MoveFilter {
    threshold: u32,
    last_recorded: Option<(i32, i32)>,
}

impl MoveFilter {
    /// Create a filter with the given pixel threshold
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last_recorded: None,
        }
    }

    /// Decide whether a move to `(x, y)` is recorded, updating state if so
    pub fn accept(&mut self, x: i32, y: i32) -> bool {
        let keep = match self.last_recorded {
            None => true,
            Some((last_x, last_y)) => {
                let dx = (i64::from(x) - i64::from(last_x)).unsigned_abs();
                let dy = (i64::from(y) - i64::from(last_y)).unsigned_abs();
                dx.max(dy) >= u64::from(self.threshold)
            }
        };
        if keep {
            self.last_recorded = Some((x, y));
        }
        keep
    }

    /// Forget the last recorded position
    pub fn reset(&mut self) {
        self.last_recorded = None;
    }
}

/// Mutable capture state, guarded by one lock
struct CaptureBuffer {
    capturing: bool,
    stop_requested: bool,
    backend_error: Option<String>,
    epoch: Instant,
    events: Vec<InputEvent>,
    filter: MoveFilter,
    record_moves: bool,
}

/// State shared between the capture thread, the backend callbacks and
/// any [`CaptureHandle`]
struct CaptureShared {
    buffer: Mutex<CaptureBuffer>,
    stopped: Condvar,
    stop_key: KeySymbol,
}

impl CaptureShared {
    fn append(&self, action: InputAction) {
        let mut buffer = self.buffer.lock();
        if !buffer.capturing {
            return;
        }
        let time = buffer.epoch.elapsed().as_secs_f64();
        buffer.events.push(InputEvent::new(time, action));
    }

    fn request_stop(&self) {
        let mut buffer = self.buffer.lock();
        buffer.capturing = false;
        buffer.stop_requested = true;
        self.stopped.notify_all();
    }
}

impl InputListener for CaptureShared {
    fn on_pointer(&self, input: PointerInput) {
        match input {
            PointerInput::Moved { x, y } => {
                let mut buffer = self.buffer.lock();
                if !buffer.capturing || !buffer.record_moves {
                    return;
                }
                if buffer.filter.accept(x, y) {
                    let time = buffer.epoch.elapsed().as_secs_f64();
                    buffer
                        .events
                        .push(InputEvent::new(time, InputAction::PointerMove { x, y }));
                }
            }
            PointerInput::Button {
                x,
                y,
                button,
                pressed,
            } => self.append(InputAction::PointerButton {
                x,
                y,
                button,
                pressed,
            }),
            PointerInput::Scrolled { x, y, dx, dy } => {
                self.append(InputAction::Scroll { x, y, dx, dy })
            }
        }
    }

    fn on_key(&self, input: KeyInput) {
        let is_stop_key = input.pressed && input.key == self.stop_key;
        let action = if input.pressed {
            InputAction::KeyDown { key: input.key }
        } else {
            InputAction::KeyUp { key: input.key }
        };
        self.append(action);

        if is_stop_key {
            tracing::info!("Stop key pressed, ending capture");
            self.request_stop();
        }
    }

    fn on_backend_error(&self, message: &str) {
        {
            let mut buffer = self.buffer.lock();
            if !buffer.capturing {
                return;
            }
            buffer.backend_error = Some(message.to_string());
        }
        self.request_stop();
    }
}

/// Cloneable handle for stopping and observing a capture from another thread
#[derive(Clone)]
pub struct CaptureHandle {
    shared: Arc<CaptureShared>,
}

impl CaptureHandle {
    /// Stop capturing. Idempotent; a no-op when nothing is running.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Check if a capture is in progress
    pub fn is_capturing(&self) -> bool {
        self.shared.buffer.lock().capturing
    }

    /// Number of events recorded so far
    pub fn event_count(&self) -> usize {
        self.shared.buffer.lock().events.len()
    }

    /// Enable or disable pointer-move recording, also mid-capture
    pub fn set_record_moves(&self, record: bool) {
        self.shared.buffer.lock().record_moves = record;
    }
}

/// Records input from a backend into an [`EventLog`]
pub struct CaptureEngine {
    backend: Arc<dyn InputBackend>,
    shared: Arc<CaptureShared>,
}

impl CaptureEngine {
    /// Create a capture engine for the given backend
    pub fn new(backend: Arc<dyn InputBackend>, settings: &CaptureSettings) -> Self {
        let buffer = CaptureBuffer {
            capturing: false,
            stop_requested: false,
            backend_error: None,
            epoch: Instant::now(),
            events: Vec::new(),
            filter: MoveFilter::new(settings.movement_threshold),
            record_moves: settings.record_moves,
        };

        Self {
            backend,
            shared: Arc::new(CaptureShared {
                buffer: Mutex::new(buffer),
                stopped: Condvar::new(),
                stop_key: settings.stop_key.clone(),
            }),
        }
    }

    /// Get a handle for stopping this capture from another thread
    pub fn handle(&self) -> CaptureHandle {
        CaptureHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run a capture, blocking until it is stopped
    ///
    /// Returns [`MacroError::BackendUnavailable`] if the backend cannot be
    /// subscribed to, or if it fails during the capture.
    pub fn start(&self) -> Result<EventLog> {
        let subscription = self.begin()?;
        self.wait_until_stopped(subscription)
    }

    /// First half of [`CaptureEngine::start`]: reset and subscribe
    ///
    /// Once this returns, the capture is live and a stop through any
    /// [`CaptureHandle`] is honored. Must be followed by exactly one
    /// [`CaptureEngine::wait_until_stopped`] with the returned id.
    pub fn begin(&self) -> Result<SubscriptionId> {
        if !self.backend.probe_capability() {
            return Err(MacroError::BackendUnavailable(
                "input capture is not supported in this session".to_string(),
            ));
        }

        {
            let mut buffer = self.shared.buffer.lock();
            if buffer.capturing {
                return Err(MacroError::SessionBusy(
                    "capture already in progress".to_string(),
                ));
            }
            buffer.events.clear();
            buffer.filter.reset();
            buffer.backend_error = None;
            buffer.stop_requested = false;
            buffer.epoch = Instant::now();
            buffer.capturing = true;
        }

        let listener: Arc<dyn InputListener> = self.shared.clone();
        match self.backend.subscribe(listener) {
            Ok(id) => {
                tracing::info!("Capture started via {} backend", self.backend.name());
                Ok(id)
            }
            Err(e) => {
                self.shared.buffer.lock().capturing = false;
                tracing::error!("Failed to subscribe to input backend: {}", e);
                Err(e)
            }
        }
    }

    /// Second half of [`CaptureEngine::start`]: block until stopped,
    /// unsubscribe and return the finished log
    pub fn wait_until_stopped(&self, subscription: SubscriptionId) -> Result<EventLog> {
        let (events, backend_error) = {
            let mut buffer = self.shared.buffer.lock();
            while !buffer.stop_requested {
                self.shared.stopped.wait(&mut buffer);
            }
            buffer.capturing = false;
            (
                std::mem::take(&mut buffer.events),
                buffer.backend_error.take(),
            )
        };

        self.backend.unsubscribe(subscription);

        if let Some(message) = backend_error {
            tracing::error!("Capture aborted by backend: {}", message);
            return Err(MacroError::BackendUnavailable(message));
        }

        let log = EventLog::new(events)?;
        tracing::info!("Capture stopped: {}", log.stats());
        Ok(log)
    }
}
