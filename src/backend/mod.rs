//! Input backend adapter
//!
//! The engines never talk to an OS input stack directly. They go through
//! [`InputBackend`], which offers two capability surfaces:
//!
//! - **Observation**: [`InputBackend::subscribe`] registers an
//!   [`InputListener`] that receives pointer and key notifications in
//!   arrival order until [`InputBackend::unsubscribe`] is called.
//! - **Injection**: synchronous `inject_*` calls that move the pointer,
//!   press/release buttons and keys, and scroll.
//!
//! # Implementations
//!
//! - [`MockBackend`] - In-process backend that records injections and lets
//!   callers emit synthetic input (tests, demos, dry runs)
//! - `RdevBackend` - Native hook/injection via `rdev` (feature `native-input`)
//!
//! # Example
//!
//! ```ignore
//! use macrotape::backend::{native_backend, InputBackend};
//!
//! let backend = native_backend()?;
//! if !backend.probe_capability() {
//!     eprintln!("input recording is not supported in this session");
//! }
//! backend.inject_pointer_move(100, 200)?;
//! ```

pub mod mock_backend;
#[cfg(feature = "native-input")]
pub mod rdev_backend;

pub use mock_backend::{InjectedInput, InjectionRecord, MockBackend};
#[cfg(feature = "native-input")]
pub use rdev_backend::RdevBackend;

use crate::error::Result;
use crate::keys::KeySymbol;
use crate::types::MouseButton;
use std::sync::Arc;

/// Handle identifying one active subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Pointer notification delivered by a backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    /// Pointer moved to an absolute position
    Moved { x: i32, y: i32 },
    /// Button pressed or released
    Button {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    /// Scroll wheel delta
    Scrolled { x: i32, y: i32, dx: f64, dy: f64 },
}

/// Key notification delivered by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    /// Symbolic key identity
    pub key: KeySymbol,
    /// True for press, false for release
    pub pressed: bool,
}

/// Receiver of observed input
///
/// Callbacks may run on a backend-owned thread and must not block for long.
/// Implementations must tolerate notifications that arrive after they have
/// asked to stop.
pub trait InputListener: Send + Sync {
    /// A pointer notification arrived
    fn on_pointer(&self, input: PointerInput);

    /// A key notification arrived
    fn on_key(&self, input: KeyInput);

    /// The backend lost its input source and will not deliver further input
    fn on_backend_error(&self, _message: &str) {}
}

/// Unified interface for input observation and injection
///
/// Implementations must be `Send + Sync` so one backend can be shared by
/// the capture and playback workers.
#[cfg_attr(test, mockall::automock)]
pub trait InputBackend: Send + Sync {
    /// Check whether input can be observed and injected in this session
    fn probe_capability(&self) -> bool;

    /// Register a listener for pointer and key notifications
    ///
    /// Fails with [`crate::MacroError::BackendUnavailable`] if the input
    /// source cannot be opened. On failure nothing stays registered.
    fn subscribe(&self, listener: Arc<dyn InputListener>) -> Result<SubscriptionId>;

    /// Remove a listener. Unknown handles are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Move the pointer to an absolute position
    fn inject_pointer_move(&self, x: i32, y: i32) -> Result<()>;

    /// Press or release a pointer button
    fn inject_pointer_button(&self, button: MouseButton, pressed: bool) -> Result<()>;

    /// Apply a scroll delta
    fn inject_scroll(&self, dx: f64, dy: f64) -> Result<()>;

    /// Press or release a key
    ///
    /// Symbols without a backend key identity fail with
    /// [`crate::MacroError::KeySymbolUnknown`].
    fn inject_key(&self, key: &KeySymbol, pressed: bool) -> Result<()>;

    /// Short backend name for diagnostics
    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Create the platform input backend
///
/// Without the `native-input` feature there is no platform backend and
/// this returns [`crate::MacroError::BackendUnavailable`].
pub fn native_backend() -> Result<Arc<dyn InputBackend>> {
    #[cfg(feature = "native-input")]
    {
        Ok(Arc::new(RdevBackend::new()))
    }
    #[cfg(not(feature = "native-input"))]
    {
        Err(crate::error::MacroError::BackendUnavailable(
            "built without the native-input feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(feature = "native-input"))]
    fn test_native_backend_unavailable_without_feature() {
        let err = native_backend().err().expect("should be unavailable");
        assert!(matches!(err, crate::MacroError::BackendUnavailable(_)));
    }

    #[test]
    fn test_subscription_id_equality() {
        assert_eq!(SubscriptionId(3), SubscriptionId(3));
        assert_ne!(SubscriptionId(3), SubscriptionId(4));
    }
}
