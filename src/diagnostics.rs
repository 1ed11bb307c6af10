//! Display server diagnostics
//!
//! A read-only snapshot of the graphical session, used by the `info`
//! command and logged at debug level when `record` or `play` opens the
//! input backend. Input hooks behave very differently on X11 and Wayland,
//! so this is the first thing to look at when capture records nothing.

use crate::backend::InputBackend;
use serde::Serialize;
use std::fmt;

/// Placeholder for unset environment values
const UNKNOWN: &str = "unknown";

/// Snapshot of the display server environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayServerInfo {
    /// `XDG_SESSION_TYPE`, or "unknown"
    pub session_type: String,
    /// `XDG_CURRENT_DESKTOP`, or "unknown"
    pub desktop: String,
    /// `WAYLAND_DISPLAY`, if set
    pub wayland_display: Option<String>,
    /// `DISPLAY`, if set
    pub x11_display: Option<String>,
    /// Whether the input backend reported capability
    pub supports_input: bool,
}

impl DisplayServerInfo {
    /// Read the environment of the current process
    pub fn detect() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the environment and probe the backend for input capability
    pub fn detect_with(backend: &dyn InputBackend) -> Self {
        let mut info = Self::detect();
        info.supports_input = backend.probe_capability();
        info
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        Self {
            session_type: non_empty("XDG_SESSION_TYPE").unwrap_or_else(|| UNKNOWN.to_string()),
            desktop: non_empty("XDG_CURRENT_DESKTOP").unwrap_or_else(|| UNKNOWN.to_string()),
            wayland_display: non_empty("WAYLAND_DISPLAY"),
            x11_display: non_empty("DISPLAY"),
            supports_input: false,
        }
    }

    /// Whether this is a Wayland session
    pub fn is_wayland(&self) -> bool {
        self.session_type.eq_ignore_ascii_case("wayland")
    }

    /// Whether this is an X11 session
    pub fn is_x11(&self) -> bool {
        self.session_type.eq_ignore_ascii_case("x11")
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} session on {} desktop, input {}",
            self.session_type,
            self.desktop,
            if self.supports_input {
                "supported"
            } else {
                "unavailable"
            }
        )
    }
}

impl fmt::Display for DisplayServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session type:    {}", self.session_type)?;
        writeln!(f, "Desktop:         {}", self.desktop)?;
        writeln!(
            f,
            "Wayland display: {}",
            self.wayland_display.as_deref().unwrap_or("-")
        )?;
        writeln!(
            f,
            "X11 display:     {}",
            self.x11_display.as_deref().unwrap_or("-")
        )?;
        write!(f, "Input supported: {}", self.supports_input)
    }
}
