//! Persistence codec for event logs
//!
//! Logs are stored as a pretty-printed JSON array, one object per event:
//!
//! ```json
//! [
//!   { "type": "mouse_move", "data": { "x": 10, "y": 20 }, "time": 0.0 },
//!   { "type": "key_press", "data": { "key": "Key.enter" }, "time": 0.42 }
//! ]
//! ```
//!
//! Loading validates the same timestamp invariants as [`EventLog::new`], so
//! a file either loads completely or not at all. Saving goes through a
//! temporary file and a rename, so an interrupted save never leaves a
//! truncated log behind.

pub mod compiler;

pub use compiler::{compile_to_script, render_script};

use crate::error::{MacroError, Result};
use crate::types::{EventLog, InputEvent};
use std::io::Write;
use std::path::Path;

/// Serialize a log to pretty JSON
pub fn to_json_string(log: &EventLog) -> Result<String> {
    serde_json::to_string_pretty(log.events())
        .map_err(|e| MacroError::Serialization(e.to_string()))
}

/// Parse and validate a log from JSON text
pub fn from_json_str(json: &str) -> Result<EventLog> {
    let events: Vec<InputEvent> =
        serde_json::from_str(json).map_err(|e| MacroError::MalformedLog(e.to_string()))?;
    EventLog::new(events)
}

/// Save a log to `path`, replacing any existing file atomically
pub fn save(log: &EventLog, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = to_json_string(log)?;

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    // Uniquely named sibling, removed on drop if the save fails
    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| MacroError::Io(e).with_context(format!("creating temp file in {}", parent.display())))?;
    temp.write_all(json.as_bytes())
        .map_err(|e| MacroError::Io(e).with_context(format!("writing {}", temp.path().display())))?;
    temp.persist(path)
        .map_err(|e| MacroError::Io(e.error).with_context(format!("replacing {}", path.display())))?;

    tracing::info!("Saved {} events to {}", log.len(), path.display());
    Ok(())
}

/// Load and validate a log from `path`
pub fn load(path: impl AsRef<Path>) -> Result<EventLog> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| MacroError::Io(e).with_context(format!("reading {}", path.display())))?;

    let log = from_json_str(&json).map_err(|e| e.with_context(format!("loading {}", path.display())))?;
    tracing::info!("Loaded {} events from {}", log.len(), path.display());
    Ok(log)
}
