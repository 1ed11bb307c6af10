//! Standalone replay artifact generation
//!
//! Renders an [`EventLog`] into a self-contained Python 3 script that
//! replays it through `pynput`, with no dependency on this crate at
//! replay time. The event array is embedded as a JSON string literal and
//! decoded by the script, so no recorded value is ever evaluated as code.
//! Keys and buttons are looked up by enum member name; unresolvable ones
//! are skipped and counted by the script.

use super::to_json_string;
use crate::error::{MacroError, Result};
use crate::types::EventLog;
use std::path::Path;

const TEMPLATE: &str = include_str!("replay_template.py");

/// Render the replay script for a log
pub fn render_script(log: &EventLog) -> Result<String> {
    let events_json = to_json_string(log)?;
    let events_literal = serde_json::to_string(&events_json)
        .map_err(|e| MacroError::Serialization(e.to_string()))?;
    let generated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");

    Ok(TEMPLATE
        .replace("{{VERSION}}", env!("CARGO_PKG_VERSION"))
        .replace("{{GENERATED_AT}}", &generated_at.to_string())
        .replace("{{EVENT_COUNT}}", &log.len().to_string())
        .replace("{{DURATION}}", &format!("{:.2}", log.duration()))
        .replace("{{EVENTS_LITERAL}}", &events_literal))
}

/// Write the replay script to `path` and mark it executable
pub fn compile_to_script(log: &EventLog, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let script = render_script(log)?;

    std::fs::write(path, script)
        .map_err(|e| MacroError::Io(e).with_context(format!("writing {}", path.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }

    tracing::info!(
        "Compiled {} events to standalone script {}",
        log.len(),
        path.display()
    );
    Ok(())
}
