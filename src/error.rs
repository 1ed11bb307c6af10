//! Error handling for macrotape
//!
//! This module defines the error taxonomy shared by the capture engine,
//! the playback engine and the persistence codec, plus a Result alias.
//!
//! Lifecycle errors (subscribe/start failures, bad configuration, parse
//! failures) propagate to the caller. Per-event errors
//! ([`MacroError::KeySymbolUnknown`], [`MacroError::DispatchFailure`]) are
//! contained by the playback engine at the event boundary.

use thiserror::Error;

/// Main error type for macrotape operations
#[derive(Error, Debug)]
pub enum MacroError {
    /// The input backend cannot observe or inject input
    #[error("Input backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Rejected settings (non-positive speed, zero loops, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A stored event log could not be parsed or violates its invariants
    #[error("Malformed event log: {0}")]
    MalformedLog(String),

    /// A key symbol has no backend key identity
    #[error("Unknown key symbol: {0}")]
    KeySymbolUnknown(String),

    /// The backend failed to inject a single event
    #[error("Dispatch failed for {kind}: {message}")]
    DispatchFailure { kind: String, message: String },

    /// A capture or playback is already running in this session
    #[error("Session busy: {0}")]
    SessionBusy(String),

    /// Playback or export was requested without a recorded macro
    #[error("No macro loaded")]
    NoMacroLoaded,

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MacroError>,
    },
}

impl MacroError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MacroError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a dispatch failure for the given event kind
    pub fn dispatch(kind: impl Into<String>, message: impl Into<String>) -> Self {
        MacroError::DispatchFailure {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The innermost error, skipping any context wrappers
    pub fn root(&self) -> &MacroError {
        match self {
            MacroError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for macrotape operations
pub type Result<T> = std::result::Result<T, MacroError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MacroError::InvalidConfiguration("speed must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: speed must be positive"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = MacroError::MalformedLog("expected array".to_string());
        let with_ctx = err.with_context("Failed to load macro.json");
        assert!(with_ctx.to_string().contains("Failed to load macro.json"));
        assert!(matches!(with_ctx.root(), MacroError::MalformedLog(_)));
    }

    #[test]
    fn test_dispatch_failure() {
        let err = MacroError::dispatch("mouse_click", "button not supported");
        assert!(err.to_string().contains("mouse_click"));
        assert!(err.to_string().contains("button not supported"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<()> = Err(MacroError::NoMacroLoaded);
        let err = result.context("Cannot play").unwrap_err();
        assert_eq!(err.to_string(), "Cannot play: No macro loaded");
    }
}
