//! # macrotape: input macro capture and replay
//!
//! Records pointer and keyboard input into a timestamped event log, stores
//! it as JSON, and replays it with scaled timing, looping and pause/resume.
//! A log can also be exported as a standalone replay script.
//!
//! ## Architecture
//!
//! - **Backend**: [`backend::InputBackend`] observes and injects input;
//!   `rdev` natively (feature `native-input`) or an in-process mock
//! - **Engines**: [`engine::CaptureEngine`] records, [`engine::PlaybackEngine`]
//!   replays, each controllable from another thread
//! - **Session**: [`MacroSession`] serializes capture and playback on worker
//!   threads and reports through crossbeam channels
//! - **Persistence**: JSON codec plus the replay script compiler
//!
//! ## Configuration
//!
//! `config.toml` lives in the platform config directory and app state in
//! the data directory, both under `dev.macrotape`. See [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use macrotape::{backend::native_backend, config::AppConfig, MacroSession};
//!
//! fn main() -> macrotape::Result<()> {
//!     let config = AppConfig::load_or_default(None);
//!     let mut session = MacroSession::new(native_backend()?, config);
//!
//!     session.start_capture()?;
//!     let stats = session.wait_for_capture()?; // press F9 to stop
//!     println!("{stats}");
//!
//!     session.save("macro.json")?;
//!     session.start_playback(1.0, 1)?;
//!     session.wait_for_playback();
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod keys;
pub mod persistence;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use backend::{InputBackend, InputListener, MockBackend};
pub use config::{AppConfig, AppState, CaptureSettings, PlaybackSettings};
pub use diagnostics::DisplayServerInfo;
pub use engine::{
    CaptureEngine, PlaybackEngine, PlaybackOptions, PlaybackOutcome, PlaybackReport,
    PlaybackState,
};
pub use error::{MacroError, Result, ResultExt};
pub use keys::{KeySymbol, NamedKey};
pub use session::{MacroSession, SessionMessage};
pub use types::{CaptureStats, EventKind, EventLog, InputAction, InputEvent, MouseButton};
