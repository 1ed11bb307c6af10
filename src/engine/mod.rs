//! Capture and playback engines
//!
//! - [`CaptureEngine`] - Records backend notifications into an event log
//! - [`PlaybackEngine`] - Re-injects an event log with scaled timing

pub mod capture;
pub mod playback;

pub use capture::{CaptureEngine, CaptureHandle, MoveFilter};
pub use playback::{
    LoopClock, PlaybackControl, PlaybackEngine, PlaybackOptions, PlaybackOutcome,
    PlaybackProgress, PlaybackReport, PlaybackState,
};
