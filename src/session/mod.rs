//! Macro session
//!
//! [`MacroSession`] is the control surface a UI or CLI drives. It owns one
//! event log, one capture engine and one playback engine, runs each active
//! operation on its own worker thread, and serializes them: at most one
//! capture or one playback is active at any time.
//!
//! # Messages
//!
//! Workers report through a crossbeam channel. [`MacroSession::poll`]
//! reaps finished workers and drains the channel, so a frontend calls it
//! once per frame (or tick) and reacts to the returned
//! [`SessionMessage`]s.
//!
//! # Example
//!
//! ```ignore
//! use macrotape::{config::AppConfig, MacroSession, backend::native_backend};
//!
//! let mut session = MacroSession::new(native_backend()?, AppConfig::default());
//! session.start_capture()?;
//! let stats = session.wait_for_capture()?; // ends on the stop key
//! session.save("macro.json")?;
//!
//! session.start_playback(2.0, 3)?;
//! while session.is_playing() {
//!     for msg in session.poll() {
//!         println!("{msg:?}");
//!     }
//! }
//! ```

use crate::backend::InputBackend;
use crate::config::AppConfig;
use crate::engine::{
    CaptureEngine, CaptureHandle, PlaybackControl, PlaybackEngine, PlaybackOptions,
    PlaybackProgress, PlaybackReport, PlaybackState,
};
use crate::error::{MacroError, Result};
use crate::persistence;
use crate::types::{CaptureStats, EventLog};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Message sent from session workers to the frontend
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// A capture subscribed and is recording
    CaptureStarted,
    /// A capture ended and its log replaced the session log
    CaptureFinished(CaptureStats),
    /// A capture ended with an error; the previous log is kept
    CaptureFailed(String),
    /// An event was dispatched
    PlaybackProgress(PlaybackProgress),
    /// Playback completed or was stopped
    PlaybackFinished(PlaybackReport),
    /// The playback worker died
    PlaybackFailed(String),
}

/// Owner of the current macro and its capture/playback workers
pub struct MacroSession {
    config: AppConfig,
    log: Arc<EventLog>,
    capture: Arc<CaptureEngine>,
    capture_handle: CaptureHandle,
    capture_worker: Option<JoinHandle<Result<EventLog>>>,
    playback: Arc<PlaybackEngine>,
    playback_control: PlaybackControl,
    playback_worker: Option<JoinHandle<PlaybackReport>>,
    sender: Sender<SessionMessage>,
    receiver: Receiver<SessionMessage>,
}

impl MacroSession {
    /// Create a session with an empty log
    pub fn new(backend: Arc<dyn InputBackend>, config: AppConfig) -> Self {
        let capture = Arc::new(CaptureEngine::new(Arc::clone(&backend), &config.capture));
        let playback = Arc::new(PlaybackEngine::new(backend));
        let (sender, receiver) = unbounded();

        Self {
            capture_handle: capture.handle(),
            playback_control: playback.control(),
            config,
            log: Arc::new(EventLog::empty()),
            capture,
            capture_worker: None,
            playback,
            playback_worker: None,
            sender,
            receiver,
        }
    }

    /// Configuration the session was created with
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The current log
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Replace the current log
    pub fn set_log(&mut self, log: EventLog) -> Result<()> {
        self.ensure_idle()?;
        self.log = Arc::new(log);
        Ok(())
    }

    // ==================== Capture ====================

    /// Start recording
    ///
    /// Subscription happens before this returns, so backend failures are
    /// reported here and a following [`MacroSession::stop_capture`] is
    /// never lost.
    pub fn start_capture(&mut self) -> Result<()> {
        self.reap();
        self.ensure_idle()?;

        let subscription = self.capture.begin()?;
        let engine = Arc::clone(&self.capture);
        let spawned = std::thread::Builder::new()
            .name("macro-capture".to_string())
            .spawn(move || engine.wait_until_stopped(subscription));

        match spawned {
            Ok(handle) => {
                self.capture_worker = Some(handle);
                let _ = self.sender.send(SessionMessage::CaptureStarted);
                Ok(())
            }
            Err(e) => {
                // Unsubscribe through the normal path
                self.capture_handle.stop();
                let _ = self.capture.wait_until_stopped(subscription);
                Err(MacroError::Io(e))
            }
        }
    }

    /// Stop recording and install the captured log
    ///
    /// Without an active capture this returns the stats of the current log.
    pub fn stop_capture(&mut self) -> Result<CaptureStats> {
        self.capture_handle.stop();
        self.wait_for_capture()
    }

    /// Block until the active capture ends (e.g. via the stop key)
    pub fn wait_for_capture(&mut self) -> Result<CaptureStats> {
        match self.join_capture() {
            Some(result) => result,
            None => Ok(self.log.stats()),
        }
    }

    /// Check if a capture is active
    pub fn is_capturing(&self) -> bool {
        self.capture_worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Stats of the current log
    pub fn capture_stats(&self) -> CaptureStats {
        self.log.stats()
    }

    /// Number of events recorded so far by the active capture
    pub fn live_event_count(&self) -> usize {
        self.capture_handle.event_count()
    }

    /// Enable or disable pointer-move recording, also mid-capture
    pub fn set_record_moves(&mut self, record: bool) {
        self.config.capture.record_moves = record;
        self.capture_handle.set_record_moves(record);
    }

    fn join_capture(&mut self) -> Option<Result<CaptureStats>> {
        let worker = self.capture_worker.take()?;
        let result = worker.join().unwrap_or_else(|_| {
            Err(MacroError::BackendUnavailable(
                "capture worker panicked".to_string(),
            ))
        });

        Some(match result {
            Ok(log) => {
                let stats = log.stats();
                self.log = Arc::new(log);
                let _ = self
                    .sender
                    .send(SessionMessage::CaptureFinished(stats.clone()));
                Ok(stats)
            }
            Err(e) => {
                tracing::error!("Capture failed: {}", e);
                let _ = self.sender.send(SessionMessage::CaptureFailed(e.to_string()));
                Err(e)
            }
        })
    }

    // ==================== Playback ====================

    /// Start playing the current log
    ///
    /// Loop settle and poll interval come from the session configuration.
    pub fn start_playback(&mut self, speed: f64, loops: u32) -> Result<()> {
        self.reap();
        self.ensure_idle()?;
        if self.log.is_empty() {
            return Err(MacroError::NoMacroLoaded);
        }

        let options = PlaybackOptions {
            speed,
            loops,
            ..PlaybackOptions::from(&self.config.playback)
        };
        let sender = self.sender.clone();
        let worker = Arc::clone(&self.playback).spawn(
            Arc::clone(&self.log),
            options,
            move |progress| {
                let _ = sender.send(SessionMessage::PlaybackProgress(progress));
            },
        )?;

        self.playback_worker = Some(worker);
        Ok(())
    }

    /// Start playing with the configured speed and loop count
    pub fn start_playback_with_defaults(&mut self) -> Result<()> {
        let settings = self.config.playback.clone();
        self.start_playback(settings.speed, settings.loops)
    }

    /// Pause playback
    pub fn pause(&self) {
        self.playback_control.pause();
    }

    /// Resume playback
    pub fn resume(&self) {
        self.playback_control.resume();
    }

    /// Toggle between paused and playing
    pub fn toggle_pause(&self) {
        match self.playback_control.state() {
            PlaybackState::Playing => self.playback_control.pause(),
            PlaybackState::Paused => self.playback_control.resume(),
            PlaybackState::Idle => {}
        }
    }

    /// Stop playback and wait for the worker to exit
    pub fn stop_playback(&mut self) -> Option<PlaybackReport> {
        self.playback_control.stop();
        self.join_playback()
    }

    /// Block until playback ends on its own
    pub fn wait_for_playback(&mut self) -> Option<PlaybackReport> {
        self.join_playback()
    }

    /// Check if playback is active (playing or paused)
    pub fn is_playing(&self) -> bool {
        self.playback_control.is_active()
    }

    /// Current playback state
    pub fn playback_state(&self) -> PlaybackState {
        self.playback_control.state()
    }

    fn join_playback(&mut self) -> Option<PlaybackReport> {
        let worker = self.playback_worker.take()?;
        match worker.join() {
            Ok(report) => {
                let _ = self
                    .sender
                    .send(SessionMessage::PlaybackFinished(report.clone()));
                Some(report)
            }
            Err(_) => {
                tracing::error!("Playback worker panicked");
                let _ = self.sender.send(SessionMessage::PlaybackFailed(
                    "playback worker panicked".to_string(),
                ));
                None
            }
        }
    }

    // ==================== Files ====================

    /// Save the current log
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if self.log.is_empty() {
            return Err(MacroError::NoMacroLoaded);
        }
        persistence::save(&self.log, path)
    }

    /// Load a log, replacing the current one only on success
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<CaptureStats> {
        self.reap();
        self.ensure_idle()?;

        let log = persistence::load(path)?;
        let stats = log.stats();
        self.log = Arc::new(log);
        Ok(stats)
    }

    /// Export the current log as a standalone replay script
    pub fn compile(&self, path: impl AsRef<Path>) -> Result<()> {
        if self.log.is_empty() {
            return Err(MacroError::NoMacroLoaded);
        }
        persistence::compile_to_script(&self.log, path)
    }

    // ==================== Messages ====================

    /// Reap finished workers and drain pending messages
    pub fn poll(&mut self) -> Vec<SessionMessage> {
        self.reap();

        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    fn reap(&mut self) {
        if self
            .capture_worker
            .as_ref()
            .is_some_and(|worker| worker.is_finished())
        {
            let _ = self.join_capture();
        }
        if self
            .playback_worker
            .as_ref()
            .is_some_and(|worker| worker.is_finished())
        {
            let _ = self.join_playback();
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.capture_worker.is_some() {
            return Err(MacroError::SessionBusy("capture in progress".to_string()));
        }
        if self.playback_worker.is_some() || self.playback_control.is_active() {
            return Err(MacroError::SessionBusy("playback in progress".to_string()));
        }
        Ok(())
    }
}

impl Drop for MacroSession {
    fn drop(&mut self) {
        self.capture_handle.stop();
        self.playback_control.stop();
        let _ = self.join_capture();
        let _ = self.join_playback();
    }
}
