//! Playback engine
//!
//! Replays an [`EventLog`] against an [`InputBackend`], reproducing the
//! recorded timing scaled by a speed multiplier, for a number of loops.
//!
//! # Timing model
//!
//! Each loop has its own [`LoopClock`]. Event `i` is due when the loop's
//! elapsed time reaches `time_i / speed`. Time spent paused is excluded from
//! the elapsed time, so resuming continues the original schedule instead of
//! firing the backlog at once. Because targets are absolute, a slow dispatch
//! or progress callback does not accumulate drift.
//!
//! # Control
//!
//! [`PlaybackControl`] is a cloneable handle that can pause, resume and stop
//! from any thread. Every wait inside the loop is a condition-variable wait
//! bounded by the poll interval, so stop and pause take effect within one
//! interval at worst, and usually immediately.
//!
//! # Failure containment
//!
//! A failed dispatch (unknown key, backend error) is logged, counted in the
//! [`PlaybackReport`] and skipped. It never aborts the run.

use crate::backend::InputBackend;
use crate::config::PlaybackSettings;
use crate::error::{MacroError, Result};
use crate::types::{EventLog, InputAction, InputEvent};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Delay inserted between consecutive loops
pub const DEFAULT_LOOP_SETTLE: Duration = Duration::from_millis(100);

/// Upper bound on a single uninterrupted wait
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for one playback run
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOptions {
    /// Speed multiplier (> 1 faster, < 1 slower)
    pub speed: f64,
    /// Number of times to play the log (>= 1)
    pub loops: u32,
    /// Pause between loops
    pub loop_settle: Duration,
    /// Maximum time between stop/pause checks
    pub poll_interval: Duration,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loops: 1,
            loop_settle: DEFAULT_LOOP_SETTLE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PlaybackOptions {
    /// Options with the given speed and loop count
    pub fn new(speed: f64, loops: u32) -> Self {
        Self {
            speed,
            loops,
            ..Self::default()
        }
    }

    /// Reject options that cannot be played
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(MacroError::InvalidConfiguration(format!(
                "speed must be a positive number, got {}",
                self.speed
            )));
        }
        if self.loops == 0 {
            return Err(MacroError::InvalidConfiguration(
                "loop count must be at least 1".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(MacroError::InvalidConfiguration(
                "poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&PlaybackSettings> for PlaybackOptions {
    fn from(settings: &PlaybackSettings) -> Self {
        Self {
            speed: settings.speed,
            loops: settings.loops,
            loop_settle: settings.loop_settle(),
            poll_interval: settings.poll_interval(),
        }
    }
}

/// Observable state of the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Progress notification, sent after each dispatched event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackProgress {
    /// Fraction of the current loop completed, in (0, 1]
    pub fraction: f64,
    /// 1-based index of the current loop
    pub current_loop: u32,
    /// Total loops requested
    pub total_loops: u32,
}

/// How a playback run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Stopped,
}

/// Summary of a playback run
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub outcome: PlaybackOutcome,
    /// Events successfully injected
    pub events_dispatched: usize,
    /// Events whose injection failed
    pub dispatch_failures: usize,
    /// Key events skipped because the key could not be resolved
    pub unknown_keys: usize,
    /// Loops played to the end
    pub loops_completed: u32,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl PlaybackReport {
    fn new(outcome: PlaybackOutcome) -> Self {
        Self {
            outcome,
            events_dispatched: 0,
            dispatch_failures: 0,
            unknown_keys: 0,
            loops_completed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Events that were skipped for any reason
    pub fn events_skipped(&self) -> usize {
        self.dispatch_failures + self.unknown_keys
    }
}

/// Elapsed-time accounting for one loop, excluding paused time
#[derive(Debug, Clone)]
pub struct LoopClock {
    origin: Instant,
    paused_total: Duration,
    paused_at: Option<Instant>,
}

impl LoopClock {
    /// Start a clock at `now`
    pub fn start_at(now: Instant) -> Self {
        Self {
            origin: now,
            paused_total: Duration::ZERO,
            paused_at: None,
        }
    }

    /// Mark the start of a pause. Repeated calls keep the first instant.
    pub fn pause_at(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Mark the end of a pause
    pub fn resume_at(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    /// Active (non-paused) time since the origin
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(self.origin)
            .saturating_sub(self.paused_total)
    }
}

#[derive(Debug)]
struct ControlState {
    state: PlaybackState,
    /// Incremented by every begin and stop; a run exits when it changes
    generation: u64,
}

#[derive(Debug)]
struct ControlInner {
    state: Mutex<ControlState>,
    changed: Condvar,
}

/// Cloneable handle controlling a [`PlaybackEngine`]
#[derive(Debug, Clone)]
pub struct PlaybackControl {
    inner: Arc<ControlInner>,
}

impl Default for PlaybackControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a wait ended early
enum Interrupted {
    Stopped,
}

impl PlaybackControl {
    /// Create an idle control
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ControlInner {
                state: Mutex::new(ControlState {
                    state: PlaybackState::Idle,
                    generation: 0,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.inner.state.lock().state
    }

    /// Check if a run is active (playing or paused)
    pub fn is_active(&self) -> bool {
        self.state() != PlaybackState::Idle
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        self.state() == PlaybackState::Paused
    }

    /// Pause a playing run
    pub fn pause(&self) {
        let mut guard = self.inner.state.lock();
        if guard.state == PlaybackState::Playing {
            guard.state = PlaybackState::Paused;
            self.inner.changed.notify_all();
            tracing::info!("Playback paused");
        }
    }

    /// Resume a paused run
    pub fn resume(&self) {
        let mut guard = self.inner.state.lock();
        if guard.state == PlaybackState::Paused {
            guard.state = PlaybackState::Playing;
            self.inner.changed.notify_all();
            tracing::info!("Playback resumed");
        }
    }

    /// Stop the active run. Idempotent; a no-op when idle.
    ///
    /// After this returns no further event is dispatched, apart from one
    /// that was already being injected.
    pub fn stop(&self) {
        let mut guard = self.inner.state.lock();
        if guard.state != PlaybackState::Idle {
            guard.state = PlaybackState::Idle;
            guard.generation += 1;
            self.inner.changed.notify_all();
            tracing::info!("Playback stopped");
        }
    }

    /// Transition Idle -> Playing, returning the run's generation
    fn begin(&self) -> Result<u64> {
        let mut guard = self.inner.state.lock();
        if guard.state != PlaybackState::Idle {
            return Err(MacroError::SessionBusy(
                "playback already in progress".to_string(),
            ));
        }
        guard.state = PlaybackState::Playing;
        guard.generation += 1;
        Ok(guard.generation)
    }

    /// Return to Idle if the run was not stopped meanwhile
    fn finish(&self, generation: u64) {
        let mut guard = self.inner.state.lock();
        if guard.generation == generation {
            guard.state = PlaybackState::Idle;
            self.inner.changed.notify_all();
        }
    }

    /// Wait until `clock` reaches `target`, honoring pause and stop
    fn wait_until(
        &self,
        generation: u64,
        clock: &mut LoopClock,
        target: Duration,
        poll_interval: Duration,
    ) -> std::result::Result<(), Interrupted> {
        let mut guard = self.inner.state.lock();
        loop {
            if guard.generation != generation {
                return Err(Interrupted::Stopped);
            }

            let now = Instant::now();
            if guard.state == PlaybackState::Paused {
                clock.pause_at(now);
                self.inner.changed.wait_for(&mut guard, poll_interval);
                continue;
            }
            clock.resume_at(now);

            let elapsed = clock.elapsed_at(now);
            if elapsed >= target {
                return Ok(());
            }
            let remaining = target - elapsed;
            self.inner
                .changed
                .wait_for(&mut guard, remaining.min(poll_interval));
        }
    }
}

/// Replays event logs through an input backend
pub struct PlaybackEngine {
    backend: Arc<dyn InputBackend>,
    control: PlaybackControl,
}

impl PlaybackEngine {
    /// Create a playback engine for the given backend
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self {
            backend,
            control: PlaybackControl::new(),
        }
    }

    /// Get a handle for pausing, resuming and stopping from another thread
    pub fn control(&self) -> PlaybackControl {
        self.control.clone()
    }

    /// Play a log, blocking until it finishes or is stopped
    ///
    /// `on_progress` runs on the calling thread after every dispatched
    /// event. It should hand the value off (e.g. into a channel) rather than
    /// do slow work. An empty log returns immediately without calling it.
    pub fn play<F>(
        &self,
        log: &EventLog,
        options: &PlaybackOptions,
        mut on_progress: F,
    ) -> Result<PlaybackReport>
    where
        F: FnMut(PlaybackProgress),
    {
        options.validate()?;
        if log.is_empty() {
            return Ok(PlaybackReport::new(PlaybackOutcome::Completed));
        }

        let generation = self.control.begin()?;
        let report = self.run(generation, log, options, &mut on_progress);
        self.control.finish(generation);
        Ok(report)
    }

    /// Validate, enter the Playing state and run the log on a new thread
    ///
    /// The state transition happens before this returns, so a stop issued
    /// right after spawning is never lost.
    pub fn spawn<F>(
        self: Arc<Self>,
        log: Arc<EventLog>,
        options: PlaybackOptions,
        mut on_progress: F,
    ) -> Result<JoinHandle<PlaybackReport>>
    where
        F: FnMut(PlaybackProgress) + Send + 'static,
    {
        options.validate()?;
        let generation = self.control.begin()?;

        let spawned = std::thread::Builder::new()
            .name("macro-playback".to_string())
            .spawn({
                let engine = Arc::clone(&self);
                move || {
                    let report = if log.is_empty() {
                        PlaybackReport::new(PlaybackOutcome::Completed)
                    } else {
                        engine.run(generation, &log, &options, &mut on_progress)
                    };
                    engine.control.finish(generation);
                    report
                }
            });

        spawned.map_err(|e| {
            self.control.finish(generation);
            MacroError::Io(e)
        })
    }

    fn run(
        &self,
        generation: u64,
        log: &EventLog,
        options: &PlaybackOptions,
        on_progress: &mut dyn FnMut(PlaybackProgress),
    ) -> PlaybackReport {
        let started = Instant::now();
        let mut report = PlaybackReport::new(PlaybackOutcome::Completed);
        let total = log.len();

        tracing::info!(
            "Playback started: {} events, speed {}x, {} loop(s)",
            total,
            options.speed,
            options.loops
        );

        'loops: for loop_index in 0..options.loops {
            if loop_index > 0 {
                let mut settle = LoopClock::start_at(Instant::now());
                if self
                    .control
                    .wait_until(generation, &mut settle, options.loop_settle, options.poll_interval)
                    .is_err()
                {
                    report.outcome = PlaybackOutcome::Stopped;
                    break 'loops;
                }
            }

            let mut clock = LoopClock::start_at(Instant::now());
            for (index, event) in log.iter().enumerate() {
                let target = scaled_target(event.time, options.speed);
                if self
                    .control
                    .wait_until(generation, &mut clock, target, options.poll_interval)
                    .is_err()
                {
                    report.outcome = PlaybackOutcome::Stopped;
                    break 'loops;
                }

                match self.dispatch(event) {
                    Ok(()) => report.events_dispatched += 1,
                    Err(MacroError::KeySymbolUnknown(key)) => {
                        tracing::warn!("Skipping event {}: unknown key symbol {:?}", index, key);
                        report.unknown_keys += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Skipping event {} ({}): {}", index, event.kind(), e);
                        report.dispatch_failures += 1;
                    }
                }

                on_progress(PlaybackProgress {
                    fraction: (index + 1) as f64 / total as f64,
                    current_loop: loop_index + 1,
                    total_loops: options.loops,
                });
            }
            report.loops_completed += 1;
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            "Playback {:?} after {:.2}s: {} dispatched, {} skipped",
            report.outcome,
            report.elapsed.as_secs_f64(),
            report.events_dispatched,
            report.events_skipped()
        );
        report
    }

    fn dispatch(&self, event: &InputEvent) -> Result<()> {
        tracing::trace!("Dispatching {} at {:.3}s", event.kind(), event.time);
        match &event.action {
            InputAction::PointerMove { x, y } => self.backend.inject_pointer_move(*x, *y),
            InputAction::PointerButton {
                button, pressed, ..
            } => self.backend.inject_pointer_button(*button, *pressed),
            InputAction::Scroll { dx, dy, .. } => self.backend.inject_scroll(*dx, *dy),
            InputAction::KeyDown { key } => self.backend.inject_key(key, true),
            InputAction::KeyUp { key } => self.backend.inject_key(key, false),
        }
    }
}

/// Wall-clock offset at which an event recorded at `time` is due
fn scaled_target(time: f64, speed: f64) -> Duration {
    Duration::try_from_secs_f64((time / speed).max(0.0)).unwrap_or(Duration::MAX)
}
