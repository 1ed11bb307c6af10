//! Core data types for macrotape
//!
//! This module contains the event model shared by capture, playback and
//! persistence:
//!
//! - [`InputEvent`] - One timestamped input action
//! - [`InputAction`] - The five kinds of input with their payloads
//! - [`EventLog`] - An immutable, time-ordered sequence of events
//! - [`CaptureStats`] - Summary counts over a log
//!
//! Timestamps are seconds since the capture epoch as `f64`. They are
//! finite, non-negative and non-decreasing across a log.

use crate::error::{MacroError, Result};
use crate::keys::KeySymbol;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mouse button identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[serde(alias = "Button.left")]
    Left,
    #[serde(alias = "Button.right")]
    Right,
    #[serde(alias = "Button.middle")]
    Middle,
    /// Back / first extra button
    #[serde(alias = "Button.x1", alias = "Button.button8")]
    X1,
    /// Forward / second extra button
    #[serde(alias = "Button.x2", alias = "Button.button9")]
    X2,
}

/// Kind tag of an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    PointerButton,
    Scroll,
    KeyDown,
    KeyUp,
}

impl EventKind {
    /// Tag used in the persisted format
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::PointerMove => "mouse_move",
            EventKind::PointerButton => "mouse_click",
            EventKind::Scroll => "mouse_scroll",
            EventKind::KeyDown => "key_press",
            EventKind::KeyUp => "key_release",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single input action with its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputAction {
    /// Absolute pointer position
    #[serde(rename = "mouse_move")]
    PointerMove { x: i32, y: i32 },
    /// Button press or release at a position
    #[serde(rename = "mouse_click")]
    PointerButton {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    /// Scroll delta at a position
    #[serde(rename = "mouse_scroll")]
    Scroll { x: i32, y: i32, dx: f64, dy: f64 },
    /// Key pressed
    #[serde(rename = "key_press")]
    KeyDown { key: KeySymbol },
    /// Key released
    #[serde(rename = "key_release")]
    KeyUp { key: KeySymbol },
}

impl InputAction {
    /// Kind tag of this action
    pub fn kind(&self) -> EventKind {
        match self {
            InputAction::PointerMove { .. } => EventKind::PointerMove,
            InputAction::PointerButton { .. } => EventKind::PointerButton,
            InputAction::Scroll { .. } => EventKind::Scroll,
            InputAction::KeyDown { .. } => EventKind::KeyDown,
            InputAction::KeyUp { .. } => EventKind::KeyUp,
        }
    }
}

/// A timestamped input event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// What happened
    #[serde(flatten)]
    pub action: InputAction,
    /// Seconds since the capture epoch
    pub time: f64,
}

impl InputEvent {
    /// Create a new event
    pub fn new(time: f64, action: InputAction) -> Self {
        Self { action, time }
    }

    /// Kind tag of this event
    pub fn kind(&self) -> EventKind {
        self.action.kind()
    }
}

/// An immutable, time-ordered sequence of input events
///
/// Insertion order is temporal order is replay order. A log is only ever
/// replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<InputEvent>,
}

impl EventLog {
    /// Create a log, validating the timestamp invariants
    pub fn new(events: Vec<InputEvent>) -> Result<Self> {
        let mut previous = 0.0_f64;
        for (index, event) in events.iter().enumerate() {
            if !event.time.is_finite() || event.time < 0.0 {
                return Err(MacroError::MalformedLog(format!(
                    "event {} has invalid timestamp {}",
                    index, event.time
                )));
            }
            if index > 0 && event.time < previous {
                return Err(MacroError::MalformedLog(format!(
                    "event {} has timestamp {} earlier than previous {}",
                    index, event.time, previous
                )));
            }
            previous = event.time;
        }
        Ok(Self { events })
    }

    /// Create an empty log
    pub fn empty() -> Self {
        Self::default()
    }

    /// All events in replay order
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Iterate over events in replay order
    pub fn iter(&self) -> std::slice::Iter<'_, InputEvent> {
        self.events.iter()
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the last event in seconds
    pub fn duration(&self) -> f64 {
        self.events.last().map(|e| e.time).unwrap_or(0.0)
    }

    /// Summary counts over the log
    pub fn stats(&self) -> CaptureStats {
        let count = |kind: EventKind| self.events.iter().filter(|e| e.kind() == kind).count();

        CaptureStats {
            total_events: self.events.len(),
            duration: self.duration(),
            click_count: count(EventKind::PointerButton),
            move_count: count(EventKind::PointerMove),
            key_press_count: count(EventKind::KeyDown),
        }
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a InputEvent;
    type IntoIter = std::slice::Iter<'a, InputEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Summary statistics for a recorded macro
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureStats {
    /// Total number of events
    pub total_events: usize,
    /// Timestamp of the last event in seconds
    pub duration: f64,
    /// Button presses and releases
    pub click_count: usize,
    /// Recorded pointer moves
    pub move_count: usize,
    /// Key presses (releases are not counted)
    pub key_press_count: usize,
}

impl fmt::Display for CaptureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events over {:.2}s ({} clicks, {} moves, {} key presses)",
            self.total_events, self.duration, self.click_count, self.move_count, self.key_press_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::NamedKey;
    use proptest::prelude::*;

    fn sample_events() -> Vec<InputEvent> {
        vec![
            InputEvent::new(0.1, InputAction::PointerMove { x: 10, y: 20 }),
            InputEvent::new(
                0.2,
                InputAction::PointerButton {
                    x: 10,
                    y: 20,
                    button: MouseButton::Left,
                    pressed: true,
                },
            ),
            InputEvent::new(
                0.25,
                InputAction::PointerButton {
                    x: 10,
                    y: 20,
                    button: MouseButton::Left,
                    pressed: false,
                },
            ),
            InputEvent::new(0.3, InputAction::KeyDown { key: KeySymbol::Char('a') }),
            InputEvent::new(0.35, InputAction::KeyUp { key: KeySymbol::Char('a') }),
        ]
    }

    #[test]
    fn test_event_log_stats() {
        let log = EventLog::new(sample_events()).unwrap();
        let stats = log.stats();

        assert_eq!(stats.total_events, 5);
        assert_eq!(stats.click_count, 2);
        assert_eq!(stats.move_count, 1);
        assert_eq!(stats.key_press_count, 1);
        assert!((stats.duration - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_log() {
        let log = EventLog::empty();
        assert!(log.is_empty());
        assert_eq!(log.duration(), 0.0);
        assert_eq!(log.stats(), CaptureStats::default());
    }

    #[test]
    fn test_first_timestamp_need_not_be_zero() {
        let log = EventLog::new(vec![InputEvent::new(
            2.5,
            InputAction::PointerMove { x: 0, y: 0 },
        )]);
        assert!(log.is_ok());
    }

    #[test]
    fn test_rejects_decreasing_timestamps() {
        let mut events = sample_events();
        events[3].time = 0.05;
        let err = EventLog::new(events).unwrap_err();
        assert!(matches!(err, MacroError::MalformedLog(_)));
        assert!(err.to_string().contains("event 3"));
    }

    #[test]
    fn test_rejects_non_finite_timestamps() {
        let events = vec![InputEvent::new(f64::NAN, InputAction::PointerMove { x: 0, y: 0 })];
        assert!(EventLog::new(events).is_err());

        let events = vec![InputEvent::new(-1.0, InputAction::PointerMove { x: 0, y: 0 })];
        assert!(EventLog::new(events).is_err());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = InputEvent::new(
            1.5,
            InputAction::KeyDown {
                key: KeySymbol::Named(NamedKey::Enter),
            },
        );
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "key_press");
        assert_eq!(value["data"]["key"], "Key.enter");
        assert_eq!(value["time"], 1.5);
    }

    #[test]
    fn test_legacy_button_names() {
        let button: MouseButton = serde_json::from_str("\"Button.right\"").unwrap();
        assert_eq!(button, MouseButton::Right);

        let button: MouseButton = serde_json::from_str("\"middle\"").unwrap();
        assert_eq!(button, MouseButton::Middle);
    }

    proptest! {
        #[test]
        fn test_log_accepts_exactly_non_decreasing_times(
            times in prop::collection::vec(0.0f64..100.0, 0..50)
        ) {
            let events: Vec<InputEvent> = times
                .iter()
                .map(|&t| InputEvent::new(t, InputAction::PointerMove { x: 0, y: 0 }))
                .collect();
            let sorted = times.windows(2).all(|w| w[0] <= w[1]);
            prop_assert_eq!(EventLog::new(events).is_ok(), sorted);
        }
    }
}
