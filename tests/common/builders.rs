//! Test data builders for creating event logs

use macrotape::{EventLog, InputAction, InputEvent, KeySymbol, MouseButton};

/// Builder for creating test event logs
///
/// Each event is placed `step` seconds after the previous one unless an
/// explicit time is given with [`LogBuilder::at`].
pub struct LogBuilder {
    events: Vec<InputEvent>,
    next_time: f64,
    step: f64,
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBuilder {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_time: 0.0,
            step: 0.0,
        }
    }

    /// Spacing between consecutive events
    pub fn step(mut self, seconds: f64) -> Self {
        self.step = seconds;
        self
    }

    /// Time of the next event
    pub fn at(mut self, seconds: f64) -> Self {
        self.next_time = seconds;
        self
    }

    pub fn move_to(self, x: i32, y: i32) -> Self {
        self.push(InputAction::PointerMove { x, y })
    }

    pub fn click(self, x: i32, y: i32, button: MouseButton) -> Self {
        self.push(InputAction::PointerButton {
            x,
            y,
            button,
            pressed: true,
        })
        .push(InputAction::PointerButton {
            x,
            y,
            button,
            pressed: false,
        })
    }

    pub fn scroll(self, dx: f64, dy: f64) -> Self {
        self.push(InputAction::Scroll { x: 0, y: 0, dx, dy })
    }

    pub fn key_down(self, key: impl Into<KeySymbol>) -> Self {
        self.push(InputAction::KeyDown { key: key.into() })
    }

    pub fn key_up(self, key: impl Into<KeySymbol>) -> Self {
        self.push(InputAction::KeyUp { key: key.into() })
    }

    /// Press and release a key
    pub fn tap(self, key: impl Into<KeySymbol> + Clone) -> Self {
        self.key_down(key.clone()).key_up(key)
    }

    fn push(mut self, action: InputAction) -> Self {
        self.events.push(InputEvent::new(self.next_time, action));
        self.next_time += self.step;
        self
    }

    pub fn build(self) -> EventLog {
        EventLog::new(self.events).expect("builder produced an invalid log")
    }
}

/// `count` pointer moves spaced `step` seconds apart, starting at zero
pub fn moves(count: usize, step: f64) -> EventLog {
    (0..count)
        .fold(LogBuilder::new().step(step), |b, i| b.move_to(i as i32 * 10, 0))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_builder() {
        let log = LogBuilder::new()
            .step(0.5)
            .move_to(1, 2)
            .click(1, 2, MouseButton::Left)
            .build();

        assert_eq!(log.len(), 3);
        assert_eq!(log.duration(), 1.0);
    }
}
