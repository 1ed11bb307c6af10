//! Native input backend built on `rdev`
//!
//! `rdev::listen` installs a process-wide hook that cannot be removed, so
//! the hook thread is started once on first subscription and fans events
//! out to whichever listeners are currently registered. Unsubscribing only
//! removes the listener from that fan-out.
//!
//! Button and wheel events from `rdev` carry no position, so the last
//! observed pointer position is attached to them.

use super::{InputBackend, InputListener, KeyInput, PointerInput, SubscriptionId};
use crate::error::{MacroError, Result};
use crate::keys::{KeySymbol, NamedKey};
use crate::types::MouseButton;
use parking_lot::Mutex;
use rdev::{Button, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Delay rdev recommends between simulated events on some platforms
const SIMULATE_SETTLE: std::time::Duration = std::time::Duration::from_millis(2);

#[derive(Default)]
struct HookShared {
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn InputListener>)>>,
    position: Mutex<(i32, i32)>,
}

impl HookShared {
    fn snapshot(&self) -> Vec<Arc<dyn InputListener>> {
        self.listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    fn dispatch(&self, event: Event) {
        match event.event_type {
            EventType::MouseMove { x, y } => {
                let (x, y) = (x.round() as i32, y.round() as i32);
                *self.position.lock() = (x, y);
                self.pointer(PointerInput::Moved { x, y });
            }
            EventType::ButtonPress(button) | EventType::ButtonRelease(button) => {
                let Some(button) = from_rdev_button(button) else {
                    return;
                };
                let pressed = matches!(event.event_type, EventType::ButtonPress(_));
                let (x, y) = *self.position.lock();
                self.pointer(PointerInput::Button {
                    x,
                    y,
                    button,
                    pressed,
                });
            }
            EventType::Wheel { delta_x, delta_y } => {
                let (x, y) = *self.position.lock();
                self.pointer(PointerInput::Scrolled {
                    x,
                    y,
                    dx: delta_x as f64,
                    dy: delta_y as f64,
                });
            }
            EventType::KeyPress(key) | EventType::KeyRelease(key) => {
                let pressed = matches!(event.event_type, EventType::KeyPress(_));
                let input = KeyInput {
                    key: key_symbol_for(key),
                    pressed,
                };
                for listener in self.snapshot() {
                    listener.on_key(input.clone());
                }
            }
        }
    }

    fn pointer(&self, input: PointerInput) {
        for listener in self.snapshot() {
            listener.on_pointer(input);
        }
    }
}

/// Input backend using the `rdev` global hook and `rdev::simulate`
pub struct RdevBackend {
    shared: Arc<HookShared>,
    hook_started: AtomicBool,
    next_id: AtomicU64,
}

impl Default for RdevBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RdevBackend {
    /// Create the backend. The hook is installed lazily.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(HookShared::default()),
            hook_started: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    fn ensure_hook(&self) -> Result<()> {
        if self.hook_started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("rdev-hook".to_string())
            .spawn(move || {
                let hook_shared = Arc::clone(&shared);
                if let Err(e) = rdev::listen(move |event| hook_shared.dispatch(event)) {
                    let message = format!("input hook failed: {:?}", e);
                    tracing::error!("{}", message);
                    for listener in shared.snapshot() {
                        listener.on_backend_error(&message);
                    }
                }
            });

        if let Err(e) = spawned {
            self.hook_started.store(false, Ordering::SeqCst);
            return Err(MacroError::BackendUnavailable(format!(
                "failed to start input hook thread: {}",
                e
            )));
        }
        Ok(())
    }

    fn simulate(&self, kind: &str, event: &EventType) -> Result<()> {
        rdev::simulate(event)
            .map_err(|e| MacroError::dispatch(kind, format!("{:?}", e)))?;
        std::thread::sleep(SIMULATE_SETTLE);
        Ok(())
    }
}

impl InputBackend for RdevBackend {
    fn probe_capability(&self) -> bool {
        rdev::display_size().is_ok()
    }

    fn subscribe(&self, listener: Arc<dyn InputListener>) -> Result<SubscriptionId> {
        if !self.probe_capability() {
            return Err(MacroError::BackendUnavailable(
                "no display available for the input hook".to_string(),
            ));
        }
        self.ensure_hook()?;

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.shared.listeners.lock().push((id, listener));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.shared
            .listeners
            .lock()
            .retain(|(existing, _)| *existing != id);
    }

    fn inject_pointer_move(&self, x: i32, y: i32) -> Result<()> {
        self.simulate(
            "mouse_move",
            &EventType::MouseMove {
                x: x as f64,
                y: y as f64,
            },
        )
    }

    fn inject_pointer_button(&self, button: MouseButton, pressed: bool) -> Result<()> {
        let button = to_rdev_button(button);
        let event = if pressed {
            EventType::ButtonPress(button)
        } else {
            EventType::ButtonRelease(button)
        };
        self.simulate("mouse_click", &event)
    }

    fn inject_scroll(&self, dx: f64, dy: f64) -> Result<()> {
        self.simulate(
            "mouse_scroll",
            &EventType::Wheel {
                delta_x: dx.round() as i64,
                delta_y: dy.round() as i64,
            },
        )
    }

    fn inject_key(&self, key: &KeySymbol, pressed: bool) -> Result<()> {
        let resolved = resolve_key(key).ok_or_else(|| MacroError::KeySymbolUnknown(key.to_string()))?;
        let event = if pressed {
            EventType::KeyPress(resolved)
        } else {
            EventType::KeyRelease(resolved)
        };
        self.simulate(if pressed { "key_press" } else { "key_release" }, &event)
    }

    fn name(&self) -> &'static str {
        "rdev"
    }
}

fn from_rdev_button(button: Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        Button::Unknown(8) => Some(MouseButton::X1),
        Button::Unknown(9) => Some(MouseButton::X2),
        Button::Unknown(_) => None,
    }
}

fn to_rdev_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
        MouseButton::X1 => Button::Unknown(8),
        MouseButton::X2 => Button::Unknown(9),
    }
}

// The symbol comes from the physical key only. rdev reports layout text
// for presses but not for releases, so using it would split a pair.
fn key_symbol_for(key: Key) -> KeySymbol {
    if let Some(named) = named_from_rdev(key) {
        return KeySymbol::Named(named);
    }
    if let Some(c) = char_from_rdev(key) {
        return KeySymbol::Char(c);
    }
    if let Some(symbol) = keypad_from_rdev(key) {
        return symbol;
    }
    match key {
        Key::Unknown(code) => KeySymbol::Unknown(format!("<{}>", code)),
        other => KeySymbol::Unknown(format!("{:?}", other)),
    }
}

fn resolve_key(symbol: &KeySymbol) -> Option<Key> {
    match symbol {
        KeySymbol::Named(named) => named_to_rdev(*named),
        KeySymbol::Char(c) => char_to_rdev(*c),
        KeySymbol::Unknown(raw) => raw
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .and_then(|code| code.parse().ok())
            .map(Key::Unknown),
    }
}

const NAMED_KEYS: &[(Key, NamedKey)] = &[
    (Key::Alt, NamedKey::Alt),
    (Key::AltGr, NamedKey::AltGr),
    (Key::Backspace, NamedKey::Backspace),
    (Key::CapsLock, NamedKey::CapsLock),
    (Key::ControlLeft, NamedKey::CtrlL),
    (Key::ControlRight, NamedKey::CtrlR),
    (Key::Delete, NamedKey::Delete),
    (Key::DownArrow, NamedKey::Down),
    (Key::End, NamedKey::End),
    (Key::Escape, NamedKey::Esc),
    (Key::F1, NamedKey::F1),
    (Key::F2, NamedKey::F2),
    (Key::F3, NamedKey::F3),
    (Key::F4, NamedKey::F4),
    (Key::F5, NamedKey::F5),
    (Key::F6, NamedKey::F6),
    (Key::F7, NamedKey::F7),
    (Key::F8, NamedKey::F8),
    (Key::F9, NamedKey::F9),
    (Key::F10, NamedKey::F10),
    (Key::F11, NamedKey::F11),
    (Key::F12, NamedKey::F12),
    (Key::Home, NamedKey::Home),
    (Key::LeftArrow, NamedKey::Left),
    (Key::MetaLeft, NamedKey::CmdL),
    (Key::MetaRight, NamedKey::CmdR),
    (Key::PageDown, NamedKey::PageDown),
    (Key::PageUp, NamedKey::PageUp),
    (Key::Return, NamedKey::Enter),
    (Key::RightArrow, NamedKey::Right),
    (Key::ShiftLeft, NamedKey::ShiftL),
    (Key::ShiftRight, NamedKey::ShiftR),
    (Key::Space, NamedKey::Space),
    (Key::Tab, NamedKey::Tab),
    (Key::UpArrow, NamedKey::Up),
    (Key::PrintScreen, NamedKey::PrintScreen),
    (Key::ScrollLock, NamedKey::ScrollLock),
    (Key::Pause, NamedKey::Pause),
    (Key::NumLock, NamedKey::NumLock),
    (Key::Insert, NamedKey::Insert),
];

fn named_from_rdev(key: Key) -> Option<NamedKey> {
    NAMED_KEYS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, named)| *named)
}

/// Keypad keys recorded as the symbol they type. `+` and `*` have no
/// unshifted main-row key, so they replay through the keypad.
const KEYPAD_KEYS: &[(Key, KeySymbol)] = &[
    (Key::KpReturn, KeySymbol::Named(NamedKey::Enter)),
    (Key::KpDelete, KeySymbol::Named(NamedKey::Delete)),
    (Key::KpMinus, KeySymbol::Char('-')),
    (Key::KpPlus, KeySymbol::Char('+')),
    (Key::KpMultiply, KeySymbol::Char('*')),
    (Key::KpDivide, KeySymbol::Char('/')),
    (Key::Kp0, KeySymbol::Char('0')),
    (Key::Kp1, KeySymbol::Char('1')),
    (Key::Kp2, KeySymbol::Char('2')),
    (Key::Kp3, KeySymbol::Char('3')),
    (Key::Kp4, KeySymbol::Char('4')),
    (Key::Kp5, KeySymbol::Char('5')),
    (Key::Kp6, KeySymbol::Char('6')),
    (Key::Kp7, KeySymbol::Char('7')),
    (Key::Kp8, KeySymbol::Char('8')),
    (Key::Kp9, KeySymbol::Char('9')),
];

fn keypad_from_rdev(key: Key) -> Option<KeySymbol> {
    KEYPAD_KEYS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, symbol)| symbol.clone())
}

fn named_to_rdev(key: NamedKey) -> Option<Key> {
    Some(match key {
        NamedKey::Alt | NamedKey::AltL => Key::Alt,
        NamedKey::AltR | NamedKey::AltGr => Key::AltGr,
        NamedKey::Backspace => Key::Backspace,
        NamedKey::CapsLock => Key::CapsLock,
        NamedKey::Cmd | NamedKey::CmdL => Key::MetaLeft,
        NamedKey::CmdR => Key::MetaRight,
        NamedKey::Ctrl | NamedKey::CtrlL => Key::ControlLeft,
        NamedKey::CtrlR => Key::ControlRight,
        NamedKey::Delete => Key::Delete,
        NamedKey::Down => Key::DownArrow,
        NamedKey::End => Key::End,
        NamedKey::Enter => Key::Return,
        NamedKey::Esc => Key::Escape,
        NamedKey::F1 => Key::F1,
        NamedKey::F2 => Key::F2,
        NamedKey::F3 => Key::F3,
        NamedKey::F4 => Key::F4,
        NamedKey::F5 => Key::F5,
        NamedKey::F6 => Key::F6,
        NamedKey::F7 => Key::F7,
        NamedKey::F8 => Key::F8,
        NamedKey::F9 => Key::F9,
        NamedKey::F10 => Key::F10,
        NamedKey::F11 => Key::F11,
        NamedKey::F12 => Key::F12,
        NamedKey::Home => Key::Home,
        NamedKey::Left => Key::LeftArrow,
        NamedKey::PageDown => Key::PageDown,
        NamedKey::PageUp => Key::PageUp,
        NamedKey::Right => Key::RightArrow,
        NamedKey::Shift | NamedKey::ShiftL => Key::ShiftLeft,
        NamedKey::ShiftR => Key::ShiftRight,
        NamedKey::Space => Key::Space,
        NamedKey::Tab => Key::Tab,
        NamedKey::Up => Key::UpArrow,
        NamedKey::Insert => Key::Insert,
        NamedKey::NumLock => Key::NumLock,
        NamedKey::Pause => Key::Pause,
        NamedKey::PrintScreen => Key::PrintScreen,
        NamedKey::ScrollLock => Key::ScrollLock,
        _ => return None,
    })
}

const CHAR_KEYS: &[(char, Key)] = &[
    ('a', Key::KeyA),
    ('b', Key::KeyB),
    ('c', Key::KeyC),
    ('d', Key::KeyD),
    ('e', Key::KeyE),
    ('f', Key::KeyF),
    ('g', Key::KeyG),
    ('h', Key::KeyH),
    ('i', Key::KeyI),
    ('j', Key::KeyJ),
    ('k', Key::KeyK),
    ('l', Key::KeyL),
    ('m', Key::KeyM),
    ('n', Key::KeyN),
    ('o', Key::KeyO),
    ('p', Key::KeyP),
    ('q', Key::KeyQ),
    ('r', Key::KeyR),
    ('s', Key::KeyS),
    ('t', Key::KeyT),
    ('u', Key::KeyU),
    ('v', Key::KeyV),
    ('w', Key::KeyW),
    ('x', Key::KeyX),
    ('y', Key::KeyY),
    ('z', Key::KeyZ),
    ('0', Key::Num0),
    ('1', Key::Num1),
    ('2', Key::Num2),
    ('3', Key::Num3),
    ('4', Key::Num4),
    ('5', Key::Num5),
    ('6', Key::Num6),
    ('7', Key::Num7),
    ('8', Key::Num8),
    ('9', Key::Num9),
    ('`', Key::BackQuote),
    ('-', Key::Minus),
    ('=', Key::Equal),
    ('[', Key::LeftBracket),
    (']', Key::RightBracket),
    (';', Key::SemiColon),
    ('\'', Key::Quote),
    ('\\', Key::BackSlash),
    (',', Key::Comma),
    ('.', Key::Dot),
    ('/', Key::Slash),
    (' ', Key::Space),
];

fn char_to_rdev(c: char) -> Option<Key> {
    match c {
        '+' => return Some(Key::KpPlus),
        '*' => return Some(Key::KpMultiply),
        _ => {}
    }
    // Uppercase letters from older files replay through the same key; the
    // shift press/release is its own event.
    let c = c.to_ascii_lowercase();
    CHAR_KEYS
        .iter()
        .find(|(candidate, _)| *candidate == c)
        .map(|(_, key)| *key)
}

fn char_from_rdev(key: Key) -> Option<char> {
    CHAR_KEYS
        .iter()
        .find(|(_, candidate)| *candidate == key)
        .map(|(c, _)| *c)
}
