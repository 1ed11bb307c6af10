//! Key symbols
//!
//! Keys are stored symbolically so a macro stays readable and portable:
//!
//! - Named special keys serialize as `Key.<name>` (`Key.enter`, `Key.f9`)
//! - Printable keys serialize as the literal character (`a`, `;`)
//! - Anything else is kept verbatim as [`KeySymbol::Unknown`]
//!
//! Parsing is total and never fails. Resolution to a concrete backend key
//! happens in the backend, which reports unresolvable symbols as
//! [`crate::MacroError::KeySymbolUnknown`] instead of aborting playback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix used for named special keys
pub const NAMED_KEY_PREFIX: &str = "Key.";

macro_rules! named_keys {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Closed set of special keys with a symbolic name
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NamedKey {
            $($variant),*
        }

        impl NamedKey {
            /// Every named key, in declaration order
            pub const ALL: &'static [NamedKey] = &[$(NamedKey::$variant),*];

            /// Symbolic name (without the `Key.` prefix)
            pub fn name(self) -> &'static str {
                match self {
                    $(NamedKey::$variant => $name),*
                }
            }

            /// Look up a key by its symbolic name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(NamedKey::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

named_keys! {
    Alt => "alt",
    AltL => "alt_l",
    AltR => "alt_r",
    AltGr => "alt_gr",
    Backspace => "backspace",
    CapsLock => "caps_lock",
    Cmd => "cmd",
    CmdL => "cmd_l",
    CmdR => "cmd_r",
    Ctrl => "ctrl",
    CtrlL => "ctrl_l",
    CtrlR => "ctrl_r",
    Delete => "delete",
    Down => "down",
    End => "end",
    Enter => "enter",
    Esc => "esc",
    F1 => "f1",
    F2 => "f2",
    F3 => "f3",
    F4 => "f4",
    F5 => "f5",
    F6 => "f6",
    F7 => "f7",
    F8 => "f8",
    F9 => "f9",
    F10 => "f10",
    F11 => "f11",
    F12 => "f12",
    F13 => "f13",
    F14 => "f14",
    F15 => "f15",
    F16 => "f16",
    F17 => "f17",
    F18 => "f18",
    F19 => "f19",
    F20 => "f20",
    Home => "home",
    Left => "left",
    PageDown => "page_down",
    PageUp => "page_up",
    Right => "right",
    Shift => "shift",
    ShiftL => "shift_l",
    ShiftR => "shift_r",
    Space => "space",
    Tab => "tab",
    Up => "up",
    MediaPlayPause => "media_play_pause",
    MediaVolumeMute => "media_volume_mute",
    MediaVolumeDown => "media_volume_down",
    MediaVolumeUp => "media_volume_up",
    MediaPrevious => "media_previous",
    MediaNext => "media_next",
    Insert => "insert",
    Menu => "menu",
    NumLock => "num_lock",
    Pause => "pause",
    PrintScreen => "print_screen",
    ScrollLock => "scroll_lock",
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NAMED_KEY_PREFIX, self.name())
    }
}

/// Symbolic identity of a keyboard key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum KeySymbol {
    /// A special key from the closed [`NamedKey`] table
    Named(NamedKey),
    /// A single printable character
    Char(char),
    /// A symbol this build does not recognize, kept verbatim
    Unknown(String),
}

impl KeySymbol {
    /// Parse a stored key string. Never fails.
    pub fn parse(text: &str) -> Self {
        if let Some(name) = text.strip_prefix(NAMED_KEY_PREFIX) {
            return match NamedKey::from_name(name) {
                Some(key) => KeySymbol::Named(key),
                None => KeySymbol::Unknown(text.to_string()),
            };
        }

        let mut chars = text.chars();
        match (chars.next(), chars.next(), chars.next(), chars.next()) {
            (Some(c), None, _, _) => KeySymbol::Char(c),
            // Legacy quoted form: 'a'
            (Some('\''), Some(c), Some('\''), None) => KeySymbol::Char(c),
            _ => KeySymbol::Unknown(text.to_string()),
        }
    }

    /// Whether this symbol maps to a known key identity
    pub fn is_known(&self) -> bool {
        !matches!(self, KeySymbol::Unknown(_))
    }
}

impl fmt::Display for KeySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySymbol::Named(key) => write!(f, "{}", key),
            KeySymbol::Char(c) => write!(f, "{}", c),
            KeySymbol::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl From<NamedKey> for KeySymbol {
    fn from(key: NamedKey) -> Self {
        KeySymbol::Named(key)
    }
}

impl From<char> for KeySymbol {
    fn from(c: char) -> Self {
        KeySymbol::Char(c)
    }
}

impl From<String> for KeySymbol {
    fn from(text: String) -> Self {
        KeySymbol::parse(&text)
    }
}

impl From<KeySymbol> for String {
    fn from(key: KeySymbol) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_key_roundtrip() {
        for key in NamedKey::ALL {
            let symbol = KeySymbol::Named(*key);
            assert_eq!(KeySymbol::parse(&symbol.to_string()), symbol);
        }
    }

    #[test]
    fn test_named_key_names_are_unique() {
        let mut names: Vec<_> = NamedKey::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), NamedKey::ALL.len());
    }

    #[test]
    fn test_parse_characters() {
        assert_eq!(KeySymbol::parse("a"), KeySymbol::Char('a'));
        assert_eq!(KeySymbol::parse(";"), KeySymbol::Char(';'));
        assert_eq!(KeySymbol::parse("'"), KeySymbol::Char('\''));
        assert_eq!(KeySymbol::parse("é"), KeySymbol::Char('é'));
    }

    #[test]
    fn test_parse_legacy_quoted_character() {
        assert_eq!(KeySymbol::parse("'x'"), KeySymbol::Char('x'));
        assert_eq!(KeySymbol::parse("'''"), KeySymbol::Char('\''));
    }

    #[test]
    fn test_unknown_symbols_are_kept_verbatim() {
        let unknown = KeySymbol::parse("Key.hyper_launch");
        assert_eq!(unknown, KeySymbol::Unknown("Key.hyper_launch".to_string()));
        assert_eq!(unknown.to_string(), "Key.hyper_launch");
        assert!(!unknown.is_known());

        let odd = KeySymbol::parse("<65027>");
        assert_eq!(odd.to_string(), "<65027>");
        assert_eq!(KeySymbol::parse(""), KeySymbol::Unknown(String::new()));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&KeySymbol::Named(NamedKey::F9)).unwrap();
        assert_eq!(json, "\"Key.f9\"");

        let key: KeySymbol = serde_json::from_str("\"Key.page_down\"").unwrap();
        assert_eq!(key, KeySymbol::Named(NamedKey::PageDown));

        let key: KeySymbol = serde_json::from_str("\"q\"").unwrap();
        assert_eq!(key, KeySymbol::Char('q'));
    }
}
