//! Canonical key combinations.
//!
//! Every hotkey that enters the backend (from the UI, from the saved button
//! document, or from an in-window key-down event) is parsed into a
//! [`KeyCombo`] first. Two spellings of the same physical combination always
//! produce equal values, so the registry can use them as map keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform whose physical modifier a generic `CommandOrControl` resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }
}

/// Errors produced while parsing a key combination
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("empty key combination")]
    Empty,

    #[error("key combination has no main key")]
    MissingKey,

    #[error("key combination has more than one main key: {0} and {1}")]
    MultipleKeys(String, String),

    #[error("unknown key: {0}")]
    UnknownKey(String),
}

/// Modifier flags of a combination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub control: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        control: false,
        alt: false,
        shift: false,
        super_key: false,
    };
}

/// A normalized key plus modifiers, e.g. `Control+Shift+F5`.
///
/// The canonical string form lists modifiers in the fixed order
/// Control, Alt, Shift, Super and then the key name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCombo {
    modifiers: Modifiers,
    key: String,
}

/// Named keys: canonical spelling followed by accepted lowercase aliases.
const NAMED_KEYS: &[(&str, &[&str])] = &[
    ("Space", &[" ", "space", "spacebar"]),
    ("Enter", &["enter", "return"]),
    ("Escape", &["escape", "esc"]),
    ("Tab", &["tab"]),
    ("Backspace", &["backspace"]),
    ("Delete", &["delete", "del"]),
    ("Insert", &["insert", "ins"]),
    ("Home", &["home"]),
    ("End", &["end"]),
    ("PageUp", &["pageup", "pgup"]),
    ("PageDown", &["pagedown", "pgdn"]),
    ("ArrowUp", &["arrowup", "up"]),
    ("ArrowDown", &["arrowdown", "down"]),
    ("ArrowLeft", &["arrowleft", "left"]),
    ("ArrowRight", &["arrowright", "right"]),
    ("Minus", &["minus", "-"]),
    ("Equal", &["equal", "equals", "="]),
    ("Comma", &["comma", ","]),
    ("Period", &["period", "."]),
    ("Slash", &["slash", "/"]),
    ("Backslash", &["backslash", "\\"]),
    ("Semicolon", &["semicolon", ";"]),
    ("Quote", &["quote", "'"]),
    ("Backquote", &["backquote", "backtick", "`"]),
    ("BracketLeft", &["bracketleft", "["]),
    ("BracketRight", &["bracketright", "]"]),
    ("CapsLock", &["capslock"]),
    ("NumLock", &["numlock"]),
    ("ScrollLock", &["scrolllock"]),
    ("PrintScreen", &["printscreen", "prtsc"]),
    ("Pause", &["pause"]),
    ("MediaPlayPause", &["mediaplaypause"]),
    ("MediaStop", &["mediastop"]),
    ("MediaTrackNext", &["mediatracknext", "medianexttrack"]),
    ("MediaTrackPrevious", &["mediatrackprevious", "mediaprevioustrack"]),
    ("AudioVolumeUp", &["audiovolumeup", "volumeup"]),
    ("AudioVolumeDown", &["audiovolumedown", "volumedown"]),
    ("AudioVolumeMute", &["audiovolumemute", "volumemute"]),
];

enum Token {
    Control,
    Alt,
    Shift,
    Super,
    Key(String),
}

fn classify_token(raw: &str, platform: Platform) -> Result<Token, KeyParseError> {
    // A lone space is the DOM name of the space bar, so only trim longer tokens.
    let token = if raw == " " { raw } else { raw.trim() };
    let lower = token.to_lowercase();

    let modifier = match lower.as_str() {
        "ctrl" | "control" => Some(Token::Control),
        "alt" | "option" | "altgr" => Some(Token::Alt),
        "shift" => Some(Token::Shift),
        "super" | "cmd" | "command" | "meta" | "win" | "windows" => Some(Token::Super),
        "commandorcontrol" | "cmdorctrl" | "cmdorcontrol" | "commandorctrl" => {
            Some(match platform {
                Platform::MacOs => Token::Super,
                Platform::Other => Token::Control,
            })
        }
        _ => None,
    };
    if let Some(modifier) = modifier {
        return Ok(modifier);
    }

    normalize_key_name(token).map(Token::Key)
}

/// Map a key name (DOM `key`/`code` value or accelerator spelling) to its
/// canonical spelling.
pub fn normalize_key_name(name: &str) -> Result<String, KeyParseError> {
    if name.is_empty() {
        return Err(KeyParseError::MissingKey);
    }
    let lower = name.to_lowercase();

    for (canonical, aliases) in NAMED_KEYS {
        if aliases.contains(&lower.as_str()) {
            return Ok((*canonical).to_string());
        }
    }

    // Letters: "a", "A", "KeyA"
    let letter = lower.strip_prefix("key").unwrap_or(&lower);
    if letter.len() == 1 {
        let c = letter.chars().next().unwrap_or_default();
        if c.is_ascii_alphabetic() {
            return Ok(c.to_ascii_uppercase().to_string());
        }
    }

    // Digits: "5", "Digit5"
    let digit = lower.strip_prefix("digit").unwrap_or(&lower);
    if digit.len() == 1 && digit.chars().all(|c| c.is_ascii_digit()) {
        return Ok(digit.to_string());
    }

    if let Some(n) = lower.strip_prefix("numpad") {
        if n.len() == 1 && n.chars().all(|c| c.is_ascii_digit()) {
            return Ok(format!("Numpad{}", n));
        }
    }

    if let Some(n) = lower.strip_prefix('f') {
        if let Ok(index) = n.parse::<u8>() {
            if (1..=24).contains(&index) && !n.starts_with('0') {
                return Ok(format!("F{}", index));
            }
        }
    }

    Err(KeyParseError::UnknownKey(name.to_string()))
}

impl KeyCombo {
    /// Build a combo from a main key and modifier flags.
    pub fn new(key: &str, modifiers: Modifiers) -> Result<Self, KeyParseError> {
        let key = normalize_key_name(key)?;
        Ok(Self { modifiers, key })
    }

    /// Parse an accelerator string, resolving `CommandOrControl` for `platform`.
    pub fn parse_for(s: &str, platform: Platform) -> Result<Self, KeyParseError> {
        if s.trim().is_empty() && s != " " {
            return Err(KeyParseError::Empty);
        }

        // "Control++" and a bare "+" name the plus/equal key.
        let (modifier_part, trailing_key) = if s == "+" {
            ("", Some("="))
        } else if let Some(rest) = s.strip_suffix("++") {
            (rest, Some("="))
        } else {
            (s, None)
        };

        let mut modifiers = Modifiers::NONE;
        let mut key: Option<String> = trailing_key.map(|k| k.to_string());
        if let Some(k) = key.as_mut() {
            *k = normalize_key_name(k)?;
        }

        let parts = modifier_part.split('+').filter(|p| !p.is_empty());
        for part in parts {
            match classify_token(part, platform)? {
                Token::Control => modifiers.control = true,
                Token::Alt => modifiers.alt = true,
                Token::Shift => modifiers.shift = true,
                Token::Super => modifiers.super_key = true,
                Token::Key(name) => {
                    if let Some(existing) = key.take() {
                        return Err(KeyParseError::MultipleKeys(existing, name));
                    }
                    key = Some(name);
                }
            }
        }

        let key = key.ok_or(KeyParseError::MissingKey)?;
        Ok(Self { modifiers, key })
    }
}

impl FromStr for KeyCombo {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_for(s, Platform::current())
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (on, name) in [
            (m.control, "Control"),
            (m.alt, "Alt"),
            (m.shift, "Shift"),
            (m.super_key, "Super"),
        ] {
            if on {
                write!(f, "{}+", name)?;
            }
        }
        f.write_str(&self.key)
    }
}

impl TryFrom<String> for KeyCombo {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyCombo> for String {
    fn from(value: KeyCombo) -> Self {
        value.to_string()
    }
}
