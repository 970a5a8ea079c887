use serde::Deserialize;
use std::collections::HashMap;

use crate::dispatcher::{DispatchOutcome, Dispatcher, FireSource};
use crate::keys::{KeyCombo, Modifiers};
use crate::registry::ActionId;

/// A key-down event reported by the focused window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyEvent {
    /// DOM `key` value, e.g. "a", "F5", " "
    pub key: String,
    /// DOM `code` value, e.g. "KeyA"; preferred when present
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
    /// Auto-repeat from a held key
    #[serde(default)]
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Default::default()
        }
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers {
            control: self.ctrl,
            alt: self.alt,
            shift: self.shift,
            super_key: self.meta,
        }
    }

    /// Combo for this event, or `None` for keys we can't bind (a bare
    /// modifier press, a shifted symbol, ...).
    pub fn combo(&self) -> Option<KeyCombo> {
        let modifiers = self.modifiers();
        if let Some(code) = self.code.as_deref() {
            if let Ok(combo) = KeyCombo::new(code, modifiers) {
                return Some(combo);
            }
        }
        KeyCombo::new(&self.key, modifiers).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDownOutcome {
    /// Bound key: the window must suppress its default handling.
    Handled,
    Ignored,
}

impl KeyDownOutcome {
    pub fn prevent_default(&self) -> bool {
        matches!(self, KeyDownOutcome::Handled)
    }
}

#[derive(Debug)]
struct Subscription {
    handler: u64,
    action: ActionId,
}

/// Subscription table for in-window shortcuts: at most one handler per key.
#[derive(Debug, Default)]
pub struct LocalShortcutListener {
    subscriptions: HashMap<KeyCombo, Subscription>,
    next_handler: u64,
}

impl LocalShortcutListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler for `key`, detaching any existing one first.
    /// Returns the new handler id.
    pub fn attach(&mut self, key: KeyCombo, action: ActionId) -> u64 {
        if let Some(old) = self.subscriptions.remove(&key) {
            log::debug!("Shortcut already exists, replacing: {} (handler {})", key, old.handler);
        }
        self.next_handler += 1;
        let handler = self.next_handler;
        log::debug!("Attached local shortcut {} -> {} (handler {})", key, action, handler);
        self.subscriptions.insert(key, Subscription { handler, action });
        handler
    }

    pub fn detach(&mut self, key: &KeyCombo) -> bool {
        self.subscriptions.remove(key).is_some()
    }

    /// Remove every handler. Returns how many were attached.
    pub fn detach_all(&mut self) -> usize {
        let count = self.subscriptions.len();
        if count > 0 {
            log::info!("Detaching all {} local shortcuts", count);
        }
        self.subscriptions.clear();
        count
    }

    pub fn handler_for(&self, key: &KeyCombo) -> Option<u64> {
        self.subscriptions.get(key).map(|s| s.handler)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Route a key-down event. A bound key fires the dispatcher once per
    /// physical press; auto-repeat events are suppressed but not fired.
    pub fn handle_key_down(&self, event: &KeyEvent, dispatcher: &mut Dispatcher) -> KeyDownOutcome {
        let Some(combo) = event.combo() else {
            return KeyDownOutcome::Ignored;
        };
        let Some(subscription) = self.subscriptions.get(&combo) else {
            return KeyDownOutcome::Ignored;
        };

        if !event.repeat {
            log::debug!("Shortcut triggered: {}", combo);
            if dispatcher.fire(&subscription.action, FireSource::Local) != DispatchOutcome::Delivered {
                log::debug!("Local shortcut {} was not delivered", combo);
            }
        }
        KeyDownOutcome::Handled
    }
}
