//! Global shortcut bridge.
//!
//! Keeps the OS-level registrations in step with the Global-scope bindings.
//! The OS facility sits behind [`ShortcutBackend`] so the bridge logic can be
//! exercised without a display server.

mod os;

pub use os::{forward_pressed_events, pump_platform_events, OsShortcutBackend, UnavailableBackend};

use std::collections::HashMap;

use crate::keys::KeyCombo;

/// Identifier the OS facility assigns to a registration
pub type HotkeyId = u32;

/// Errors reported by a shortcut backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("global shortcuts are unavailable: {0}")]
    Unavailable(String),

    #[error("'{0}' cannot be expressed as an OS shortcut: {1}")]
    Unsupported(KeyCombo, String),

    #[error("OS refused '{0}': {1}")]
    Denied(KeyCombo, String),
}

/// OS-level global hotkey facility
pub trait ShortcutBackend {
    /// Grab `key` system-wide and return the id its fire events will carry.
    fn register(&mut self, key: &KeyCombo) -> Result<HotkeyId, BackendError>;

    /// Release a grab previously returned by [`ShortcutBackend::register`].
    fn unregister(&mut self, key: &KeyCombo, id: HotkeyId) -> Result<(), BackendError>;

    fn name(&self) -> &'static str;
}

/// Tracks which combos are armed with the OS and resolves fire events back
/// to combos.
pub struct GlobalShortcutBridge {
    backend: Box<dyn ShortcutBackend>,
    armed: HashMap<KeyCombo, HotkeyId>,
    by_id: HashMap<HotkeyId, KeyCombo>,
}

impl GlobalShortcutBridge {
    pub fn new(backend: Box<dyn ShortcutBackend>) -> Self {
        log::info!("Global shortcut backend: {}", backend.name());
        Self {
            backend,
            armed: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Arm `key` with the OS. An existing registration for the same key is
    /// released first, so calling this twice re-arms rather than failing.
    ///
    /// Returns `false` when the OS refuses the grab; this is never fatal.
    pub fn register(&mut self, key: &KeyCombo) -> bool {
        if self.armed.contains_key(key) {
            log::debug!("Re-arming already registered shortcut {}", key);
            self.unregister(key);
        }

        match self.backend.register(key) {
            Ok(id) => {
                self.armed.insert(key.clone(), id);
                self.by_id.insert(id, key.clone());
                log::info!("Hotkey registration: {} succeeded (id: {})", key, id);
                true
            }
            Err(e) => {
                log::warn!("Hotkey registration: {} failed: {}", key, e);
                false
            }
        }
    }

    /// Release `key`. Unknown keys are ignored.
    pub fn unregister(&mut self, key: &KeyCombo) {
        let Some(id) = self.armed.remove(key) else {
            return;
        };
        self.by_id.remove(&id);

        // Local tracking is already updated; a failed OS release can't be retried usefully.
        if let Err(e) = self.backend.unregister(key, id) {
            log::warn!("Failed to unregister shortcut {} (id: {}): {}", key, id, e);
        }
    }

    /// Release every registration. Safe to call repeatedly, including from
    /// shutdown paths after the window is gone.
    pub fn unregister_all(&mut self) {
        if self.armed.is_empty() {
            return;
        }
        log::info!("Unregistering all {} global shortcuts", self.armed.len());

        self.by_id.clear();
        for (key, id) in self.armed.drain() {
            if let Err(e) = self.backend.unregister(&key, id) {
                log::warn!("Failed to unregister shortcut {} (id: {}): {}", key, id, e);
            }
        }
    }

    pub fn is_registered(&self, key: &KeyCombo) -> bool {
        self.armed.contains_key(key)
    }

    /// Map a fire event from the OS back to the combo it was armed for.
    ///
    /// Events for registrations that have since been released resolve to
    /// `None`; the OS may still deliver a few of those after teardown.
    pub fn resolve(&self, id: HotkeyId) -> Option<&KeyCombo> {
        self.by_id.get(&id)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

impl Drop for GlobalShortcutBridge {
    fn drop(&mut self) {
        self.unregister_all();
    }
}
