// OS global hotkey backend built on the `global-hotkey` crate.
//
// The facility delivers events through the platform event loop of the thread
// that created the manager. On Windows the control loop pumps that thread's
// message queue via `pump_platform_events`. On Linux/X11 the crate runs its
// own event thread. macOS needs the main-thread run loop, which belongs to the
// UI process, so there (and on mobile) the backend reports itself as
// unavailable and every global bind is refused.

use super::{BackendError, HotkeyId, ShortcutBackend};
use crate::keys::KeyCombo;

#[cfg(not(any(target_os = "android", target_os = "ios", target_os = "macos")))]
mod imp {
    use super::*;
    use global_hotkey::hotkey::HotKey;
    use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
    use std::collections::HashMap;
    use std::str::FromStr;

    pub struct OsShortcutBackend {
        manager: GlobalHotKeyManager,
        hotkeys: HashMap<HotkeyId, HotKey>,
    }

    impl OsShortcutBackend {
        /// Must be created on the thread that runs the platform event loop.
        pub fn new() -> Result<Self, BackendError> {
            let manager = GlobalHotKeyManager::new()
                .map_err(|e| BackendError::Unavailable(e.to_string()))?;
            Ok(Self {
                manager,
                hotkeys: HashMap::new(),
            })
        }
    }

    impl ShortcutBackend for OsShortcutBackend {
        fn register(&mut self, key: &KeyCombo) -> Result<HotkeyId, BackendError> {
            let hotkey = HotKey::from_str(&key.to_string())
                .map_err(|e| BackendError::Unsupported(key.clone(), e.to_string()))?;

            self.manager
                .register(hotkey)
                .map_err(|e| BackendError::Denied(key.clone(), e.to_string()))?;

            self.hotkeys.insert(hotkey.id(), hotkey);
            Ok(hotkey.id())
        }

        fn unregister(&mut self, key: &KeyCombo, id: HotkeyId) -> Result<(), BackendError> {
            let Some(hotkey) = self.hotkeys.remove(&id) else {
                return Ok(());
            };
            self.manager
                .unregister(hotkey)
                .map_err(|e| BackendError::Denied(key.clone(), e.to_string()))
        }

        fn name(&self) -> &'static str {
            "global-hotkey"
        }
    }

    /// Forward key-press events from the OS facility to `sink` on a
    /// background thread. Releases are dropped. The thread ends once `sink`
    /// returns `false`.
    pub fn forward_pressed_events<F>(sink: F)
    where
        F: Fn(HotkeyId) -> bool + Send + 'static,
    {
        std::thread::spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if event.state != HotKeyState::Pressed {
                    continue;
                }
                log::debug!("Received global hotkey event id={}", event.id);
                if !sink(event.id) {
                    break;
                }
            }
        });
    }
}

#[cfg(any(target_os = "android", target_os = "ios", target_os = "macos"))]
mod imp {
    use super::*;

    pub struct OsShortcutBackend;

    impl OsShortcutBackend {
        pub fn new() -> Result<Self, BackendError> {
            let reason = if cfg!(target_os = "macos") {
                "global hotkeys need the main run loop of the window process"
            } else {
                "no global hotkey facility on this platform"
            };
            Err(BackendError::Unavailable(reason.to_string()))
        }
    }

    impl ShortcutBackend for OsShortcutBackend {
        fn register(&mut self, key: &KeyCombo) -> Result<HotkeyId, BackendError> {
            Err(BackendError::Unavailable(format!("cannot register {}", key)))
        }

        fn unregister(&mut self, _key: &KeyCombo, _id: HotkeyId) -> Result<(), BackendError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "none"
        }
    }

    pub fn forward_pressed_events<F>(_sink: F)
    where
        F: Fn(HotkeyId) -> bool + Send + 'static,
    {
    }
}

pub use imp::{forward_pressed_events, OsShortcutBackend};

/// Dispatch any window messages queued for this thread. Must be called
/// regularly from the thread that created [`OsShortcutBackend`], otherwise
/// WM_HOTKEY never reaches the facility.
#[cfg(target_os = "windows")]
pub fn pump_platform_events() {
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    };

    let mut msg = MSG::default();
    unsafe {
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub fn pump_platform_events() {}

/// Backend used when the OS facility could not be created. Every grab is
/// refused, which leaves in-window shortcuts as the only trigger path.
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ShortcutBackend for UnavailableBackend {
    fn register(&mut self, _key: &KeyCombo) -> Result<HotkeyId, BackendError> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }

    fn unregister(&mut self, _key: &KeyCombo, _id: HotkeyId) -> Result<(), BackendError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkeys::GlobalShortcutBridge;

    #[test]
    fn test_unavailable_backend_refuses_grabs() {
        let mut bridge = GlobalShortcutBridge::new(Box::new(UnavailableBackend::new("headless")));
        let key: KeyCombo = "F5".parse().unwrap();
        assert!(!bridge.register(&key));
        assert!(!bridge.is_registered(&key));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_macos_backend_reports_unavailable() {
        assert!(matches!(
            OsShortcutBackend::new(),
            Err(BackendError::Unavailable(_))
        ));
    }

    #[test]
    fn test_pump_with_empty_queue_returns() {
        pump_platform_events();
        pump_platform_events();
    }
}
