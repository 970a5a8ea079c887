use std::sync::Arc;

use crate::config::ConfigFacade;
use crate::dispatcher::{DispatchOutcome, Dispatcher, FireSink, FireSource};
use crate::external_player;
use crate::hotkeys::{GlobalShortcutBridge, HotkeyId, ShortcutBackend};
use crate::keys::{KeyCombo, Platform};
use crate::local::{KeyDownOutcome, KeyEvent, LocalShortcutListener};
use crate::registry::{ActionId, BindError, BindOutcome, KeyBindingRegistry, Scope};
use crate::settings::{ButtonConfig, Settings};
use crate::state::{CloseAction, Lifecycle, LifecyclePhase};

/// Owns the live binding set, both listener paths, the dispatcher and the
/// config facade. All methods run on the single control thread.
pub struct Soundboard {
    lifecycle: Arc<Lifecycle>,
    registry: KeyBindingRegistry,
    bridge: GlobalShortcutBridge,
    local: LocalShortcutListener,
    dispatcher: Dispatcher,
    config: ConfigFacade,
}

impl Soundboard {
    pub fn new(
        config: ConfigFacade,
        backend: Box<dyn ShortcutBackend>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self::with_platform(config, backend, lifecycle, Platform::current())
    }

    pub fn with_platform(
        config: ConfigFacade,
        backend: Box<dyn ShortcutBackend>,
        lifecycle: Arc<Lifecycle>,
        platform: Platform,
    ) -> Self {
        let policy = config.load_settings().binding_policy;
        Self {
            registry: KeyBindingRegistry::new(platform, policy),
            bridge: GlobalShortcutBridge::new(backend),
            local: LocalShortcutListener::new(),
            dispatcher: Dispatcher::new(lifecycle.clone()),
            lifecycle,
            config,
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn config(&self) -> &ConfigFacade {
        &self.config
    }

    pub fn attach_target(&mut self, target: Box<dyn FireSink>) {
        self.dispatcher.attach_target(target);
    }

    pub fn detach_target(&mut self) {
        self.dispatcher.detach_target();
    }

    /// Bind `key` to `action` in `scope` and arm the matching listener.
    ///
    /// Global binds are only recorded once the OS has accepted the grab. If
    /// the OS refuses a re-arm, the key's previous global binding is gone too
    /// and is removed from the registry.
    pub fn bind(&mut self, key: &str, action: ActionId, scope: Scope) -> Result<BindOutcome, BindError> {
        let combo = self.registry.normalize(key)?;
        self.registry.check(&combo, scope)?;

        if scope == Scope::Global && !self.bridge.register(&combo) {
            if let Some(previous) = self.registry.unbind_combo(&combo, Scope::Global) {
                log::warn!("Global binding {} -> {} lost after failed re-arm", combo, previous);
            }
            return Err(BindError::OsRegistrationDenied(combo));
        }

        let outcome = self
            .registry
            .bind_combo(combo.clone(), action.clone(), scope)?;
        if let Some(demoted) = &outcome.demoted {
            self.disarm(&demoted.key, demoted.scope);
        }
        if scope == Scope::Local {
            self.local.attach(combo.clone(), action.clone());
        }

        log::info!("Bound {} -> {} ({})", combo, action, scope);
        Ok(outcome)
    }

    pub fn request_bind(&mut self, key: &str, action: ActionId, scope: Scope) -> bool {
        match self.bind(key, action, scope) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Bind request for '{}' failed: {}", key, e);
                false
            }
        }
    }

    fn disarm(&mut self, key: &KeyCombo, scope: Scope) {
        match scope {
            Scope::Global => self.bridge.unregister(key),
            Scope::Local => {
                self.local.detach(key);
            }
        }
    }

    pub fn unbind(&mut self, key: &str, scope: Scope) -> Result<Option<ActionId>, BindError> {
        let combo = self.registry.normalize(key)?;
        let removed = self.registry.unbind_combo(&combo, scope);
        self.disarm(&combo, scope);
        if let Some(action) = &removed {
            log::info!("Unbound {} -> {} ({})", combo, action, scope);
        }
        Ok(removed)
    }

    pub fn request_unbind(&mut self, key: &str, scope: Scope) -> bool {
        match self.unbind(key, scope) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Unbind request for '{}' failed: {}", key, e);
                false
            }
        }
    }

    /// Drop every binding in `scope` (or everywhere) together with its OS
    /// registration or in-window handler. Idempotent.
    pub fn unbind_all(&mut self, scope: Option<Scope>) {
        let removed = self.registry.unbind_all(scope);
        if !removed.is_empty() {
            log::info!("Cleared {} bindings", removed.len());
        }
        if scope != Some(Scope::Local) {
            self.bridge.unregister_all();
        }
        if scope != Some(Scope::Global) {
            self.local.detach_all();
        }
    }

    pub fn lookup(&self, key: &str, scope: Scope) -> Option<ActionId> {
        let combo = self.registry.normalize(key).ok()?;
        self.registry.lookup(&combo, scope).cloned()
    }

    /// Route an OS fire event. Events for keys that were released in the
    /// meantime are dropped.
    pub fn handle_global_event(&mut self, id: HotkeyId) -> Option<DispatchOutcome> {
        let Some(combo) = self.bridge.resolve(id) else {
            log::debug!("Ignoring event for unknown hotkey id {}", id);
            return None;
        };
        let action = self.registry.lookup(combo, Scope::Global)?.clone();
        Some(self.dispatcher.fire(&action, FireSource::Global))
    }

    pub fn handle_key_down(&mut self, event: &KeyEvent) -> KeyDownOutcome {
        if !self.lifecycle.is_running() {
            return KeyDownOutcome::Ignored;
        }
        self.local.handle_key_down(event, &mut self.dispatcher)
    }

    /// Bind the hotkeys of every saved button. Returns how many took effect.
    pub fn arm_saved_buttons(&mut self) -> usize {
        let buttons = self.config.load_config();
        let mut armed = 0;
        for button in &buttons {
            let Some(hotkey) = &button.hotkey else {
                continue;
            };
            if self.request_bind(&hotkey.to_string(), ActionId::new(button.id.clone()), button.scope) {
                armed += 1;
            }
        }
        log::info!("Armed {} of {} saved buttons", armed, buttons.len());
        armed
    }

    pub fn save_config(&mut self, buttons: Vec<ButtonConfig>) -> bool {
        self.config.save_config(buttons)
    }

    pub fn save_settings(&mut self, settings: &Settings) -> bool {
        if !self.config.save_settings(settings) {
            return false;
        }
        self.registry.set_policy(settings.binding_policy);
        true
    }

    pub fn external_player_active(&self) -> bool {
        external_player::is_external_player_active(&self.config.load_settings().external_player)
    }

    pub fn stop_external_player(&self) {
        external_player::stop_external_player(&self.config.load_settings().external_player);
    }

    /// Handle a window close request; a quitting close runs the full shutdown.
    pub fn close(&mut self, quitting: bool) -> CloseAction {
        let action = self.lifecycle.request_close(quitting);
        if action == CloseAction::Shutdown {
            self.shutdown();
        }
        action
    }

    /// Release every shortcut, detach the fire target and mark the app
    /// terminated. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.lifecycle.phase() == LifecyclePhase::Terminated {
            return;
        }
        self.lifecycle.begin_closing();
        self.unbind_all(None);
        self.dispatcher.detach_target();
        self.lifecycle.mark_terminated();
        log::info!("Shutdown complete");
    }
}

impl Drop for Soundboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}
