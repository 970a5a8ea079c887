//! Load/save contract for the UI layer.
//!
//! Wraps the secure store with the boundary policy: loads never fail (they
//! fall back to defaults) and saves report success as a boolean.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::settings::{validate_buttons, ButtonConfig, Settings, SoundAsset};
use crate::storage::SecureStore;

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "SOUNDPAD_DATA_DIR";

const APP_DIR_NAME: &str = "soundpad";

/// Resolve where documents live: `$SOUNDPAD_DATA_DIR`, else the OS user-data
/// directory, else `./userdata`.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match dirs::data_dir() {
        Some(dir) => dir.join(APP_DIR_NAME),
        None => {
            log::warn!("No OS data directory available; using ./userdata");
            PathBuf::from("userdata")
        }
    }
}

#[derive(Clone)]
pub struct ConfigFacade {
    store: Arc<SecureStore>,
}

impl ConfigFacade {
    pub fn new(store: Arc<SecureStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SecureStore {
        &self.store
    }

    pub fn load_settings(&self) -> Settings {
        self.store.load()
    }

    pub fn save_settings(&self, settings: &Settings) -> bool {
        if let Err(e) = validate_buttons(&settings.buttons) {
            log::warn!("Refusing to save settings: {}", e);
            return false;
        }
        match self.store.save(settings) {
            Ok(()) => {
                log::info!("Settings saved to {}", self.store.dir().display());
                true
            }
            Err(e) => {
                log::error!("Save settings error: {}", e);
                false
            }
        }
    }

    pub fn load_config(&self) -> Vec<ButtonConfig> {
        self.load_settings().buttons
    }

    /// Replace the button document, keeping every other setting as stored.
    pub fn save_config(&self, buttons: Vec<ButtonConfig>) -> bool {
        let mut settings = self.load_settings();
        settings.buttons = buttons;
        self.save_settings(&settings)
    }

    pub fn save_sound(&self, category: &str, position: u32, name: &str, payload: Vec<u8>) -> Option<SoundAsset> {
        match self.store.save_sound(category, position, name, payload) {
            Ok(asset) => Some(asset),
            Err(e) => {
                log::error!("Save sound error: {}", e);
                None
            }
        }
    }

    pub fn sounds_by_category(&self, category: &str) -> BTreeMap<u32, SoundAsset> {
        self.store.sounds_by_category(category)
    }
}
