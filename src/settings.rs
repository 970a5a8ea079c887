use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::keys::KeyCombo;
use crate::registry::{ConflictPolicy, Scope};

// ============================================================================
// DEFAULT SETTINGS - Single source of truth for first-run values
// ============================================================================

pub const DEFAULT_THEME: &str = "light";

pub const DEFAULT_AUDIO_OUTPUT: &str = "default";

/// Percent, 0-100
pub const DEFAULT_VOLUME: u8 = 100;

/// Percent, 0-100
pub const DEFAULT_OPACITY: u8 = 100;

pub const DEFAULT_WINDOW_WIDTH: u32 = 1200;

pub const DEFAULT_WINDOW_HEIGHT: u32 = 800;

/// Process image name of the external music player we pause before playing
pub const DEFAULT_EXTERNAL_PLAYER: &str = "KuGou.exe";

// ============================================================================

/// Which encrypted file a document lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Settings,
    Sounds,
}

impl DocumentKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKind::Settings => "settings.dat",
            DocumentKind::Sounds => "sounds.dat",
        }
    }
}

/// A document the secure store can persist. Loading falls back to
/// `Default::default()` on any failure.
pub trait StoredDocument: Serialize + for<'de> Deserialize<'de> + Default {
    const KIND: DocumentKind;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowBounds {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

/// One soundboard button
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ButtonConfig {
    pub id: String,
    pub category: String,
    pub position: u32,
    #[serde(default)]
    pub label: String,
    /// Stored hotkeys that no longer parse are dropped rather than failing the document
    #[serde(default, deserialize_with = "deserialize_hotkey")]
    pub hotkey: Option<KeyCombo>,
    #[serde(default = "default_button_scope")]
    pub scope: Scope,
    #[serde(default)]
    pub sound_ref: Option<String>,
}

fn default_button_scope() -> Scope {
    Scope::Global
}

fn deserialize_hotkey<'de, D>(deserializer: D) -> Result<Option<KeyCombo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    let combo = match value {
        None => None,
        Some(s) if s.trim().is_empty() => None,
        Some(s) => match s.parse::<KeyCombo>() {
            Ok(combo) => Some(combo),
            Err(e) => {
                log::warn!("Ignoring unparseable stored hotkey '{}': {}", s, e);
                None
            }
        },
    };
    Ok(combo)
}

impl ButtonConfig {
    pub fn new(category: &str, position: u32, label: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: category.to_string(),
            position,
            label: label.to_string(),
            hotkey: None,
            scope: Scope::Global,
            sound_ref: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("two buttons share category '{category}' position {position}")]
    DuplicatePosition { category: String, position: u32 },
}

/// Check that `(category, position)` pairs are unique.
pub fn validate_buttons(buttons: &[ButtonConfig]) -> Result<(), DocumentError> {
    let mut seen = HashSet::new();
    for button in buttons {
        if !seen.insert((button.category.as_str(), button.position)) {
            return Err(DocumentError::DuplicatePosition {
                category: button.category.clone(),
                position: button.position,
            });
        }
    }
    Ok(())
}

/// The settings document: appearance, audio output and the button grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: String,
    pub audio_output: String,
    #[serde(deserialize_with = "deserialize_volume")]
    pub volume: u8,
    #[serde(deserialize_with = "deserialize_opacity")]
    pub opacity: u8,
    pub window_bounds: WindowBounds,
    pub buttons: Vec<ButtonConfig>,
    pub binding_policy: ConflictPolicy,
    pub external_player: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            audio_output: DEFAULT_AUDIO_OUTPUT.to_string(),
            volume: DEFAULT_VOLUME,
            opacity: DEFAULT_OPACITY,
            window_bounds: WindowBounds::default(),
            buttons: Vec::new(),
            binding_policy: ConflictPolicy::default(),
            external_player: DEFAULT_EXTERNAL_PLAYER.to_string(),
        }
    }
}

/// Read a 0-100 percentage, rounding fractions and clamping out-of-range
/// numbers. Anything that is not a number falls back to `default`.
fn lenient_percent<'de, D>(deserializer: D, field: &str, default: u8) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value.as_f64() {
        Some(n) if n.is_finite() => Ok(n.round().clamp(0.0, 100.0) as u8),
        _ => {
            log::warn!("Ignoring invalid stored {} {}", field, value);
            Ok(default)
        }
    }
}

fn deserialize_volume<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_percent(deserializer, "volume", DEFAULT_VOLUME)
}

fn deserialize_opacity<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_percent(deserializer, "opacity", DEFAULT_OPACITY)
}

impl StoredDocument for Settings {
    const KIND: DocumentKind = DocumentKind::Settings;
}

/// A stored sound clip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoundAsset {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Older sounds files call this `fileData`
    #[serde(alias = "fileData", deserialize_with = "deserialize_payload")]
    pub payload: Vec<u8>,
}

/// Encodings a stored clip may use
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPayload {
    Bytes(Vec<u8>),
    /// Node `Buffer` serialized with `JSON.stringify`
    Buffer { data: Vec<u8> },
    /// `data:<mime>;base64,<data>` URL or bare base64
    Text(String),
}

fn deserialize_payload<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match StoredPayload::deserialize(deserializer)? {
        StoredPayload::Bytes(bytes) | StoredPayload::Buffer { data: bytes } => Ok(bytes),
        StoredPayload::Text(text) => decode_text_payload(&text).map_err(D::Error::custom),
    }
}

fn decode_text_payload(text: &str) -> Result<Vec<u8>, String> {
    let Some(url) = text.strip_prefix("data:") else {
        return STANDARD
            .decode(text.trim())
            .map_err(|e| format!("sound payload is not base64: {}", e));
    };
    let (header, data) = url
        .split_once(',')
        .ok_or_else(|| "data URL has no payload".to_string())?;
    if header.ends_with(";base64") {
        STANDARD
            .decode(data.trim())
            .map_err(|e| format!("data URL payload is not base64: {}", e))
    } else {
        Ok(data.as_bytes().to_vec())
    }
}

impl SoundAsset {
    pub fn new(name: &str, payload: Vec<u8>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            payload,
        }
    }
}

/// The sounds document: `category -> position -> clip`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SoundLibrary(BTreeMap<String, BTreeMap<u32, SoundAsset>>);

impl SoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `asset` at `(category, position)`, returning the clip it replaced.
    pub fn insert(&mut self, category: &str, position: u32, asset: SoundAsset) -> Option<SoundAsset> {
        self.0
            .entry(category.to_string())
            .or_default()
            .insert(position, asset)
    }

    pub fn get(&self, category: &str, position: u32) -> Option<&SoundAsset> {
        self.0.get(category).and_then(|slots| slots.get(&position))
    }

    /// All clips of a category; empty when the category is unknown.
    pub fn category(&self, category: &str) -> BTreeMap<u32, SoundAsset> {
        self.0.get(category).cloned().unwrap_or_default()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&SoundAsset> {
        self.0
            .values()
            .flat_map(|slots| slots.values())
            .find(|asset| !id.is_empty() && asset.id == id)
    }

    pub fn remove(&mut self, category: &str, position: u32) -> Option<SoundAsset> {
        let slots = self.0.get_mut(category)?;
        let removed = slots.remove(&position);
        if slots.is_empty() {
            self.0.remove(category);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl StoredDocument for SoundLibrary {
    const KIND: DocumentKind = DocumentKind::Sounds;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.volume, 100);
        assert_eq!(settings.window_bounds, WindowBounds { width: 1200, height: 800 });
        assert!(settings.buttons.is_empty());
        assert_eq!(settings.binding_policy, ConflictPolicy::Demote);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"theme":"dark","audioOutput":"speakers"}"#).unwrap();
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.audio_output, "speakers");
        assert_eq!(settings.opacity, DEFAULT_OPACITY);
        assert_eq!(settings.external_player, DEFAULT_EXTERNAL_PLAYER);
    }

    #[test]
    fn test_bad_stored_hotkey_is_dropped() {
        let json = r#"{"buttons":[
            {"id":"b1","category":"drums","position":0,"hotkey":"Ctrl+Banana"},
            {"id":"b2","category":"drums","position":1,"hotkey":"ctrl+f5","scope":"local"}
        ]}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.buttons[0].hotkey, None);
        assert_eq!(settings.buttons[0].scope, Scope::Global);
        assert_eq!(settings.buttons[1].hotkey.as_ref().unwrap().to_string(), "Control+F5");
        assert_eq!(settings.buttons[1].scope, Scope::Local);
    }

    #[test]
    fn test_validate_buttons_rejects_duplicate_slot() {
        let a = ButtonConfig::new("drums", 0, "kick");
        let b = ButtonConfig::new("drums", 1, "snare");
        let c = ButtonConfig::new("drums", 0, "clap");
        assert!(validate_buttons(&[a.clone(), b.clone()]).is_ok());
        assert_eq!(
            validate_buttons(&[a, b, c]),
            Err(DocumentError::DuplicatePosition {
                category: "drums".to_string(),
                position: 0
            })
        );
    }

    #[test]
    fn test_sound_library_json_shape() {
        let json = r#"{"drums":{"0":{"name":"kick","payload":[1,2,3]}}}"#;
        let library: SoundLibrary = serde_json::from_str(json).unwrap();
        let kick = library.get("drums", 0).unwrap();
        assert_eq!(kick.name, "kick");
        assert_eq!(kick.payload, vec![1, 2, 3]);
        assert!(library.category("vocals").is_empty());
    }

    #[test]
    fn test_legacy_file_data_shapes() {
        let json = r#"{
            "drums": {
                "0": {"name":"kick","fileData":"data:audio/mpeg;base64,AQID"},
                "1": {"name":"snare","fileData":{"type":"Buffer","data":[4,5]}},
                "2": {"name":"hat","fileData":[6]}
            }
        }"#;
        let library: SoundLibrary = serde_json::from_str(json).unwrap();
        assert_eq!(library.get("drums", 0).unwrap().payload, vec![1, 2, 3]);
        assert_eq!(library.get("drums", 1).unwrap().payload, vec![4, 5]);
        assert_eq!(library.get("drums", 2).unwrap().payload, vec![6]);
        assert_eq!(library.get("drums", 0).unwrap().id, "");
    }

    #[test]
    fn test_bad_data_url_is_an_error() {
        let json = r#"{"fx":{"0":{"name":"x","fileData":"data:audio/wav;base64,@@@"}}}"#;
        assert!(serde_json::from_str::<SoundLibrary>(json).is_err());
    }

    #[test]
    fn test_out_of_range_percentages_are_clamped() {
        let settings: Settings =
            serde_json::from_str(r#"{"theme":"dark","volume":57.6,"opacity":250}"#).unwrap();
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.volume, 58);
        assert_eq!(settings.opacity, 100);

        let settings: Settings =
            serde_json::from_str(r#"{"volume":"loud","opacity":-3}"#).unwrap();
        assert_eq!(settings.volume, DEFAULT_VOLUME);
        assert_eq!(settings.opacity, 0);
    }

    #[test]
    fn test_sound_library_remove_prunes_category() {
        let mut library = SoundLibrary::new();
        let asset = SoundAsset::new("kick", vec![1]);
        let id = asset.id.clone();
        library.insert("drums", 0, asset);
        assert_eq!(library.find_by_id(&id).map(|a| a.name.as_str()), Some("kick"));

        assert!(library.remove("drums", 0).is_some());
        assert!(library.is_empty());
        assert!(library.find_by_id(&id).is_none());
    }
}
