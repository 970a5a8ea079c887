//! IPC commands for the settings, button and sound documents.
//!
//! Loads always answer with a document (defaults when the file is missing or
//! unreadable); saves answer `true`/`false`.

use serde_json::Value;

use crate::app::Soundboard;
use crate::settings::{ButtonConfig, Settings};

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to encode reply: {}", e))
}

pub fn load_config(app: &mut Soundboard) -> Result<Value, String> {
    to_value(&app.config().load_config())
}

pub fn save_config(app: &mut Soundboard, buttons: Vec<ButtonConfig>) -> Result<Value, String> {
    Ok(Value::Bool(app.save_config(buttons)))
}

pub fn load_settings(app: &mut Soundboard) -> Result<Value, String> {
    to_value(&app.config().load_settings())
}

pub fn save_settings(app: &mut Soundboard, settings: &Settings) -> Result<Value, String> {
    Ok(Value::Bool(app.save_settings(settings)))
}

/// Store a clip in its slot. Answers the stored asset, or `null` on failure.
pub fn save_sound(
    app: &mut Soundboard,
    category: &str,
    position: u32,
    name: &str,
    payload: Vec<u8>,
) -> Result<Value, String> {
    match app.config().save_sound(category, position, name, payload) {
        Some(asset) => to_value(&asset),
        None => Ok(Value::Null),
    }
}

/// Sounds of one category keyed by slot position.
pub fn sounds_by_category(app: &mut Soundboard, category: &str) -> Result<Value, String> {
    to_value(&app.config().sounds_by_category(category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::harness;
    use serde_json::json;

    #[test]
    fn test_settings_round_trip_through_commands() {
        let mut h = harness();
        let mut settings: Settings = serde_json::from_value(load_settings(&mut h.app).unwrap()).unwrap();
        assert_eq!(settings, Settings::default());

        settings.volume = 55;
        assert_eq!(save_settings(&mut h.app, &settings), Ok(Value::Bool(true)));
        assert_eq!(load_settings(&mut h.app).unwrap()["volume"], json!(55));
    }

    #[test]
    fn test_save_config_rejects_duplicate_slot() {
        let mut h = harness();
        let buttons = vec![
            ButtonConfig::new("fx", 3, "horn"),
            ButtonConfig::new("fx", 3, "bell"),
        ];
        assert_eq!(save_config(&mut h.app, buttons), Ok(Value::Bool(false)));
        assert_eq!(load_config(&mut h.app), Ok(json!([])));
    }

    #[test]
    fn test_sounds_by_category_keys_by_position() {
        let mut h = harness();
        let stored = save_sound(&mut h.app, "drums", 4, "tom", vec![7, 8]).unwrap();
        assert_eq!(stored["name"], json!("tom"));

        let drums = sounds_by_category(&mut h.app, "drums").unwrap();
        assert_eq!(drums["4"]["payload"], json!([7, 8]));
        assert_eq!(sounds_by_category(&mut h.app, "none"), Ok(json!({})));
    }
}
