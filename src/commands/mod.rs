//! IPC boundary between the UI/window process and the backend.
//!
//! Requests arrive one JSON envelope per line:
//! `{"id": 7, "request": {"channel": "register-hotkey", "payload": {...}}}`.
//! They are validated into [`IpcRequest`] before anything in the core sees
//! them. Replies and fire events go back as one JSON object per line.

pub mod config;
pub mod hotkeys;
pub mod window;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

use crate::app::Soundboard;
use crate::dispatcher::{FireSink, TargetGone};
use crate::local::KeyEvent;
use crate::registry::{ActionId, Scope};
use crate::settings::{ButtonConfig, Settings};

fn default_scope() -> Scope {
    Scope::Global
}

/// Actions the UI may request on the external player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalAudioAction {
    Pause,
}

/// One request per channel, with its typed payload.
#[derive(Debug, Deserialize)]
#[serde(
    tag = "channel",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase",
    deny_unknown_fields
)]
pub enum IpcRequest {
    RegisterHotkey {
        hotkey: String,
        button_id: String,
        #[serde(default = "default_scope")]
        scope: Scope,
    },
    UnregisterHotkey {
        hotkey: String,
        #[serde(default = "default_scope")]
        scope: Scope,
    },
    UnregisterAllHotkeys {
        #[serde(default)]
        scope: Option<Scope>,
    },
    KeyDown(KeyEvent),
    LoadConfig {},
    SaveConfig {
        buttons: Vec<ButtonConfig>,
    },
    LoadSettings {},
    SaveSettings {
        settings: Settings,
    },
    SaveSound {
        category: String,
        position: u32,
        name: String,
        payload: Vec<u8>,
    },
    SoundsByCategory {
        category: String,
    },
    CheckExternalPlayer {},
    ControlExternalAudio {
        action: ExternalAudioAction,
    },
    CloseWindow {
        #[serde(default)]
        quit: bool,
    },
    MinimizeWindow {},
}

#[derive(Debug, Deserialize)]
pub struct IpcEnvelope {
    pub id: u64,
    pub request: IpcRequest,
}

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    Invalid(String),
}

impl IpcEnvelope {
    /// Parse and validate one line of input.
    pub fn parse(line: &str) -> Result<Self, IpcError> {
        let mut value: Value = serde_json::from_str(line)?;

        // Channels without arguments may omit the payload entirely.
        if let Some(request) = value.get_mut("request").and_then(Value::as_object_mut) {
            request
                .entry("payload")
                .or_insert_with(|| Value::Object(Default::default()));
        }

        let envelope: IpcEnvelope = serde_json::from_value(value)?;
        envelope.request.validate()?;
        Ok(envelope)
    }

    /// Best-effort id extraction so even a rejected line gets a reply.
    pub fn peek_id(line: &str) -> Option<u64> {
        serde_json::from_str::<Value>(line)
            .ok()?
            .get("id")?
            .as_u64()
    }
}

impl IpcRequest {
    fn validate(&self) -> Result<(), IpcError> {
        let blank = |field: &str, value: &str| {
            if value.trim().is_empty() {
                Err(IpcError::Invalid(format!("{} must not be empty", field)))
            } else {
                Ok(())
            }
        };

        match self {
            IpcRequest::RegisterHotkey { hotkey, button_id, .. } => {
                blank("hotkey", hotkey)?;
                blank("buttonId", button_id)
            }
            IpcRequest::UnregisterHotkey { hotkey, .. } => blank("hotkey", hotkey),
            IpcRequest::SaveSound { category, name, .. } => {
                blank("category", category)?;
                blank("name", name)
            }
            IpcRequest::SoundsByCategory { category } => blank("category", category),
            _ => Ok(()),
        }
    }
}

/// Everything the backend writes to the UI
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Outgoing {
    Response {
        id: Option<u64>,
        ok: bool,
        value: Value,
    },
    HotkeyTriggered {
        button_id: String,
    },
}

impl Outgoing {
    fn ok(id: u64, value: Value) -> Self {
        Outgoing::Response {
            id: Some(id),
            ok: true,
            value,
        }
    }

    fn err(id: Option<u64>, message: String) -> Self {
        Outgoing::Response {
            id,
            ok: false,
            value: Value::String(message),
        }
    }
}

/// Run one validated request against the app.
pub fn handle(app: &mut Soundboard, request: IpcRequest) -> Result<Value, String> {
    match request {
        IpcRequest::RegisterHotkey {
            hotkey,
            button_id,
            scope,
        } => hotkeys::register_hotkey(app, &hotkey, &button_id, scope),
        IpcRequest::UnregisterHotkey { hotkey, scope } => {
            hotkeys::unregister_hotkey(app, &hotkey, scope)
        }
        IpcRequest::UnregisterAllHotkeys { scope } => hotkeys::unregister_all_hotkeys(app, scope),
        IpcRequest::KeyDown(event) => hotkeys::key_down(app, &event),
        IpcRequest::LoadConfig {} => config::load_config(app),
        IpcRequest::SaveConfig { buttons } => config::save_config(app, buttons),
        IpcRequest::LoadSettings {} => config::load_settings(app),
        IpcRequest::SaveSettings { settings } => config::save_settings(app, &settings),
        IpcRequest::SaveSound {
            category,
            position,
            name,
            payload,
        } => config::save_sound(app, &category, position, &name, payload),
        IpcRequest::SoundsByCategory { category } => config::sounds_by_category(app, &category),
        IpcRequest::CheckExternalPlayer {} => window::check_external_player(app),
        IpcRequest::ControlExternalAudio { action } => window::control_external_audio(app, action),
        IpcRequest::CloseWindow { quit } => window::close_window(app, quit),
        IpcRequest::MinimizeWindow {} => window::minimize_window(app),
    }
}

/// Parse, run and answer one input line.
pub fn handle_line(app: &mut Soundboard, line: &str) -> Outgoing {
    match IpcEnvelope::parse(line) {
        Ok(envelope) => match handle(app, envelope.request) {
            Ok(value) => Outgoing::ok(envelope.id, value),
            Err(message) => Outgoing::err(Some(envelope.id), message),
        },
        Err(e) => {
            log::warn!("Rejected IPC message: {}", e);
            Outgoing::err(IpcEnvelope::peek_id(line), e.to_string())
        }
    }
}

/// Write one message as a single line on stdout.
pub fn write_message(message: &Outgoing) -> std::io::Result<()> {
    let line = serde_json::to_string(message)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()
}

/// Fire target that reports triggered buttons on stdout. A closed stdout
/// means the UI process is gone.
pub struct StdoutSink;

impl FireSink for StdoutSink {
    fn deliver(&mut self, action: &ActionId) -> Result<(), TargetGone> {
        let message = Outgoing::HotkeyTriggered {
            button_id: action.to_string(),
        };
        write_message(&message).map_err(|_| TargetGone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_register_defaults_to_global() {
        let line = r#"{"id":1,"request":{"channel":"register-hotkey","payload":{"hotkey":"F5","buttonId":"b3"}}}"#;
        let envelope = IpcEnvelope::parse(line).unwrap();
        assert_eq!(envelope.id, 1);
        match envelope.request {
            IpcRequest::RegisterHotkey {
                hotkey,
                button_id,
                scope,
            } => {
                assert_eq!(hotkey, "F5");
                assert_eq!(button_id, "b3");
                assert_eq!(scope, Scope::Global);
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_parse_payloadless_channel() {
        let envelope = IpcEnvelope::parse(r#"{"id":2,"request":{"channel":"load-config"}}"#).unwrap();
        assert!(matches!(envelope.request, IpcRequest::LoadConfig {}));

        let envelope =
            IpcEnvelope::parse(r#"{"id":3,"request":{"channel":"unregister-all-hotkeys"}}"#).unwrap();
        assert!(matches!(
            envelope.request,
            IpcRequest::UnregisterAllHotkeys { scope: None }
        ));
    }

    #[test]
    fn test_parse_rejects_bad_messages() {
        assert!(IpcEnvelope::parse("not json").is_err());
        assert!(IpcEnvelope::parse(r#"{"id":4,"request":{"channel":"format-disk"}}"#).is_err());
        assert!(matches!(
            IpcEnvelope::parse(
                r#"{"id":5,"request":{"channel":"register-hotkey","payload":{"hotkey":" ","buttonId":"b"}}}"#
            ),
            Err(IpcError::Invalid(_))
        ));
        assert!(IpcEnvelope::parse(
            r#"{"id":6,"request":{"channel":"save-sound","payload":{"category":"a","position":-1,"name":"n","payload":[]}}}"#
        )
        .is_err());
        assert_eq!(IpcEnvelope::peek_id(r#"{"id":9,"request":{}}"#), Some(9));
    }

    #[test]
    fn test_outgoing_shape() {
        let fired = serde_json::to_value(Outgoing::HotkeyTriggered {
            button_id: "b1".to_string(),
        })
        .unwrap();
        assert_eq!(fired, serde_json::json!({"type": "hotkey-triggered", "buttonId": "b1"}));

        let reply = serde_json::to_value(Outgoing::err(None, "nope".to_string())).unwrap();
        assert_eq!(
            reply,
            serde_json::json!({"type": "response", "id": null, "ok": false, "value": "nope"})
        );
    }
}
