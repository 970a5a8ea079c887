//! IPC commands for window lifecycle and the external music player.
//!
//! The window itself belongs to the UI process. These commands update the
//! backend's lifecycle and tell the UI which window action to perform.

use serde_json::{json, Value};

use crate::app::Soundboard;
use crate::commands::ExternalAudioAction;
use crate::state::CloseAction;

fn close_action_name(action: CloseAction) -> &'static str {
    match action {
        CloseAction::Hide => "hide",
        CloseAction::Shutdown => "quit",
        CloseAction::AlreadyClosing => "none",
    }
}

/// Close request from the title bar. Without `quit` the app keeps running in
/// the background and every shortcut stays armed.
pub fn close_window(app: &mut Soundboard, quit: bool) -> Result<Value, String> {
    let action = app.close(quit);
    log::info!("close-window (quit: {}) -> {:?}", quit, action);
    Ok(json!({ "action": close_action_name(action) }))
}

pub fn minimize_window(app: &mut Soundboard) -> Result<Value, String> {
    if !app.lifecycle().is_running() {
        return Ok(json!({ "action": "none" }));
    }
    Ok(json!({ "action": "minimize" }))
}

pub fn check_external_player(app: &mut Soundboard) -> Result<Value, String> {
    Ok(Value::Bool(app.external_player_active()))
}

pub fn control_external_audio(app: &mut Soundboard, action: ExternalAudioAction) -> Result<Value, String> {
    match action {
        ExternalAudioAction::Pause => app.stop_external_player(),
    }
    Ok(Value::Bool(true))
}
