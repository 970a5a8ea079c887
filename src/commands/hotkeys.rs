//! IPC commands for hotkey registration and in-window key events.

use serde_json::{json, Value};

use crate::app::Soundboard;
use crate::local::{KeyDownOutcome, KeyEvent};
use crate::registry::{ActionId, Scope};

/// Bind `hotkey` to the button. Answers `true`/`false`; a refused bind is a
/// normal outcome, not a transport error.
pub fn register_hotkey(
    app: &mut Soundboard,
    hotkey: &str,
    button_id: &str,
    scope: Scope,
) -> Result<Value, String> {
    log::debug!("register-hotkey {} -> {} ({})", hotkey, button_id, scope);
    Ok(Value::Bool(app.request_bind(
        hotkey,
        ActionId::new(button_id),
        scope,
    )))
}

pub fn unregister_hotkey(app: &mut Soundboard, hotkey: &str, scope: Scope) -> Result<Value, String> {
    Ok(Value::Bool(app.request_unbind(hotkey, scope)))
}

pub fn unregister_all_hotkeys(app: &mut Soundboard, scope: Option<Scope>) -> Result<Value, String> {
    app.unbind_all(scope);
    Ok(Value::Bool(true))
}

/// Feed a focused-window keydown to the local listener. The UI must cancel
/// the browser default when `preventDefault` comes back true.
pub fn key_down(app: &mut Soundboard, event: &KeyEvent) -> Result<Value, String> {
    let outcome = app.handle_key_down(event);
    Ok(json!({
        "handled": outcome == KeyDownOutcome::Handled,
        "preventDefault": outcome.prevent_default(),
    }))
}
