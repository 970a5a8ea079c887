//! End-to-end scenarios driven the way the UI drives the backend: one JSON
//! line in, one JSON reply out.

use serde_json::{json, Value};
use tempfile::TempDir;

use std::cell::Cell;
use std::sync::mpsc;

use super::{harness, soundboard_at};
use crate::{control_loop, LoopEvent};
use crate::commands::{handle_line, Outgoing};
use crate::registry::{ActionId, Scope};
use crate::settings::{DocumentKind, SoundLibrary};
use crate::storage::SecureStore;

fn send(app: &mut crate::app::Soundboard, id: u64, channel: &str, payload: Value) -> (bool, Value) {
    let line = json!({ "id": id, "request": { "channel": channel, "payload": payload } }).to_string();
    match handle_line(app, &line) {
        Outgoing::Response { id: reply_id, ok, value } => {
            assert_eq!(reply_id, Some(id));
            (ok, value)
        }
        other => panic!("expected a response, got {:?}", other),
    }
}

#[test]
fn test_global_hotkey_fires_once_until_cleared() {
    let mut h = harness();
    let (ok, value) = send(
        &mut h.app,
        1,
        "register-hotkey",
        json!({ "hotkey": "F5", "buttonId": "play-sound-3" }),
    );
    assert!(ok);
    assert_eq!(value, json!(true));

    let id = h.os.press("F5").unwrap();
    h.app.handle_global_event(id);
    assert_eq!(h.sink.fired(), vec!["play-sound-3"]);

    let (ok, _) = send(&mut h.app, 2, "unregister-all-hotkeys", json!({}));
    assert!(ok);
    assert!(h.os.press("F5").is_none());
    assert!(h.app.handle_global_event(id).is_none());
    assert_eq!(h.sink.fired(), vec!["play-sound-3"]);
}

#[test]
fn test_local_binding_only_fires_in_window() {
    let mut h = harness();
    send(
        &mut h.app,
        1,
        "register-hotkey",
        json!({ "hotkey": "Ctrl+B", "buttonId": "b", "scope": "local" }),
    );
    assert!(!h.os.is_grabbed("Control+B"));

    let (_, reply) = send(
        &mut h.app,
        2,
        "key-down",
        json!({ "key": "b", "code": "KeyB", "ctrl": true }),
    );
    assert_eq!(reply["preventDefault"], json!(true));

    let (_, reply) = send(
        &mut h.app,
        3,
        "key-down",
        json!({ "key": "b", "code": "KeyB", "ctrl": true, "repeat": true }),
    );
    assert_eq!(reply["preventDefault"], json!(true));
    assert_eq!(h.sink.fired(), vec!["b"]);
}

#[test]
fn test_sounds_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let (mut app, _os, _sink) = soundboard_at(&dir);
        let (ok, value) = send(
            &mut app,
            1,
            "save-sound",
            json!({ "category": "drums", "position": 0, "name": "kick", "payload": [1, 2, 3] }),
        );
        assert!(ok);
        assert_eq!(value["name"], json!("kick"));
    }

    let store = SecureStore::open(dir.path().to_path_buf()).unwrap();
    let sounds: SoundLibrary = store.try_load().unwrap();
    let kick = sounds.get("drums", 0).unwrap();
    assert_eq!(kick.name, "kick");
    assert_eq!(kick.payload, vec![1, 2, 3]);
    assert!(store.path_for(DocumentKind::Sounds).exists());
}

#[test]
fn test_saved_buttons_rearm_after_restart() {
    let dir = TempDir::new().unwrap();
    {
        let (mut app, _os, _sink) = soundboard_at(&dir);
        let (ok, value) = send(
            &mut app,
            1,
            "save-config",
            json!({ "buttons": [{
                "id": "btn-1",
                "category": "fx",
                "position": 0,
                "label": "horn",
                "hotkey": "Ctrl+H",
            }]}),
        );
        assert!(ok);
        assert_eq!(value, json!(true));
    }

    let (mut app, os, sink) = soundboard_at(&dir);
    assert_eq!(app.arm_saved_buttons(), 1);
    assert_eq!(app.lookup("Ctrl+H", Scope::Global), Some(ActionId::from("btn-1")));

    let id = os.press("Control+H").unwrap();
    app.handle_global_event(id);
    assert_eq!(sink.fired(), vec!["btn-1"]);
}

#[test]
fn test_bad_lines_get_error_replies() {
    let mut h = harness();
    match handle_line(&mut h.app, "{ not json") {
        Outgoing::Response { id, ok, .. } => {
            assert_eq!(id, None);
            assert!(!ok);
        }
        other => panic!("unexpected {:?}", other),
    }

    let (ok, _) = send(&mut h.app, 7, "register-hotkey", json!({ "hotkey": "F5" }));
    assert!(!ok);
    assert_eq!(h.os.state.lock().unwrap().register_calls, 0);
}

#[test]
fn test_quit_over_ipc_releases_os_grabs() {
    let mut h = harness();
    send(&mut h.app, 1, "register-hotkey", json!({ "hotkey": "F8", "buttonId": "x" }));
    let (_, reply) = send(&mut h.app, 2, "close-window", json!({ "quit": true }));
    assert_eq!(reply, json!({ "action": "quit" }));
    assert!(!h.os.is_grabbed("F8"));
    assert!(!h.app.lifecycle().is_running());
}

#[test]
fn test_control_loop_pumps_and_routes_events() {
    let mut h = harness();
    assert!(h.app.request_bind("F5", "play-sound-3".into(), Scope::Global));
    let id = h.os.press("F5").unwrap();

    let (tx, rx) = mpsc::channel();
    tx.send(LoopEvent::Hotkey(id)).unwrap();
    tx.send(LoopEvent::Ipc(
        r#"{"id":1,"request":{"channel":"load-config"}}"#.to_string(),
    ))
    .unwrap();
    tx.send(LoopEvent::Ipc(
        r#"{"id":2,"request":{"channel":"close-window","payload":{"quit":true}}}"#.to_string(),
    ))
    .unwrap();
    tx.send(LoopEvent::Hotkey(id)).unwrap();

    let pumps = Cell::new(0);
    let mut replies = Vec::new();
    control_loop(
        &mut h.app,
        &rx,
        || pumps.set(pumps.get() + 1),
        |message| {
            replies.push(serde_json::to_value(message).unwrap());
            Ok(())
        },
    );

    // The quit ends the loop before the last queued press is handled.
    assert_eq!(h.sink.fired(), vec!["play-sound-3"]);
    assert!(pumps.get() >= 3);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1]["value"], json!({ "action": "quit" }));
    assert!(!h.os.is_grabbed("F5"));
}

#[test]
fn test_control_loop_stops_when_input_closes() {
    let mut h = harness();
    let (tx, rx) = mpsc::channel();
    tx.send(LoopEvent::InputClosed).unwrap();
    tx.send(LoopEvent::Ipc(r#"{"id":1,"request":{"channel":"load-config"}}"#.to_string()))
        .unwrap();

    let mut replies = 0;
    control_loop(&mut h.app, &rx, || {}, |_| {
        replies += 1;
        Ok(())
    });
    assert_eq!(replies, 0);
    assert!(h.app.lifecycle().is_running());
}
