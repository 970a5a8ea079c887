use std::io::BufRead;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

pub mod app;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod dispatcher;
pub mod external_player;
pub mod hotkeys;
pub mod keys;
pub mod local;
pub mod registry;
pub mod settings;
pub mod state;
pub mod storage;

#[cfg(test)]
mod tests;

use app::Soundboard;
use commands::{handle_line, write_message, Outgoing, StdoutSink};
use config::{default_data_dir, ConfigFacade};
use hotkeys::{
    forward_pressed_events, pump_platform_events, HotkeyId, OsShortcutBackend, ShortcutBackend,
    UnavailableBackend,
};
use state::Lifecycle;
use storage::SecureStore;

/// Everything the control loop reacts to
enum LoopEvent {
    Hotkey(HotkeyId),
    Ipc(String),
    InputClosed,
}

/// How long the control loop waits for an event before pumping the
/// platform event queue again
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// Serialise OS hotkey events and IPC lines onto the calling thread, which
/// must be the one that owns the shortcut backend. `pump` runs between
/// waits so the platform can deliver hotkey messages. Returns once input
/// closes, a reply can't be written, or the app stops running.
fn control_loop<P, W>(app: &mut Soundboard, rx: &mpsc::Receiver<LoopEvent>, mut pump: P, mut reply: W)
where
    P: FnMut(),
    W: FnMut(&Outgoing) -> std::io::Result<()>,
{
    loop {
        pump();
        let event = match rx.recv_timeout(PUMP_INTERVAL) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        match event {
            LoopEvent::Hotkey(id) => {
                app.handle_global_event(id);
            }
            LoopEvent::Ipc(line) => {
                let outgoing = handle_line(app, &line);
                if let Err(e) = reply(&outgoing) {
                    log::error!("Failed to write IPC reply: {}", e);
                    break;
                }
            }
            LoopEvent::InputClosed => {
                log::info!("IPC input closed");
                break;
            }
        }
        if !app.lifecycle().is_running() {
            break;
        }
    }
}

fn shortcut_backend() -> Box<dyn ShortcutBackend> {
    match OsShortcutBackend::new() {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            log::warn!("Global shortcuts disabled: {}", e);
            Box::new(UnavailableBackend::new(e.to_string()))
        }
    }
}

/// Read IPC lines from stdin until the UI process closes it.
fn spawn_stdin_reader(tx: mpsc::Sender<LoopEvent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Failed to read IPC input: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if tx.send(LoopEvent::Ipc(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(LoopEvent::InputClosed);
    });
}

pub fn run() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = default_data_dir();
    log::info!("Data directory: {}", data_dir.display());
    let store = match SecureStore::open(data_dir) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to open data directory: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = Soundboard::new(
        ConfigFacade::new(Arc::new(store)),
        shortcut_backend(),
        Arc::new(Lifecycle::new()),
    );
    app.attach_target(Box::new(StdoutSink));
    app.arm_saved_buttons();

    let (tx, rx) = mpsc::channel();
    {
        let tx = tx.clone();
        forward_pressed_events(move |id| tx.send(LoopEvent::Hotkey(id)).is_ok());
    }
    spawn_stdin_reader(tx);

    log::info!("Soundboard ready");
    control_loop(&mut app, &rx, pump_platform_events, write_message);
    app.shutdown();
}
