//! Cross-module scenarios and the shared test harness.

mod end_to_end;

use std::sync::Arc;
use tempfile::TempDir;

use crate::app::Soundboard;
use crate::config::ConfigFacade;
use crate::dispatcher::testing::RecordingSink;
use crate::hotkeys::testing::FakeBackend;
use crate::keys::Platform;
use crate::state::Lifecycle;
use crate::storage::SecureStore;

/// A soundboard wired to a fake OS shortcut facility and a recording target,
/// backed by a throwaway data directory.
pub(crate) struct Harness {
    pub _dir: TempDir,
    pub app: Soundboard,
    pub os: FakeBackend,
    pub sink: RecordingSink,
}

pub(crate) fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let (app, os, sink) = soundboard_at(&dir);
    Harness { _dir: dir, app, os, sink }
}

pub(crate) fn soundboard_at(dir: &TempDir) -> (Soundboard, FakeBackend, RecordingSink) {
    let store = SecureStore::open(dir.path().to_path_buf()).unwrap();
    let os = FakeBackend::default();
    let sink = RecordingSink::default();
    let mut app = Soundboard::with_platform(
        ConfigFacade::new(Arc::new(store)),
        Box::new(os.clone()),
        Arc::new(Lifecycle::new()),
        Platform::Other,
    );
    app.attach_target(Box::new(sink.clone()));
    (app, os, sink)
}
