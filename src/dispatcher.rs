use std::sync::Arc;

use crate::registry::ActionId;
use crate::state::Lifecycle;

/// The fire target (the UI layer) has gone away.
#[derive(Debug, thiserror::Error)]
#[error("fire target is gone")]
pub struct TargetGone;

/// Receiver of fired actions; the `onFired` side of the UI boundary.
pub trait FireSink: Send {
    fn deliver(&mut self, action: &ActionId) -> Result<(), TargetGone>;
}

/// Which listener path produced a fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSource {
    Global,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// No target attached, or the target vanished; nothing was delivered.
    NoTarget,
    /// The app is shutting down; fires are dropped.
    ShuttingDown,
}

/// Single entry point for fired bindings.
///
/// A physical key is live in at most one scope at a time (the registry
/// enforces that at bind time), so every press reaches `fire` once.
pub struct Dispatcher {
    target: Option<Box<dyn FireSink>>,
    lifecycle: Arc<Lifecycle>,
    delivered: u64,
}

impl Dispatcher {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            target: None,
            lifecycle,
            delivered: 0,
        }
    }

    pub fn attach_target(&mut self, target: Box<dyn FireSink>) {
        self.target = Some(target);
    }

    pub fn detach_target(&mut self) {
        self.target = None;
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn fire(&mut self, action: &ActionId, source: FireSource) -> DispatchOutcome {
        if !self.lifecycle.is_running() {
            log::debug!("Dropping {:?} fire of {} during shutdown", source, action);
            return DispatchOutcome::ShuttingDown;
        }

        let Some(target) = self.target.as_mut() else {
            log::debug!("No fire target for {}", action);
            return DispatchOutcome::NoTarget;
        };

        match target.deliver(action) {
            Ok(()) => {
                self.delivered += 1;
                log::info!("Hotkey triggered: {} ({:?})", action, source);
                DispatchOutcome::Delivered
            }
            Err(TargetGone) => {
                log::debug!("Fire target gone while delivering {}; detaching", action);
                self.target = None;
                DispatchOutcome::NoTarget
            }
        }
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records every delivered action.
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub fired: Arc<Mutex<Vec<ActionId>>>,
        pub closed: Arc<Mutex<bool>>,
    }

    impl RecordingSink {
        pub fn fired(&self) -> Vec<String> {
            self.fired
                .lock()
                .unwrap()
                .iter()
                .map(|a| a.to_string())
                .collect()
        }

        pub fn close(&self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    impl FireSink for RecordingSink {
        fn deliver(&mut self, action: &ActionId) -> Result<(), TargetGone> {
            if *self.closed.lock().unwrap() {
                return Err(TargetGone);
            }
            self.fired.lock().unwrap().push(action.clone());
            Ok(())
        }
    }
}
