use std::sync::atomic::{AtomicU8, Ordering};

/// Application lifecycle. Transitions only move forward:
/// `Running -> Closing -> Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LifecyclePhase {
    Running = 0,
    /// Shutdown has started; global shortcuts are being released
    Closing = 1,
    /// Shortcuts are released and the window may be dropped
    Terminated = 2,
}

impl LifecyclePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecyclePhase::Running,
            1 => LifecyclePhase::Closing,
            _ => LifecyclePhase::Terminated,
        }
    }
}

/// What the window layer should do with a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Not quitting: keep running in the background with the window hidden
    Hide,
    /// Quitting: the caller must release shortcuts, then call
    /// [`Lifecycle::mark_terminated`]
    Shutdown,
    /// A shutdown is already in progress or finished
    AlreadyClosing,
}

/// Lifecycle state shared by reference with every component that needs to
/// know whether the app is still live.
#[derive(Debug, Default)]
pub struct Lifecycle {
    phase: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LifecyclePhase {
        LifecyclePhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.phase() == LifecyclePhase::Running
    }

    /// Move from Running to Closing. Returns `false` if shutdown had already begun.
    pub fn begin_closing(&self) -> bool {
        self.phase
            .compare_exchange(
                LifecyclePhase::Running as u8,
                LifecyclePhase::Closing as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub fn mark_terminated(&self) {
        let previous = self
            .phase
            .swap(LifecyclePhase::Terminated as u8, Ordering::SeqCst);
        if previous == LifecyclePhase::Running as u8 {
            log::warn!("Lifecycle terminated without passing through Closing");
        }
    }

    pub fn request_close(&self, quitting: bool) -> CloseAction {
        if !quitting {
            return if self.is_running() {
                CloseAction::Hide
            } else {
                CloseAction::AlreadyClosing
            };
        }
        if self.begin_closing() {
            CloseAction::Shutdown
        } else {
            CloseAction::AlreadyClosing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_without_quit_hides() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.request_close(false), CloseAction::Hide);
        assert!(lifecycle.is_running());
    }

    #[test]
    fn test_quit_transitions_once() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.request_close(true), CloseAction::Shutdown);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Closing);
        assert_eq!(lifecycle.request_close(true), CloseAction::AlreadyClosing);
        assert_eq!(lifecycle.request_close(false), CloseAction::AlreadyClosing);

        lifecycle.mark_terminated();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Terminated);
        assert!(!lifecycle.begin_closing());
    }
}
