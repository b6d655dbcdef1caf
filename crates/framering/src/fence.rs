//! Pollable, non-blocking completion fences for ring slots.

use parking_lot::Mutex;
use std::sync::Arc;

/// Lifecycle of a slot's completion fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceState {
    /// No work ever armed; the slot may be overwritten.
    Idle,
    /// Work in flight; the slot must not be read or overwritten.
    Pending,
    /// Work complete; the slot may be read, and later overwritten.
    Signaled,
}

/// Shared completion marker. The ring arms it when it hands work to the
/// transport; the transport's completion callback signals it. Clones share
/// one state cell, so a clone can cross into a GPU callback.
///
/// Legal transitions: `Idle|Signaled → Pending` (arm) and
/// `Pending → Signaled` (signal); everything else is rejected or ignored.
#[derive(Debug, Clone)]
pub struct Fence {
    state: Arc<Mutex<FenceState>>,
}

impl Default for Fence {
    fn default() -> Self {
        Self::new()
    }
}

impl Fence {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FenceState::Idle)),
        }
    }

    /// Current state; a strictly non-blocking poll.
    #[inline]
    pub fn state(&self) -> FenceState {
        *self.state.lock()
    }

    /// Arms the fence for newly submitted work. Returns false (and changes
    /// nothing) when work is already in flight.
    #[must_use]
    pub fn try_arm(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            FenceState::Pending => false,
            FenceState::Idle | FenceState::Signaled => {
                *state = FenceState::Pending;
                true
            }
        }
    }

    /// Marks in-flight work complete. A signal for a fence that is not
    /// `Pending` is ignored.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        if *state == FenceState::Pending {
            *state = FenceState::Signaled;
        } else {
            log::trace!("ignoring signal in state {:?}", *state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let fence = Fence::new();
        assert_eq!(fence.state(), FenceState::Idle);

        assert!(fence.try_arm());
        assert_eq!(fence.state(), FenceState::Pending);

        // Double-arm rejected while in flight.
        assert!(!fence.try_arm());
        assert_eq!(fence.state(), FenceState::Pending);

        fence.signal();
        assert_eq!(fence.state(), FenceState::Signaled);

        // Re-arm from Signaled is the overwrite path.
        assert!(fence.try_arm());
        assert_eq!(fence.state(), FenceState::Pending);
    }

    #[test]
    fn test_stray_signal_is_ignored() {
        let fence = Fence::new();
        fence.signal();
        assert_eq!(fence.state(), FenceState::Idle);

        assert!(fence.try_arm());
        fence.signal();
        fence.signal();
        assert_eq!(fence.state(), FenceState::Signaled);
    }

    #[test]
    fn test_clones_share_state() {
        let fence = Fence::new();
        let remote = fence.clone();
        assert!(fence.try_arm());
        remote.signal();
        assert_eq!(fence.state(), FenceState::Signaled);
    }
}
