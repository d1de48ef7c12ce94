//! Favorite toggle guard window.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardState {
    Idle,
    Guarding { until: Instant },
}

/// Suppresses restarts for a while after each favorite toggle.
///
/// Every toggle re-arms the deadline. Restarts requested while guarding
/// collapse into one pending restart, released when the window closes.
#[derive(Debug)]
pub(crate) struct GuardWindow {
    window: Duration,
    state: GuardState,
    pending_restart: bool,
}

impl GuardWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: GuardState::Idle,
            pending_restart: false,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, GuardState::Guarding { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            GuardState::Idle => None,
            GuardState::Guarding { until } => Some(until),
        }
    }

    #[cfg(test)]
    pub fn has_pending_restart(&self) -> bool {
        self.pending_restart
    }

    /// Open the window, or push its deadline out to `now + window`.
    pub fn arm(&mut self, now: Instant) {
        self.state = GuardState::Guarding {
            until: now + self.window,
        };
    }

    pub fn defer_restart(&mut self) {
        self.pending_restart = true;
    }

    /// Close the window if its deadline has passed.
    ///
    /// Returns true when a deferred restart must be issued now. A window that
    /// was re-armed after the timer was scheduled stays open.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.state {
            GuardState::Guarding { until } if now >= until => {
                self.state = GuardState::Idle;
                std::mem::take(&mut self.pending_restart)
            }
            _ => false,
        }
    }
}
