//! The manager's single pending timer.
//!
//! States that need to wait (a reconnect back-off, a disconnect drain) ask
//! for a timer and get a [`TimerTicket`] back. Whoever drives the manager
//! sleeps for the requested delay and hands the ticket back through
//! `on_timer`. Tickets are never reused, so a ticket that no longer matches
//! the pending timer is stale and dropped.

use std::fmt;
use std::time::Duration;

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerTicket(u64);

impl TimerTicket {
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// A timer the manager is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub ticket: TimerTicket,
    /// How long after scheduling the timer should fire.
    pub delay: Duration,
}

/// At most one pending timer plus the ticket counter.
#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    next_ticket: u64,
    pending: Option<PendingTimer>,
}

impl TimerSlot {
    /// Schedules a timer, replacing any pending one.
    pub(crate) fn schedule(&mut self, delay: Duration) -> TimerTicket {
        self.next_ticket += 1;
        let ticket = TimerTicket(self.next_ticket);
        if let Some(replaced) = self.pending.replace(PendingTimer { ticket, delay }) {
            tracing::debug!(ticket = %replaced.ticket, "pending timer replaced");
        }
        tracing::debug!(%ticket, ?delay, "timer scheduled");
        ticket
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(cancelled) = self.pending.take() {
            tracing::debug!(ticket = %cancelled.ticket, "timer cancelled");
        }
    }

    pub(crate) fn pending(&self) -> Option<PendingTimer> {
        self.pending
    }

    /// Consumes the pending timer if `ticket` matches it.
    pub(crate) fn fire(&mut self, ticket: TimerTicket) -> bool {
        match self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}
