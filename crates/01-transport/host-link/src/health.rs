//! Health tracking for the host link.
//!
//! Faults on the host-facing path cannot be reported through the link itself:
//! a diagnostic that rides the outbound queue it just failed would loop. The
//! link instead latches sticky flags and counts traffic here, giving the
//! runtime a transport-independent view it can poll or dump.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Latch-style fault indicators and traffic counters for one link.
///
/// Flags only ever go from clear to set; counters saturate at `u32::MAX`.
#[derive(Default)]
pub(crate) struct LinkHealth {
    sentinel_stalled: AtomicBool,
    drain_timed_out: AtomicBool,
    protocol_fault: AtomicBool,
    accepted: AtomicU32,
    rejected: AtomicU32,
    delivered: AtomicU32,
    faults: AtomicU32,
}

impl LinkHealth {
    pub(crate) fn note_sentinel_stalled(&self) {
        self.sentinel_stalled.store(true, Ordering::Relaxed);
    }

    pub(crate) fn note_drain_timed_out(&self) {
        self.drain_timed_out.store(true, Ordering::Relaxed);
    }

    pub(crate) fn note_accepted(&self) {
        saturating_bump(&self.accepted);
    }

    pub(crate) fn note_rejected(&self) {
        saturating_bump(&self.rejected);
    }

    pub(crate) fn note_delivered(&self) {
        saturating_bump(&self.delivered);
    }

    pub(crate) fn note_fault(&self) {
        self.protocol_fault.store(true, Ordering::Relaxed);
        saturating_bump(&self.faults);
    }

    pub(crate) fn snapshot(&self) -> LinkHealthSnapshot {
        LinkHealthSnapshot {
            sentinel_stalled: self.sentinel_stalled.load(Ordering::Relaxed),
            drain_timed_out: self.drain_timed_out.load(Ordering::Relaxed),
            protocol_fault: self.protocol_fault.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

fn saturating_bump(counter: &AtomicU32) {
    let mut current = counter.load(Ordering::Relaxed);
    while current != u32::MAX {
        match counter.compare_exchange_weak(
            current,
            current + 1,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

/// Point-in-time copy of the link's health, safe to hold across operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LinkHealthSnapshot {
    /// Shutdown could not enqueue its sentinel within the bounded retries.
    pub sentinel_stalled: bool,
    /// The queue still held messages when the drain window closed.
    pub drain_timed_out: bool,
    /// A dequeued payload could not be represented in the host's buffer.
    pub protocol_fault: bool,
    /// Messages accepted into the outbound queue.
    pub accepted: u32,
    /// Messages refused at submission (queue full or link not running).
    pub rejected: u32,
    /// Messages copied out toward the host.
    pub delivered: u32,
    /// Dequeues that ended in a protocol fault.
    pub faults: u32,
}
