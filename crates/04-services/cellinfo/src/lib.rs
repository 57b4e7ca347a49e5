//! Cell environment scans coordinated between apps and the radio driver.
//!
//! The modem services one scan at a time, so the manager admits a single
//! outstanding request and rejects the rest; requesting apps own their own
//! retry. A ticket records who asked and with which cookie so the
//! asynchronous completion can be routed back and tagged.

use log::{debug, error};
use parking_lot::Mutex;
use runtime_abi::{
    AppEvent, AppEventSinkHandle, AppInstanceId, CellInfoEvent, CellScanResult, Cookie,
    RadioDriverHandle,
};
use std::sync::atomic::{AtomicU32, Ordering};

/// Requester identity and correlation cookie for the scan in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    /// App instance the result event goes to.
    pub requester: AppInstanceId,
    /// Correlation value echoed back in the result event.
    pub cookie: Cookie,
}

/// Single-flight coordinator for cell environment scans.
///
/// Driver and event sink are injected at construction; the manager keeps no
/// global state and can be instantiated per radio.
pub struct CellInfoManager {
    driver: RadioDriverHandle,
    events: AppEventSinkHandle,
    // TODO: queue concurrent requests and replay them one at a time instead
    // of rejecting while a scan is in flight.
    pending: Mutex<Option<Ticket>>,
    strays: AtomicU32,
}

impl CellInfoManager {
    /// Creates a manager that scans through `driver` and posts results
    /// through `events`.
    pub fn new(driver: RadioDriverHandle, events: AppEventSinkHandle) -> Self {
        Self {
            driver,
            events,
            pending: Mutex::new(None),
            strays: AtomicU32::new(0),
        }
    }

    /// Capability bits advertised by the underlying driver.
    pub fn capabilities(&self) -> u32 {
        self.driver.capabilities()
    }

    /// Requests a cell environment scan on behalf of `requester`.
    ///
    /// Returns `false` when another request is outstanding or the driver
    /// refuses the scan; either way nothing changed and no event will reach
    /// `requester` for this call. On `true` the requester eventually receives
    /// exactly one [`AppEvent::CellInfo`] tagged with `cookie`.
    pub fn request_cell_info(&self, requester: AppInstanceId, cookie: Cookie) -> bool {
        let mut pending = self.pending.lock();
        if let Some(ticket) = pending.as_ref() {
            debug!(
                "rejecting cell scan from {requester}: {} already has one in flight",
                ticket.requester
            );
            return false;
        }
        *pending = Some(Ticket { requester, cookie });
        // Completions arrive from a separate driver context, never from
        // inside request_cell_scan, so the lock stays held across the call
        // without re-entering.
        if self.driver.request_cell_scan() {
            debug!("cell scan started for {requester} (cookie {cookie})");
            true
        } else {
            debug!("radio driver refused cell scan for {requester}");
            *pending = None;
            false
        }
    }

    /// Delivers a finished scan to whoever requested it.
    ///
    /// The outstanding ticket is taken before the event is posted, so by the
    /// time the requester handles the result a follow-up request is already
    /// admissible. A completion with no outstanding ticket is a driver
    /// protocol violation: logged loudly, counted, and otherwise ignored.
    pub fn on_scan_complete(&self, result: CellScanResult) {
        let taken = self.pending.lock().take();
        match taken {
            Some(Ticket { requester, cookie }) => {
                debug!("cell scan finished; posting result to {requester} (cookie {cookie})");
                self.events
                    .post(requester, AppEvent::CellInfo(CellInfoEvent { cookie, result }));
            }
            None => {
                error!("cell scan completion arrived with no outstanding request; dropping");
                self.strays.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Ticket for the scan currently in flight, if any.
    pub fn pending_request(&self) -> Option<Ticket> {
        *self.pending.lock()
    }

    /// Number of completions that arrived with no outstanding request.
    pub fn stray_completions(&self) -> u32 {
        self.strays.load(Ordering::Relaxed)
    }
}
