//! Boundary types shared between the link layer, services, and the runtime.
//!
//! This crate defines the protocol boundary between the application runtime
//! and the transport/driver layers, with no app-specific dependencies.

#![allow(missing_docs)]

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Host endpoint value addressing every host-side client at once.
pub const HOST_ENDPOINT_BROADCAST: u16 = 0xFFFE;

/// Capability bit advertised by radio drivers able to service cell scans.
pub const RADIO_CAP_CELL_INFO: u32 = 1 << 0;

/// Identifier of a running application instance inside the runtime.
///
/// Instance ids are assigned by the event-loop layer when an app starts and
/// stay unique for the lifetime of the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AppInstanceId(pub u32);

impl fmt::Display for AppInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app#{}", self.0)
    }
}

/// Opaque correlation value chosen by a requesting app and echoed back
/// verbatim in the matching response event. Never interpreted here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Cookie(pub u64);

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Outbound message addressed to a client on the host processor.
///
/// Producers hand these around by [`Arc`] handle; the transport layer keeps a
/// handle only while the message sits in the outbound queue and returns it
/// through [`CompletionSink::on_message_to_host_complete`] once delivery
/// finished or deterministically failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageToHost {
    /// Instance id of the producing application.
    pub sender_app: AppInstanceId,
    /// Application-defined type code, opaque to the transport.
    pub message_type: u32,
    /// Destination endpoint on the host processor.
    pub host_endpoint: u16,
    /// Marshalled payload bytes, opaque to the transport.
    pub payload: Vec<u8>,
}

impl MessageToHost {
    /// Convenience constructor used by producers and tests.
    pub fn new(
        sender_app: AppInstanceId,
        message_type: u32,
        host_endpoint: u16,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            sender_app,
            message_type,
            host_endpoint,
            payload,
        }
    }
}

/// Receives ownership of outbound messages once transport is done with them.
pub trait CompletionSink {
    /// Called exactly once per accepted message: after its payload was copied
    /// toward the host, or after a deterministic delivery failure. Never
    /// called for messages the queue rejected at submission.
    fn on_message_to_host_complete(&self, message: Arc<MessageToHost>);
}

/// Reasons a radio scan can fail asynchronously.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RadioError {
    #[error("radio driver reported a generic failure")]
    Failure,
    #[error("radio driver is busy with another client")]
    Busy,
    #[error("scan timed out before the modem responded")]
    Timeout,
    #[error("cell scans are not supported by this driver")]
    NotSupported,
}

/// Outcome of an asynchronous cell environment scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellScanResult {
    /// Scan finished; `cells` holds the marshalled cell list exactly as the
    /// driver produced it.
    Completed { cells: Arc<[u8]> },
    /// Scan failed with the given driver error.
    Failed(RadioError),
}

/// Cell scan response delivered to the app that requested it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellInfoEvent {
    /// Correlation value supplied with the request, echoed back unchanged.
    pub cookie: Cookie,
    /// What the scan produced.
    pub result: CellScanResult,
}

/// Events delivered back into application event queues.
///
/// New asynchronous request kinds add variants here; each variant carries the
/// requester's cookie so apps can correlate responses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    /// Result of a cell environment scan.
    CellInfo(CellInfoEvent),
}

/// Routes events into a specific application instance's event queue.
pub trait AppEventSink {
    /// Posts `event` to the instance identified by `app`.
    fn post(&self, app: AppInstanceId, event: AppEvent);
}

/// Platform radio driver as seen by the request coordinator.
pub trait RadioDriver {
    /// Capability bits currently advertised by the modem stack.
    fn capabilities(&self) -> u32;

    /// Starts an asynchronous cell scan.
    ///
    /// Returns `false` when the driver cannot take the request right now; no
    /// completion follows a rejected request. Accepted requests complete from
    /// a separate driver context, never from inside this call.
    fn request_cell_scan(&self) -> bool;
}

/// Handle to the completion sink installed by the runtime.
pub type CompletionSinkHandle = Arc<dyn CompletionSink + Send + Sync>;
/// Handle to the application event router.
pub type AppEventSinkHandle = Arc<dyn AppEventSink + Send + Sync>;
/// Handle to the platform radio driver.
pub type RadioDriverHandle = Arc<dyn RadioDriver + Send + Sync>;
