//! Outbound link between the runtime and the host processor.
//!
//! Producers on runtime threads enqueue [`MessageToHost`] handles; the host
//! side drives a single blocking consumer through an RPC boundary that calls
//! [`HostLink::next_message_for_host`] with a destination buffer. Shutdown
//! threads a sentinel through the same queue so a blocked consumer wakes
//! exactly once and knows to stop calling.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info};
use parking_lot::Mutex;
use serde::Serialize;
use transport::BlockingQueue;

use runtime_abi::{CompletionSinkHandle, MessageToHost};

use crate::error::LinkResult;
use crate::health::{LinkHealth, LinkHealthSnapshot};

/// Depth of the outbound queue, sized for worst-case burst fan-in from
/// application producers between host wakeups.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 32;

/// Attempts granted to each bounded shutdown phase (sentinel push, drain wait).
pub const SHUTDOWN_ATTEMPTS: u32 = 5;

/// Sleep between attempts within a shutdown phase.
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Largest payload length the RPC length field can represent.
const MAX_WIRE_PAYLOAD: usize = u32::MAX as usize;

/// Element of the outbound queue: a real message or the shutdown sentinel.
enum Outbound {
    Message(Arc<MessageToHost>),
    Shutdown,
}

/// Lifecycle of the outbound link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LinkState {
    /// Accepting messages and serving dequeues.
    Running,
    /// Shutdown requested; sentinel not yet enqueued.
    SentinelPending,
    /// Sentinel enqueued; waiting for the consumer to drain the queue.
    Draining,
    /// Terminal state; no further messages flow.
    Stopped,
}

/// Protocol faults detected while handing a message to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolFault {
    /// The pending payload exceeds the host's buffer or the wire length
    /// field. Nothing was copied.
    PayloadOverrun {
        /// Length of the payload that could not be represented.
        payload_len: usize,
        /// Length of the destination buffer the host supplied.
        buffer_len: usize,
    },
}

/// Where a blocking dequeue ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostDequeue {
    /// A payload was copied into the destination buffer.
    Delivered {
        /// Number of bytes written at the front of the buffer.
        len: usize,
    },
    /// The link is shutting down; the consumer must stop calling.
    ShuttingDown,
    /// The pending message could not be handed over; see [`ProtocolFault`].
    Fault(ProtocolFault),
}

/// Owner of the outbound queue and the shutdown protocol.
///
/// The completion sink is injected at construction so the runtime decides
/// where finished messages return to; the link itself holds no global state.
pub struct HostLink {
    queue: BlockingQueue<Outbound>,
    state: Mutex<LinkState>,
    health: LinkHealth,
    completions: CompletionSinkHandle,
}

impl HostLink {
    /// Creates a link with the standard outbound queue depth.
    pub fn new(completions: CompletionSinkHandle) -> LinkResult<Self> {
        Self::with_queue_capacity(OUTBOUND_QUEUE_CAPACITY, completions)
    }

    /// Creates a link with a caller-chosen outbound queue depth.
    pub fn with_queue_capacity(
        capacity: usize,
        completions: CompletionSinkHandle,
    ) -> LinkResult<Self> {
        Ok(Self {
            queue: BlockingQueue::with_capacity(capacity)?,
            state: Mutex::new(LinkState::Running),
            health: LinkHealth::default(),
            completions,
        })
    }

    /// Enqueues `message` for delivery to the host. Never blocks.
    ///
    /// Returns `false` when the queue is full or the link has left
    /// [`LinkState::Running`]; the producer keeps its handle and no
    /// completion follows. On `true` the message is owned by the link until
    /// the completion sink hands it back. A send racing [`HostLink::shutdown`]
    /// may land behind the sentinel; such messages are abandoned with the
    /// link and surface as a drain timeout.
    pub fn send_message(&self, message: Arc<MessageToHost>) -> bool {
        if *self.state.lock() != LinkState::Running {
            self.health.note_rejected();
            return false;
        }
        match self.queue.try_push(Outbound::Message(message)) {
            Ok(()) => {
                self.health.note_accepted();
                true
            }
            Err(_) => {
                self.health.note_rejected();
                false
            }
        }
    }

    /// Blocks until an outbound message exists, then copies its payload into
    /// `dest` and returns how the handover went.
    ///
    /// Exactly one completion is delivered per dequeued message, for
    /// successful copies and faults alike. A payload that cannot fit `dest`
    /// (or the wire length field) produces [`HostDequeue::Fault`] with no
    /// partial copy; the link stays usable for subsequent messages.
    pub fn next_message_for_host(&self, dest: &mut [u8]) -> HostDequeue {
        if *self.state.lock() == LinkState::Stopped && self.queue.is_empty() {
            return HostDequeue::ShuttingDown;
        }
        match self.queue.pop() {
            Outbound::Shutdown => {
                debug!("host consumer observed shutdown sentinel");
                HostDequeue::ShuttingDown
            }
            Outbound::Message(message) => {
                let payload_len = message.payload.len();
                if payload_len > dest.len() || payload_len > MAX_WIRE_PAYLOAD {
                    // Must not travel the outbound path it just failed;
                    // process-local log plus health latch only.
                    error!(
                        "outbound payload of {payload_len} bytes overruns host buffer of {} bytes; dropping",
                        dest.len()
                    );
                    self.health.note_fault();
                    let fault = ProtocolFault::PayloadOverrun {
                        payload_len,
                        buffer_len: dest.len(),
                    };
                    self.completions.on_message_to_host_complete(message);
                    return HostDequeue::Fault(fault);
                }
                dest[..payload_len].copy_from_slice(&message.payload);
                self.health.note_delivered();
                self.completions.on_message_to_host_complete(message);
                HostDequeue::Delivered { len: payload_len }
            }
        }
    }

    /// Accepts a raw payload pushed down from the host processor.
    ///
    /// Inbound routing is not wired up yet: the payload is acknowledged and
    /// dropped so the host side never blocks on the runtime.
    // TODO: route inbound payloads to per-app delivery once the event loop
    // grows an inbound queue.
    pub fn deliver_from_host(&self, payload: &[u8]) -> bool {
        debug!("got {} bytes from the host; inbound routing pending", payload.len());
        true
    }

    /// Stops the link, waking the blocked host consumer via a queued sentinel.
    ///
    /// Bounded by construction: each phase makes [`SHUTDOWN_ATTEMPTS`]
    /// attempts with [`SHUTDOWN_POLL_INTERVAL`] between them, so the call
    /// returns within a handful of intervals even when the consumer is gone.
    /// Messages still queued when a phase gives up are abandoned, their
    /// completions never fire, and the condition is latched in
    /// [`LinkHealthSnapshot`]. Shutting down a link that already left
    /// `Running` is a no-op.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if *state != LinkState::Running {
                return;
            }
            *state = LinkState::SentinelPending;
        }
        info!("shutting down host link");

        let mut attempts = SHUTDOWN_ATTEMPTS;
        let enqueued = loop {
            if self.queue.try_push(Outbound::Shutdown).is_ok() {
                break true;
            }
            attempts -= 1;
            if attempts == 0 {
                break false;
            }
            thread::sleep(SHUTDOWN_POLL_INTERVAL);
        };

        if !enqueued {
            error!(
                "failed to enqueue shutdown sentinel after {SHUTDOWN_ATTEMPTS} attempts; \
                 the host consumer is likely stuck, stopping with messages queued"
            );
            self.health.note_sentinel_stalled();
            *self.state.lock() = LinkState::Stopped;
            return;
        }

        *self.state.lock() = LinkState::Draining;
        debug!("draining outbound queue");

        let mut polls = SHUTDOWN_ATTEMPTS;
        let drained = loop {
            if self.queue.is_empty() {
                break true;
            }
            polls -= 1;
            if polls == 0 {
                break false;
            }
            thread::sleep(SHUTDOWN_POLL_INTERVAL);
        };

        if drained {
            debug!("outbound queue drained");
        } else {
            error!(
                "host never drained the outbound queue ({} elements left); stopping anyway",
                self.queue.len()
            );
            self.health.note_drain_timed_out();
        }

        *self.state.lock() = LinkState::Stopped;
        info!("host link stopped");
    }

    /// Current lifecycle state; a polling snapshot.
    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Sticky fault latches and traffic counters for this link.
    pub fn health(&self) -> LinkHealthSnapshot {
        self.health.snapshot()
    }
}
