//! Host link: the outbound message boundary of the runtime.
//!
//! One [`HostLink`] owns the bounded outbound queue, the blocking dequeue
//! entry the host's RPC layer parks in, the completion handoff back to
//! producers, and the sentinel-based shutdown protocol. Faults on the
//! host-facing path are reported through [`LinkHealthSnapshot`] rather than
//! the link itself.

mod error;
mod health;
mod link;

pub use error::{LinkError, LinkResult};
pub use health::LinkHealthSnapshot;
pub use link::{
    HostDequeue, HostLink, LinkState, ProtocolFault, OUTBOUND_QUEUE_CAPACITY, SHUTDOWN_ATTEMPTS,
    SHUTDOWN_POLL_INTERVAL,
};
