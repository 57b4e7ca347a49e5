//! Core transport primitives for the outbound host-message path.
//!
//! This crate exposes the foundational pieces the link layer builds on:
//! * [`BlockingQueue`] – fixed-capacity multi-producer FIFO whose consumer
//!   side blocks; pushes fail fast instead of blocking or dropping.
//! * [`TransportError`] – lightweight error surface for construction failures.

mod error;
mod queue;

pub use error::{TransportError, TransportResult};
pub use queue::BlockingQueue;
