#![deny(missing_docs)]
//! Native wiring harness shared by integration tests and demos.
//!
//! The harness assembles a [`HostLink`] and a [`CellInfoManager`] with
//! recording sinks and a scripted radio driver, and runs the host side of the
//! RPC boundary on a real thread so scenarios exercise genuine blocking and
//! wakeups.

use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use host_link::{HostDequeue, HostLink, ProtocolFault, OUTBOUND_QUEUE_CAPACITY};
use runtime_abi::{
    AppEvent, AppEventSink, AppEventSinkHandle, AppInstanceId, CompletionSink,
    CompletionSinkHandle, MessageToHost, RadioDriver, RadioDriverHandle, RADIO_CAP_CELL_INFO,
};
use services_cellinfo::CellInfoManager;

/// Destination buffer size the pump hands to the link on every dequeue.
pub const PUMP_BUFFER_LEN: usize = 4096;

/// Completion sink that records every handed-back message.
#[derive(Default)]
pub struct RecordingCompletionSink {
    completed: Mutex<Vec<Arc<MessageToHost>>>,
}

impl RecordingCompletionSink {
    /// Number of completions observed so far.
    pub fn completed_count(&self) -> usize {
        self.completed.lock().len()
    }

    /// Removes and returns every recorded completion, oldest first.
    pub fn take_completed(&self) -> Vec<Arc<MessageToHost>> {
        std::mem::take(&mut *self.completed.lock())
    }
}

impl CompletionSink for RecordingCompletionSink {
    fn on_message_to_host_complete(&self, message: Arc<MessageToHost>) {
        self.completed.lock().push(message);
    }
}

/// Event sink that records every posted app event.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<(AppInstanceId, AppEvent)>>,
}

impl RecordingEventSink {
    /// Number of events posted so far.
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    /// Removes and returns every recorded event, oldest first.
    pub fn take_events(&self) -> Vec<(AppInstanceId, AppEvent)> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl AppEventSink for RecordingEventSink {
    fn post(&self, app: AppInstanceId, event: AppEvent) {
        self.events.lock().push((app, event));
    }
}

/// Radio driver whose accept/refuse behaviour is scripted by the test.
pub struct ScriptedRadioDriver {
    caps: u32,
    accept: AtomicBool,
    scans: AtomicU32,
}

impl ScriptedRadioDriver {
    /// Creates a driver advertising `caps` that accepts every scan.
    pub fn new(caps: u32) -> Self {
        Self {
            caps,
            accept: AtomicBool::new(true),
            scans: AtomicU32::new(0),
        }
    }

    /// Makes subsequent scan requests succeed or fail.
    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::Relaxed);
    }

    /// Number of scan requests the driver has seen.
    pub fn scan_count(&self) -> u32 {
        self.scans.load(Ordering::Relaxed)
    }
}

impl Default for ScriptedRadioDriver {
    fn default() -> Self {
        Self::new(RADIO_CAP_CELL_INFO)
    }
}

impl RadioDriver for ScriptedRadioDriver {
    fn capabilities(&self) -> u32 {
        self.caps
    }

    fn request_cell_scan(&self) -> bool {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.accept.load(Ordering::Relaxed)
    }
}

/// Events observed by the host-side pump thread, in dequeue order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PumpEvent {
    /// A payload was copied out of the link.
    Delivered(Vec<u8>),
    /// The link reported a protocol fault for the pending message.
    Faulted(ProtocolFault),
    /// The pump observed the shutdown sentinel and exited its loop.
    Stopped,
}

/// Host-side consumer loop running on its own thread.
///
/// Mirrors the RPC boundary of the real deployment: a single blocking caller
/// repeatedly asks the link for the next message with a fixed-size buffer and
/// forwards whatever it observes over a channel.
pub struct HostPump {
    events: Receiver<PumpEvent>,
    thread: Option<JoinHandle<()>>,
}

impl HostPump {
    /// Spawns the consumer loop over `link` with a `buffer_len`-byte buffer.
    pub fn spawn(link: Arc<HostLink>, buffer_len: usize) -> Self {
        let (tx, rx): (Sender<PumpEvent>, Receiver<PumpEvent>) = crossbeam_channel::unbounded();
        let thread = thread::spawn(move || {
            let mut dest = vec![0u8; buffer_len];
            loop {
                match link.next_message_for_host(&mut dest) {
                    HostDequeue::Delivered { len } => {
                        let _ = tx.send(PumpEvent::Delivered(dest[..len].to_vec()));
                    }
                    HostDequeue::Fault(fault) => {
                        let _ = tx.send(PumpEvent::Faulted(fault));
                    }
                    HostDequeue::ShuttingDown => {
                        let _ = tx.send(PumpEvent::Stopped);
                        break;
                    }
                }
            }
        });
        Self {
            events: rx,
            thread: Some(thread),
        }
    }

    /// Receives the next pump event, waiting up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PumpEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Collects every event that is ready right now without blocking.
    pub fn drain_ready(&self) -> SmallVec<[PumpEvent; 4]> {
        let mut ready = SmallVec::new();
        while let Ok(event) = self.events.try_recv() {
            ready.push(event);
        }
        ready
    }

    /// Waits for the pump thread to exit; call after the link shut down.
    ///
    /// Dropping a pump without joining detaches the thread, which only exits
    /// once it observes the sentinel.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join().expect("host pump thread");
        }
    }
}

/// Fully wired boundary: link, scan coordinator, and their recording sinks.
pub struct BoundaryRuntime {
    link: Arc<HostLink>,
    cellinfo: Arc<CellInfoManager>,
    completions: Arc<RecordingCompletionSink>,
    events: Arc<RecordingEventSink>,
    driver: Arc<ScriptedRadioDriver>,
}

impl BoundaryRuntime {
    /// Creates a new builder for assembling a boundary runtime.
    pub fn builder() -> BoundaryRuntimeBuilder {
        BoundaryRuntimeBuilder::new()
    }

    /// The outbound link under test.
    pub fn link(&self) -> &Arc<HostLink> {
        &self.link
    }

    /// The cell-info coordinator under test.
    pub fn cellinfo(&self) -> &Arc<CellInfoManager> {
        &self.cellinfo
    }

    /// Completion sink installed on the link.
    pub fn completions(&self) -> &Arc<RecordingCompletionSink> {
        &self.completions
    }

    /// Event sink installed on the coordinator.
    pub fn events(&self) -> &Arc<RecordingEventSink> {
        &self.events
    }

    /// The scripted driver behind the coordinator.
    pub fn driver(&self) -> &Arc<ScriptedRadioDriver> {
        &self.driver
    }
}

/// Builder for assembling a [`BoundaryRuntime`] from individual parts.
pub struct BoundaryRuntimeBuilder {
    queue_capacity: usize,
    driver: Option<Arc<ScriptedRadioDriver>>,
}

impl BoundaryRuntimeBuilder {
    /// Creates a builder with the standard outbound queue depth and no driver.
    pub fn new() -> Self {
        Self {
            queue_capacity: OUTBOUND_QUEUE_CAPACITY,
            driver: None,
        }
    }

    /// Overrides the outbound queue depth.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Installs the scripted radio driver.
    pub fn driver(mut self, driver: Arc<ScriptedRadioDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Wires everything together.
    pub fn build(self) -> Result<BoundaryRuntime> {
        let driver = self
            .driver
            .ok_or_else(|| anyhow!("missing radio driver"))?;
        let completions = Arc::new(RecordingCompletionSink::default());
        let events = Arc::new(RecordingEventSink::default());
        let link = Arc::new(HostLink::with_queue_capacity(
            self.queue_capacity,
            Arc::clone(&completions) as CompletionSinkHandle,
        )?);
        let cellinfo = Arc::new(CellInfoManager::new(
            Arc::clone(&driver) as RadioDriverHandle,
            Arc::clone(&events) as AppEventSinkHandle,
        ));
        Ok(BoundaryRuntime {
            link,
            cellinfo,
            completions,
            events,
            driver,
        })
    }
}

impl Default for BoundaryRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
