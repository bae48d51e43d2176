//! Capture worker and session lifecycle
//!
//! A [`CaptureSession`] owns one background capture loop. `start` is
//! fire-and-forget: it spawns the worker and returns. `stop` sets a flag
//! and returns immediately with no completion guarantee; callers that
//! need synchronous teardown follow it with [`CaptureSession::join`].
//! All session state (stop flag, worker state, counters) lives in the
//! session object, so independent sessions can run concurrently.

use crate::ring::Producer;
use crate::shmem::{SlotRegion, SlotWriter};
use crate::source::FrameSource;
use crate::stats::{CaptureStats, CaptureStatsSnapshot};
use crate::DEFAULT_SLOT_COUNT;
use flowgate_common::{CapturedFrame, FlowHash, FlowKey};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Session configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Slots in a region allocated via [`CaptureSession::allocate_region`]
    pub slot_count: usize,
    /// Worker thread name prefix (full name: `<prefix>-<interface>`)
    pub thread_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            thread_prefix: "capture".to_string(),
        }
    }
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// `start` was called while a session was already running
    #[error("capture session already running")]
    AlreadyRunning,

    /// The background worker thread could not be created
    #[error("failed to spawn capture thread: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

/// One captured frame plus its derived features, as handed to a sink
pub struct CaptureRecord {
    /// The captured frame
    pub frame: CapturedFrame,
    /// Flow the frame belongs to
    pub flow: FlowKey,
    /// Hash derived from `flow`
    pub flow_hash: FlowHash,
}

/// Destination the worker writes each record into
///
/// `deliver` must never block; returning `false` means the record was
/// lost because the sink was full. The worker counts the loss and moves
/// on - a full sink is data loss by policy, not a fatal error.
pub trait FrameSink: Send + 'static {
    /// Hand one record to the sink
    fn deliver(&mut self, record: CaptureRecord) -> bool;
}

impl FrameSink for SlotWriter {
    fn deliver(&mut self, record: CaptureRecord) -> bool {
        // Shared-memory delivery always succeeds; overrun overwrites
        // stale slots instead of failing.
        self.publish(&record.frame, record.flow_hash);
        true
    }
}

impl FrameSink for Producer<CaptureRecord> {
    fn deliver(&mut self, record: CaptureRecord) -> bool {
        self.push(record).is_ok()
    }
}

const STOPPED: u8 = 0;
const STARTING: u8 = 1;
const RUNNING: u8 = 2;

struct Shared {
    state: AtomicU8,
    stop: AtomicBool,
    stats: CaptureStats,
}

/// One capture session: at most one running worker at a time
pub struct CaptureSession {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
    config: CaptureConfig,
}

impl CaptureSession {
    /// Create a session with default configuration
    pub fn new() -> Self {
        Self::with_config(CaptureConfig::default())
    }

    /// Create a session with explicit configuration
    pub fn with_config(config: CaptureConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(STOPPED),
                stop: AtomicBool::new(false),
                stats: CaptureStats::default(),
            }),
            handle: Mutex::new(None),
            config,
        }
    }

    /// Allocate a shared-memory region sized by this session's config
    pub fn allocate_region(&self) -> Arc<SlotRegion> {
        Arc::new(SlotRegion::with_capacity(self.config.slot_count))
    }

    /// Launch the background capture loop
    ///
    /// Fails with [`CaptureError::AlreadyRunning`] if a worker is
    /// already active; the running session is left untouched. The worker
    /// is not joined by this call.
    pub fn start<S, K>(&self, interface: &str, source: S, sink: K) -> Result<(), CaptureError>
    where
        S: FrameSource,
        K: FrameSink,
    {
        // STARTING exists only to make concurrent start attempts lose.
        if self
            .shared
            .state
            .compare_exchange(STOPPED, STARTING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::AlreadyRunning);
        }

        self.shared.stop.store(false, Ordering::Release);
        // Published before the spawn so a worker that exits instantly
        // cannot have its STOPPED overwritten afterwards.
        self.shared.state.store(RUNNING, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let name = format!("{}-{}", self.config.thread_prefix, interface);
        match thread::Builder::new()
            .name(name)
            .spawn(move || run_loop(shared, source, sink))
        {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                tracing::info!(interface, "capture session started");
                Ok(())
            }
            Err(e) => {
                self.shared.state.store(STOPPED, Ordering::Release);
                Err(CaptureError::SpawnFailed(e))
            }
        }
    }

    /// Start a session writing into a shared-memory region
    pub fn start_shared<S: FrameSource>(
        &self,
        interface: &str,
        source: S,
        region: &Arc<SlotRegion>,
    ) -> Result<(), CaptureError> {
        self.start(interface, source, SlotWriter::new(Arc::clone(region)))
    }

    /// Request termination; returns immediately
    ///
    /// The worker observes the flag once per iteration, so shutdown
    /// latency is bounded by one iteration plus any non-cancellable time
    /// inside the frame source. No completion signal is given; use
    /// [`CaptureSession::join`] when teardown must be synchronous.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
        tracing::info!("capture stop requested");
    }

    /// Wait for the worker to finish its current run, if any
    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("capture worker panicked");
            }
        }
    }

    /// Whether a worker is currently active (liveness indicator)
    pub fn is_running(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == RUNNING
    }

    /// Session counters
    pub fn stats(&self) -> CaptureStatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

fn run_loop<S: FrameSource, K: FrameSink>(shared: Arc<Shared>, mut source: S, mut sink: K) {
    tracing::debug!("capture worker running");

    loop {
        // (1) obtain one frame; a closed source ends the session
        let Some(sourced) = source.next_frame() else {
            tracing::debug!("frame source exhausted");
            break;
        };

        // (2) derive features
        let flow_hash = sourced.flow.hash();
        let caplen = sourced.frame.caplen() as u64;

        // (3) write the slot / publish the index
        let delivered = sink.deliver(CaptureRecord {
            frame: sourced.frame,
            flow: sourced.flow,
            flow_hash,
        });
        if delivered {
            shared.stats.record_frame(caplen);
        } else {
            shared.stats.record_drop();
        }

        // (4) cooperative cancellation, once per iteration
        if shared.stop.load(Ordering::Acquire) {
            break;
        }
    }

    shared.state.store(STOPPED, Ordering::Release);
    tracing::debug!("capture worker stopped");
}
