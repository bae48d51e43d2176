//! Flowgate Capture Data Plane
//!
//! Moves frames from a capture source to a consumer without locks or
//! per-packet allocation, and publishes progress across a trust boundary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CAPTURE SESSION                         │
//! │                                                              │
//! │  FrameSource ──► worker thread ──► FrameSink                 │
//! │   (pcap API /      derive           │                        │
//! │    synthetic)      features         ├─► RingBuffer<T>        │
//! │                                     │    (in-process SPSC)   │
//! │                                     └─► SlotRegion           │
//! │                                          (cross-process,     │
//! │                                           published index)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both sinks share one ordering contract: the producer writes the full
//! record, then publishes its cursor with `Release`; the consumer loads
//! the cursor with `Acquire` before reading record contents. Neither end
//! ever blocks. Overrun is reported (ring) or silently overwrites stale
//! slots (shared memory) - bounded latency is chosen over completeness.

#![warn(missing_docs)]

pub mod ring;
pub mod shmem;
pub mod source;
pub mod stats;
pub mod worker;

pub use ring::{Consumer, Empty, Full, Producer, RingBuffer};
pub use shmem::{FrameSlot, SlotReader, SlotRegion, SlotWriter, SLOT_WIRE_VERSION};
pub use source::{FrameSource, SourcedFrame, SyntheticSource};
pub use stats::{CaptureStats, CaptureStatsSnapshot};
pub use worker::{CaptureConfig, CaptureError, CaptureRecord, CaptureSession, FrameSink};

/// Default number of slots in a shared-memory region
pub const DEFAULT_SLOT_COUNT: usize = 1024;

/// Default ring buffer capacity (slots; holds capacity - 1 records)
pub const DEFAULT_RING_CAPACITY: usize = 64 * 1024;
