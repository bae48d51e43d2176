//! Capture statistics
//!
//! Lock-free counters updated from the worker loop, snapshotted by the
//! control plane.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session capture counters (atomic, lock-free)
#[derive(Debug, Default)]
pub struct CaptureStats {
    /// Frames delivered to the sink
    pub frames: AtomicU64,
    /// Payload bytes delivered to the sink
    pub bytes: AtomicU64,
    /// Frames lost because the sink was full
    pub dropped: AtomicU64,
}

impl CaptureStats {
    /// Record one delivered frame
    #[inline(always)]
    pub fn record_frame(&self, bytes: u64) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record one frame lost to a full sink
    #[inline(always)]
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough point-in-time copy
    pub fn snapshot(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`CaptureStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureStatsSnapshot {
    /// Frames delivered to the sink
    pub frames: u64,
    /// Payload bytes delivered to the sink
    pub bytes: u64,
    /// Frames lost because the sink was full
    pub dropped: u64,
}
