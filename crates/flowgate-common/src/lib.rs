//! Flowgate Common - shared types for the capture and enforcement core
//!
//! This crate provides the vocabulary shared by the data plane and the
//! control plane:
//! - Captured frames and their fixed-size headers
//! - Flow keys and derived flow hashes
//! - Firewall actions and per-packet decisions
//! - Timestamps and lock-free counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod flow;
pub mod frame;

pub use action::{FirewallAction, PacketDecision, RuleId};
pub use flow::{FlowHash, FlowKey};
pub use frame::{CapturedFrame, FrameHeader, MAX_SNAPLEN};

use std::sync::atomic::{AtomicU64, Ordering};

/// Nanosecond wall-clock timestamp used for frame arrival times
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Get current timestamp (nanoseconds since epoch)
    #[inline(always)]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self(nanos)
    }

    /// Build from raw nanoseconds since epoch
    #[inline(always)]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Get nanoseconds value
    #[inline(always)]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Split into (seconds, microseconds) as carried in a frame header
    #[inline(always)]
    pub const fn as_secs_usecs(&self) -> (u32, u32) {
        let secs = self.0 / 1_000_000_000;
        let usecs = (self.0 % 1_000_000_000) / 1_000;
        (secs as u32, usecs as u32)
    }
}

/// High-performance counter for lock-free metrics
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create new counter
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Increment and return previous value
    #[inline(always)]
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Add value and return previous
    #[inline(always)]
    pub fn add(&self, val: u64) -> u64 {
        self.0.fetch_add(val, Ordering::Relaxed)
    }

    /// Get current value
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
