//! Captured frame representation
//!
//! A frame is opaque payload bytes plus a small fixed header of derived
//! features. Payload storage is a fixed array so frames can sit inline in
//! ring slots and shared-memory slots without per-packet allocation.

use crate::Timestamp;

/// Maximum bytes captured per frame (snap length)
pub const MAX_SNAPLEN: usize = 2048;

/// Fixed capture header, one per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct FrameHeader {
    /// Bytes actually captured into the payload buffer
    pub caplen: u32,
    /// Original length on the wire (may exceed caplen)
    pub len: u32,
    /// Capture timestamp, seconds part
    pub ts_sec: u32,
    /// Capture timestamp, microseconds part
    pub ts_usec: u32,
}

/// One captured frame: header plus inline payload storage
#[derive(Clone)]
#[repr(C)]
pub struct CapturedFrame {
    /// Capture header
    pub header: FrameHeader,
    /// Inline payload storage; only `header.caplen` bytes are valid
    pub payload: [u8; MAX_SNAPLEN],
}

impl CapturedFrame {
    /// Build a frame from raw bytes, truncating the capture to the snap
    /// length while preserving the original wire length.
    pub fn new(bytes: &[u8], wire_len: usize, ts: Timestamp) -> Self {
        let caplen = bytes.len().min(MAX_SNAPLEN);
        let (ts_sec, ts_usec) = ts.as_secs_usecs();

        let mut payload = [0u8; MAX_SNAPLEN];
        payload[..caplen].copy_from_slice(&bytes[..caplen]);

        Self {
            header: FrameHeader {
                caplen: caplen as u32,
                len: wire_len as u32,
                ts_sec,
                ts_usec,
            },
            payload,
        }
    }

    /// Captured payload bytes
    #[inline(always)]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.header.caplen as usize]
    }

    /// Original length on the wire
    #[inline(always)]
    pub fn wire_len(&self) -> usize {
        self.header.len as usize
    }

    /// Captured length
    #[inline(always)]
    pub fn caplen(&self) -> usize {
        self.header.caplen as usize
    }
}

impl std::fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("header", &self.header)
            .field("payload", &format_args!("[u8; {}]", self.header.caplen))
            .finish()
    }
}
