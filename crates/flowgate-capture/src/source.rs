//! Capture source abstraction
//!
//! The worker never talks to a capture API directly; it pulls frames
//! from an injected [`FrameSource`]. Production wires in a real capture
//! backend, tests and benches use [`SyntheticSource`].

use flowgate_common::{CapturedFrame, FlowKey, Timestamp};

/// One frame as obtained from a capture source, with the flow it
/// belongs to already identified
pub struct SourcedFrame {
    /// The captured frame
    pub frame: CapturedFrame,
    /// Flow the frame belongs to
    pub flow: FlowKey,
}

/// An external capture source feeding the worker loop
///
/// `next_frame` may block inside the underlying capture API; the worker
/// checks its stop flag between iterations, so shutdown latency is
/// bounded by one call into the source.
pub trait FrameSource: Send + 'static {
    /// Obtain the next frame, or `None` when the source is exhausted or
    /// closed (ends the capture loop)
    fn next_frame(&mut self) -> Option<SourcedFrame>;
}

/// Deterministic frame generator standing in for a capture API
///
/// Produces frames with lengths cycling through 100..=1500 and one new
/// flow per frame, mirroring the traffic shape of a simulated capture
/// loop.
pub struct SyntheticSource {
    counter: u64,
    remaining: Option<u64>,
    state: u64,
    scratch: [u8; 1500],
}

impl SyntheticSource {
    /// Endless source
    pub fn new() -> Self {
        Self {
            counter: 0,
            remaining: None,
            state: 0x9E3779B97F4A7C15,
            scratch: [0; 1500],
        }
    }

    /// Source that stops after `count` frames
    pub fn with_limit(count: u64) -> Self {
        Self {
            remaining: Some(count),
            ..Self::new()
        }
    }

    /// Frames produced so far
    pub fn produced(&self) -> u64 {
        self.counter
    }

    #[inline]
    fn next_len(&mut self) -> usize {
        // xorshift; anything uniform-ish in 100..=1500 will do
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        100 + (self.state % 1401) as usize
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Option<SourcedFrame> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        self.counter += 1;
        let len = self.next_len();
        let fill = (self.counter & 0xFF) as u8;
        self.scratch[..len].fill(fill);
        let frame = CapturedFrame::new(&self.scratch[..len], len, Timestamp::now());

        // One synthetic flow per frame: port rotates with the counter.
        let flow = FlowKey::new(
            0x0A00_0001,
            0x0A00_0002,
            (self.counter % u16::MAX as u64) as u16,
            443,
            6,
        );

        Some(SourcedFrame { frame, flow })
    }
}
