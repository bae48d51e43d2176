//! Flow identification for per-packet policy lookup
//!
//! A flow is a logical bidirectional packet stream identified by its
//! 5-tuple. The data plane never keys on the tuple directly; it derives a
//! 64-bit hash once per frame and uses that as the policy table key.

use serde::{Deserialize, Serialize};

/// 5-tuple flow key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C, align(16))]
pub struct FlowKey {
    /// Source IPv4 address
    pub src_ip: u32,
    /// Destination IPv4 address
    pub dst_ip: u32,
    /// Source port
    pub src_port: u16,
    /// Destination port
    pub dst_port: u16,
    /// IP protocol (TCP=6, UDP=17)
    pub protocol: u8,
    /// Padding for alignment
    _pad: [u8; 3],
}

impl FlowKey {
    /// Create new flow key
    #[inline(always)]
    pub const fn new(
        src_ip: u32,
        dst_ip: u32,
        src_port: u16,
        dst_port: u16,
        protocol: u8,
    ) -> Self {
        Self {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            protocol,
            _pad: [0; 3],
        }
    }

    /// Create reverse (reply) flow key
    #[inline(always)]
    pub const fn reverse(&self) -> Self {
        Self::new(
            self.dst_ip,
            self.src_ip,
            self.dst_port,
            self.src_port,
            self.protocol,
        )
    }

    /// Derive the flow hash used as the policy table key (FNV-1a)
    #[inline(always)]
    pub fn hash(&self) -> FlowHash {
        const FNV_OFFSET: u64 = 0xcbf29ce484222325;
        const FNV_PRIME: u64 = 0x100000001b3;

        let mut h = FNV_OFFSET;

        for byte in self.src_ip.to_ne_bytes() {
            h ^= byte as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        for byte in self.dst_ip.to_ne_bytes() {
            h ^= byte as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        for byte in self.src_port.to_ne_bytes() {
            h ^= byte as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        for byte in self.dst_port.to_ne_bytes() {
            h ^= byte as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        h ^= self.protocol as u64;
        h = h.wrapping_mul(FNV_PRIME);

        FlowHash(h)
    }
}

/// Derived flow identifier, unique per logical flow rather than per packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FlowHash(pub u64);

impl std::fmt::Display for FlowHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for FlowHash {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
