//! Enforcement actions and per-packet decisions
//!
//! A decision pairs the action with the identifier of the rule that
//! produced it, so downstream consumers (audit log, dashboard) can always
//! name the policy responsible for a verdict.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Action taken on a packet or flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FirewallAction {
    /// Allow the packet/flow to proceed
    Pass = 0,
    /// Discard the packet immediately (silent)
    Drop = 1,
    /// Discard and notify the sender (ICMP/TCP RST)
    Reject = 2,
    /// Throttle the flow
    RateLimit = 3,
}

impl Default for FirewallAction {
    fn default() -> Self {
        Self::Pass
    }
}

impl FirewallAction {
    /// Raw discriminant, suitable for atomic storage
    #[inline(always)]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Recover an action from its discriminant
    #[inline(always)]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Pass),
            1 => Some(Self::Drop),
            2 => Some(Self::Reject),
            3 => Some(Self::RateLimit),
            _ => None,
        }
    }
}

/// Identifier of the policy that produced a decision
///
/// Built-in rules are static strings; flow overrides carry a shared id
/// minted at install time, so cloning one on the decide path is a
/// refcount bump, not an allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleId {
    /// A built-in rule (oversize check, default policy)
    Static(&'static str),
    /// A flow-specific override installed by the control plane
    Flow(Arc<str>),
}

/// Rule id for the oversize/malformed frame check
pub const RULE_JUMBO_PACKET: RuleId = RuleId::Static("JUMBO_PACKET");

/// Rule id for the engine default action
pub const RULE_DEFAULT_POLICY: RuleId = RuleId::Static("DEFAULT_POLICY");

impl RuleId {
    /// The identifier as a string
    #[inline(always)]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Static(s) => s,
            Self::Flow(s) => s,
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of classifying one packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketDecision {
    /// Action to take
    pub action: FirewallAction,
    /// Which policy produced the action
    pub rule_id: RuleId,
}

impl PacketDecision {
    /// Build a decision
    #[inline(always)]
    pub const fn new(action: FirewallAction, rule_id: RuleId) -> Self {
        Self { action, rule_id }
    }
}
