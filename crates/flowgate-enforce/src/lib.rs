//! Flowgate Enforcement Engine
//!
//! Classifies each packet/flow into an action using a default action
//! plus a mutable per-flow override table.
//!
//! # Decision order
//!
//! `decide` resolves in strict priority order:
//!
//! 1. Oversize check - frames longer than the configured maximum are
//!    dropped with the `JUMBO_PACKET` rule id, independent of flow.
//! 2. Flow override - exact lookup of the derived flow hash in the
//!    policy table; a hit returns the stored action with its per-flow
//!    rule id.
//! 3. Default - the engine's current default action, `DEFAULT_POLICY`.
//!
//! The decide path runs once per captured frame at line rate: O(1)
//! expected, no allocation, callable concurrently with control-plane
//! installs. Table contention is an implementation concern and never
//! surfaces to callers. A flow's effective action may change between two
//! packets of the same flow when the control plane installs a policy in
//! between - that is intended, not a race to eliminate.
//!
//! Two backends implement the same [`EnforcementEngine`] contract:
//! [`FlowTableEnforcer`] (sharded concurrent map, the general-purpose
//! choice) and [`SnapshotEnforcer`] (full-table snapshot swap for
//! strictly read-dominated deployments).

#![warn(missing_docs)]

pub mod snapshot;
pub mod table;

pub use snapshot::SnapshotEnforcer;
pub use table::{EnforcerStats, FlowTableEnforcer};

use flowgate_common::{CapturedFrame, FirewallAction, FlowHash, PacketDecision};
use std::sync::Arc;

/// Default frame length ceiling (standard Ethernet MTU)
pub const DEFAULT_MAX_FRAME_LEN: usize = 1500;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EnforcerConfig {
    /// Frames longer than this are dropped as malformed/jumbo
    pub max_frame_len: usize,
    /// Action applied when no override matches
    pub default_action: FirewallAction,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            default_action: FirewallAction::Pass,
        }
    }
}

/// Per-flow override entry: the action plus the rule id minted for it
///
/// The rule id is shared, so handing it out on the decide path is a
/// refcount bump rather than an allocation.
#[derive(Debug, Clone)]
pub(crate) struct FlowPolicy {
    pub(crate) action: FirewallAction,
    pub(crate) rule_id: Arc<str>,
}

impl FlowPolicy {
    pub(crate) fn new(flow: FlowHash, action: FirewallAction) -> Self {
        Self {
            action,
            rule_id: Arc::from(format!("FLOW_OVERRIDE_{flow}").as_str()),
        }
    }
}

/// The enforcement contract shared by all policy table backends
///
/// `decide` is the data plane; `install_policy` and `default_action`
/// are the control plane. Implementations must allow `decide` and
/// `install_policy` to race freely.
pub trait EnforcementEngine: Send + Sync {
    /// Classify one packet by wire length and derived flow hash
    fn decide(&self, len: usize, flow: FlowHash) -> PacketDecision;

    /// Install or overwrite the override for a flow (last writer wins);
    /// the only mutation path into the policy table
    fn install_policy(&self, flow: FlowHash, action: FirewallAction);

    /// The action applied when no override matches
    fn default_action(&self) -> FirewallAction;

    /// Classify a captured frame (uses the original wire length, which
    /// may exceed the captured length)
    fn decide_frame(&self, frame: &CapturedFrame, flow: FlowHash) -> PacketDecision {
        self.decide(frame.wire_len(), flow)
    }
}
