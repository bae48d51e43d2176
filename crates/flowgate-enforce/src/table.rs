//! Concurrent-map policy table backend
//!
//! The general-purpose backend: a sharded concurrent hash map keyed by
//! flow hash. Reads take a shard read lock (uncontended in the common
//! case), installs take one shard write lock. Suits the read-heavy,
//! write-light workload of a per-packet decide path with occasional
//! control-plane installs.

use crate::{EnforcementEngine, EnforcerConfig, FlowPolicy};
use dashmap::DashMap;
use flowgate_common::action::{RULE_DEFAULT_POLICY, RULE_JUMBO_PACKET};
use flowgate_common::{AtomicCounter, FirewallAction, FlowHash, PacketDecision, RuleId};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Enforcement engine backed by a sharded concurrent map
pub struct FlowTableEnforcer {
    overrides: DashMap<FlowHash, FlowPolicy>,
    default_action: AtomicU8,
    max_frame_len: usize,

    // Metrics
    lookups: AtomicCounter,
    override_hits: AtomicCounter,
    oversize_drops: AtomicCounter,
}

impl FlowTableEnforcer {
    /// Create with default configuration (PASS default, 1500-byte limit)
    pub fn new() -> Self {
        Self::with_config(EnforcerConfig::default())
    }

    /// Create with explicit configuration
    pub fn with_config(config: EnforcerConfig) -> Self {
        Self {
            overrides: DashMap::new(),
            default_action: AtomicU8::new(config.default_action.as_u8()),
            max_frame_len: config.max_frame_len,
            lookups: AtomicCounter::new(0),
            override_hits: AtomicCounter::new(0),
            oversize_drops: AtomicCounter::new(0),
        }
    }

    /// Change the default action (control plane)
    pub fn set_default_action(&self, action: FirewallAction) {
        self.default_action.store(action.as_u8(), Ordering::Release);
        tracing::info!(?action, "default action changed");
    }

    /// Remove the override for a flow, if any (control plane)
    pub fn remove_policy(&self, flow: FlowHash) -> bool {
        let removed = self.overrides.remove(&flow).is_some();
        if removed {
            tracing::info!(%flow, "flow override removed");
        }
        removed
    }

    /// Number of installed overrides
    pub fn overrides_len(&self) -> usize {
        self.overrides.len()
    }

    /// Engine counters
    pub fn stats(&self) -> EnforcerStats {
        EnforcerStats {
            lookups: self.lookups.get(),
            override_hits: self.override_hits.get(),
            oversize_drops: self.oversize_drops.get(),
            overrides_installed: self.overrides.len(),
        }
    }
}

impl Default for FlowTableEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

impl EnforcementEngine for FlowTableEnforcer {
    #[inline]
    fn decide(&self, len: usize, flow: FlowHash) -> PacketDecision {
        self.lookups.inc();

        // 1. Oversize/malformed check, independent of flow.
        if len > self.max_frame_len {
            self.oversize_drops.inc();
            return PacketDecision::new(FirewallAction::Drop, RULE_JUMBO_PACKET);
        }

        // 2. Flow override.
        if let Some(policy) = self.overrides.get(&flow) {
            self.override_hits.inc();
            return PacketDecision::new(policy.action, RuleId::Flow(policy.rule_id.clone()));
        }

        // 3. Default.
        let action = FirewallAction::from_u8(self.default_action.load(Ordering::Acquire))
            .unwrap_or_default();
        PacketDecision::new(action, RULE_DEFAULT_POLICY)
    }

    fn install_policy(&self, flow: FlowHash, action: FirewallAction) {
        self.overrides.insert(flow, FlowPolicy::new(flow, action));
        tracing::info!(%flow, ?action, "flow override installed");
    }

    fn default_action(&self) -> FirewallAction {
        FirewallAction::from_u8(self.default_action.load(Ordering::Acquire)).unwrap_or_default()
    }
}

/// Point-in-time engine counters
#[derive(Debug, Clone, Serialize)]
pub struct EnforcerStats {
    /// Total decide calls
    pub lookups: u64,
    /// Decisions resolved by a flow override
    pub override_hits: u64,
    /// Decisions resolved by the oversize check
    pub oversize_drops: u64,
    /// Overrides currently installed
    pub overrides_installed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_oversize_always_drops() {
        let engine = FlowTableEnforcer::new();
        // Even an explicit PASS override cannot rescue a jumbo frame.
        engine.install_policy(FlowHash(42), FirewallAction::Pass);

        let decision = engine.decide(1600, FlowHash(42));
        assert_eq!(decision.action, FirewallAction::Drop);
        assert_eq!(decision.rule_id.as_str(), "JUMBO_PACKET");

        let decision = engine.decide(1600, FlowHash(9999));
        assert_eq!(decision.rule_id.as_str(), "JUMBO_PACKET");
    }

    #[test]
    fn test_boundary_length_not_oversize() {
        let engine = FlowTableEnforcer::new();
        let decision = engine.decide(1500, FlowHash(1));
        assert_eq!(decision.action, FirewallAction::Pass);
        assert_eq!(decision.rule_id.as_str(), "DEFAULT_POLICY");
    }

    #[test]
    fn test_override_beats_default() {
        let engine = FlowTableEnforcer::new();
        engine.install_policy(FlowHash(42), FirewallAction::Reject);

        let decision = engine.decide(800, FlowHash(42));
        assert_eq!(decision.action, FirewallAction::Reject);
        assert_eq!(
            decision.rule_id.as_str(),
            "FLOW_OVERRIDE_000000000000002a"
        );

        // Other flows still fall through to the default.
        let decision = engine.decide(800, FlowHash(43));
        assert_eq!(decision.action, FirewallAction::Pass);
        assert_eq!(decision.rule_id.as_str(), "DEFAULT_POLICY");
    }

    #[test]
    fn test_reinstall_last_writer_wins() {
        let engine = FlowTableEnforcer::new();
        engine.install_policy(FlowHash(7), FirewallAction::Drop);
        engine.install_policy(FlowHash(7), FirewallAction::RateLimit);

        let decision = engine.decide(100, FlowHash(7));
        assert_eq!(decision.action, FirewallAction::RateLimit);
        assert_eq!(engine.overrides_len(), 1);
    }

    #[test]
    fn test_default_action_mutable() {
        let engine = FlowTableEnforcer::new();
        assert_eq!(engine.default_action(), FirewallAction::Pass);

        engine.set_default_action(FirewallAction::Drop);
        assert_eq!(engine.default_action(), FirewallAction::Drop);
        let decision = engine.decide(100, FlowHash(1));
        assert_eq!(decision.action, FirewallAction::Drop);
        assert_eq!(decision.rule_id.as_str(), "DEFAULT_POLICY");
    }

    #[test]
    fn test_remove_policy() {
        let engine = FlowTableEnforcer::new();
        engine.install_policy(FlowHash(5), FirewallAction::Drop);
        assert!(engine.remove_policy(FlowHash(5)));
        assert!(!engine.remove_policy(FlowHash(5)));

        let decision = engine.decide(100, FlowHash(5));
        assert_eq!(decision.rule_id.as_str(), "DEFAULT_POLICY");
    }

    #[test]
    fn test_install_visible_across_threads() {
        // Control plane installs from one thread; the data plane must
        // observe the override from another once the write completes.
        let engine = Arc::new(FlowTableEnforcer::new());

        let control = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                engine.install_policy(FlowHash(42), FirewallAction::Reject);
            })
        };
        control.join().unwrap();

        let data = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.decide(800, FlowHash(42)))
        };
        let decision = data.join().unwrap();
        assert_eq!(decision.action, FirewallAction::Reject);
        assert!(matches!(decision.rule_id, RuleId::Flow(_)));
    }

    #[test]
    fn test_decide_races_with_installs() {
        // Contention must never surface as an error or a nonsense
        // decision: every result is one of the legal outcomes.
        let engine = Arc::new(FlowTableEnforcer::new());
        let flow = FlowHash(99);

        let writer = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for i in 0..10_000u32 {
                    let action = if i % 2 == 0 {
                        FirewallAction::Drop
                    } else {
                        FirewallAction::Reject
                    };
                    engine.install_policy(flow, action);
                }
            })
        };

        let reader = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    let decision = engine.decide(100, flow);
                    match decision.rule_id.as_str() {
                        "DEFAULT_POLICY" => assert_eq!(decision.action, FirewallAction::Pass),
                        id => {
                            assert_eq!(id, "FLOW_OVERRIDE_0000000000000063");
                            assert!(matches!(
                                decision.action,
                                FirewallAction::Drop | FirewallAction::Reject
                            ));
                        }
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();

        let stats = engine.stats();
        assert_eq!(stats.lookups, 10_000);
        assert_eq!(stats.overrides_installed, 1);
    }
}
