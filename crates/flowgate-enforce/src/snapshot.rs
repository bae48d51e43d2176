//! Snapshot-swap policy table backend
//!
//! Keeps the whole override table behind an atomically swappable
//! snapshot: the decide path is a lock-free pointer load plus one hash
//! lookup, and an install clones the table, applies the change, and
//! swaps the snapshot in. Installs are serialized by a small mutex so a
//! racing pair cannot lose each other's entries. Worth it only when the
//! write rate is genuinely low; the clone cost grows with table size.

use crate::{EnforcementEngine, EnforcerConfig, FlowPolicy};
use arc_swap::ArcSwap;
use flowgate_common::action::{RULE_DEFAULT_POLICY, RULE_JUMBO_PACKET};
use flowgate_common::{FirewallAction, FlowHash, PacketDecision, RuleId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Enforcement engine backed by an atomically swapped table snapshot
pub struct SnapshotEnforcer {
    overrides: ArcSwap<HashMap<FlowHash, FlowPolicy>>,
    install_lock: Mutex<()>,
    default_action: AtomicU8,
    max_frame_len: usize,
}

impl SnapshotEnforcer {
    /// Create with default configuration (PASS default, 1500-byte limit)
    pub fn new() -> Self {
        Self::with_config(EnforcerConfig::default())
    }

    /// Create with explicit configuration
    pub fn with_config(config: EnforcerConfig) -> Self {
        Self {
            overrides: ArcSwap::from_pointee(HashMap::new()),
            install_lock: Mutex::new(()),
            default_action: AtomicU8::new(config.default_action.as_u8()),
            max_frame_len: config.max_frame_len,
        }
    }

    /// Change the default action (control plane)
    pub fn set_default_action(&self, action: FirewallAction) {
        self.default_action.store(action.as_u8(), Ordering::Release);
        tracing::info!(?action, "default action changed");
    }

    /// Replace the entire override table in one swap (control plane)
    pub fn load_policies(&self, policies: impl IntoIterator<Item = (FlowHash, FirewallAction)>) {
        let table: HashMap<_, _> = policies
            .into_iter()
            .map(|(flow, action)| (flow, FlowPolicy::new(flow, action)))
            .collect();

        let _guard = self.install_lock.lock();
        tracing::info!(overrides = table.len(), "override table replaced");
        self.overrides.store(Arc::new(table));
    }

    /// Number of installed overrides
    pub fn overrides_len(&self) -> usize {
        self.overrides.load().len()
    }
}

impl Default for SnapshotEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

impl EnforcementEngine for SnapshotEnforcer {
    #[inline]
    fn decide(&self, len: usize, flow: FlowHash) -> PacketDecision {
        // 1. Oversize/malformed check, independent of flow.
        if len > self.max_frame_len {
            return PacketDecision::new(FirewallAction::Drop, RULE_JUMBO_PACKET);
        }

        // 2. Flow override against the current snapshot.
        let snapshot = self.overrides.load();
        if let Some(policy) = snapshot.get(&flow) {
            return PacketDecision::new(policy.action, RuleId::Flow(policy.rule_id.clone()));
        }

        // 3. Default.
        let action = FirewallAction::from_u8(self.default_action.load(Ordering::Acquire))
            .unwrap_or_default();
        PacketDecision::new(action, RULE_DEFAULT_POLICY)
    }

    fn install_policy(&self, flow: FlowHash, action: FirewallAction) {
        // Clone-and-swap under the install lock; concurrent decides keep
        // reading the previous snapshot until the store lands.
        let _guard = self.install_lock.lock();
        let mut table = (*self.overrides.load_full()).clone();
        table.insert(flow, FlowPolicy::new(flow, action));
        self.overrides.store(Arc::new(table));
        tracing::info!(%flow, ?action, "flow override installed");
    }

    fn default_action(&self) -> FirewallAction {
        FirewallAction::from_u8(self.default_action.load(Ordering::Acquire)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let engine = SnapshotEnforcer::new();
        engine.install_policy(FlowHash(42), FirewallAction::Reject);

        // Oversize wins over the override.
        let decision = engine.decide(1600, FlowHash(42));
        assert_eq!(decision.rule_id.as_str(), "JUMBO_PACKET");

        // Override wins over the default.
        let decision = engine.decide(800, FlowHash(42));
        assert_eq!(decision.action, FirewallAction::Reject);
        assert!(matches!(decision.rule_id, RuleId::Flow(_)));

        // Default for everything else.
        let decision = engine.decide(800, FlowHash(1));
        assert_eq!(decision.rule_id.as_str(), "DEFAULT_POLICY");
    }

    #[test]
    fn test_reinstall_last_writer_wins() {
        let engine = SnapshotEnforcer::new();
        engine.install_policy(FlowHash(7), FirewallAction::Drop);
        engine.install_policy(FlowHash(7), FirewallAction::RateLimit);

        assert_eq!(engine.overrides_len(), 1);
        let decision = engine.decide(100, FlowHash(7));
        assert_eq!(decision.action, FirewallAction::RateLimit);
    }

    #[test]
    fn test_concurrent_installs_do_not_lose_entries() {
        // Two racing installers on different flows; the install lock
        // makes the clone-and-swap pairs atomic, so both entries land.
        let engine = Arc::new(SnapshotEnforcer::new());

        let threads: Vec<_> = (0..4u64)
            .map(|t| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        engine.install_policy(FlowHash(t * 1000 + i), FirewallAction::Drop);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(engine.overrides_len(), 400);
    }

    #[test]
    fn test_bulk_load_replaces_table() {
        let engine = SnapshotEnforcer::new();
        engine.install_policy(FlowHash(1), FirewallAction::Drop);

        engine.load_policies([
            (FlowHash(2), FirewallAction::Reject),
            (FlowHash(3), FirewallAction::RateLimit),
        ]);

        assert_eq!(engine.overrides_len(), 2);
        // The pre-load override is gone.
        let decision = engine.decide(100, FlowHash(1));
        assert_eq!(decision.rule_id.as_str(), "DEFAULT_POLICY");
    }
}
