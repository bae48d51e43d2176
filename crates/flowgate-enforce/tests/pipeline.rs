//! End-to-end data path: capture worker -> shared slots -> decisions
//!
//! Exercises the full handoff the way a deployment wires it: a session
//! publishing into a shared-memory region, a consumer draining slots and
//! asking the enforcement engine for a verdict per frame, and the
//! control plane installing an override based on what it saw.

use flowgate_capture::{CaptureSession, SlotReader, SyntheticSource};
use flowgate_common::{FirewallAction, FlowHash};
use flowgate_enforce::{EnforcementEngine, FlowTableEnforcer};
use std::sync::Arc;

#[test]
fn frames_become_decisions() {
    let session = CaptureSession::new();
    let region = session.allocate_region();
    let mut reader = SlotReader::new(Arc::clone(&region));
    let engine = FlowTableEnforcer::new();

    session
        .start_shared("eth0", SyntheticSource::with_limit(100), &region)
        .unwrap();
    session.join();

    let mut slots = Vec::new();
    reader.drain_into(&mut slots);
    assert_eq!(slots.len(), 100);
    assert_eq!(session.stats().frames, 100);

    // Synthetic traffic stays within the MTU, so everything falls
    // through to the default policy.
    for slot in &slots {
        let decision = engine.decide(slot.len as usize, FlowHash(slot.flow_hash));
        assert_eq!(decision.action, FirewallAction::Pass);
        assert_eq!(decision.rule_id.as_str(), "DEFAULT_POLICY");
    }

    // Control plane reacts to an observed flow; the next packet of that
    // flow gets the override.
    let suspect = FlowHash(slots[0].flow_hash);
    engine.install_policy(suspect, FirewallAction::Reject);

    let decision = engine.decide(slots[0].len as usize, suspect);
    assert_eq!(decision.action, FirewallAction::Reject);
    assert!(decision.rule_id.as_str().starts_with("FLOW_OVERRIDE_"));
}
