//! Override queueing.
//!
//! Override bodies patch an already-declared class. Each carries a global
//! arrival sequence; overrides for one target apply in arrival order, last
//! writer wins. A record targeting a class that has not finalized is held
//! here until it does; the runtime applies records immediately (with
//! re-finalization and descendant propagation) when the target is already
//! finalized.

use rustc_hash::FxHashMap;

use crate::directive::DirectiveSet;

/// One queued or applied override.
#[derive(Debug, Clone)]
pub struct OverrideRecord {
    /// Path of the class being patched.
    pub target: String,
    /// The override directive body.
    pub body: DirectiveSet,
    /// Global arrival sequence number.
    pub sequence: u64,
}

/// Arrival-ordered override queue, keyed by target path.
#[derive(Debug, Default)]
pub struct OverrideManager {
    queued: FxHashMap<String, Vec<OverrideRecord>>,
    next_sequence: u64,
}

impl OverrideManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next arrival sequence number.
    pub fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    /// Hold a record until its target finalizes.
    pub fn queue(&mut self, record: OverrideRecord) {
        self.queued.entry(record.target.clone()).or_default().push(record);
    }

    /// Take every held record for a target, in arrival order.
    pub fn drain_for(&mut self, target: &str) -> Vec<OverrideRecord> {
        let mut records = self.queued.remove(target).unwrap_or_default();
        records.sort_by_key(|r| r.sequence);
        records
    }

    /// Whether any record is held for the target.
    pub fn has_queued(&self, target: &str) -> bool {
        self.queued.get(target).is_some_and(|v| !v.is_empty())
    }

    /// Drop all held records (test isolation). The sequence counter resets
    /// too; a reset runtime starts from a clean history.
    pub fn clear(&mut self) {
        self.queued.clear();
        self.next_sequence = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(manager: &mut OverrideManager, target: &str, body: serde_json::Value) -> OverrideRecord {
        OverrideRecord {
            target: target.to_string(),
            body: DirectiveSet::from_value(body).unwrap(),
            sequence: manager.next_sequence(),
        }
    }

    #[test]
    fn test_drain_preserves_arrival_order() {
        let mut manager = OverrideManager::new();
        let first = record(&mut manager, "Widget.A", json!({ "config": { "color": "green" } }));
        let second = record(&mut manager, "Widget.A", json!({ "config": { "color": "gold" } }));
        manager.queue(second);
        manager.queue(first);

        let drained = manager.drain_for("Widget.A");
        assert_eq!(drained.len(), 2);
        assert!(drained[0].sequence < drained[1].sequence);
        assert!(!manager.has_queued("Widget.A"));
    }

    #[test]
    fn test_targets_are_independent() {
        let mut manager = OverrideManager::new();
        let a = record(&mut manager, "Widget.A", json!({}));
        manager.queue(a);
        assert!(manager.has_queued("Widget.A"));
        assert!(!manager.has_queued("Widget.B"));
        assert!(manager.drain_for("Widget.B").is_empty());
    }
}
