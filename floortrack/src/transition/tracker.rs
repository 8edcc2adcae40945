//! Containment-set diffing.
//!
//! The tracker keeps, per entity, the set of fences that contained it on
//! its previous update. Diffing the freshly computed set against the
//! stored one yields transitions exactly on state change: the detection is
//! level-triggered, so an entity sitting inside a fence produces no event
//! spam, and an entity whose very first observation is already inside a
//! fence emits a single entry.

use std::collections::{BTreeSet, HashMap};

use crate::registry::EntityRef;

use super::event_log::FenceEventKind;

/// A single detected transition, before it is recorded as an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceTransition {
    pub kind: FenceEventKind,
    pub fence_id: String,
}

/// Per-entity containment state with transition detection.
#[derive(Debug, Default)]
pub struct TransitionTracker {
    containment: HashMap<EntityRef, BTreeSet<String>>,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current containment set for an entity and return the
    /// transitions relative to its previous state.
    ///
    /// Entries are reported before exits; both in fence-id order. The
    /// stored set is replaced unconditionally, also when no transitions
    /// fired.
    pub fn observe(
        &mut self,
        entity: &EntityRef,
        current: BTreeSet<String>,
    ) -> Vec<FenceTransition> {
        let previous = self.containment.get(entity);

        let mut transitions = Vec::new();
        for fence_id in &current {
            if previous.map_or(true, |prev| !prev.contains(fence_id)) {
                transitions.push(FenceTransition {
                    kind: FenceEventKind::RegionEntry,
                    fence_id: fence_id.clone(),
                });
            }
        }
        if let Some(prev) = previous {
            for fence_id in prev {
                if !current.contains(fence_id) {
                    transitions.push(FenceTransition {
                        kind: FenceEventKind::RegionExit,
                        fence_id: fence_id.clone(),
                    });
                }
            }
        }

        self.containment.insert(entity.clone(), current);
        transitions
    }

    /// Containment set from the entity's last observation. `None` for an
    /// entity never observed.
    pub fn containment(&self, entity: &EntityRef) -> Option<&BTreeSet<String>> {
        self.containment.get(entity)
    }

    /// Drop all state for an entity (on delete). Idempotent.
    pub fn forget(&mut self, entity: &EntityRef) {
        self.containment.remove(entity);
    }

    pub fn tracked_count(&self) -> usize {
        self.containment.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(id: &str) -> EntityRef {
        EntityRef::Provider(id.to_string())
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_move_through_fence_yields_one_entry_one_exit() {
        let mut tracker = TransitionTracker::new();
        let p1 = provider("p1");

        // Outside, enter, dwell, dwell, leave.
        let sequence = [
            set(&[]),
            set(&["f1"]),
            set(&["f1"]),
            set(&["f1"]),
            set(&[]),
        ];

        let mut all: Vec<FenceTransition> = Vec::new();
        for current in sequence {
            all.extend(tracker.observe(&p1, current));
        }

        assert_eq!(
            all,
            vec![
                FenceTransition {
                    kind: FenceEventKind::RegionEntry,
                    fence_id: "f1".to_string()
                },
                FenceTransition {
                    kind: FenceEventKind::RegionExit,
                    fence_id: "f1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_first_observation_inside_emits_single_entry() {
        let mut tracker = TransitionTracker::new();
        let transitions = tracker.observe(&provider("new"), set(&["f1"]));
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].kind, FenceEventKind::RegionEntry);
    }

    #[test]
    fn test_stationary_entity_is_silent() {
        let mut tracker = TransitionTracker::new();
        let p1 = provider("p1");
        tracker.observe(&p1, set(&["f1", "f2"]));
        for _ in 0..10 {
            assert!(tracker.observe(&p1, set(&["f1", "f2"])).is_empty());
        }
    }

    #[test]
    fn test_fence_swap_in_one_update() {
        let mut tracker = TransitionTracker::new();
        let p1 = provider("p1");
        tracker.observe(&p1, set(&["f1"]));

        let transitions = tracker.observe(&p1, set(&["f2"]));
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].kind, FenceEventKind::RegionEntry);
        assert_eq!(transitions[0].fence_id, "f2");
        assert_eq!(transitions[1].kind, FenceEventKind::RegionExit);
        assert_eq!(transitions[1].fence_id, "f1");
    }

    #[test]
    fn test_state_replaced_even_without_transitions() {
        let mut tracker = TransitionTracker::new();
        let p1 = provider("p1");
        tracker.observe(&p1, set(&["f1"]));
        tracker.observe(&p1, set(&["f1"]));
        assert_eq!(tracker.containment(&p1), Some(&set(&["f1"])));
    }

    #[test]
    fn test_entities_are_independent() {
        let mut tracker = TransitionTracker::new();
        tracker.observe(&provider("p1"), set(&["f1"]));

        // A different entity entering the same fence still transitions.
        let transitions = tracker.observe(&provider("p2"), set(&["f1"]));
        assert_eq!(transitions.len(), 1);

        // Provider and trackable namespaces do not collide.
        let transitions = tracker.observe(&EntityRef::Trackable("p1".to_string()), set(&["f1"]));
        assert_eq!(transitions.len(), 1);
    }

    #[test]
    fn test_forget_resets_entity_state() {
        let mut tracker = TransitionTracker::new();
        let p1 = provider("p1");
        tracker.observe(&p1, set(&["f1"]));
        tracker.forget(&p1);
        assert!(tracker.containment(&p1).is_none());

        // Re-appearing inside the fence counts as a fresh entry.
        let transitions = tracker.observe(&p1, set(&["f1"]));
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].kind, FenceEventKind::RegionEntry);
    }
}
