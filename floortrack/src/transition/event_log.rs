//! Capped, newest-first log of fence transition events.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::EntityRef;

/// Default number of events retained before the oldest are evicted.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 100;

/// Kind of fence transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FenceEventKind {
    RegionEntry,
    RegionExit,
}

/// A fence entry or exit record.
///
/// Carries `entry_time` for entries and `exit_time` for exits; the entity
/// reference serializes as a single `provider_id` or `trackable_id` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FenceEvent {
    pub id: u64,

    pub event_type: FenceEventKind,

    pub fence_id: String,

    #[serde(flatten)]
    pub entity: EntityRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<DateTime<Utc>>,
}

/// Ring buffer of fence events with monotonically increasing ids.
///
/// Once the capacity is exceeded the oldest events are evicted silently;
/// reads return newest first.
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<FenceEvent>,
    capacity: usize,
    next_id: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Append a transition, assigning the next event id. Returns the
    /// recorded event.
    pub fn record(
        &mut self,
        kind: FenceEventKind,
        fence_id: impl Into<String>,
        entity: EntityRef,
        at: DateTime<Utc>,
    ) -> FenceEvent {
        let (entry_time, exit_time) = match kind {
            FenceEventKind::RegionEntry => (Some(at), None),
            FenceEventKind::RegionExit => (None, Some(at)),
        };
        let event = FenceEvent {
            id: self.next_id,
            event_type: kind,
            fence_id: fence_id.into(),
            entity,
            entry_time,
            exit_time,
        };
        self.next_id += 1;

        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event.clone());
        event
    }

    /// The most recent events, newest first.
    pub fn latest(&self, count: usize) -> Vec<FenceEvent> {
        self.events.iter().rev().take(count).cloned().collect()
    }

    /// The most recent events for one entity, newest first.
    pub fn for_entity(&self, entity: &EntityRef, count: usize) -> Vec<FenceEvent> {
        self.events
            .iter()
            .rev()
            .filter(|e| &e.entity == entity)
            .take(count)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(id: &str) -> EntityRef {
        EntityRef::Provider(id.to_string())
    }

    #[test]
    fn test_record_assigns_monotonic_ids() {
        let mut log = EventLog::new(10);
        let a = log.record(FenceEventKind::RegionEntry, "f1", provider("p1"), Utc::now());
        let b = log.record(FenceEventKind::RegionExit, "f1", provider("p1"), Utc::now());
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_entry_and_exit_timestamps() {
        let mut log = EventLog::new(10);
        let at = Utc::now();

        let entry = log.record(FenceEventKind::RegionEntry, "f1", provider("p1"), at);
        assert_eq!(entry.entry_time, Some(at));
        assert_eq!(entry.exit_time, None);

        let exit = log.record(FenceEventKind::RegionExit, "f1", provider("p1"), at);
        assert_eq!(exit.entry_time, None);
        assert_eq!(exit.exit_time, Some(at));
    }

    #[test]
    fn test_capacity_evicts_oldest_silently() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.record(
                FenceEventKind::RegionEntry,
                format!("f{}", i),
                provider("p1"),
                Utc::now(),
            );
        }
        assert_eq!(log.len(), 3);

        let latest = log.latest(10);
        let fences: Vec<&str> = latest.iter().map(|e| e.fence_id.as_str()).collect();
        // Newest first; f0 and f1 were evicted.
        assert_eq!(fences, vec!["f4", "f3", "f2"]);
    }

    #[test]
    fn test_for_entity_filters() {
        let mut log = EventLog::new(10);
        log.record(FenceEventKind::RegionEntry, "f1", provider("p1"), Utc::now());
        log.record(FenceEventKind::RegionEntry, "f1", provider("p2"), Utc::now());
        log.record(FenceEventKind::RegionExit, "f1", provider("p1"), Utc::now());

        let events = log.for_entity(&provider("p1"), 10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, FenceEventKind::RegionExit);
    }

    #[test]
    fn test_event_wire_shape() {
        let mut log = EventLog::new(10);
        let event = log.record(
            FenceEventKind::RegionEntry,
            "dock",
            EntityRef::Trackable("t1".to_string()),
            Utc::now(),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "region_entry");
        assert_eq!(json["fence_id"], "dock");
        assert_eq!(json["trackable_id"], "t1");
        assert!(json.get("provider_id").is_none());
        assert!(json.get("exit_time").is_none());
        assert!(json.get("entry_time").is_some());
    }
}
