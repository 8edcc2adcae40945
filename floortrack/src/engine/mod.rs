//! Ingestion pipeline.
//!
//! The engine owns every stateful component (registry, fence set,
//! transition tracker, event log, metrics) and applies each incoming
//! update to completion: normalize → registry upsert → propagation →
//! containment evaluation → transition diff → broadcast. A single
//! consumer task drains the update queue, so registry mutations never
//! interleave and no locks guard the hot path.
//!
//! Fan-out happens on every normalized update, independent of geofence
//! evaluation; a location that triggers no transition is still published
//! to subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::SceneConfig;
use crate::coord::{Georeference, Point};
use crate::fence::{fences_containing_point, Fence};
use crate::hub::{HubMessage, LocationHub};
use crate::location::{normalize_with_status, Location, NormalizeStatus};
use crate::registry::{
    EntityRef, ProviderType, Registry, RegistryError, UpsertOutcome,
};
use crate::telemetry::PipelineMetrics;
use crate::transition::{EventLog, FenceEvent, TransitionTracker};

/// Default depth of the update queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fence events retained in the log.
    pub event_log_capacity: usize,
    /// Update queue depth before ingestion callers are backpressured.
    pub queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: crate::transition::DEFAULT_EVENT_LOG_CAPACITY,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn with_event_log_capacity(mut self, capacity: usize) -> Self {
        self.event_log_capacity = capacity;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }
}

/// Whether an update targets the provider or trackable namespace.
///
/// The routing decision belongs to the caller (the ingestion endpoint),
/// not to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Provider,
    Trackable,
}

/// A location update as it arrives from the outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub kind: UpdateKind,

    pub entity_id: String,

    pub position: Point,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<ProviderType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trackables: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl LocationUpdate {
    fn to_location(&self) -> Location {
        Location {
            position: self.position.clone(),
            crs: self.crs.clone(),
            provider_id: match self.kind {
                UpdateKind::Provider => Some(self.entity_id.clone()),
                UpdateKind::Trackable => None,
            },
            provider_type: self.provider_type,
            trackables: self.trackables.clone(),
            timestamp: self.timestamp,
            accuracy: self.accuracy,
        }
    }
}

/// Everything one update produced.
#[derive(Debug)]
pub struct ProcessedUpdate {
    /// Which upsert branch the primary entity took.
    pub outcome: UpsertOutcome,
    /// Fence transitions recorded in the event log.
    pub events: Vec<FenceEvent>,
    /// Messages to fan out to subscribers.
    pub messages: Vec<HubMessage>,
}

/// The ingestion engine.
pub struct Engine {
    georef: Georeference,
    fences: Vec<Fence>,
    registry: Registry,
    tracker: TransitionTracker,
    event_log: Arc<RwLock<EventLog>>,
    metrics: Arc<PipelineMetrics>,
}

impl Engine {
    /// Build an engine from a validated scene configuration.
    ///
    /// Seed providers and trackables from the scene are registered before
    /// any update is processed.
    pub fn from_scene(scene: SceneConfig, config: &EngineConfig) -> Result<Self, RegistryError> {
        let mut registry = Registry::new();
        for provider in scene.providers {
            registry.create_provider(provider)?;
        }
        for trackable in scene.trackables {
            registry.create_trackable(trackable)?;
        }

        Ok(Self {
            georef: scene.georeference,
            fences: scene.fences,
            registry,
            tracker: TransitionTracker::new(),
            event_log: Arc::new(RwLock::new(EventLog::new(config.event_log_capacity))),
            metrics: Arc::new(PipelineMetrics::new()),
        })
    }

    /// Shared handle to the event log for display layers.
    pub fn event_log(&self) -> Arc<RwLock<EventLog>> {
        Arc::clone(&self.event_log)
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Create the update queue for this engine's [`run`](Self::run) loop.
    pub fn update_channel(
        config: &EngineConfig,
    ) -> (mpsc::Sender<LocationUpdate>, mpsc::Receiver<LocationUpdate>) {
        mpsc::channel(config.queue_depth)
    }

    /// Apply a single update to completion.
    pub fn process_update(&mut self, update: LocationUpdate) -> ProcessedUpdate {
        self.metrics.update_received();

        let at = update.timestamp.unwrap_or_else(Utc::now);
        let location = update.to_location();
        let (normalized, status) = normalize_with_status(&location, &self.georef);
        match status {
            NormalizeStatus::Normalized => self.metrics.update_normalized(),
            NormalizeStatus::FailedOpen => self.metrics.transform_failed(),
            NormalizeStatus::AlreadyLocal | NormalizeStatus::Unsupported => {}
        }

        let (outcome, events, messages) = match update.kind {
            UpdateKind::Provider => self.apply_provider_update(&update.entity_id, normalized, at),
            UpdateKind::Trackable => self.apply_trackable_update(&update.entity_id, normalized, at),
        };

        self.metrics.events_emitted(events.len() as u64);

        ProcessedUpdate {
            outcome,
            events,
            messages,
        }
    }

    fn apply_provider_update(
        &mut self,
        entity_id: &str,
        normalized: Location,
        at: DateTime<Utc>,
    ) -> (UpsertOutcome, Vec<FenceEvent>, Vec<HubMessage>) {
        let result = self
            .registry
            .upsert_provider_location(entity_id, normalized.clone());
        if result.outcome.is_created() {
            self.metrics.entity_auto_created();
        }

        let position = normalized.position.clone();
        let mut events =
            self.evaluate_transitions(EntityRef::Provider(entity_id.to_string()), &position, at);
        let mut messages = vec![HubMessage::ProviderLocation {
            entity_id: entity_id.to_string(),
            location: normalized,
        }];

        // Propagated trackables share the provider's position; each is a
        // location update in its own right.
        for trackable_id in result.propagated {
            events.extend(self.evaluate_transitions(
                EntityRef::Trackable(trackable_id.clone()),
                &position,
                at,
            ));
            if let Some(location) = self.registry.trackable_location(&trackable_id) {
                messages.push(HubMessage::TrackableLocation {
                    entity_id: trackable_id,
                    location: location.clone(),
                });
            }
        }

        (result.outcome, events, messages)
    }

    fn apply_trackable_update(
        &mut self,
        entity_id: &str,
        normalized: Location,
        at: DateTime<Utc>,
    ) -> (UpsertOutcome, Vec<FenceEvent>, Vec<HubMessage>) {
        let outcome = self
            .registry
            .upsert_trackable_location(entity_id, normalized.clone());
        if outcome.is_created() {
            self.metrics.entity_auto_created();
        }

        let events = self.evaluate_transitions(
            EntityRef::Trackable(entity_id.to_string()),
            &normalized.position,
            at,
        );
        let messages = vec![HubMessage::TrackableLocation {
            entity_id: entity_id.to_string(),
            location: normalized,
        }];

        (outcome, events, messages)
    }

    fn evaluate_transitions(
        &mut self,
        entity: EntityRef,
        position: &Point,
        at: DateTime<Utc>,
    ) -> Vec<FenceEvent> {
        let containing = fences_containing_point(position, &self.fences);
        let transitions = self.tracker.observe(&entity, containing);
        if transitions.is_empty() {
            return Vec::new();
        }

        let mut log = self.event_log.write();
        transitions
            .into_iter()
            .map(|t| log.record(t.kind, t.fence_id, entity.clone(), at))
            .collect()
    }

    /// Delete a provider, dropping its stored location and containment
    /// state together.
    pub fn delete_provider(&mut self, id: &str) -> Result<(), RegistryError> {
        self.registry.delete_provider(id)?;
        self.tracker.forget(&EntityRef::Provider(id.to_string()));
        Ok(())
    }

    /// Delete a trackable, dropping its stored location and containment
    /// state together.
    pub fn delete_trackable(&mut self, id: &str) -> Result<(), RegistryError> {
        self.registry.delete_trackable(id)?;
        self.tracker.forget(&EntityRef::Trackable(id.to_string()));
        Ok(())
    }

    /// Consume updates until the channel closes or `cancel` fires.
    ///
    /// Each update runs to completion before the next is received, which
    /// is what makes the registry safe without locks.
    pub async fn run(
        mut self,
        mut updates: mpsc::Receiver<LocationUpdate>,
        hub: Arc<LocationHub>,
        cancel: CancellationToken,
    ) {
        info!(
            fence_count = self.fences.len(),
            provider_count = self.registry.provider_count(),
            trackable_count = self.registry.trackable_count(),
            "Ingestion engine started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = updates.recv() => {
                    let Some(update) = received else { break };
                    let processed = self.process_update(update);
                    for event in &processed.events {
                        info!(
                            event_id = event.id,
                            fence_id = %event.fence_id,
                            entity = %event.entity,
                            kind = ?event.event_type,
                            "Fence transition"
                        );
                    }
                    for message in &processed.messages {
                        hub.broadcast(message).await;
                    }
                }
            }
        }

        info!("Ingestion engine stopped");
    }
}
