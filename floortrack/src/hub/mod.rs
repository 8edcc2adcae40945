//! Realtime fan-out of location updates
//!
//! The hub holds the set of connected subscriber channels and publishes
//! every normalized location update to all of them, independent of
//! geofence evaluation. Messages are serialized once and fanned out as
//! JSON text frames.
//!
//! # Failure isolation
//!
//! A send failure (the subscriber's receiver was dropped or its transport
//! reported closure) removes only that subscriber; delivery to the others
//! continues unaffected.
//!
//! # Heartbeats
//!
//! Each subscriber gets a keep-alive frame roughly every 15 seconds to
//! defeat idle-connection timeouts imposed by proxies between the hub and
//! the consumer. The heartbeat task and the subscriber channel share one
//! cancellation token, so both are released together on unsubscribe and
//! timers cannot leak past their subscription.

mod reconnect;

pub use reconnect::{ConnectionState, ReconnectDecision, ReconnectPolicy, ReconnectState};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::location::Location;
use crate::telemetry::PipelineMetrics;

/// Default keep-alive interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Interval between keep-alive frames per subscriber.
    pub heartbeat_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Messages published to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    ProviderLocation {
        entity_id: String,
        location: Location,
    },
    TrackableLocation {
        entity_id: String,
        location: Location,
    },
    /// Keep-alive frame.
    Heartbeat { timestamp: DateTime<Utc> },
}

/// A live subscription handed to the consumer.
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::UnboundedReceiver<String>,
}

struct Subscriber {
    tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

/// Fan-out hub over in-process subscriber channels.
pub struct LocationHub {
    subscribers: RwLock<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
    config: HubConfig,
    metrics: Arc<PipelineMetrics>,
}

impl LocationHub {
    pub fn new(config: HubConfig, metrics: Arc<PipelineMetrics>) -> Arc<Self> {
        Arc::new(Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
            metrics,
        })
    }

    /// Attach a new subscriber and start its heartbeat task.
    pub async fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(
                id,
                Subscriber {
                    tx,
                    cancel: cancel.clone(),
                },
            );
        }
        self.metrics.subscriber_connected();
        info!(subscriber_id = id, "Subscriber connected");

        spawn_heartbeat(
            Arc::downgrade(self),
            id,
            cancel,
            self.config.heartbeat_interval,
        );

        Subscription { id, receiver: rx }
    }

    /// Detach a subscriber, cancelling its heartbeat task with it.
    pub async fn unsubscribe(&self, id: u64) {
        let removed = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.remove(&id)
        };
        if let Some(subscriber) = removed {
            subscriber.cancel.cancel();
            self.metrics.subscriber_dropped();
            info!(subscriber_id = id, "Subscriber disconnected");
        }
    }

    /// Publish one message to every connected subscriber.
    ///
    /// Subscribers whose channel rejects the send are removed; the rest
    /// are unaffected.
    pub async fn broadcast(&self, message: &HubMessage) {
        let frame = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize hub message");
                return;
            }
        };

        let failed = {
            let subscribers = self.subscribers.read().await;
            debug!(
                subscriber_count = subscribers.len(),
                "Broadcasting to subscribers"
            );
            let mut failed = Vec::new();
            for (id, subscriber) in subscribers.iter() {
                if subscriber.tx.send(frame.clone()).is_err() {
                    failed.push(*id);
                } else {
                    self.metrics.broadcast_sent();
                }
            }
            failed
        };

        for id in failed {
            warn!(subscriber_id = id, "Send failed, dropping subscriber");
            self.metrics.broadcast_failed();
            self.unsubscribe(id).await;
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Send a keep-alive frame to one subscriber. Returns false when the
    /// subscriber is gone or its channel is closed.
    async fn send_heartbeat(&self, id: u64) -> bool {
        let frame = match serde_json::to_string(&HubMessage::Heartbeat {
            timestamp: Utc::now(),
        }) {
            Ok(json) => json,
            Err(_) => return false,
        };

        let sent = {
            let subscribers = self.subscribers.read().await;
            match subscribers.get(&id) {
                Some(subscriber) => subscriber.tx.send(frame).is_ok(),
                None => return false,
            }
        };

        if !sent {
            warn!(subscriber_id = id, "Heartbeat failed, dropping subscriber");
            self.unsubscribe(id).await;
        }
        sent
    }
}

fn spawn_heartbeat(
    hub: Weak<LocationHub>,
    id: u64,
    cancel: CancellationToken,
    period: Duration,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; a subscriber should not
        // receive a heartbeat right after connecting.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let Some(hub) = hub.upgrade() else { break };
                    if !hub.send_heartbeat(id).await {
                        break;
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Point;
    use crate::location::CRS_LOCAL;

    fn hub_with(config: HubConfig) -> Arc<LocationHub> {
        LocationHub::new(config, Arc::new(PipelineMetrics::new()))
    }

    fn provider_message(id: &str) -> HubMessage {
        HubMessage::ProviderLocation {
            entity_id: id.to_string(),
            location: Location::new(Point::new(1.0, 2.0), CRS_LOCAL),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let hub = hub_with(HubConfig::default());
        let mut a = hub.subscribe().await;
        let mut b = hub.subscribe().await;

        hub.broadcast(&provider_message("p1")).await;

        let frame_a = a.receiver.recv().await.unwrap();
        let frame_b = b.receiver.recv().await.unwrap();
        assert_eq!(frame_a, frame_b);

        let parsed: HubMessage = serde_json::from_str(&frame_a).unwrap();
        assert!(matches!(parsed, HubMessage::ProviderLocation { entity_id, .. } if entity_id == "p1"));
    }

    #[tokio::test]
    async fn test_message_wire_shape() {
        let hub = hub_with(HubConfig::default());
        let mut sub = hub.subscribe().await;

        hub.broadcast(&HubMessage::TrackableLocation {
            entity_id: "t1".to_string(),
            location: Location::new(Point::new(3.0, 4.0), CRS_LOCAL),
        })
        .await;

        let frame = sub.receiver.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "trackable_location");
        assert_eq!(json["entity_id"], "t1");
        assert_eq!(json["location"]["position"]["coordinates"][0], 3.0);
    }

    #[tokio::test]
    async fn test_failed_subscriber_is_isolated() {
        let hub = hub_with(HubConfig::default());
        let dead = hub.subscribe().await;
        let mut live = hub.subscribe().await;

        // Simulate a closed transport by dropping the receiver.
        drop(dead.receiver);

        hub.broadcast(&provider_message("p1")).await;

        assert_eq!(hub.subscriber_count().await, 1);
        assert!(live.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_and_cancels() {
        let hub = hub_with(HubConfig::default());
        let sub = hub.subscribe().await;
        assert_eq!(hub.subscriber_count().await, 1);

        hub.unsubscribe(sub.id).await;
        assert_eq!(hub.subscriber_count().await, 0);

        // Idempotent.
        hub.unsubscribe(sub.id).await;
    }

    #[tokio::test]
    async fn test_heartbeat_frames_are_delivered() {
        let hub = hub_with(HubConfig {
            heartbeat_interval: Duration::from_millis(20),
        });
        let mut sub = hub.subscribe().await;

        let frame = tokio::time::timeout(Duration::from_secs(2), sub.receiver.recv())
            .await
            .expect("heartbeat within timeout")
            .expect("channel open");

        let parsed: HubMessage = serde_json::from_str(&frame).unwrap();
        assert!(matches!(parsed, HubMessage::Heartbeat { .. }));
    }

    #[tokio::test]
    async fn test_metrics_track_subscriber_lifecycle() {
        let metrics = Arc::new(PipelineMetrics::new());
        let hub = LocationHub::new(HubConfig::default(), Arc::clone(&metrics));

        let sub = hub.subscribe().await;
        hub.broadcast(&provider_message("p1")).await;
        hub.unsubscribe(sub.id).await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.subscribers_connected, 1);
        assert_eq!(snapshot.subscribers_dropped, 1);
        assert_eq!(snapshot.broadcasts_sent, 1);
    }
}
