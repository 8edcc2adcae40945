//! Entity records managed by the registry.
//!
//! Two distinct namespaces exist: location providers (the sensor devices
//! that emit positions) and trackables (the logical assets being tracked).
//! A trackable may receive its location from one or more providers; the
//! link set on the trackable records that many-to-many relation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sensor technology of a location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Ble,
    Uwb,
    Wifi,
    Rfid,
    Gps,
    Virtual,
    #[serde(other)]
    Unknown,
}

impl Default for ProviderType {
    fn default() -> Self {
        ProviderType::Unknown
    }
}

/// Kind of asset a trackable represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackableType {
    Asset,
    Person,
    Vehicle,
    #[serde(other)]
    Unknown,
}

impl Default for TrackableType {
    fn default() -> Self {
        TrackableType::Unknown
    }
}

/// A location-emitting sensor device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,

    #[serde(rename = "type", default)]
    pub provider_type: ProviderType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl Provider {
    pub fn new(id: impl Into<String>, provider_type: ProviderType) -> Self {
        Self {
            id: id.into(),
            provider_type,
            name: None,
            properties: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A tracked logical asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trackable {
    pub id: String,

    #[serde(rename = "type", default)]
    pub trackable_type: TrackableType,

    /// Providers this trackable receives location from.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub providers: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Radius in local units for circular rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl Trackable {
    pub fn new(id: impl Into<String>, trackable_type: TrackableType) -> Self {
        Self {
            id: id.into(),
            trackable_type,
            providers: BTreeSet::new(),
            name: None,
            radius: None,
        }
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.providers.insert(provider_id.into());
        self
    }
}

/// Entity namespace discriminator for errors and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Provider,
    Trackable,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Provider => write!(f, "provider"),
            EntityKind::Trackable => write!(f, "trackable"),
        }
    }
}

/// Reference to a tracked entity in either namespace.
///
/// Serializes as a single `provider_id` or `trackable_id` field (the two
/// are mutually exclusive on the wire).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    #[serde(rename = "provider_id")]
    Provider(String),
    #[serde(rename = "trackable_id")]
    Trackable(String),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Provider(_) => EntityKind::Provider,
            EntityRef::Trackable(_) => EntityKind::Trackable,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityRef::Provider(id) | EntityRef::Trackable(id) => id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Which branch an upsert took, so callers and tests can assert on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created)
    }
}

/// Errors reported to callers of explicit registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required field was missing or empty on an explicit create.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced entity does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },
}
