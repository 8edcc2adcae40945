//! Startup scene configuration.
//!
//! The scene document is a single JSON file supplying the georeference,
//! the fence set, and optional seed entities. Configuration problems are
//! fatal at boot: a system running with a half-configured georeference or
//! a malformed fence would silently misplace entities, so loading fails
//! loudly instead.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{local_to_wgs84, wgs84_to_local, CoordError, Georeference, Point};
use crate::fence::{Fence, FenceGeometryError, FenceRegion};
use crate::location::{is_wgs84_tag, CRS_LOCAL};
use crate::registry::{Provider, Trackable};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scene file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scene document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid georeference: {0}")]
    Georeference(#[from] CoordError),

    #[error("invalid fence '{id}': {source}")]
    InvalidFence {
        id: String,
        #[source]
        source: FenceGeometryError,
    },

    #[error("duplicate fence id '{0}'")]
    DuplicateFenceId(String),

    #[error("fence '{id}' uses unsupported CRS '{crs}'")]
    UnsupportedFenceCrs { id: String, crs: String },

    #[error("failed to georeference fence '{id}': {source}")]
    FenceTransform {
        id: String,
        #[source]
        source: CoordError,
    },

    #[error("invalid seed entity: {0}")]
    InvalidEntity(String),
}

/// The validated scene: georeference, fences, and seed entities.
///
/// After [`SceneConfig::from_file`] returns, every fence is in the local
/// frame and every invariant the engine relies on has been checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    pub georeference: Georeference,

    #[serde(default)]
    pub fences: Vec<Fence>,

    #[serde(default)]
    pub providers: Vec<Provider>,

    #[serde(default)]
    pub trackables: Vec<Trackable>,
}

impl SceneConfig {
    /// Load and validate a scene document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse and validate a scene document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut scene: SceneConfig = serde_json::from_str(raw)?;
        scene.validate_and_normalize()?;
        Ok(scene)
    }

    fn validate_and_normalize(&mut self) -> Result<(), ConfigError> {
        self.georeference.validate()?;

        let mut seen = BTreeSet::new();
        for fence in &self.fences {
            if !seen.insert(fence.id.clone()) {
                return Err(ConfigError::DuplicateFenceId(fence.id.clone()));
            }
            fence.validate().map_err(|source| ConfigError::InvalidFence {
                id: fence.id.clone(),
                source,
            })?;
        }

        let georef = self.georeference.clone();
        for fence in &mut self.fences {
            normalize_fence_crs(fence, &georef)?;
        }

        for provider in &self.providers {
            if provider.id.is_empty() {
                return Err(ConfigError::InvalidEntity(
                    "provider id must not be empty".to_string(),
                ));
            }
        }
        for trackable in &self.trackables {
            if trackable.id.is_empty() {
                return Err(ConfigError::InvalidEntity(
                    "trackable id must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Bring a fence into the local frame.
///
/// Untagged and `local`-tagged fences pass through; WGS84-tagged fences
/// have every coordinate georeferenced. Any other tag is rejected, since
/// a fence in an unknown frame can never match entity positions.
fn normalize_fence_crs(fence: &mut Fence, georef: &Georeference) -> Result<(), ConfigError> {
    match fence.crs.as_deref() {
        None | Some(CRS_LOCAL) => Ok(()),
        Some(tag) if is_wgs84_tag(tag) => {
            transform_region(&mut fence.region, georef).map_err(|source| {
                ConfigError::FenceTransform {
                    id: fence.id.clone(),
                    source,
                }
            })?;
            fence.crs = Some(CRS_LOCAL.to_string());
            Ok(())
        }
        Some(other) => Err(ConfigError::UnsupportedFenceCrs {
            id: fence.id.clone(),
            crs: other.to_string(),
        }),
    }
}

fn transform_region(region: &mut FenceRegion, georef: &Georeference) -> Result<(), CoordError> {
    match region {
        FenceRegion::Point { coordinates } => {
            transform_position(coordinates, georef)?;
            Ok(())
        }
        FenceRegion::Polygon { coordinates } => {
            for ring in coordinates {
                for position in ring {
                    transform_position(position, georef)?;
                }
            }
            Ok(())
        }
    }
}

fn transform_position(position: &mut Vec<f64>, georef: &Georeference) -> Result<(), CoordError> {
    let point = Point {
        coordinates: position.clone(),
    };
    let local = wgs84_to_local(&point, georef)?;
    // Round-trip sanity: a frame that cannot be inverted would hide a
    // degenerate scale until the first entity update.
    local_to_wgs84(&local, georef)?;
    *position = local.coordinates;
    Ok(())
}
