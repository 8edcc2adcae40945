//! In-memory entity registry.
//!
//! The registry is the authoritative store for providers, trackables and
//! their current locations. It is an owned service: constructed once per
//! process and passed explicitly to whatever drives ingestion, with no
//! module-level global state.
//!
//! Location updates follow an upsert discipline: unknown entities are
//! auto-created on their first update, and the stored location is always
//! replaced wholesale (never field-merged). Updates are applied strictly
//! in receipt order; the last write wins.

use std::collections::HashMap;

use tracing::debug;

use crate::location::Location;

use super::types::{
    EntityKind, Provider, ProviderType, RegistryError, Trackable, TrackableType, UpsertOutcome,
};

/// Result of a provider location upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUpsert {
    /// Whether the provider was auto-created or already known.
    pub outcome: UpsertOutcome,
    /// Trackables the location was propagated to, in application order.
    pub propagated: Vec<String>,
}

/// Authoritative in-memory store of providers, trackables and locations.
#[derive(Debug, Default)]
pub struct Registry {
    providers: HashMap<String, Provider>,
    trackables: HashMap<String, Trackable>,
    provider_locations: HashMap<String, Location>,
    trackable_locations: HashMap<String, Location>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- explicit CRUD ----------------------------------------------------

    /// Register a provider explicitly. Replaces the metadata record if the
    /// id already exists; any stored location is kept.
    pub fn create_provider(&mut self, provider: Provider) -> Result<(), RegistryError> {
        if provider.id.is_empty() {
            return Err(RegistryError::Validation(
                "provider id must not be empty".to_string(),
            ));
        }
        self.providers.insert(provider.id.clone(), provider);
        Ok(())
    }

    /// Register a trackable explicitly. Replaces the metadata record if
    /// the id already exists; any stored location is kept.
    pub fn create_trackable(&mut self, trackable: Trackable) -> Result<(), RegistryError> {
        if trackable.id.is_empty() {
            return Err(RegistryError::Validation(
                "trackable id must not be empty".to_string(),
            ));
        }
        self.trackables.insert(trackable.id.clone(), trackable);
        Ok(())
    }

    /// Remove a provider, its stored location, and its entry in every
    /// trackable's link set.
    pub fn delete_provider(&mut self, id: &str) -> Result<Provider, RegistryError> {
        let provider = self.providers.remove(id).ok_or_else(|| RegistryError::NotFound {
            kind: EntityKind::Provider,
            id: id.to_string(),
        })?;
        self.provider_locations.remove(id);
        for trackable in self.trackables.values_mut() {
            trackable.providers.remove(id);
        }
        Ok(provider)
    }

    /// Remove a trackable and its stored location.
    pub fn delete_trackable(&mut self, id: &str) -> Result<Trackable, RegistryError> {
        let trackable = self
            .trackables
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound {
                kind: EntityKind::Trackable,
                id: id.to_string(),
            })?;
        self.trackable_locations.remove(id);
        Ok(trackable)
    }

    // ---- location upserts -------------------------------------------------

    /// Apply a provider location update.
    ///
    /// Auto-creates the provider when unknown (type inferred from the
    /// payload, placeholder name), replaces its stored location, and
    /// propagates the location to trackables:
    ///
    /// - **Rule A** (primary): the payload names trackables explicitly;
    ///   each is auto-created if unknown, the provider is linked
    ///   (idempotent union), and the location is copied to it.
    /// - **Rule B** (fallback, only when the payload list is absent or
    ///   empty): every already-registered trackable whose link set
    ///   contains this provider receives the location. No trackables are
    ///   created in this path.
    ///
    /// `location` must already be normalized to the local frame.
    pub fn upsert_provider_location(
        &mut self,
        provider_id: &str,
        mut location: Location,
    ) -> ProviderUpsert {
        let outcome = if self.providers.contains_key(provider_id) {
            UpsertOutcome::Updated
        } else {
            let provider_type = location.provider_type.unwrap_or(ProviderType::Unknown);
            let provider = Provider::new(provider_id, provider_type)
                .with_name(format!("Provider {}", provider_id));
            debug!(provider_id = %provider_id, ?provider_type, "Auto-created provider on first location update");
            self.providers.insert(provider_id.to_string(), provider);
            UpsertOutcome::Created
        };

        location.provider_id = Some(provider_id.to_string());

        let propagated = match location.trackables.as_deref() {
            Some(listed) if !listed.is_empty() => {
                self.propagate_to_listed(provider_id, listed.to_vec(), &location)
            }
            _ => self.propagate_to_linked(provider_id, &location),
        };

        self.provider_locations
            .insert(provider_id.to_string(), location);

        ProviderUpsert {
            outcome,
            propagated,
        }
    }

    /// Rule A: propagate to explicitly listed trackables, creating and
    /// linking as needed.
    fn propagate_to_listed(
        &mut self,
        provider_id: &str,
        listed: Vec<String>,
        location: &Location,
    ) -> Vec<String> {
        let mut propagated = Vec::with_capacity(listed.len());
        for trackable_id in listed {
            if propagated.contains(&trackable_id) {
                continue;
            }
            let trackable = self
                .trackables
                .entry(trackable_id.clone())
                .or_insert_with(|| {
                    debug!(trackable_id = %trackable_id, "Auto-created trackable from provider update");
                    Trackable::new(trackable_id.clone(), TrackableType::Unknown)
                });
            trackable.providers.insert(provider_id.to_string());
            self.trackable_locations
                .insert(trackable_id.clone(), location.clone());
            propagated.push(trackable_id);
        }
        propagated
    }

    /// Rule B: propagate to registered trackables already linked to the
    /// provider. Sorted for deterministic application order.
    fn propagate_to_linked(&mut self, provider_id: &str, location: &Location) -> Vec<String> {
        let mut linked: Vec<String> = self
            .trackables
            .values()
            .filter(|t| t.providers.contains(provider_id))
            .map(|t| t.id.clone())
            .collect();
        linked.sort();
        for trackable_id in &linked {
            self.trackable_locations
                .insert(trackable_id.clone(), location.clone());
        }
        linked
    }

    /// Apply a direct trackable location update.
    ///
    /// Auto-creates the trackable when unknown, linking the supplying
    /// provider from the payload if present, then replaces the stored
    /// location. `location` must already be normalized.
    pub fn upsert_trackable_location(
        &mut self,
        trackable_id: &str,
        location: Location,
    ) -> UpsertOutcome {
        let outcome = if self.trackables.contains_key(trackable_id) {
            UpsertOutcome::Updated
        } else {
            let mut trackable = Trackable::new(trackable_id, TrackableType::Unknown);
            if let Some(provider_id) = location.provider_id.as_deref() {
                trackable.providers.insert(provider_id.to_string());
            }
            debug!(trackable_id = %trackable_id, "Auto-created trackable on first location update");
            self.trackables.insert(trackable_id.to_string(), trackable);
            UpsertOutcome::Created
        };

        self.trackable_locations
            .insert(trackable_id.to_string(), location);
        outcome
    }

    // ---- accessors --------------------------------------------------------

    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.get(id)
    }

    pub fn trackable(&self, id: &str) -> Option<&Trackable> {
        self.trackables.get(id)
    }

    pub fn provider_location(&self, id: &str) -> Option<&Location> {
        self.provider_locations.get(id)
    }

    pub fn trackable_location(&self, id: &str) -> Option<&Location> {
        self.trackable_locations.get(id)
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn trackable_count(&self) -> usize {
        self.trackables.len()
    }
}
