//! Entity registry: providers, trackables, and their current locations.
//!
//! See [`store::Registry`] for the upsert and propagation semantics.

mod store;
mod types;

pub use store::{ProviderUpsert, Registry};
pub use types::{
    EntityKind, EntityRef, Provider, ProviderType, RegistryError, Trackable, TrackableType,
    UpsertOutcome,
};
