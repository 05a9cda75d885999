//! Desired and observed record traits.
//!
//! Each entity kind has a pair of records:
//!
//! - a **desired** record: sparse, every field a [`declarative::Field`],
//!   supplied by the caller and never mutated
//! - an **observed** record: the full remote state including
//!   server-computed fields, replaced after every successful call

use crate::registry::{EntityKind, KindSpec};
use declarative::Delta;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Remote state of one entity.
pub trait Observed: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Kind of entity this record describes.
    const KIND: EntityKind;

    /// Registry entry for this kind.
    fn spec() -> &'static KindSpec {
        Self::KIND.spec()
    }

    /// Identity, following the kind's identity fields in priority order.
    fn identity(&self) -> Option<String> {
        serde_json::to_value(self)
            .ok()
            .and_then(|value| Self::spec().identity_of(&value))
    }
}

/// Desired configuration of one entity.
pub trait Desired: Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync + 'static {
    /// The observed record for the same kind.
    type Observed: Observed;

    /// Parent identity for kinds created under another entity.
    fn scope(&self) -> Option<&str> {
        None
    }

    /// Changed fields against the last observed state.
    ///
    /// Unset fields never appear. Computed fields are stripped later by the
    /// reconciler from registry data.
    fn diff(&self, observed: &Self::Observed) -> serde_json::Result<Delta>;
}
