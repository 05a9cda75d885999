//! Workers.
//!
//! Workers register themselves and go away when they disconnect. The API
//! has no update or delete for them: updates are recorded locally and a
//! delete only stops tracking. A read that finds nothing means the worker
//! is gone, not that something broke.

use super::Blob;
use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};

/// Desired worker registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub environment_name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub hostname: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub worker_metadata: Field<Blob>,
}

/// Observed worker.
///
/// Responses may carry `worker_id`, `id`, or both; `worker_id` wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Worker {
    pub id: Option<String>,
    pub worker_id: Option<String>,
    pub organization_id: Option<String>,
    pub environment_name: Option<String>,
    pub hostname: Option<String>,
    /// `active`, `inactive` or `disconnected`.
    pub status: Option<String>,
    pub worker_metadata: Option<Blob>,
    #[serde(with = "crate::timestamp")]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Observed for Worker {
    const KIND: EntityKind = EntityKind::Worker;
}

impl Desired for WorkerConfig {
    type Observed = Worker;

    fn diff(&self, observed: &Worker) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar(
                "environment_name",
                &self.environment_name,
                observed.environment_name.as_ref(),
            )
            .scalar("hostname", &self.hostname, observed.hostname.as_ref())
            .blob(
                "worker_metadata",
                &self.worker_metadata,
                observed.worker_metadata.as_ref(),
            );
        delta.finish()
    }
}
