//! Worker queues.
//!
//! A queue lives inside an environment. The environment id goes into the
//! create path, never into a body, and cannot change after creation.

use super::Blob;
use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};

/// Desired worker queue configuration.
///
/// Unset at create time: `status` becomes `active` and
/// `heartbeat_interval` 60 seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerQueueConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub environment_id: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub display_name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub status: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub max_workers: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub heartbeat_interval: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub tags: Field<Vec<String>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub settings: Field<Blob>,
}

/// Observed worker queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerQueue {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub environment_id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub max_workers: Option<i64>,
    pub heartbeat_interval: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub settings: Option<Blob>,
    pub created_by: Option<String>,
    pub active_workers: Option<i64>,
    pub task_queue_name: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Observed for WorkerQueue {
    const KIND: EntityKind = EntityKind::WorkerQueue;
}

impl Desired for WorkerQueueConfig {
    type Observed = WorkerQueue;

    fn scope(&self) -> Option<&str> {
        self.environment_id.as_value().map(String::as_str)
    }

    fn diff(&self, observed: &WorkerQueue) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar(
                "environment_id",
                &self.environment_id,
                observed.environment_id.as_ref(),
            )
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("display_name", &self.display_name, observed.display_name.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .scalar("status", &self.status, observed.status.as_ref())
            .scalar("max_workers", &self.max_workers, observed.max_workers.as_ref())
            .scalar(
                "heartbeat_interval",
                &self.heartbeat_interval,
                observed.heartbeat_interval.as_ref(),
            )
            .tags("tags", &self.tags, observed.tags.as_deref())
            .blob("settings", &self.settings, observed.settings.as_ref());
        delta.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_comes_from_environment_id() {
        let desired = WorkerQueueConfig {
            environment_id: Field::Value("env-1".to_string()),
            ..Default::default()
        };
        assert_eq!(desired.scope(), Some("env-1"));
        assert_eq!(WorkerQueueConfig::default().scope(), None);
    }

    #[test]
    fn test_moving_environment_shows_in_delta() {
        let observed: WorkerQueue =
            serde_json::from_value(json!({"id": "q1", "environment_id": "env-1"})).unwrap();
        let desired = WorkerQueueConfig {
            environment_id: Field::Value("env-2".to_string()),
            ..Default::default()
        };
        assert!(desired.diff(&observed).unwrap().contains("environment_id"));
    }
}
