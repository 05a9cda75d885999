//! Environments.

use super::Blob;
use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Desired environment configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub display_name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub tags: Field<Vec<String>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub settings: Field<Blob>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub status: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub execution_environment: Field<Blob>,
}

/// Observed environment.
///
/// `worker_token` is a generated secret; it is kept in observed state but
/// never sent back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub settings: Option<Blob>,
    pub status: Option<String>,
    pub execution_environment: Option<Blob>,
    pub created_by: Option<String>,
    pub worker_token: Option<String>,
    pub provisioning_workflow_id: Option<String>,
    pub error_message: Option<String>,
    pub temporal_namespace_id: Option<String>,
    pub active_workers: Option<i64>,
    pub idle_workers: Option<i64>,
    pub busy_workers: Option<i64>,
    pub toolset_ids: Option<Vec<String>>,
    pub toolsets: Option<Vec<Value>>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub provisioned_at: Option<DateTime<Utc>>,
}

impl Observed for Environment {
    const KIND: EntityKind = EntityKind::Environment;
}

impl Desired for EnvironmentConfig {
    type Observed = Environment;

    fn diff(&self, observed: &Environment) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("display_name", &self.display_name, observed.display_name.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .tags("tags", &self.tags, observed.tags.as_deref())
            .blob("settings", &self.settings, observed.settings.as_ref())
            .scalar("status", &self.status, observed.status.as_ref())
            .blob(
                "execution_environment",
                &self.execution_environment,
                observed.execution_environment.as_ref(),
            );
        delta.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_observed_keeps_generated_secret() {
        let observed: Environment = serde_json::from_value(json!({
            "id": "env-1",
            "name": "prod",
            "worker_token": "wt-secret",
            "provisioned_at": "2024-05-01 10:00:00.123"
        }))
        .unwrap();
        assert_eq!(observed.worker_token.as_deref(), Some("wt-secret"));
        assert!(observed.provisioned_at.is_some());

        let desired = EnvironmentConfig {
            name: Field::Value("prod".to_string()),
            ..Default::default()
        };
        assert!(desired.diff(&observed).unwrap().is_empty());
    }
}
