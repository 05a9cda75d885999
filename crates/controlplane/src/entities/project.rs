//! Projects.

use super::Blob;
use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};

/// Desired project configuration.
///
/// `visibility` defaults to `private` and `restrict_to_environment` to
/// `false` when a project is created with them unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub key: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub goals: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub settings: Field<Blob>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub status: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub visibility: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub restrict_to_environment: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub policy_ids: Field<Vec<String>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub default_model: Field<String>,
}

/// Observed project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    pub key: Option<String>,
    pub description: Option<String>,
    pub goals: Option<String>,
    pub settings: Option<Blob>,
    pub status: Option<String>,
    pub visibility: Option<String>,
    pub owner_id: Option<String>,
    pub owner_email: Option<String>,
    pub restrict_to_environment: Option<bool>,
    pub policy_ids: Option<Vec<String>>,
    pub default_model: Option<String>,
    pub agent_count: Option<i64>,
    pub team_count: Option<i64>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Observed for Project {
    const KIND: EntityKind = EntityKind::Project;
}

impl Desired for ProjectConfig {
    type Observed = Project;

    fn diff(&self, observed: &Project) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("key", &self.key, observed.key.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .scalar("goals", &self.goals, observed.goals.as_ref())
            .blob("settings", &self.settings, observed.settings.as_ref())
            .scalar("status", &self.status, observed.status.as_ref())
            .scalar("visibility", &self.visibility, observed.visibility.as_ref())
            .scalar(
                "restrict_to_environment",
                &self.restrict_to_environment,
                observed.restrict_to_environment.as_ref(),
            )
            .tags("policy_ids", &self.policy_ids, observed.policy_ids.as_deref())
            .scalar("default_model", &self.default_model, observed.default_model.as_ref());
        delta.finish()
    }
}
