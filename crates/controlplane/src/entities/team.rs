//! Teams.

use super::Blob;
use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};

/// Desired team configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    /// `active`, `inactive` or `archived`.
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub status: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub configuration: Field<Blob>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub skill_ids: Field<Vec<String>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub execution_environment: Field<Blob>,
}

/// Observed team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub configuration: Option<Blob>,
    pub skill_ids: Option<Vec<String>>,
    pub execution_environment: Option<Blob>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Observed for Team {
    const KIND: EntityKind = EntityKind::Team;
}

impl Desired for TeamConfig {
    type Observed = Team;

    fn diff(&self, observed: &Team) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .scalar("status", &self.status, observed.status.as_ref())
            .blob("configuration", &self.configuration, observed.configuration.as_ref())
            .tags("skill_ids", &self.skill_ids, observed.skill_ids.as_deref())
            .blob(
                "execution_environment",
                &self.execution_environment,
                observed.execution_environment.as_ref(),
            );
        delta.finish()
    }
}
