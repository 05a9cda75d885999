//! Tool sets.

use super::Blob;
use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};

/// Desired tool set configuration. `type` is fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSetConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Field::is_unset")]
    pub toolset_type: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub icon: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub enabled: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub configuration: Field<Blob>,
}

/// Observed tool set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSet {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub toolset_type: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub enabled: Option<bool>,
    pub configuration: Option<Blob>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Observed for ToolSet {
    const KIND: EntityKind = EntityKind::ToolSet;
}

impl Desired for ToolSetConfig {
    type Observed = ToolSet;

    fn diff(&self, observed: &ToolSet) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("type", &self.toolset_type, observed.toolset_type.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .scalar("icon", &self.icon, observed.icon.as_ref())
            .scalar("enabled", &self.enabled, observed.enabled.as_ref())
            .blob("configuration", &self.configuration, observed.configuration.as_ref());
        delta.finish()
    }
}
