//! Skills.
//!
//! Skill timestamps come back in several formats, which is why every
//! observed record parses them through [`crate::timestamp`].

use super::Blob;
use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};

/// Desired skill configuration.
///
/// `type` (`file_system`, `shell`, `docker`, `python`, `file_generation`,
/// `custom`) is fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Field::is_unset")]
    pub skill_type: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub icon: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub enabled: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub configuration: Field<Blob>,
}

/// Observed skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skill {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub skill_type: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub enabled: Option<bool>,
    pub configuration: Option<Blob>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Observed for Skill {
    const KIND: EntityKind = EntityKind::Skill;
}

impl Desired for SkillConfig {
    type Observed = Skill;

    fn diff(&self, observed: &Skill) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("type", &self.skill_type, observed.skill_type.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .scalar("icon", &self.icon, observed.icon.as_ref())
            .scalar("enabled", &self.enabled, observed.enabled.as_ref())
            .blob("configuration", &self.configuration, observed.configuration.as_ref());
        delta.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_naive_timestamps_decode() {
        let observed: Skill = serde_json::from_value(json!({
            "id": "sk-1",
            "type": "shell",
            "created_at": "2024-05-01T08:00:00.123456",
            "updated_at": ""
        }))
        .unwrap();
        assert!(observed.created_at.is_some());
        assert!(observed.updated_at.is_none());
    }

    #[test]
    fn test_type_uses_wire_name() {
        let desired: SkillConfig = serde_json::from_value(json!({"type": "docker"})).unwrap();
        let observed: Skill = serde_json::from_value(json!({"id": "sk-1", "type": "shell"})).unwrap();
        let delta = desired.diff(&observed).unwrap();
        assert_eq!(delta.get("type").unwrap(), "docker");
    }
}
