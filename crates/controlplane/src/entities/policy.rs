//! Policies.
//!
//! The update endpoint does not accept `policy_type`, so changing it
//! replaces the policy.

use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};

/// Policy language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    /// OPA Rego.
    #[default]
    Rego,
    /// JSON document.
    Json,
}

/// Desired policy configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub policy_content: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub policy_type: Field<PolicyType>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub enabled: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub tags: Field<Vec<String>>,
}

/// Observed policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub policy_content: Option<String>,
    pub policy_type: Option<PolicyType>,
    pub enabled: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub version: Option<i64>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Observed for Policy {
    const KIND: EntityKind = EntityKind::Policy;
}

impl Desired for PolicyConfig {
    type Observed = Policy;

    fn diff(&self, observed: &Policy) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .scalar(
                "policy_content",
                &self.policy_content,
                observed.policy_content.as_ref(),
            )
            .scalar("policy_type", &self.policy_type, observed.policy_type.as_ref())
            .scalar("enabled", &self.enabled, observed.enabled.as_ref())
            .tags("tags", &self.tags, observed.tags.as_deref());
        delta.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_type_change_is_in_delta() {
        let observed: Policy =
            serde_json::from_value(json!({"id": "pol-1", "policy_type": "rego", "version": 4}))
                .unwrap();
        let desired = PolicyConfig {
            policy_type: Field::Value(PolicyType::Json),
            ..Default::default()
        };
        let delta = desired.diff(&observed).unwrap();
        assert_eq!(delta.get("policy_type").unwrap(), "json");
        assert!(EntityKind::Policy.spec().requires_replace("policy_type"));
    }
}
