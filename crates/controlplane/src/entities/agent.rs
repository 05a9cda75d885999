//! Agents.

use super::Blob;
use crate::entity::{Desired, Observed};
use crate::registry::EntityKind;
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};

/// Agent runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Runtime {
    /// Platform default runtime.
    #[default]
    Default,
    /// Claude Code runtime.
    ClaudeCode,
}

/// Desired agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub capabilities: Field<Vec<String>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub configuration: Field<Blob>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub model_id: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub llm_config: Field<Blob>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub runtime: Field<Runtime>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub team_id: Field<String>,
}

/// Observed agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub capabilities: Option<Vec<String>>,
    pub configuration: Option<Blob>,
    pub model_id: Option<String>,
    pub llm_config: Option<Blob>,
    pub runtime: Option<Runtime>,
    pub team_id: Option<String>,
    pub state: Option<Blob>,
    pub error_message: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Observed for Agent {
    const KIND: EntityKind = EntityKind::Agent;
}

impl Desired for AgentConfig {
    type Observed = Agent;

    fn diff(&self, observed: &Agent) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .list("capabilities", &self.capabilities, observed.capabilities.as_deref())
            .blob("configuration", &self.configuration, observed.configuration.as_ref())
            .scalar("model_id", &self.model_id, observed.model_id.as_ref())
            .blob("llm_config", &self.llm_config, observed.llm_config.as_ref())
            .scalar("runtime", &self.runtime, observed.runtime.as_ref())
            .scalar("team_id", &self.team_id, observed.team_id.as_ref());
        delta.finish()
    }
}
