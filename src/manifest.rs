//! Manifest - the desired configuration file
//!
//! One table per entity kind, each mapping a resource name to that kind's
//! desired record:
//!
//! ```toml
//! [agent.svc_bot]
//! name = "svc-bot"
//! capabilities = ["triage"]
//!
//! [worker_queue.default]
//! environment_id = "env-123"
//! name = "default"
//! ```
//!
//! TOML is the default format. A `.json` manifest has the same layout and
//! is the only way to clear a field, by setting it to `null`.

use anyhow::{Context, Result, bail};
use controlplane::EntityKind;
use controlplane::entities::{
    AgentConfig, EnvironmentConfig, JobConfig, PolicyConfig, ProjectConfig, SkillConfig,
    TeamConfig, ToolSetConfig, WorkerConfig, WorkerQueueConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Desired configuration for every managed resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub agent: BTreeMap<String, AgentConfig>,
    #[serde(default)]
    pub team: BTreeMap<String, TeamConfig>,
    #[serde(default)]
    pub project: BTreeMap<String, ProjectConfig>,
    #[serde(default)]
    pub environment: BTreeMap<String, EnvironmentConfig>,
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
    #[serde(default)]
    pub policy: BTreeMap<String, PolicyConfig>,
    #[serde(default)]
    pub skill: BTreeMap<String, SkillConfig>,
    #[serde(default)]
    pub toolset: BTreeMap<String, ToolSetConfig>,
    #[serde(default)]
    pub worker: BTreeMap<String, WorkerConfig>,
    #[serde(default)]
    pub worker_queue: BTreeMap<String, WorkerQueueConfig>,
}

impl Manifest {
    /// Load and validate a manifest. The format follows the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest = Self::parse(&content, is_json(path))
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        manifest.validate()?;
        log::debug!("Loaded {} resources from {}", manifest.len(), path.display());
        Ok(manifest)
    }

    /// Parse manifest text
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(toml::from_str(content)?)
        }
    }

    /// Check names and required scopes
    pub fn validate(&self) -> Result<()> {
        for (kind, name) in self.addresses() {
            if name.trim().is_empty() {
                bail!("{kind} entry with an empty name");
            }
            if name.contains('.') {
                bail!("{kind}.{name}: resource names cannot contain '.'");
            }
        }
        for (name, queue) in &self.worker_queue {
            let missing = queue
                .environment_id
                .as_value()
                .is_none_or(|id| id.trim().is_empty());
            if missing {
                bail!("worker_queue.{name}: environment_id is required");
            }
        }
        Ok(())
    }

    /// Every `(kind, name)` pair in the manifest
    pub fn addresses(&self) -> Vec<(EntityKind, &str)> {
        fn names<T>(kind: EntityKind, table: &BTreeMap<String, T>) -> Vec<(EntityKind, &str)> {
            table.keys().map(|name| (kind, name.as_str())).collect()
        }
        let mut all = Vec::with_capacity(self.len());
        all.extend(names(EntityKind::Agent, &self.agent));
        all.extend(names(EntityKind::Team, &self.team));
        all.extend(names(EntityKind::Project, &self.project));
        all.extend(names(EntityKind::Environment, &self.environment));
        all.extend(names(EntityKind::Job, &self.job));
        all.extend(names(EntityKind::Policy, &self.policy));
        all.extend(names(EntityKind::Skill, &self.skill));
        all.extend(names(EntityKind::ToolSet, &self.toolset));
        all.extend(names(EntityKind::Worker, &self.worker));
        all.extend(names(EntityKind::WorkerQueue, &self.worker_queue));
        all
    }

    /// Whether a `kind.name` address is declared
    pub fn contains(&self, address: &str) -> bool {
        self.addresses()
            .iter()
            .any(|(kind, name)| address == format!("{kind}.{name}"))
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.agent.len()
            + self.team.len()
            + self.project.len()
            + self.environment.len()
            + self.job.len()
            + self.policy.len()
            + self.skill.len()
            + self.toolset.len()
            + self.worker.len()
            + self.worker_queue.len()
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use controlplane::Field;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[agent.svc_bot]
name = "svc-bot"
description = "Service bot"
capabilities = ["triage"]

[worker_queue.default]
environment_id = "env-123"
name = "default"
max_workers = 4
"#;

    #[test]
    fn test_parse_toml() {
        let manifest = Manifest::parse(SAMPLE, false).unwrap();
        manifest.validate().unwrap();

        assert_eq!(manifest.len(), 2);
        let bot = &manifest.agent["svc_bot"];
        assert_eq!(bot.name, Field::Value("svc-bot".to_string()));
        assert!(bot.model_id.is_unset());
        assert_eq!(manifest.worker_queue["default"].max_workers, Field::Value(4));
        assert!(manifest.contains("worker_queue.default"));
        assert!(!manifest.contains("agent.default"));
    }

    #[test]
    fn test_json_can_clear() {
        let manifest =
            Manifest::parse(r#"{"team": {"ops": {"description": null}}}"#, true).unwrap();
        assert_eq!(manifest.team["ops"].description, Field::Clear);
        assert!(manifest.team["ops"].name.is_unset());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(Manifest::parse("[agent.a]\nstatus = \"idle\"\n", false).is_err());
        assert!(Manifest::parse("[robot.a]\nname = \"x\"\n", false).is_err());
    }

    #[test]
    fn test_worker_queue_requires_environment() {
        let manifest = Manifest::parse("[worker_queue.q]\nname = \"q\"\n", false).unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("environment_id"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let manifest = Manifest::parse("[agent.\" \"]\nname = \"x\"\n", false).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_load_by_extension() {
        let dir = TempDir::new().unwrap();
        let toml_path = dir.path().join("kcp.toml");
        let json_path = dir.path().join("kcp.json");
        fs::write(&toml_path, SAMPLE).unwrap();
        fs::write(&json_path, r#"{"skill": {"sh": {"type": "shell"}}}"#).unwrap();

        assert_eq!(Manifest::load(&toml_path).unwrap().len(), 2);
        assert_eq!(Manifest::load(&json_path).unwrap().skill.len(), 1);
        assert!(Manifest::load(&dir.path().join("missing.toml")).is_err());
    }
}
