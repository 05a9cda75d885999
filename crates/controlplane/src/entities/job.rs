//! Jobs.
//!
//! Besides the usual CRUD, jobs can be switched on and off through
//! dedicated endpoints: `POST /api/v1/jobs/{id}/enable` and `/disable`.

use super::Blob;
use crate::Client;
use crate::entity::{Desired, Observed};
use crate::error::Result;
use crate::registry::EntityKind;
use crate::transport::{CallOptions, Method, Request};
use crate::{decode, reconciler};
use chrono::{DateTime, Utc};
use declarative::{Delta, DeltaBuilder, Field};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variables, secrets and integrations available to a job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionEnvironment {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub integration_ids: Vec<String>,
}

/// Desired job configuration.
///
/// Unset at create time: `enabled` becomes `true`, `cron_timezone` `UTC`,
/// `planning_mode` `predefined_agent` and `executor_type` `auto`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub description: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub enabled: Field<bool>,
    /// `cron`, `webhook` or `manual`.
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub trigger_type: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub cron_schedule: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub cron_timezone: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub planning_mode: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub entity_type: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub entity_id: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub prompt_template: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub system_prompt: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub executor_type: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub worker_queue_name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub environment_name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub config: Field<Blob>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub execution_environment: Field<ExecutionEnvironment>,
}

/// Observed job.
///
/// `webhook_secret` is generated for webhook-triggered jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub status: Option<String>,
    pub trigger_type: Option<String>,
    pub cron_schedule: Option<String>,
    pub cron_timezone: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub temporal_schedule_id: Option<String>,
    pub planning_mode: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub prompt_template: Option<String>,
    pub system_prompt: Option<String>,
    pub executor_type: Option<String>,
    pub worker_queue_name: Option<String>,
    pub environment_name: Option<String>,
    pub config: Option<Blob>,
    pub execution_environment: Option<ExecutionEnvironment>,
    #[serde(with = "crate::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Observed for Job {
    const KIND: EntityKind = EntityKind::Job;
}

impl Desired for JobConfig {
    type Observed = Job;

    fn diff(&self, observed: &Job) -> serde_json::Result<Delta> {
        let mut delta = DeltaBuilder::new();
        delta
            .scalar("name", &self.name, observed.name.as_ref())
            .scalar("description", &self.description, observed.description.as_ref())
            .scalar("enabled", &self.enabled, observed.enabled.as_ref())
            .scalar("trigger_type", &self.trigger_type, observed.trigger_type.as_ref())
            .scalar("cron_schedule", &self.cron_schedule, observed.cron_schedule.as_ref())
            .scalar("cron_timezone", &self.cron_timezone, observed.cron_timezone.as_ref())
            .scalar("planning_mode", &self.planning_mode, observed.planning_mode.as_ref())
            .scalar("entity_type", &self.entity_type, observed.entity_type.as_ref())
            .scalar("entity_id", &self.entity_id, observed.entity_id.as_ref())
            .scalar(
                "prompt_template",
                &self.prompt_template,
                observed.prompt_template.as_ref(),
            )
            .scalar("system_prompt", &self.system_prompt, observed.system_prompt.as_ref())
            .scalar("executor_type", &self.executor_type, observed.executor_type.as_ref())
            .scalar(
                "worker_queue_name",
                &self.worker_queue_name,
                observed.worker_queue_name.as_ref(),
            )
            .scalar(
                "environment_name",
                &self.environment_name,
                observed.environment_name.as_ref(),
            )
            .blob("config", &self.config, observed.config.as_ref())
            .blob(
                "execution_environment",
                &self.execution_environment,
                observed.execution_environment.as_ref(),
            );
        delta.finish()
    }
}

impl Client {
    /// Enable a job.
    pub fn enable_job(&self, id: &str, opts: &CallOptions) -> Result<Job> {
        self.toggle_job(id, "enable", opts)
    }

    /// Disable a job.
    pub fn disable_job(&self, id: &str, opts: &CallOptions) -> Result<Job> {
        self.toggle_job(id, "disable", opts)
    }

    fn toggle_job(&self, id: &str, action: &str, opts: &CallOptions) -> Result<Job> {
        let spec = Job::spec();
        let path = format!("{}/{action}", spec.item_path(id));
        log::info!("{} job {}", action, id);

        let response = self.send(Request::new(Method::Post, path).options(opts))?;
        let record = decode::decode_record(&response, spec, id)?;
        let job: Job = serde_json::from_value(record)?;
        reconciler::assert_identity(Job::KIND, id, job.identity())?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, Response};
    use serde_json::json;

    #[test]
    fn test_execution_environment_blob_is_canonical() {
        let observed: Job = serde_json::from_value(json!({
            "id": "j1",
            "execution_environment": {"secrets": ["gh"], "env_vars": {"A": "1"}}
        }))
        .unwrap();
        let desired: JobConfig = serde_json::from_value(json!({
            "execution_environment": {"env_vars": {"A": "1"}, "secrets": ["gh"]}
        }))
        .unwrap();
        assert!(desired.diff(&observed).unwrap().is_empty());
    }

    #[test]
    fn test_enable_job_posts_without_body() {
        let mock = MockTransport::new();
        mock.respond(Response::json(200, &json!({"id": "j1", "enabled": true})));
        let client = Client::with_transport(Box::new(mock.clone()));

        let job = client.enable_job("j1", &CallOptions::new()).unwrap();

        assert_eq!(job.enabled, Some(true));
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].path, "/api/v1/jobs/j1/enable");
        assert!(calls[0].body.is_none());
    }

    #[test]
    fn test_disable_job_rejects_foreign_identity() {
        let mock = MockTransport::new();
        mock.respond(Response::json(200, &json!({"id": "j2", "enabled": false})));
        let client = Client::with_transport(Box::new(mock));

        let err = client.disable_job("j1", &CallOptions::new()).unwrap_err();
        assert!(matches!(err, crate::Error::IdentityChanged { .. }));
    }
}
