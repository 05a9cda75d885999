//! Resources the engine plans and applies
//!
//! - [`RemoteResource`]: a manifest entry, created, updated or replaced
//! - [`TrackedResource`]: a tracked address that is no longer declared (or
//!   is being destroyed), deleted remotely and then forgotten

use super::Session;
use crate::state::StateEntry;
use anyhow::{Context, Result};
use controlplane::reconciler::{delta, replacement_fields};
use controlplane::{Desired, EntityKind, Observed};
use declarative::{Action, ApplyContext, ApplyResult, Change, Resource};
use std::fmt;

// ============================================================================
// Declared resources
// ============================================================================

/// One manifest entry together with its last observed state
pub struct RemoteResource<D: Desired> {
    name: String,
    desired: D,
    prior: Option<D::Observed>,
    session: Session,
}

impl<D: Desired> RemoteResource<D> {
    pub fn new(
        name: impl Into<String>,
        desired: D,
        prior: Option<D::Observed>,
        session: Session,
    ) -> Self {
        Self {
            name: name.into(),
            desired,
            prior,
            session,
        }
    }

    fn kind() -> EntityKind {
        D::Observed::KIND
    }

    fn prior_identity(&self) -> Option<String> {
        self.prior.as_ref().and_then(|prior| prior.identity())
    }

    /// Persist what the Control Plane returned
    fn record(&self, observed: &D::Observed) -> Result<()> {
        let identity = observed
            .identity()
            .with_context(|| format!("{} has no identity", self.address()))?;
        let entry = StateEntry::new(Self::kind(), identity, serde_json::to_value(observed)?);
        self.session.record(&self.address(), entry)
    }

    fn create(&self) -> Result<()> {
        let session = &self.session;
        let observed = session.client().create(&self.desired, session.opts())?;
        self.record(&observed)
    }

    fn update(&self, prior: &D::Observed) -> Result<()> {
        let session = &self.session;
        let observed = session
            .client()
            .update(&self.desired, prior, session.opts())?;
        self.record(&observed)
    }

    /// Delete the old resource, forget it, then create the new one
    fn replace(&self) -> Result<()> {
        let address = self.address();
        if let Some(identity) = self.prior_identity() {
            let session = &self.session;
            match session
                .client()
                .delete(Self::kind(), &identity, session.opts())
            {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    log::warn!("{address}: {identity} was already gone");
                }
                Err(e) => return Err(e.into()),
            }
            session.forget(&address)?;
        }
        self.create()
    }
}

impl<D: Desired> fmt::Debug for RemoteResource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteResource")
            .field("address", &self.address())
            .field("desired", &self.desired)
            .field("prior", &self.prior)
            .finish_non_exhaustive()
    }
}

impl<D: Desired> Resource for RemoteResource<D> {
    fn address(&self) -> String {
        format!("{}.{}", Self::kind(), self.name)
    }

    fn resource_type(&self) -> &'static str {
        Self::kind().name()
    }

    fn description(&self) -> String {
        match self.prior_identity() {
            Some(identity) => format!("{} {} ({identity})", Self::kind(), self.name),
            None => format!("{} {}", Self::kind(), self.name),
        }
    }

    fn plan(&self) -> Result<Change> {
        let Some(prior) = &self.prior else {
            return Ok(Change::create());
        };

        let delta = delta(&self.desired, prior)?;
        if delta.is_empty() {
            return Ok(Change::noop());
        }

        let fields = delta.changes().to_vec();
        let replace = replacement_fields(D::Observed::spec(), &delta);
        if replace.is_empty() {
            Ok(Change::update(fields))
        } else {
            Ok(Change::replace(fields)
                .because(format!("{} cannot change in place", replace.join(", "))))
        }
    }

    fn apply(&self, change: &Change, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".into(),
            });
        }

        match (change.action, &self.prior) {
            (Action::NoOp, _) => Ok(ApplyResult::NoChange),
            (Action::Create, _) | (Action::Update | Action::Replace, None) => {
                self.create()?;
                Ok(ApplyResult::Created)
            }
            (Action::Update, Some(prior)) => {
                self.update(prior)?;
                Ok(ApplyResult::Updated)
            }
            (Action::Replace, Some(_)) => {
                self.replace()?;
                Ok(ApplyResult::Replaced)
            }
            (Action::Delete, _) => Ok(ApplyResult::Skipped {
                reason: "declared resources are never deleted".into(),
            }),
        }
    }
}

// ============================================================================
// Tracked resources
// ============================================================================

/// A tracked address about to be deleted
#[derive(Debug)]
pub struct TrackedResource {
    address: String,
    kind: EntityKind,
    identity: String,
    session: Session,
}

impl TrackedResource {
    pub fn new(address: impl Into<String>, entry: &StateEntry, session: Session) -> Self {
        Self {
            address: address.into(),
            kind: entry.kind,
            identity: entry.identity.clone(),
            session,
        }
    }
}

impl Resource for TrackedResource {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn resource_type(&self) -> &'static str {
        self.kind.name()
    }

    fn description(&self) -> String {
        format!("{} {}", self.kind, self.identity)
    }

    fn plan(&self) -> Result<Change> {
        if self.kind.spec().deletable {
            Ok(Change::delete())
        } else {
            Ok(Change::delete().because("no delete endpoint, only forgotten"))
        }
    }

    fn apply(&self, change: &Change, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".into(),
            });
        }
        if change.action != Action::Delete {
            return Ok(ApplyResult::NoChange);
        }

        let session = &self.session;
        match session
            .client()
            .delete(self.kind, &self.identity, session.opts())
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                log::warn!("{}: {} was already gone", self.address, self.identity);
            }
            Err(e) => return Err(e.into()),
        }
        session.forget(&self.address)?;
        Ok(ApplyResult::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::session;
    use crate::state::State;
    use controlplane::Field;
    use controlplane::entities::{Agent, AgentConfig, WorkerQueue, WorkerQueueConfig};
    use controlplane::transport::{Method, Response};
    use serde_json::json;

    fn agent_config(description: &str) -> AgentConfig {
        AgentConfig {
            name: Field::Value("svc-bot".to_string()),
            description: Field::Value(description.to_string()),
            ..Default::default()
        }
    }

    fn tracked_agent() -> Agent {
        serde_json::from_value(json!({"id": "a1", "name": "svc-bot", "description": "old"}))
            .unwrap()
    }

    #[test]
    fn test_untracked_plans_create_and_records_state() {
        let (session, mock, _dir) = session(State::default());
        mock.respond(Response::json(
            201,
            &json!({"id": "a1", "name": "svc-bot", "status": "idle"}),
        ));

        let resource = RemoteResource::new("bot", agent_config("Service bot"), None, session.clone());
        let change = resource.plan().unwrap();
        assert_eq!(change.action, Action::Create);

        let result = resource
            .apply(&change, &mut ApplyContext::new(false, false))
            .unwrap();
        assert_eq!(result, ApplyResult::Created);

        let saved = State::load(session.state_path()).unwrap();
        let entry = saved.get("agent.bot").unwrap();
        assert_eq!(entry.identity, "a1");
        assert_eq!(entry.observed["description"], "Service bot");
        assert_eq!(entry.observed["status"], "idle");
    }

    #[test]
    fn test_matching_config_plans_noop_without_calls() {
        let (session, mock, _dir) = session(State::default());
        let resource =
            RemoteResource::new("bot", agent_config("old"), Some(tracked_agent()), session);

        let change = resource.plan().unwrap();
        assert_eq!(change.action, Action::NoOp);
        let result = resource
            .apply(&change, &mut ApplyContext::new(false, false))
            .unwrap();
        assert_eq!(result, ApplyResult::NoChange);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_changed_field_plans_update() {
        let (session, mock, _dir) = session(State::default());
        mock.respond(Response::json(200, &json!({"id": "a1", "description": "new"})));

        let resource = RemoteResource::new(
            "bot",
            agent_config("new"),
            Some(tracked_agent()),
            session.clone(),
        );
        let change = resource.plan().unwrap();
        assert_eq!(change.action, Action::Update);
        assert_eq!(change.fields.len(), 1);
        assert_eq!(change.fields[0].field, "description");
        assert_eq!(change.fields[0].before, Some(json!("old")));

        let result = resource
            .apply(&change, &mut ApplyContext::new(false, false))
            .unwrap();
        assert_eq!(result, ApplyResult::Updated);

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Put);
        assert_eq!(calls[0].body, Some(json!({"description": "new"})));

        let saved = State::load(session.state_path()).unwrap();
        let observed = &saved.get("agent.bot").unwrap().observed;
        assert_eq!(observed["description"], "new");
        assert_eq!(observed["name"], "svc-bot");
    }

    #[test]
    fn test_parent_change_plans_replace() {
        let (session, mock, _dir) = session(State::default());
        let prior: WorkerQueue = serde_json::from_value(
            json!({"id": "q1", "environment_id": "env-1", "name": "default"}),
        )
        .unwrap();
        let desired = WorkerQueueConfig {
            environment_id: Field::Value("env-2".to_string()),
            name: Field::Value("default".to_string()),
            ..Default::default()
        };
        mock.respond(Response::empty(204));
        mock.respond(Response::json(201, &json!({"id": "q2", "name": "default"})));

        let resource = RemoteResource::new("default", desired, Some(prior), session.clone());
        let change = resource.plan().unwrap();
        assert_eq!(change.action, Action::Replace);
        assert!(change.reason.as_deref().unwrap().contains("environment_id"));

        let result = resource
            .apply(&change, &mut ApplyContext::new(false, false))
            .unwrap();
        assert_eq!(result, ApplyResult::Replaced);

        let calls = mock.calls();
        assert_eq!(calls[0].method, Method::Delete);
        assert_eq!(calls[0].path, "/api/v1/worker-queues/q1");
        assert_eq!(calls[1].method, Method::Post);
        assert_eq!(calls[1].path, "/api/v1/environments/env-2/worker-queues");

        let saved = State::load(session.state_path()).unwrap();
        let entry = saved.get("worker_queue.default").unwrap();
        assert_eq!(entry.identity, "q2");
        assert_eq!(entry.observed["environment_id"], "env-2");
    }

    #[test]
    fn test_failed_create_records_nothing() {
        let (session, mock, _dir) = session(State::default());
        mock.respond(Response::new(422, r#"{"detail": "bad"}"#));

        let resource = RemoteResource::new("bot", agent_config("x"), None, session.clone());
        let change = resource.plan().unwrap();
        assert!(
            resource
                .apply(&change, &mut ApplyContext::new(false, false))
                .is_err()
        );
        assert!(session.snapshot().get("agent.bot").is_none());
    }

    #[test]
    fn test_tracked_delete_forgets_address() {
        let mut state = State::default();
        state.upsert(
            "agent.old",
            StateEntry::new(EntityKind::Agent, "a9", json!({"id": "a9"})),
        );
        let (session, mock, _dir) = session(state);
        mock.respond(Response::empty(204));

        let entry = session.snapshot().get("agent.old").cloned().unwrap();
        let resource = TrackedResource::new("agent.old", &entry, session.clone());
        let change = resource.plan().unwrap();
        assert_eq!(change.action, Action::Delete);
        assert!(change.reason.is_none());

        let result = resource
            .apply(&change, &mut ApplyContext::new(false, false))
            .unwrap();
        assert_eq!(result, ApplyResult::Deleted);
        assert_eq!(mock.calls()[0].path, "/api/v1/agents/a9");
        assert!(session.snapshot().get("agent.old").is_none());
    }

    #[test]
    fn test_tracked_worker_is_forgotten_without_calls() {
        let mut state = State::default();
        state.upsert(
            "worker.w",
            StateEntry::new(EntityKind::Worker, "w1", json!({"worker_id": "w1"})),
        );
        let (session, mock, _dir) = session(state);

        let entry = session.snapshot().get("worker.w").cloned().unwrap();
        let resource = TrackedResource::new("worker.w", &entry, session.clone());
        let change = resource.plan().unwrap();
        assert!(change.reason.is_some());

        let result = resource
            .apply(&change, &mut ApplyContext::new(false, false))
            .unwrap();
        assert_eq!(result, ApplyResult::Deleted);
        assert_eq!(mock.call_count(), 0);
        assert!(session.snapshot().get("worker.w").is_none());
    }

    #[test]
    fn test_tracked_delete_of_missing_resource_still_forgets() {
        let mut state = State::default();
        state.upsert(
            "team.ops",
            StateEntry::new(EntityKind::Team, "t1", json!({"id": "t1"})),
        );
        let (session, mock, _dir) = session(state);
        mock.respond(Response::new(404, r#"{"detail": "not found"}"#));

        let entry = session.snapshot().get("team.ops").cloned().unwrap();
        let resource = TrackedResource::new("team.ops", &entry, session.clone());
        let change = resource.plan().unwrap();
        let result = resource
            .apply(&change, &mut ApplyContext::new(false, false))
            .unwrap();
        assert_eq!(result, ApplyResult::Deleted);
        assert!(session.snapshot().get("team.ops").is_none());
    }
}
