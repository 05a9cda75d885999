//! Entity registry - static per-kind metadata.
//!
//! Everything that differs between entity kinds lives here as data:
//! routes, identity fields, update method, deletability, accepted read
//! shapes, computed fields, fields that force a replacement and create
//! defaults. The reconciler looks a kind up and follows the entry, so a new
//! kind is a new table row rather than new logic.

use crate::decode::Shape;
use crate::transport::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Managed entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// AI agent.
    Agent,
    /// Team of agents.
    Team,
    /// Project grouping agents, teams and policies.
    Project,
    /// Execution environment.
    Environment,
    /// Scheduled or triggered job.
    Job,
    /// OPA policy.
    Policy,
    /// Skill.
    Skill,
    /// Tool set.
    #[serde(rename = "toolset")]
    ToolSet,
    /// Registered worker.
    Worker,
    /// Worker queue within an environment.
    WorkerQueue,
}

impl EntityKind {
    /// All kinds, in dependency-friendly order.
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Environment,
        EntityKind::Policy,
        EntityKind::Skill,
        EntityKind::ToolSet,
        EntityKind::Project,
        EntityKind::Team,
        EntityKind::Agent,
        EntityKind::WorkerQueue,
        EntityKind::Worker,
        EntityKind::Job,
    ];

    /// Snake-case name used in addresses and manifests.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Team => "team",
            Self::Project => "project",
            Self::Environment => "environment",
            Self::Job => "job",
            Self::Policy => "policy",
            Self::Skill => "skill",
            Self::ToolSet => "toolset",
            Self::Worker => "worker",
            Self::WorkerQueue => "worker_queue",
        }
    }

    /// Registry entry for this kind.
    #[must_use]
    pub fn spec(&self) -> &'static KindSpec {
        spec(*self)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "tool_set" => Ok(Self::ToolSet),
            "workerqueue" => Ok(Self::WorkerQueue),
            other => Self::ALL
                .into_iter()
                .find(|k| k.name() == other)
                .ok_or_else(|| format!("unknown entity kind '{s}'")),
        }
    }
}

/// A route that may need a parent identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Fixed path.
    Fixed(&'static str),
    /// Path containing `{scope}`, filled with the parent identity.
    Scoped(&'static str),
}

impl Route {
    /// Resolve to a concrete path; `None` when a required scope is missing.
    #[must_use]
    pub fn resolve(&self, scope: Option<&str>) -> Option<String> {
        match self {
            Self::Fixed(path) => Some((*path).to_string()),
            Self::Scoped(template) => scope
                .filter(|s| !s.is_empty())
                .map(|s| template.replace("{scope}", s)),
        }
    }
}

/// How in-place updates reach the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Full-object style PUT.
    Put,
    /// Partial PATCH.
    Patch,
    /// No update endpoint; changes are recorded locally only.
    LocalOnly,
}

impl UpdateMode {
    /// HTTP method, or `None` for local-only kinds.
    #[must_use]
    pub fn method(&self) -> Option<Method> {
        match self {
            Self::Put => Some(Method::Put),
            Self::Patch => Some(Method::Patch),
            Self::LocalOnly => None,
        }
    }
}

/// What a read that finds nothing means for tracked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// The resource went away on its own; stop tracking it.
    Forget,
    /// The resource should exist; report an error.
    Fail,
}

/// What to report when no read shape yields an identified record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    /// Treat as not found.
    NotFound,
    /// Treat as a contract violation.
    Decode,
}

/// Value injected into a create body when the field is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// String default.
    Str(&'static str),
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Int(i64),
}

impl DefaultValue {
    /// As a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Str(s) => Value::from(*s),
            Self::Bool(b) => Value::from(*b),
            Self::Int(i) => Value::from(*i),
        }
    }
}

/// Static metadata for one entity kind.
#[derive(Debug, Clone)]
pub struct KindSpec {
    /// The kind this entry describes.
    pub kind: EntityKind,
    /// Key of the list wrapper object, e.g. `workers`.
    pub plural: &'static str,
    /// Create endpoint (POST).
    pub create: Route,
    /// Item endpoint prefix; the identity is appended.
    pub item: &'static str,
    /// List endpoint (GET).
    pub list: Route,
    /// Identity fields in priority order.
    pub identity: &'static [&'static str],
    /// Update method.
    pub update: UpdateMode,
    /// Whether the API supports DELETE.
    pub deletable: bool,
    /// Shapes tried in order when reading one record.
    pub read_shapes: &'static [Shape],
    /// Error reported when every shape fails.
    pub on_exhausted: Exhausted,
    /// Meaning of a missing resource on read.
    pub missing: Missing,
    /// Parent scope field, sent in the path and never in a body.
    pub scope: Option<&'static str>,
    /// Server-computed fields besides the common ones.
    pub computed: &'static [&'static str],
    /// Fields whose change cannot be applied in place.
    pub replace_on: &'static [&'static str],
    /// Create defaults for unset fields.
    pub defaults: &'static [(&'static str, DefaultValue)],
}

/// Fields every kind computes server-side.
pub const COMMON_COMPUTED: &[&str] = &["id", "organization_id", "created_at", "updated_at"];

const SINGLE_OBJECT: &[Shape] = &[Shape::Object];
const WORKER_SHAPES: &[Shape] = &[Shape::Object, Shape::Array, Shape::Wrapped("workers")];
const BY_ID: &[&str] = &["id"];

impl KindSpec {
    /// Item path for one identity.
    #[must_use]
    pub fn item_path(&self, identity: &str) -> String {
        format!("{}/{}", self.item, identity)
    }

    /// Whether a field is server-computed and never sent.
    #[must_use]
    pub fn is_computed(&self, field: &str) -> bool {
        COMMON_COMPUTED.contains(&field)
            || self.identity.contains(&field)
            || self.computed.contains(&field)
    }

    /// Whether a field is the parent scope.
    #[must_use]
    pub fn is_scope(&self, field: &str) -> bool {
        self.scope == Some(field)
    }

    /// Whether changing a field forces a replacement.
    #[must_use]
    pub fn requires_replace(&self, field: &str) -> bool {
        self.replace_on.contains(&field)
    }

    /// First non-empty identity field of a raw record.
    #[must_use]
    pub fn identity_of(&self, record: &Value) -> Option<String> {
        self.identity.iter().find_map(|field| match record.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
    }
}

static REGISTRY: [KindSpec; 10] = [
    KindSpec {
        kind: EntityKind::Agent,
        plural: "agents",
        create: Route::Fixed("/api/v1/agents"),
        item: "/api/v1/agents",
        list: Route::Fixed("/api/v1/agents"),
        identity: BY_ID,
        update: UpdateMode::Put,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: None,
        computed: &["status", "last_active_at", "error_message", "state"],
        replace_on: &[],
        defaults: &[],
    },
    KindSpec {
        kind: EntityKind::Team,
        plural: "teams",
        create: Route::Fixed("/api/v1/teams"),
        item: "/api/v1/teams",
        list: Route::Fixed("/api/v1/teams"),
        identity: BY_ID,
        update: UpdateMode::Put,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: None,
        computed: &[],
        replace_on: &[],
        defaults: &[],
    },
    KindSpec {
        kind: EntityKind::Project,
        plural: "projects",
        create: Route::Fixed("/api/v1/projects"),
        item: "/api/v1/projects",
        list: Route::Fixed("/api/v1/projects"),
        identity: BY_ID,
        update: UpdateMode::Patch,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: None,
        computed: &[
            "owner_id",
            "owner_email",
            "archived_at",
            "agent_count",
            "team_count",
        ],
        replace_on: &[],
        defaults: &[
            ("visibility", DefaultValue::Str("private")),
            ("restrict_to_environment", DefaultValue::Bool(false)),
        ],
    },
    KindSpec {
        kind: EntityKind::Environment,
        plural: "environments",
        create: Route::Fixed("/api/v1/environments"),
        item: "/api/v1/environments",
        list: Route::Fixed("/api/v1/environments"),
        identity: BY_ID,
        update: UpdateMode::Patch,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: None,
        computed: &[
            "created_by",
            "worker_token",
            "provisioning_workflow_id",
            "provisioned_at",
            "error_message",
            "temporal_namespace_id",
            "active_workers",
            "idle_workers",
            "busy_workers",
            "toolset_ids",
            "toolsets",
        ],
        replace_on: &[],
        defaults: &[],
    },
    KindSpec {
        kind: EntityKind::Job,
        plural: "jobs",
        create: Route::Fixed("/api/v1/jobs"),
        item: "/api/v1/jobs",
        list: Route::Fixed("/api/v1/jobs"),
        identity: BY_ID,
        update: UpdateMode::Patch,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: None,
        computed: &[
            "status",
            "webhook_url",
            "webhook_secret",
            "temporal_schedule_id",
        ],
        replace_on: &[],
        defaults: &[
            ("enabled", DefaultValue::Bool(true)),
            ("cron_timezone", DefaultValue::Str("UTC")),
            ("planning_mode", DefaultValue::Str("predefined_agent")),
            ("executor_type", DefaultValue::Str("auto")),
        ],
    },
    KindSpec {
        kind: EntityKind::Policy,
        plural: "policies",
        create: Route::Fixed("/api/v1/policies"),
        item: "/api/v1/policies",
        list: Route::Fixed("/api/v1/policies"),
        identity: BY_ID,
        update: UpdateMode::Put,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: None,
        computed: &["version"],
        replace_on: &["policy_type"],
        defaults: &[],
    },
    KindSpec {
        kind: EntityKind::Skill,
        plural: "skills",
        create: Route::Fixed("/api/v1/skills"),
        item: "/api/v1/skills",
        list: Route::Fixed("/api/v1/skills"),
        identity: BY_ID,
        update: UpdateMode::Patch,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: None,
        computed: &[],
        replace_on: &["type"],
        defaults: &[],
    },
    KindSpec {
        kind: EntityKind::ToolSet,
        plural: "toolsets",
        create: Route::Fixed("/api/v1/toolsets"),
        item: "/api/v1/toolsets",
        list: Route::Fixed("/api/v1/toolsets"),
        identity: BY_ID,
        update: UpdateMode::Patch,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: None,
        computed: &[],
        replace_on: &["type"],
        defaults: &[],
    },
    KindSpec {
        kind: EntityKind::Worker,
        plural: "workers",
        create: Route::Fixed("/api/v1/workers/register"),
        item: "/api/v1/workers",
        list: Route::Fixed("/api/v1/workers"),
        identity: &["worker_id", "id"],
        update: UpdateMode::LocalOnly,
        deletable: false,
        read_shapes: WORKER_SHAPES,
        on_exhausted: Exhausted::NotFound,
        missing: Missing::Forget,
        scope: None,
        computed: &["status", "registered_at", "last_heartbeat"],
        replace_on: &[],
        defaults: &[],
    },
    KindSpec {
        kind: EntityKind::WorkerQueue,
        plural: "worker_queues",
        create: Route::Scoped("/api/v1/environments/{scope}/worker-queues"),
        item: "/api/v1/worker-queues",
        list: Route::Scoped("/api/v1/environments/{scope}/worker-queues"),
        identity: BY_ID,
        update: UpdateMode::Patch,
        deletable: true,
        read_shapes: SINGLE_OBJECT,
        on_exhausted: Exhausted::Decode,
        missing: Missing::Fail,
        scope: Some("environment_id"),
        computed: &["active_workers", "task_queue_name", "created_by"],
        replace_on: &["environment_id"],
        defaults: &[
            ("status", DefaultValue::Str("active")),
            ("heartbeat_interval", DefaultValue::Int(60)),
        ],
    },
];

/// Look up the registry entry for a kind.
#[must_use]
pub fn spec(kind: EntityKind) -> &'static KindSpec {
    let index = match kind {
        EntityKind::Agent => 0,
        EntityKind::Team => 1,
        EntityKind::Project => 2,
        EntityKind::Environment => 3,
        EntityKind::Job => 4,
        EntityKind::Policy => 5,
        EntityKind::Skill => 6,
        EntityKind::ToolSet => 7,
        EntityKind::Worker => 8,
        EntityKind::WorkerQueue => 9,
    };
    &REGISTRY[index]
}
