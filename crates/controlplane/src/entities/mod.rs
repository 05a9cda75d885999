//! Desired and observed records for every entity kind.
//!
//! | Kind        | Desired              | Observed      |
//! |-------------|----------------------|---------------|
//! | Agent       | [`AgentConfig`]      | [`Agent`]       |
//! | Team        | [`TeamConfig`]       | [`Team`]        |
//! | Project     | [`ProjectConfig`]    | [`Project`]     |
//! | Environment | [`EnvironmentConfig`]| [`Environment`] |
//! | Job         | [`JobConfig`]        | [`Job`]         |
//! | Policy      | [`PolicyConfig`]     | [`Policy`]      |
//! | Skill       | [`SkillConfig`]      | [`Skill`]       |
//! | ToolSet     | [`ToolSetConfig`]    | [`ToolSet`]     |
//! | Worker      | [`WorkerConfig`]     | [`Worker`]      |
//! | WorkerQueue | [`WorkerQueueConfig`]| [`WorkerQueue`] |

pub mod agent;
pub mod environment;
pub mod job;
pub mod policy;
pub mod project;
pub mod skill;
pub mod team;
pub mod toolset;
pub mod worker;
pub mod worker_queue;

pub use agent::{Agent, AgentConfig, Runtime};
pub use environment::{Environment, EnvironmentConfig};
pub use job::{ExecutionEnvironment, Job, JobConfig};
pub use policy::{Policy, PolicyConfig, PolicyType};
pub use project::{Project, ProjectConfig};
pub use skill::{Skill, SkillConfig};
pub use team::{Team, TeamConfig};
pub use toolset::{ToolSet, ToolSetConfig};
pub use worker::{Worker, WorkerConfig};
pub use worker_queue::{WorkerQueue, WorkerQueueConfig};

/// Opaque JSON configuration object, diffed and sent as a whole.
pub type Blob = serde_json::Map<String, serde_json::Value>;
