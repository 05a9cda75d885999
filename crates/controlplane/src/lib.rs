//! # controlplane
//!
//! Client for the Kubiya Control Plane API that reconciles declared
//! configuration against remote state.
//!
//! This crate provides:
//! - Create, read, update and delete for ten entity kinds, driven by a
//!   static registry
//! - Minimal updates: only changed fields are sent, and nothing at all when
//!   nothing changed
//! - Tolerant decoding of responses that come back in several shapes
//! - A redacted diagnostic log of every failed request
//!
//! ## Example
//!
//! ```no_run
//! use controlplane::entities::AgentConfig;
//! use controlplane::{CallOptions, Client, Field, Observed};
//!
//! let client = Client::from_env().expect("missing credentials");
//! let opts = CallOptions::new();
//!
//! let desired = AgentConfig {
//!     name: Field::Value("svc-bot".to_string()),
//!     ..Default::default()
//! };
//! let agent = client.create(&desired, &opts).unwrap();
//! println!("created {:?}", agent.identity());
//!
//! let desired = AgentConfig {
//!     description: Field::Value("Service bot".to_string()),
//!     ..Default::default()
//! };
//! let agent = client.update(&desired, &agent, &opts).unwrap();
//! assert_eq!(agent.description.as_deref(), Some("Service bot"));
//! ```
//!
//! ## Entity kinds
//!
//! | Kind        | Update | Deletable | Identity              |
//! |-------------|--------|-----------|-----------------------|
//! | Agent       | PUT    | yes       | `id`                  |
//! | Team        | PUT    | yes       | `id`                  |
//! | Project     | PATCH  | yes       | `id`                  |
//! | Environment | PATCH  | yes       | `id`                  |
//! | Job         | PATCH  | yes       | `id`                  |
//! | Policy      | PUT    | yes       | `id`                  |
//! | Skill       | PATCH  | yes       | `id`                  |
//! | ToolSet     | PATCH  | yes       | `id`                  |
//! | Worker      | local  | no        | `worker_id`, then `id`|
//! | WorkerQueue | PATCH  | yes       | `id`                  |

#![warn(clippy::all)]

pub mod decode;
pub mod diagnostics;
pub mod entities;
pub mod entity;
pub mod error;
pub mod reconciler;
pub mod redact;
pub mod registry;
pub mod settings;
pub mod timestamp;
pub mod transport;

pub use declarative::{Delta, Field};
pub use entity::{Desired, Observed};
pub use error::{Error, ErrorCategory, Result, TransportKind};
pub use registry::{EntityKind, KindSpec};
pub use settings::Settings;
pub use transport::{CallOptions, CancelToken, MockTransport};

use transport::Transport;
use transport::http::UreqTransport;

/// Entry point for every Control Plane operation.
///
/// Reconciler operations live in [`reconciler`]; job toggles in
/// [`entities::job`].
pub struct Client {
    transport: Box<dyn Transport>,
}

impl Client {
    /// Create a client talking HTTPS with `settings`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            transport: Box::new(UreqTransport::new(settings)),
        }
    }

    /// Create a client from `KUBIYA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(&Settings::from_env()?))
    }

    /// Create a client with a custom transport (useful for testing).
    #[must_use]
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }
}
