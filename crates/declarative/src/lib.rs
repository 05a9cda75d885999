//! # Declarative
//!
//! Primitives for reconciling a declared configuration against remote state.
//!
//! ## Core Concepts
//!
//! - **Field**: a desired-configuration value that is unset, cleared, or set
//! - **Delta**: the minimal partial-update payload built by [`DeltaBuilder`]
//! - **Merge**: overlaying a remote response onto previously observed state
//! - **Resource**: something that can plan and apply its own change
//! - **Plan**: every resource paired with the change it needs
//! - **Executor**: applies a plan with parallelism, deletes last
//!
//! ## Example
//!
//! ```
//! use declarative::{DeltaBuilder, Field};
//!
//! // Desired: description set, name left unset
//! let name: Field<String> = Field::Unset;
//! let description = Field::Value("new".to_string());
//!
//! // Observed remote state
//! let observed_name = "svc-bot".to_string();
//! let observed_description = "old".to_string();
//!
//! let mut builder = DeltaBuilder::new();
//! builder
//!     .scalar("name", &name, Some(&observed_name))
//!     .scalar("description", &description, Some(&observed_description));
//! let delta = builder.finish().unwrap();
//!
//! assert_eq!(delta.into_body(), serde_json::json!({"description": "new"}));
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This keeps the crate free of any particular UI.

pub mod context;
pub mod diff;
pub mod executor;
pub mod field;
pub mod merge;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{Delta, DeltaBuilder, FieldChange, canonical_json};
pub use executor::{execute, execute_simple};
pub use field::Field;
pub use merge::overlay;
pub use planner::{DiffSummary, Plan, PlannedResource, address_matches, filter_by_target};
pub use resource::{BoxedResource, Resource};
pub use types::{Action, ApplyResult, Change, ExecuteOptions, ExecuteSummary};
