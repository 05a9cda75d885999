//! Resource trait for declarative reconciliation
//!
//! A Resource is one declared (or tracked) remote object. It knows how to
//! work out what needs to change and how to make that change happen.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, Change};
use anyhow::Result;
use std::fmt;

/// Core trait for reconcilable resources
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, ApplyResult, Change, Resource};
///
/// #[derive(Debug)]
/// struct Note { key: String, exists: bool }
///
/// impl Resource for Note {
///     fn address(&self) -> String { format!("note.{}", self.key) }
///     fn resource_type(&self) -> &'static str { "note" }
///     fn description(&self) -> String { format!("Note {}", self.key) }
///
///     fn plan(&self) -> anyhow::Result<Change> {
///         Ok(if self.exists { Change::noop() } else { Change::create() })
///     }
///
///     fn apply(&self, change: &Change, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
///         if ctx.dry_run {
///             return Ok(ApplyResult::Skipped { reason: "Dry run".into() });
///         }
///         Ok(ApplyResult::Created)
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Stable address of this resource, `<type>.<name>`
    fn address(&self) -> String;

    /// Resource type category, used for grouping and target filters
    fn resource_type(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> String;

    /// Work out what needs to change
    ///
    /// May perform reads against the remote system.
    fn plan(&self) -> Result<Change>;

    /// Carry out a planned change
    fn apply(&self, change: &Change, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// Boxed resource for dynamic dispatch
pub type BoxedResource = Box<dyn Resource>;
