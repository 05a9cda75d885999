//! Core types for planning and applying changes

use crate::diff::FieldChange;
use serde::{Deserialize, Serialize};

/// What reconciliation will do to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Desired already matches observed
    NoOp,
    /// Resource is not tracked (or is gone remotely) and will be created
    Create,
    /// Resource will be updated in place with a partial payload
    Update,
    /// A create-only field changed: delete then create
    Replace,
    /// Resource is tracked but no longer declared
    Delete,
}

impl Action {
    /// Check if the action changes anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Diff marker for display
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoOp => "=",
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
        }
    }

    /// Verb for display
    pub fn verb(&self) -> &'static str {
        match self {
            Self::NoOp => "unchanged",
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        }
    }
}

/// A planned change for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// The action to take
    pub action: Action,
    /// Field-level changes (empty for create/delete)
    #[serde(default)]
    pub fields: Vec<FieldChange>,
    /// Why this action was chosen, when not obvious
    #[serde(default)]
    pub reason: Option<String>,
}

impl Change {
    /// No change needed
    pub fn noop() -> Self {
        Self::of(Action::NoOp)
    }

    /// Create the resource
    pub fn create() -> Self {
        Self::of(Action::Create)
    }

    /// Delete the resource
    pub fn delete() -> Self {
        Self::of(Action::Delete)
    }

    /// Update the listed fields
    pub fn update(fields: Vec<FieldChange>) -> Self {
        Self {
            action: Action::Update,
            fields,
            reason: None,
        }
    }

    /// Replace because of the listed fields
    pub fn replace(fields: Vec<FieldChange>) -> Self {
        Self {
            action: Action::Replace,
            fields,
            reason: None,
        }
    }

    /// Attach a reason
    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn of(action: Action) -> Self {
        Self {
            action,
            fields: Vec::new(),
            reason: None,
        }
    }
}

/// Result of applying a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was updated in place
    Updated,
    /// Resource was deleted and recreated
    Replaced,
    /// Resource was deleted (or dropped from tracking)
    Deleted,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Replaced | Self::Deleted
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
    /// Failed resource addresses with their errors
    #[serde(default)]
    pub failures: Vec<(String, String)>,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.replaced += other.replaced;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
        self.failures.extend(other.failures.iter().cloned());
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, address: &str, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Updated => self.updated += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Deleted => self.deleted += 1,
            ApplyResult::Failed { error } => {
                self.failed += 1;
                self.failures.push((address.to_string(), error.clone()));
            }
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_symbols() {
        assert_eq!(Action::Create.symbol(), "+");
        assert_eq!(Action::Update.symbol(), "~");
        assert_eq!(Action::Replace.symbol(), "-/+");
        assert_eq!(Action::Delete.symbol(), "-");
        assert!(!Action::NoOp.is_change());
        assert!(Action::Replace.is_change());
    }

    #[test]
    fn test_summary_counts_and_failures() {
        let mut summary = ExecuteSummary::default();
        summary.add_result("agent.a", &ApplyResult::Created);
        summary.add_result("agent.b", &ApplyResult::Updated);
        summary.add_result("agent.c", &ApplyResult::NoChange);
        summary.add_result(
            "agent.d",
            &ApplyResult::Failed {
                error: "boom".into(),
            },
        );

        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
        assert_eq!(
            summary.failures,
            vec![("agent.d".to_string(), "boom".to_string())]
        );
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ExecuteSummary::default();
        a.add_result("x", &ApplyResult::Deleted);
        let mut b = ExecuteSummary::default();
        b.add_result("y", &ApplyResult::Replaced);
        a.merge(&b);
        assert_eq!(a.deleted, 1);
        assert_eq!(a.replaced, 1);
    }

    #[test]
    fn test_change_constructors() {
        let change = Change::create().because("not tracked");
        assert_eq!(change.action, Action::Create);
        assert_eq!(change.reason.as_deref(), Some("not tracked"));
        assert!(Change::noop().fields.is_empty());
    }
}
