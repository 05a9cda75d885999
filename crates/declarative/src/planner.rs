//! Planner - works out the change for every resource

use crate::resource::BoxedResource;
use crate::types::{Action, Change};
use anyhow::{Context, Result};
use rayon::prelude::*;

/// A resource together with the change planned for it
#[derive(Debug)]
pub struct PlannedResource {
    pub resource: BoxedResource,
    pub change: Change,
}

/// An ordered set of planned changes
#[derive(Debug, Default)]
pub struct Plan {
    pub entries: Vec<PlannedResource>,
}

impl Plan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan every resource, running up to `jobs` planners at once
    ///
    /// Planning stops at the first resource that cannot be planned.
    pub fn build(resources: Vec<BoxedResource>, jobs: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()
            .context("Failed to create thread pool")?;

        let changes: Vec<Result<Change>> = pool.install(|| {
            resources
                .par_iter()
                .map(|r| {
                    r.plan()
                        .with_context(|| format!("Failed to plan {}", r.address()))
                })
                .collect()
        });

        let mut entries = Vec::with_capacity(resources.len());
        for (resource, change) in resources.into_iter().zip(changes) {
            let change = change?;
            log::debug!("{}: {}", resource.address(), change.action.verb());
            entries.push(PlannedResource { resource, change });
        }
        Ok(Self { entries })
    }

    /// Add an already planned resource
    pub fn push(&mut self, resource: BoxedResource, change: Change) {
        self.entries.push(PlannedResource { resource, change });
    }

    /// Entries that change something
    pub fn changes(&self) -> impl Iterator<Item = &PlannedResource> {
        self.entries.iter().filter(|e| e.change.action.is_change())
    }

    /// Check if anything would change
    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count planned actions
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for entry in &self.entries {
            match entry.change.action {
                Action::NoOp => summary.unchanged += 1,
                Action::Create => summary.creates += 1,
                Action::Update => summary.updates += 1,
                Action::Replace => summary.replaces += 1,
                Action::Delete => summary.deletes += 1,
            }
        }
        summary
    }
}

/// Planned action counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub creates: usize,
    pub updates: usize,
    pub replaces: usize,
    pub deletes: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Keep only resources matching a target pattern
///
/// Target format: "type" or "type.name"
pub fn filter_by_target(resources: Vec<BoxedResource>, target: Option<&str>) -> Vec<BoxedResource> {
    if target.is_none() {
        return resources;
    }
    resources
        .into_iter()
        .filter(|r| address_matches(&r.address(), target))
        .collect()
}

/// Check whether an address falls within a target pattern
pub fn address_matches(address: &str, target: Option<&str>) -> bool {
    let Some(t) = target else {
        return true;
    };
    let (resource_type, name) = parse_target(t);
    let (addr_type, addr_name) = address.split_once('.').unwrap_or((address, ""));
    resource_type.is_none_or(|rt| rt == addr_type) && name.is_none_or(|n| n == addr_name)
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) if !name.contains('.') => {
            (Some(kind.to_string()), Some(name.to_string()))
        }
        Some(_) => (None, Some(target.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::resource::Resource;
    use crate::types::ApplyResult;

    #[derive(Debug)]
    struct Fixed {
        kind: &'static str,
        name: &'static str,
        action: Action,
        fail: bool,
    }

    impl Resource for Fixed {
        fn address(&self) -> String {
            format!("{}.{}", self.kind, self.name)
        }

        fn resource_type(&self) -> &'static str {
            self.kind
        }

        fn description(&self) -> String {
            self.address()
        }

        fn plan(&self) -> Result<Change> {
            if self.fail {
                anyhow::bail!("remote unreachable");
            }
            Ok(Change {
                action: self.action,
                fields: Vec::new(),
                reason: None,
            })
        }

        fn apply(&self, _change: &Change, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            Ok(ApplyResult::NoChange)
        }
    }

    fn fixed(kind: &'static str, name: &'static str, action: Action) -> BoxedResource {
        Box::new(Fixed {
            kind,
            name,
            action,
            fail: false,
        })
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("agent"), (Some("agent".to_string()), None));
        assert_eq!(
            parse_target("agent.svc_bot"),
            (Some("agent".to_string()), Some("svc_bot".to_string()))
        );
        assert_eq!(parse_target("a.b.c"), (None, Some("a.b.c".to_string())));
    }

    #[test]
    fn test_address_matches() {
        assert!(address_matches("agent.svc_bot", None));
        assert!(address_matches("agent.svc_bot", Some("agent")));
        assert!(address_matches("agent.svc_bot", Some("agent.svc_bot")));
        assert!(!address_matches("agent.svc_bot", Some("team")));
        assert!(!address_matches("agent.svc_bot", Some("agent.other")));
    }

    #[test]
    fn test_build_preserves_order_and_summarizes() {
        let plan = Plan::build(
            vec![
                fixed("agent", "a", Action::Create),
                fixed("agent", "b", Action::NoOp),
                fixed("team", "c", Action::Update),
                fixed("worker", "d", Action::Delete),
            ],
            2,
        )
        .unwrap();

        let addresses: Vec<String> = plan.entries.iter().map(|e| e.resource.address()).collect();
        assert_eq!(addresses, vec!["agent.a", "agent.b", "team.c", "worker.d"]);

        let summary = plan.summary();
        assert_eq!(summary.creates, 1);
        assert_eq!(summary.updates, 1);
        assert_eq!(summary.deletes, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(plan.changes().count(), 3);
    }

    #[test]
    fn test_build_fails_on_plan_error() {
        let failing: BoxedResource = Box::new(Fixed {
            kind: "agent",
            name: "broken",
            action: Action::NoOp,
            fail: true,
        });
        let err = Plan::build(vec![failing], 1).unwrap_err();
        assert!(format!("{err:#}").contains("agent.broken"));
    }

    #[test]
    fn test_filter_by_target() {
        let resources = vec![
            fixed("agent", "a", Action::Create),
            fixed("team", "b", Action::Create),
        ];
        let filtered = filter_by_target(resources, Some("team"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].address(), "team.b");
    }
}
