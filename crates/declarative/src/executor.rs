//! Execution engine - applies planned changes with parallelism
//!
//! Creates, updates and replacements run first as one batch; deletes run
//! afterwards so that nothing is torn down before its replacement exists.

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::planner::{Plan, PlannedResource};
use crate::types::{Action, ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::{Context, Result};
use rayon::prelude::*;

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The plan to run
/// * `opts` - Execution options (dry_run, jobs, verbose)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Summary of execution results
pub fn execute<P, C>(
    plan: &Plan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let (deletes, upserts): (Vec<&PlannedResource>, Vec<&PlannedResource>) = plan
        .changes()
        .partition(|e| e.change.action == Action::Delete);
    let total_changes = deletes.len() + upserts.len();

    if total_changes == 0 {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        let mut summary = ExecuteSummary::default();
        for entry in upserts.iter().chain(deletes.iter()) {
            summary.add_result(
                &entry.resource.address(),
                &ApplyResult::Skipped {
                    reason: "Dry run".into(),
                },
            );
        }
        return Ok(summary);
    }

    if !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: total_changes,
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();

    for (label, batch) in [("changes", &upserts), ("deletions", &deletes)] {
        if batch.is_empty() {
            continue;
        }
        progress.on_batch_start(batch.len(), label);
        for (address, result) in execute_batch(batch, opts, progress)? {
            summary.add_result(&address, &result);
        }
        progress.on_batch_complete();
    }

    Ok(summary)
}

/// Execute a batch of planned changes
fn execute_batch<P: ProgressCallback>(
    entries: &[&PlannedResource],
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<Vec<(String, ApplyResult)>> {
    if opts.jobs <= 1 || entries.len() == 1 {
        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let address = entry.resource.address();
            progress.on_resource_start(&address, &entry.resource.description());
            let result = apply_entry(entry, opts.verbose);
            progress.on_resource_complete(&address, &result);
            results.push((address, result));
        }
        Ok(results)
    } else {
        execute_parallel(entries, opts, progress)
    }
}

/// Execute changes in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    entries: &[&PlannedResource],
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<Vec<(String, ApplyResult)>> {
    // The progress callback is not thread-safe; results are reported after the batch.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs)
        .build()
        .context("Failed to create thread pool")?;

    let results: Vec<(String, ApplyResult)> = pool.install(|| {
        entries
            .par_iter()
            .map(|entry| (entry.resource.address(), apply_entry(entry, opts.verbose)))
            .collect()
    });

    for (address, result) in &results {
        progress.on_resource_complete(address, result);
    }

    Ok(results)
}

/// Apply a single planned change
fn apply_entry(entry: &PlannedResource, verbose: bool) -> ApplyResult {
    let mut ctx = ApplyContext::new(false, verbose);

    match entry.resource.apply(&entry.change, &mut ctx) {
        Ok(result) => result,
        Err(e) => {
            log::error!("{}: {:#}", entry.resource.address(), e);
            ApplyResult::Failed {
                error: format!("{e:#}"),
            }
        }
    }
}

/// Simple execution without callbacks
pub fn execute_simple(plan: &Plan, opts: &ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::resource::Resource;
    use crate::types::Change;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Resource for Recorder {
        fn address(&self) -> String {
            format!("test.{}", self.name)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.name)
        }

        fn plan(&self) -> Result<Change> {
            Ok(Change::create())
        }

        fn apply(&self, change: &Change, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if self.fail {
                anyhow::bail!("rejected by remote");
            }
            self.log
                .lock()
                .unwrap()
                .push(format!("{} {}", change.action.verb(), self.name));
            Ok(match change.action {
                Action::Create => ApplyResult::Created,
                Action::Update => ApplyResult::Updated,
                Action::Replace => ApplyResult::Replaced,
                Action::Delete => ApplyResult::Deleted,
                Action::NoOp => ApplyResult::NoChange,
            })
        }
    }

    fn plan_with(entries: Vec<(&str, Action, bool)>, log: &Arc<Mutex<Vec<String>>>) -> Plan {
        let mut plan = Plan::new();
        for (name, action, fail) in entries {
            plan.push(
                Box::new(Recorder {
                    name: name.to_string(),
                    log: Arc::clone(log),
                    fail,
                }),
                Change {
                    action,
                    fields: Vec::new(),
                    reason: None,
                },
            );
        }
        plan
    }

    fn sequential() -> ExecuteOptions {
        ExecuteOptions {
            jobs: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_execute_empty_plan() {
        let result = execute_simple(&Plan::new(), &ExecuteOptions::default()).unwrap();
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_execute_skips_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let plan = plan_with(vec![("a", Action::NoOp, false)], &log);
        let result = execute_simple(&plan, &sequential()).unwrap();
        assert_eq!(result.total(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_deletes_run_after_other_changes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let plan = plan_with(
            vec![
                ("old", Action::Delete, false),
                ("new", Action::Create, false),
                ("changed", Action::Update, false),
            ],
            &log,
        );
        let result = execute(&plan, &sequential(), &mut NoProgress, &mut AutoConfirm).unwrap();

        assert_eq!(result.created, 1);
        assert_eq!(result.updated, 1);
        assert_eq!(result.deleted, 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["create new", "update changed", "delete old"]
        );
    }

    #[test]
    fn test_failures_are_collected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let plan = plan_with(
            vec![("ok", Action::Create, false), ("bad", Action::Create, true)],
            &log,
        );
        let result = execute_simple(&plan, &ExecuteOptions::default()).unwrap();

        assert_eq!(result.created, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures[0].0, "test.bad");
        assert!(result.failures[0].1.contains("rejected by remote"));
    }

    #[test]
    fn test_declined_confirmation_skips_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let plan = plan_with(vec![("a", Action::Create, false)], &log);
        let result = execute(&plan, &sequential(), &mut NoProgress, &mut AutoDecline).unwrap();
        assert_eq!(result.skipped, 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_applies_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let plan = plan_with(vec![("a", Action::Create, false)], &log);
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = execute_simple(&plan, &opts).unwrap();
        assert_eq!(result.skipped, 1);
        assert!(log.lock().unwrap().is_empty());
    }
}
