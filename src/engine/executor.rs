//! Apply a plan with kcp's UI

use super::differ::display_plan;
use crate::progress::{BarProgress, PromptConfirm};
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use declarative::{ExecuteOptions, ExecuteSummary, Plan};

/// Options for `apply` and `destroy`
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Show the plan without changing anything
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip the confirmation prompt
    pub yes: bool,
    pub verbose: bool,
    pub quiet: bool,
}

/// Show the plan, confirm, apply it and print a summary
pub fn apply(plan: &Plan, opts: &ApplyOptions) -> Result<ExecuteSummary> {
    display_plan(plan);

    if !plan.has_changes() {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        println!();
        ui::info("Dry run - no changes made");
        return Ok(ExecuteSummary::default());
    }

    let exec_opts = ExecuteOptions {
        dry_run: false,
        jobs: opts.jobs.max(1),
        verbose: opts.verbose,
    };
    let mut progress = BarProgress::new(opts.quiet);
    let mut confirm = PromptConfirm::new(opts.yes);

    println!();
    let summary = declarative::execute(plan, &exec_opts, &mut progress, &mut confirm)?;

    let declined = summary.total() == summary.skipped && summary.skipped == plan.summary().total();
    if declined {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(summary);
    }

    print_summary(&summary);
    Ok(summary)
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    let counts = [
        (summary.created, "created"),
        (summary.updated, "updated"),
        (summary.replaced, "replaced"),
        (summary.deleted, "deleted"),
        (summary.skipped, "skipped"),
    ];
    for (count, verb) in counts {
        if count > 0 {
            println!("    • {count} resources {verb}");
        }
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
        for (address, error) in &summary.failures {
            println!("      {} {}: {}", "✗".red(), address, error.dimmed());
        }
    }
}
