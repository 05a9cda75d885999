//! Reconcile commands
//!
//! - `plan` - Show what apply would change
//! - `apply` - Make the Control Plane match the manifest
//! - `destroy` - Delete tracked resources
//! - `refresh` - Re-read tracked resources

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::Plan;

use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs, TargetArgs};
use crate::engine::{self, ApplyOptions, Session, differ};
use crate::manifest::Manifest;
use crate::paths;
use crate::ui;

fn load_manifest(ctx: &Context) -> Result<Manifest> {
    let path = paths::manifest_path(ctx.file.as_deref());
    Manifest::load(&path)
}

/// Refresh tracked resources, warning about those that went away
fn refresh_tracked(ctx: &Context, session: &Session, target: Option<&str>, jobs: usize) -> Result<()> {
    let summary = engine::refresh(session, target, jobs)?;
    if !ctx.quiet {
        for address in &summary.dropped {
            ui::warn(&format!("{address} no longer exists and is no longer tracked"));
        }
    }
    Ok(())
}

/// Show the plan. State is refreshed in memory only.
pub fn plan(ctx: &Context, args: TargetArgs) -> Result<()> {
    let manifest = load_manifest(ctx)?;
    let session = super::session(ctx)?;
    let target = args.target.as_deref();

    refresh_tracked(ctx, &session, target, args.jobs)?;
    let resources = engine::manifest_resources(&manifest, &session, target)?;
    let plan = Plan::build(resources, args.jobs)?;
    differ::display_plan(&plan);
    Ok(())
}

/// Refresh, plan, confirm and apply
pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let manifest = load_manifest(ctx)?;
    let session = super::session(ctx)?;
    let target = args.target.as_deref();

    refresh_tracked(ctx, &session, target, args.jobs)?;
    if !args.dry_run {
        session.save()?;
    }

    let resources = engine::manifest_resources(&manifest, &session, target)?;
    let plan = Plan::build(resources, args.jobs)?;
    let summary = engine::apply(
        &plan,
        &ApplyOptions {
            dry_run: args.dry_run,
            jobs: args.jobs,
            yes: args.yes,
            verbose: ctx.verbose > 0,
            quiet: ctx.quiet,
        },
    )?;

    if !summary.is_success() {
        bail!("{} resources failed to apply", summary.failed);
    }
    Ok(())
}

/// Delete every tracked resource in `target`
pub fn destroy(ctx: &Context, args: DestroyArgs) -> Result<()> {
    let session = super::session(ctx)?;
    let resources = engine::tracked_resources(&session, args.target.as_deref());
    if resources.is_empty() {
        ui::info("Nothing is tracked");
        return Ok(());
    }

    let plan = Plan::build(resources, args.jobs)?;
    let summary = engine::apply(
        &plan,
        &ApplyOptions {
            dry_run: false,
            jobs: args.jobs,
            yes: args.yes,
            verbose: ctx.verbose > 0,
            quiet: ctx.quiet,
        },
    )?;

    if !summary.is_success() {
        bail!("{} resources failed to delete", summary.failed);
    }
    Ok(())
}

/// Re-read tracked resources and persist the result
pub fn refresh(ctx: &Context, args: TargetArgs) -> Result<()> {
    let session = super::session(ctx)?;
    let summary = engine::refresh(&session, args.target.as_deref(), args.jobs)?;
    session.save()?;

    if ctx.quiet {
        return Ok(());
    }
    for address in &summary.refreshed {
        println!("  {} {}", "✓".green(), address);
    }
    for address in &summary.dropped {
        println!("  {} {} {}", "-".red(), address, "(gone, no longer tracked)".dimmed());
    }
    println!();
    ui::success(&format!(
        "Refreshed {} resources, dropped {}",
        summary.refreshed.len(),
        summary.dropped.len()
    ));
    ui::dim(&format!("State saved to {}", session.state_path().display()));
    Ok(())
}
