//! Read-only and one-shot commands against the Control Plane

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use controlplane::EntityKind;
use serde_json::Value;

use crate::Context;
use crate::cli::JobCommand;
use crate::ui;

/// Print remote records of a kind as a table
pub fn list(ctx: &Context, kind: EntityKind, environment_id: Option<&str>) -> Result<()> {
    let client = super::client(ctx)?;
    let records = client
        .list_values(kind, environment_id, &super::call_options(ctx))
        .with_context(|| format!("Failed to list {kind} records"))?;

    if records.is_empty() {
        ui::info(&format!("No {kind} records"));
        return Ok(());
    }
    print!("{}", records_table(kind, &records));
    Ok(())
}

/// Print one remote record
pub fn get(ctx: &Context, kind: EntityKind, id: &str) -> Result<()> {
    let client = super::client(ctx)?;
    let record = client
        .lookup(kind, id, &super::call_options(ctx))
        .with_context(|| format!("Failed to fetch {kind} {id}"))?;
    ui::json(&record);
    Ok(())
}

/// `kcp job enable|disable`
pub fn job(ctx: &Context, cmd: JobCommand) -> Result<()> {
    let client = super::client(ctx)?;
    let opts = super::call_options(ctx);
    let (job, verb) = match &cmd {
        JobCommand::Enable { id } => (client.enable_job(id, &opts), "enabled"),
        JobCommand::Disable { id } => (client.disable_job(id, &opts), "disabled"),
    };
    let job = job.context("Failed to toggle job")?;

    if !ctx.quiet {
        let name = job.name.as_deref().unwrap_or("(unnamed)");
        ui::success(&format!("Job {name} {verb}"));
        if let Some(status) = &job.status {
            ui::kv("Status", status);
        }
    }
    Ok(())
}

fn records_table(kind: EntityKind, records: &[Value]) -> String {
    let spec = kind.spec();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            vec![
                spec.identity_of(record).unwrap_or_default(),
                text(record, "name")
                    .or_else(|| text(record, "hostname"))
                    .unwrap_or_default(),
                text(record, "status")
                    .map(|s| status_colored(&s))
                    .unwrap_or_default(),
            ]
        })
        .collect();
    ui::table(&["ID", "NAME", "STATUS"], &rows)
}

fn text(record: &Value, field: &str) -> Option<String> {
    record.get(field).and_then(Value::as_str).map(str::to_string)
}

fn status_colored(status: &str) -> String {
    match status {
        "active" | "ready" | "idle" => status.green().to_string(),
        "error" | "failed" | "disconnected" => status.red().to_string(),
        "inactive" | "archived" => status.dimmed().to_string(),
        other => other.yellow().to_string(),
    }
}
