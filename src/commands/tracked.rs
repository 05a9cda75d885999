//! Commands over tracked state

use anyhow::{Result, bail};
use colored::Colorize;
use controlplane::EntityKind;

use crate::Context;
use crate::cli::StateCommand;
use crate::engine;
use crate::paths;
use crate::state::State;
use crate::ui;

/// Summary of everything tracked, or one resource in full
pub fn show(_ctx: &Context, address: Option<&str>) -> Result<()> {
    let state = State::load(&paths::state_file()?)?;

    let Some(address) = address else {
        if state.resources.is_empty() {
            ui::info("Nothing is tracked");
            return Ok(());
        }
        ui::header("Tracked Resources");
        print!("{}", summary_table(&state, None));
        return Ok(());
    };

    let Some(entry) = state.get(address) else {
        bail!("{address} is not tracked");
    };
    ui::header(address);
    ui::kv("Kind", entry.kind.name());
    ui::kv("Identity", &entry.identity);
    ui::kv("Updated", &entry.updated_at.to_rfc3339());
    println!();
    ui::json(&entry.observed);
    Ok(())
}

/// `kcp state ...`
pub fn run(ctx: &Context, cmd: StateCommand) -> Result<()> {
    let path = paths::state_file()?;
    let mut state = State::load(&path)?;

    match cmd {
        StateCommand::List { target } => {
            for address in state.addresses(target.as_deref()) {
                println!("{address}");
            }
        }
        StateCommand::Rm { address } => {
            if state.remove(&address).is_none() {
                bail!("{address} is not tracked");
            }
            state.save(&path)?;
            if !ctx.quiet {
                ui::success(&format!("{address} is no longer tracked"));
                ui::dim("The remote resource was left untouched.");
            }
        }
    }
    Ok(())
}

/// Track an existing remote resource
pub fn import(ctx: &Context, kind: EntityKind, name: &str, id: &str) -> Result<()> {
    let session = super::session(ctx)?;
    let entry = engine::import(&session, kind, name, id)?;
    if !ctx.quiet {
        ui::success(&format!("Imported {} {} as {}.{}", kind, entry.identity, kind, name));
    }
    Ok(())
}

fn summary_table(state: &State, target: Option<&str>) -> String {
    let rows: Vec<Vec<String>> = state
        .addresses(target)
        .into_iter()
        .filter_map(|address| {
            let entry = state.get(&address)?;
            Some(vec![
                address.clone(),
                entry.identity.clone(),
                entry
                    .updated_at
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
                    .dimmed()
                    .to_string(),
            ])
        })
        .collect();
    ui::table(&["ADDRESS", "IDENTITY", "UPDATED"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateEntry;
    use serde_json::json;

    #[test]
    fn test_summary_table_lists_addresses() {
        colored::control::set_override(false);
        let mut state = State::default();
        state.upsert(
            "agent.bot",
            StateEntry::new(EntityKind::Agent, "a1", json!({"id": "a1"})),
        );
        state.upsert(
            "team.ops",
            StateEntry::new(EntityKind::Team, "t1", json!({"id": "t1"})),
        );

        let table = summary_table(&state, None);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ADDRESS"));
        assert!(lines[1].starts_with("agent.bot  a1"));

        assert_eq!(summary_table(&state, Some("team")).lines().count(), 2);
    }
}
