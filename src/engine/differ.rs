//! Plan display

use colored::{ColoredString, Colorize};
use declarative::{Action, FieldChange, Plan, PlannedResource, canonical_json};
use serde_json::Value;
use std::collections::BTreeMap;

/// Longest value shown inline before it is shortened
const MAX_VALUE_WIDTH: usize = 60;

/// Display every change in `plan`, grouped by kind
pub fn display_plan(plan: &Plan) {
    if !plan.has_changes() {
        println!();
        println!("  {} No changes. Remote state matches the manifest.", "✓".green());
        return;
    }

    let mut by_type: BTreeMap<&str, Vec<&PlannedResource>> = BTreeMap::new();
    for entry in plan.changes() {
        by_type
            .entry(entry.resource.resource_type())
            .or_default()
            .push(entry);
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for (resource_type, entries) in &by_type {
        println!("│ {}", resource_type.bold());
        for entry in entries {
            let change = &entry.change;
            let reason = change
                .reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            println!(
                "│   {} {:<36} {}{}",
                symbol(change.action),
                entry.resource.address(),
                change.action.verb().dimmed(),
                reason.dimmed()
            );
            for field in &change.fields {
                match blob_lines(field) {
                    Some(lines) => {
                        println!("│       {}:", field.field);
                        for line in lines {
                            println!("│         {line}");
                        }
                    }
                    None => println!("│       {}", field_line(field)),
                }
            }
        }
        println!("│");
    }

    let summary = plan.summary();
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Plan: {} to create, {} to update, {} to replace, {} to delete",
        summary.creates.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.replaces.to_string().yellow(),
        summary.deletes.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────────────┘");
}

fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Replace => action.symbol().magenta(),
        Action::Delete => action.symbol().red(),
        Action::NoOp => action.symbol().dimmed(),
    }
}

/// `field: before → after`
fn field_line(field: &FieldChange) -> String {
    let before = field
        .before
        .as_ref()
        .map(render)
        .unwrap_or_else(|| "(unset)".to_string());
    format!(
        "{}: {} → {}",
        field.field,
        before.red(),
        render(&field.after).green()
    )
}

/// Line diff of two JSON objects, or None for anything else
fn blob_lines(field: &FieldChange) -> Option<Vec<String>> {
    let (Some(before @ Value::Object(_)), after @ Value::Object(_)) = (&field.before, &field.after)
    else {
        return None;
    };
    let before = serde_json::to_string_pretty(before).ok()?;
    let after = serde_json::to_string_pretty(after).ok()?;

    let diff = similar::TextDiff::from_lines(&before, &after);
    let lines = diff
        .iter_all_changes()
        .filter_map(|change| {
            let line = change.to_string_lossy();
            let line = line.trim_end();
            match change.tag() {
                similar::ChangeTag::Delete => Some(format!("- {line}").red().to_string()),
                similar::ChangeTag::Insert => Some(format!("+ {line}").green().to_string()),
                similar::ChangeTag::Equal => None,
            }
        })
        .collect();
    Some(lines)
}

/// Render a value on one line, shortened when long
fn render(value: &Value) -> String {
    let text = match value {
        Value::String(s) if s.is_empty() => "\"\"".to_string(),
        Value::String(s) => s.clone(),
        other => canonical_json(other),
    };
    shorten(&text, MAX_VALUE_WIDTH)
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_values() {
        assert_eq!(render(&json!("svc-bot")), "svc-bot");
        assert_eq!(render(&json!("")), "\"\"");
        assert_eq!(render(&json!({"b": 1, "a": 2})), r#"{"a":2,"b":1}"#);
        assert_eq!(render(&json!(null)), "null");
    }

    #[test]
    fn test_long_values_are_shortened() {
        let long = "x".repeat(100);
        let rendered = render(&json!(long));
        assert_eq!(rendered.chars().count(), MAX_VALUE_WIDTH);
        assert!(rendered.ends_with('…'));
    }

    #[test]
    fn test_blob_changes_are_line_diffed() {
        colored::control::set_override(false);
        let change = FieldChange {
            field: "configuration".to_string(),
            before: Some(json!({"model": "a", "retries": 3})),
            after: json!({"model": "b", "retries": 3}),
        };
        let lines = blob_lines(&change).unwrap();
        assert_eq!(lines, vec![r#"-   "model": "a","#, r#"+   "model": "b","#]);

        let scalar = FieldChange {
            field: "name".to_string(),
            before: Some(json!("a")),
            after: json!("b"),
        };
        assert!(blob_lines(&scalar).is_none());
    }

    #[test]
    fn test_field_line_marks_unset_before() {
        colored::control::set_override(false);
        let change = FieldChange {
            field: "description".to_string(),
            before: None,
            after: json!("new"),
        };
        assert_eq!(field_line(&change), "description: (unset) → new");
    }
}
