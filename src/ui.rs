use colored::Colorize;
use serde_json::Value;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(console::measure_text_width(title)).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a JSON value, pretty
pub fn json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Render rows under bold headers, columns padded to the widest cell
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|h| console::measure_text_width(h))
        .collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(console::measure_text_width(cell));
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(&h.bold().to_string(), *w))
        .collect();
    out.push_str(header_cells.join("  ").trim_end());
    out.push('\n');

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| pad(cell, *w))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// Pad to `width` visible columns, ignoring ANSI escapes
fn pad(text: &str, width: usize) -> String {
    let visible = console::measure_text_width(text);
    format!("{text}{}", " ".repeat(width.saturating_sub(visible)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_aligns_columns() {
        colored::control::set_override(false);
        let rows = vec![
            vec!["a1".to_string(), "svc-bot".to_string()],
            vec!["a22".to_string(), "x".to_string()],
        ];
        let rendered = table(&["ID", "NAME"], &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "ID   NAME");
        assert_eq!(lines[1], "a1   svc-bot");
        assert_eq!(lines[2], "a22  x");
    }

    #[test]
    fn test_pad_ignores_escapes() {
        let colored = "\u{1b}[31mab\u{1b}[0m";
        assert_eq!(console::measure_text_width(&pad(colored, 4)), 4);
    }
}
