//! Progress and confirmation for the apply engine

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyResult, ConfirmCallback, ProgressCallback};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Create a progress bar with kcp's style
pub fn bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Symbol for a finished resource
pub fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created
        | ApplyResult::Updated
        | ApplyResult::Replaced
        | ApplyResult::Deleted => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// Progress bar per batch, hidden with `--quiet`
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize, label: &str) {
        if self.quiet {
            return;
        }
        println!();
        println!("  {} Applying {} {}...", "→".cyan(), count, label);
        self.bar = Some(bar(count as u64, "Applying"));
    }

    fn on_resource_start(&mut self, address: &str, _description: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(address.to_string());
        }
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        if let Some(pb) = &self.bar {
            pb.set_message(format!("{} {}", result_symbol(result), address));
            pb.inc(1);
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

/// Interactive confirmation, skipped entirely with `--yes`
pub struct PromptConfirm {
    yes: bool,
}

impl PromptConfirm {
    pub fn new(yes: bool) -> Self {
        Self { yes }
    }
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_symbols() {
        assert_eq!(result_symbol(&ApplyResult::Created), "✓");
        assert_eq!(result_symbol(&ApplyResult::NoChange), "○");
        assert_eq!(
            result_symbol(&ApplyResult::Failed {
                error: "boom".into()
            }),
            "✗"
        );
    }

    #[test]
    fn test_yes_confirms_without_prompt() {
        assert!(PromptConfirm::new(true).confirm("Apply changes?").unwrap());
    }

    #[test]
    fn test_quiet_progress_draws_nothing() {
        let mut progress = BarProgress::new(true);
        progress.on_batch_start(3, "changes");
        assert!(progress.bar.is_none());
        progress.on_resource_complete("agent.a", &ApplyResult::Created);
        progress.on_batch_complete();
    }
}
