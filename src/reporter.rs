use indicatif::{ProgressBar, ProgressStyle};
use media_consolidator::progress::{ProgressReporter, Stage};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const TICK_MS: u64 = 80;

/// CLI progress reporter using indicatif.
///
/// Stages with a known total get a bar, the rest (inventory) a spinner.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(stage: Stage) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(format!("{}...", stage.label()));
        pb
    }

    fn bar(stage: Stage, total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} {prefix} [{bar:30.cyan/dim}] {pos}/{len} ({eta} remaining)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.set_prefix(stage.label());
        pb
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            pb.enable_steady_tick(Duration::from_millis(TICK_MS));
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_stage_start(&self, stage: Stage, total: Option<usize>) {
        let pb = match total {
            Some(total) => Self::bar(stage, total),
            None => Self::spinner(stage),
        };
        self.set_bar(pb);
    }

    fn on_stage_progress(&self, stage: Stage, done: usize) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                if pb.length().is_some() && pb.length() != Some(0) {
                    pb.set_position(done as u64);
                } else {
                    pb.set_message(format!("{}... {} files", stage.label(), done));
                }
            }
        }
    }

    fn on_stage_complete(&self, stage: Stage, count: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m {} complete: {} in {:.2}s",
            stage.label(),
            count,
            duration_secs
        );
    }
}
