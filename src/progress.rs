//! Progress tracking and reporting

use crate::sync::EntryOutcome;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Spinner that ticks once per finished entry
pub struct ProgressTracker {
    progress_bar: ProgressBar,
    bytes_copied: AtomicU64,
    failed: AtomicU64,
}

impl ProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} entries {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(pb)
    }

    fn with_bar(progress_bar: ProgressBar) -> Self {
        Self {
            progress_bar,
            bytes_copied: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn record(&self, outcome: &EntryOutcome) {
        let bytes = self.bytes_copied.fetch_add(outcome.bytes, Ordering::Relaxed) + outcome.bytes;
        let failed = if outcome.outcome.is_failed() {
            self.failed.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.failed.load(Ordering::Relaxed)
        };

        self.progress_bar.inc(1);
        self.progress_bar
            .set_message(format!("({} copied, {} failed)", HumanBytes(bytes), failed));
    }

    pub fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
