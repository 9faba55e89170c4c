// src/report.rs

use crate::license::LicensePair;
use crate::model::LicenseChoice;
use crate::orchestrator::Counters;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;

/// Live progress line. Only ever reads counter snapshots.
pub struct ProgressReporter {
    bar: ProgressBar,
    licenses: LicensePair,
}

impl ProgressReporter {
    pub fn new(total: u64, licenses: LicensePair) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template("[{bar:50}] {percent:>3}% {msg}")
            .map(|style| style.progress_chars("# "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar, licenses }
    }

    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            licenses: LicensePair::default(),
        }
    }

    pub fn render(&self, counters: &Counters) {
        self.bar.set_position(counters.completed() as u64);
        self.bar.set_message(status_line(counters, &self.licenses));
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

fn status_line(counters: &Counters, licenses: &LicensePair) -> String {
    let last = counters
        .last_file
        .as_ref()
        .and_then(|path| path.file_name())
        .map_or_else(|| "N/A".to_string(), |name| name.to_string_lossy().into_owned());
    format!(
        "Processed: {}/{} | {}: {} | {}: {} | Last: {}",
        counters.completed(),
        counters.total,
        licenses.id(LicenseChoice::Before),
        counters.before_license,
        licenses.id(LicenseChoice::After),
        counters.after_license,
        last
    )
}

/// Final outcome of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counters: Counters,
    pub licenses: LicensePair,
    /// The first warnings collected, in completion order
    pub warnings: Vec<String>,
    pub omitted_warnings: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counters;
        writeln!(f, "Total files: {}", c.total)?;
        writeln!(f, "Updated: {}", c.updated)?;
        writeln!(
            f,
            "Skipped: {} (unsupported: {}, existing header: {}, unchanged: {})",
            c.skipped(),
            c.skipped_unsupported,
            c.skipped_has_header,
            c.skipped_no_change
        )?;
        writeln!(f, "Errors: {}", c.errors)?;
        writeln!(f, "{} licenses: {}", self.licenses.before, c.before_license)?;
        write!(f, "{} licenses: {}", self.licenses.after, c.after_license)?;

        if !self.warnings.is_empty() {
            write!(f, "\n\nWarnings/Errors:")?;
            for warning in &self.warnings {
                write!(f, "\n - {}", warning)?;
            }
            if self.omitted_warnings > 0 {
                write!(f, "\n - ... and {} more", self.omitted_warnings)?;
            }
        }
        Ok(())
    }
}
