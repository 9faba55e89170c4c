// src/orchestrator.rs

use crate::error::RunError;
use crate::history::HistoryProvider;
use crate::license::LicensePair;
use crate::model::*;
use crate::processor::{FileProcessor, ProcessorConfig};
use crate::report::{ProgressReporter, RunSummary};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::info;

/// How often the reporter samples the aggregate while workers drain
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Warnings listed individually in the summary; the rest are only counted
pub const MAX_REPORTED_WARNINGS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    Enumerating,
    Dispatching,
    Draining,
    Complete,
}

/// Counter snapshot handed to the reporter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: usize,
    pub updated: usize,
    pub skipped_unsupported: usize,
    pub skipped_has_header: usize,
    pub skipped_no_change: usize,
    pub errors: usize,
    pub before_license: usize,
    pub after_license: usize,
    pub last_file: Option<PathBuf>,
    pub last_license: Option<LicenseChoice>,
}

impl Counters {
    pub fn skipped(&self) -> usize {
        self.skipped_unsupported + self.skipped_has_header + self.skipped_no_change
    }

    pub fn completed(&self) -> usize {
        self.updated + self.skipped() + self.errors
    }
}

#[derive(Default)]
struct AggregateState {
    counters: Counters,
    warnings: Vec<String>,
}

/// Shared run state. All mutation goes through one mutex.
#[derive(Default)]
pub struct RunAggregate {
    state: Mutex<AggregateState>,
}

impl RunAggregate {
    pub fn new(total: usize) -> Self {
        let aggregate = Self::default();
        aggregate.lock().counters.total = total;
        aggregate
    }

    // Counters stay consistent even if a holder panicked; keep going.
    fn lock(&self) -> MutexGuard<'_, AggregateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Folds one unit's report into the totals
    pub fn record(&self, path: &Path, report: FileReport) {
        let mut state = self.lock();
        let counters = &mut state.counters;
        match &report.outcome {
            Outcome::Updated(choice) => {
                counters.updated += 1;
                match choice {
                    LicenseChoice::Before => counters.before_license += 1,
                    LicenseChoice::After => counters.after_license += 1,
                }
                counters.last_license = Some(*choice);
            }
            Outcome::Skipped(SkipReason::Unsupported) => counters.skipped_unsupported += 1,
            Outcome::Skipped(SkipReason::HasHeader) => counters.skipped_has_header += 1,
            Outcome::Skipped(SkipReason::NoChange) => counters.skipped_no_change += 1,
            Outcome::Error(_) => counters.errors += 1,
        }
        counters.last_file = Some(path.to_path_buf());

        state.warnings.extend(report.warnings);
        if let Outcome::Error(reason) = report.outcome {
            state
                .warnings
                .push(format!("Error processing {}: {}", path.display(), reason));
        }
    }

    pub fn counters(&self) -> Counters {
        self.lock().counters.clone()
    }

    pub fn summary(&self, licenses: &LicensePair) -> RunSummary {
        let state = self.lock();
        let shown = state.warnings.len().min(MAX_REPORTED_WARNINGS);
        RunSummary {
            counters: state.counters.clone(),
            licenses: licenses.clone(),
            warnings: state.warnings[..shown].to_vec(),
            omitted_warnings: state.warnings.len() - shown,
        }
    }
}

/// Runs the file processor over a batch of files on a worker pool
pub struct Orchestrator {
    history: Arc<dyn HistoryProvider>,
    config: ProcessorConfig,
    cutoff_commit: String,
    jobs: Option<usize>,
    phase: Mutex<RunPhase>,
}

impl Orchestrator {
    pub fn new(
        history: Arc<dyn HistoryProvider>,
        config: ProcessorConfig,
        cutoff_commit: String,
        jobs: Option<usize>,
    ) -> Self {
        Self {
            history,
            config,
            cutoff_commit,
            jobs,
            phase: Mutex::new(RunPhase::NotStarted),
        }
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: RunPhase) {
        info!(?phase, "run phase");
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Processes every file exactly once. Only an unresolvable cutoff commit
    /// (or a worker pool that cannot start) fails the run.
    pub fn run(&self, files: &[PathBuf], reporter: &ProgressReporter) -> Result<RunSummary, RunError> {
        self.set_phase(RunPhase::Enumerating);
        let cutoff = self
            .history
            .resolve_commit_timestamp(&self.cutoff_commit)
            .map_err(|source| RunError::CutoffUnresolved {
                commit: self.cutoff_commit.clone(),
                source,
            })?;
        info!(commit = %self.cutoff_commit, cutoff, "resolved cutoff commit");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs.unwrap_or(0))
            .build()?;
        let aggregate = RunAggregate::new(files.len());
        let processor = FileProcessor::new(&self.config, self.history.as_ref(), cutoff);
        let done = AtomicBool::new(false);

        self.set_phase(RunPhase::Dispatching);
        thread::scope(|scope| {
            scope.spawn(|| {
                pool.install(|| {
                    files.par_iter().for_each(|path| {
                        let report = panic::catch_unwind(AssertUnwindSafe(|| processor.process(path)))
                            .unwrap_or_else(|_| FileReport {
                                outcome: Outcome::Error("processing panicked".to_string()),
                                warnings: Vec::new(),
                            });
                        aggregate.record(path, report);
                    });
                });
                done.store(true, Ordering::Release);
            });

            self.set_phase(RunPhase::Draining);
            while !done.load(Ordering::Acquire) {
                reporter.render(&aggregate.counters());
                thread::sleep(POLL_INTERVAL);
            }
        });

        reporter.render(&aggregate.counters());
        reporter.finish();
        self.set_phase(RunPhase::Complete);
        Ok(aggregate.summary(&self.config.licenses))
    }
}
