// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to repository history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("repository at {0} has no work tree")]
    Bare(PathBuf),

    #[error("no commit touches {0}")]
    NoHistory(PathBuf),
}

/// Failures confined to a single file. These become `Outcome::Error` and never
/// stop the run.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures that abort the whole run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not resolve cutoff commit {commit}: {source}")]
    CutoffUnresolved {
        commit: String,
        #[source]
        source: HistoryError,
    },

    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
