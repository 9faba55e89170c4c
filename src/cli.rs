// src/cli.rs

use crate::license::LicensePair;
use crate::model::OperatorIdentity;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Adds SPDX copyright and license headers to tracked files", long_about = None)]
pub struct Args {
    /// Path to the git repository to update
    #[arg(short, long, default_value = ".")]
    pub repo: PathBuf,

    /// Commit separating the two licenses. Files last changed after it get --license-after
    #[arg(long, env = "REUSE_CUTOFF_COMMIT")]
    pub cutoff: String,

    /// License for files last changed at or before the cutoff commit
    #[arg(long, default_value = "WTFPL")]
    pub license_before: String,

    /// License for files last changed after the cutoff commit, or with unknown history
    #[arg(long, default_value = "AGPL-3.0-or-later")]
    pub license_after: String,

    /// Pathspec patterns selecting tracked files (repeatable)
    #[arg(
        short,
        long = "pattern",
        default_values = ["*.rs", "*.toml", "*.md", "*.sh", "*.yml", "*.yaml", "*.json"]
    )]
    pub patterns: Vec<String>,

    /// Number of worker threads (defaults to available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Fallback author name when history has no contributors (defaults to git's user.name)
    #[arg(long, env = "REUSE_AUTHOR_NAME", requires = "author_email")]
    pub author_name: Option<String>,

    /// Fallback author email when history has no contributors (defaults to git's user.email)
    #[arg(long, env = "REUSE_AUTHOR_EMAIL", requires = "author_name")]
    pub author_email: Option<String>,

    /// Report what would change without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn licenses(&self) -> LicensePair {
        LicensePair {
            before: self.license_before.clone(),
            after: self.license_after.clone(),
        }
    }

    pub fn operator(&self) -> Option<OperatorIdentity> {
        match (&self.author_name, &self.author_email) {
            (Some(name), Some(email)) => Some(OperatorIdentity {
                name: name.clone(),
                email: email.clone(),
            }),
            _ => None,
        }
    }
}
