// src/history.rs

use crate::error::HistoryError;
use crate::model::*;
use chrono::{Datelike, TimeZone, Utc};
use git2::{Commit, Delta, DiffFindOptions, DiffOptions, Oid, Pathspec, PathspecFlags, Repository, Tree};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read-only queries against repository history.
///
/// Paths are relative to the repository work tree. Implementations are shared
/// by every worker, so they must be `Send + Sync`.
pub trait HistoryProvider: Send + Sync {
    /// Everyone who authored a commit touching `path`
    fn list_contributors(&self, path: &Path) -> Result<ContributorSet, HistoryError>;

    /// Commit time of any revision git can resolve (hash, tag, branch)
    fn resolve_commit_timestamp(&self, commit: &str) -> Result<Timestamp, HistoryError>;

    /// Commit time of the newest commit touching `path`
    fn resolve_last_change_timestamp(&self, path: &Path) -> Result<Timestamp, HistoryError>;

    /// Tracked files matching any of `patterns`, in index order
    fn list_tracked_files(&self, patterns: &[String]) -> Result<Vec<PathBuf>, HistoryError>;
}

/// `HistoryProvider` backed by a git repository on disk.
///
/// `git2::Repository` is not `Sync`, so every query opens its own handle.
pub struct GitHistory {
    root: PathBuf,
}

impl GitHistory {
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        let repo = Repository::discover(path)?;
        let root = repo
            .workdir()
            .ok_or_else(|| HistoryError::Bare(repo.path().to_path_buf()))?
            .to_path_buf();
        Ok(Self { root })
    }

    pub fn workdir(&self) -> &Path {
        &self.root
    }

    /// `user.name` / `user.email` from the repository's git config
    pub fn operator_identity(&self) -> Option<OperatorIdentity> {
        let config = self.repo().ok()?.config().ok()?;
        let name = config.get_string("user.name").ok()?;
        let email = config.get_string("user.email").ok()?;
        Some(OperatorIdentity { name, email })
    }

    fn repo(&self) -> Result<Repository, HistoryError> {
        Ok(Repository::open(&self.root)?)
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Walks from HEAD, newest first, calling `visit` for each commit that
    /// changed `path`. Follows the file back across renames. Stops early when
    /// `visit` returns false.
    fn walk_file_commits(
        &self,
        path: &Path,
        mut visit: impl FnMut(&Commit) -> bool,
    ) -> Result<(), HistoryError> {
        let repo = self.repo()?;
        let mut path = self.relative(path).to_path_buf();

        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(git2::Sort::TIME)?;

        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            if !touches(&commit, &path)? {
                continue;
            }
            if !visit(&commit) {
                break;
            }
            if let Some(old_path) = renamed_from(&repo, &commit, &path)? {
                debug!(from = %old_path.display(), to = %path.display(), "following rename");
                path = old_path;
            }
        }
        Ok(())
    }
}

fn entry_id(tree: &Tree, path: &Path) -> Option<Oid> {
    tree.get_path(path).ok().map(|entry| entry.id())
}

/// A commit touches a path when the path exists in it and its blob differs
/// from every parent's. Merges that took one side unchanged do not count.
fn touches(commit: &Commit, path: &Path) -> Result<bool, git2::Error> {
    let Some(current) = entry_id(&commit.tree()?, path) else {
        return Ok(false);
    };
    for parent in commit.parents() {
        if entry_id(&parent.tree()?, path) == Some(current) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// If `commit` introduced `path` by renaming another file, returns the old path
fn renamed_from(repo: &Repository, commit: &Commit, path: &Path) -> Result<Option<PathBuf>, git2::Error> {
    if commit.parent_count() != 1 {
        return Ok(None);
    }
    let parent_tree = commit.parent(0)?.tree()?;
    if entry_id(&parent_tree, path).is_some() {
        return Ok(None);
    }

    let mut diff_opts = DiffOptions::new();
    diff_opts.include_untracked(false);
    diff_opts.ignore_filemode(true);
    let mut diff = repo.diff_tree_to_tree(Some(&parent_tree), Some(&commit.tree()?), Some(&mut diff_opts))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))?;

    let old_path = diff
        .deltas()
        .find(|delta| delta.status() == Delta::Renamed && delta.new_file().path() == Some(path))
        .and_then(|delta| delta.old_file().path().map(Path::to_path_buf));
    Ok(old_path)
}

fn commit_year(commit: &Commit) -> Option<i32> {
    Utc.timestamp_opt(commit.time().seconds(), 0)
        .single()
        .map(|time| time.year())
}

impl HistoryProvider for GitHistory {
    fn list_contributors(&self, path: &Path) -> Result<ContributorSet, HistoryError> {
        let mut contributors = ContributorSet::new();
        self.walk_file_commits(path, |commit| {
            let author = commit.author();
            let identity = format!(
                "{} <{}>",
                author.name().unwrap_or("Unknown"),
                author.email().unwrap_or("")
            );
            if let Some(year) = commit_year(commit) {
                add_contributor(&mut contributors, &identity, YearSpan::single(year));
            }
            true
        })?;
        Ok(contributors)
    }

    fn resolve_commit_timestamp(&self, commit: &str) -> Result<Timestamp, HistoryError> {
        let repo = self.repo()?;
        let commit = repo.revparse_single(commit)?.peel_to_commit()?;
        Ok(commit.time().seconds())
    }

    fn resolve_last_change_timestamp(&self, path: &Path) -> Result<Timestamp, HistoryError> {
        let mut newest = None;
        self.walk_file_commits(path, |commit| {
            newest = Some(commit.time().seconds());
            false
        })?;
        newest.ok_or_else(|| HistoryError::NoHistory(path.to_path_buf()))
    }

    fn list_tracked_files(&self, patterns: &[String]) -> Result<Vec<PathBuf>, HistoryError> {
        let repo = self.repo()?;
        let index = repo.index()?;
        let pathspec = Pathspec::new(patterns.iter().map(String::as_str))?;

        let mut files: Vec<PathBuf> = index
            .iter()
            .filter_map(|entry| String::from_utf8(entry.path).ok())
            .map(PathBuf::from)
            .filter(|path| pathspec.matches_path(path, PathspecFlags::DEFAULT))
            .collect();
        // Conflicted paths appear once per stage
        files.dedup();
        Ok(files)
    }
}
