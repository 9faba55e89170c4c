// src/model.rs

use std::collections::BTreeMap;

/// Seconds since the Unix epoch, as reported by git
pub type Timestamp = i64;

/// Earliest and latest year a contributor is recorded for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSpan {
    pub first: i32,
    pub last: i32,
}

impl YearSpan {
    pub fn single(year: i32) -> Self {
        Self { first: year, last: year }
    }

    pub fn merge(self, other: YearSpan) -> Self {
        Self {
            first: self.first.min(other.first),
            last: self.last.max(other.last),
        }
    }
}

/// Maps an identity ("Name <email>") to its years. Ordered by identity, which
/// is also the order copyright lines are written in.
pub type ContributorSet = BTreeMap<String, YearSpan>;

/// Adds `identity` to the set, widening the span if it is already present
pub fn add_contributor(set: &mut ContributorSet, identity: &str, span: YearSpan) {
    set.entry(identity.to_string())
        .and_modify(|existing| *existing = existing.merge(span))
        .or_insert(span);
}

/// How a comment is opened (and optionally closed) for a file category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub prefix: &'static str,
    pub suffix: Option<&'static str>,
}

/// A synthesized header, line by line. The last line is the blank separator
/// between the header and the original content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    pub lines: Vec<String>,
    pub license: Option<String>,
    pub contributors: ContributorSet,
}

impl HeaderBlock {
    /// Joins the lines with `eol`, which also terminates the last one
    pub fn render(&self, eol: &str) -> String {
        let mut out = self.lines.join(eol);
        out.push_str(eol);
        out
    }
}

/// Result of scanning the top of a file for an existing header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedHeader {
    pub contributors: ContributorSet,
    pub license: Option<String>,
    pub consumed_lines: usize,
}

impl ParsedHeader {
    /// True when nothing attributable was found. A run of bare separator
    /// lines alone does not count as a header.
    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty() && self.license.is_none()
    }
}

/// Fallback attribution used when history has nothing to say about a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorIdentity {
    pub name: String,
    pub email: String,
}

impl OperatorIdentity {
    pub fn identity(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

/// Which side of the cutoff a file's license falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseChoice {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unsupported,
    HasHeader,
    NoChange,
}

/// Terminal classification of one file's processing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Updated(LicenseChoice),
    Skipped(SkipReason),
    Error(String),
}

/// What a single processing unit hands back to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub outcome: Outcome,
    pub warnings: Vec<String>,
}
