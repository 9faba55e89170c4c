// src/processor.rs

use crate::error::ProcessError;
use crate::header;
use crate::history::HistoryProvider;
use crate::license::{self, LicensePair};
use crate::model::*;
use crate::syntax;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Settings shared by every processing unit in a run
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Work tree root; file paths are resolved against it
    pub root: PathBuf,
    pub licenses: LicensePair,
    pub operator: Option<OperatorIdentity>,
    /// Year stamped on fallback attributions
    pub current_year: i32,
    /// Decide outcomes without touching any file
    pub dry_run: bool,
}

pub struct FileProcessor<'a> {
    config: &'a ProcessorConfig,
    history: &'a dyn HistoryProvider,
    cutoff: Timestamp,
}

impl<'a> FileProcessor<'a> {
    pub fn new(config: &'a ProcessorConfig, history: &'a dyn HistoryProvider, cutoff: Timestamp) -> Self {
        Self { config, history, cutoff }
    }

    /// Processes one file. Never fails: errors come back as `Outcome::Error`.
    pub fn process(&self, path: &Path) -> FileReport {
        let mut warnings = Vec::new();
        let outcome = match self.try_process(path, &mut warnings) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to process file");
                Outcome::Error(err.to_string())
            }
        };
        debug!(path = %path.display(), ?outcome, "processed");
        FileReport { outcome, warnings }
    }

    fn try_process(&self, path: &Path, warnings: &mut Vec<String>) -> Result<Outcome, ProcessError> {
        let Some(syntax) = syntax::for_path(path) else {
            return Ok(Outcome::Skipped(SkipReason::Unsupported));
        };

        let full_path = self.config.root.join(path);
        let bytes = fs::read(&full_path).map_err(|source| ProcessError::Read {
            path: full_path.clone(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|err| ProcessError::Decode {
            path: full_path.clone(),
            source: err.utf8_error(),
        })?;

        if header::has_license_marker(&content) {
            return Ok(Outcome::Skipped(SkipReason::HasHeader));
        }

        // Copyright lines left without a license tag get folded into the new header
        let existing = header::parse(&content, syntax);
        let mut contributors = self.gather_contributors(path, warnings);
        let body = if existing.is_empty() {
            content.as_str()
        } else {
            for (identity, span) in &existing.contributors {
                add_contributor(&mut contributors, identity, *span);
            }
            header::body_after(&content, existing.consumed_lines)
        };

        let last_change = match self.history.resolve_last_change_timestamp(path) {
            Ok(timestamp) => Some(timestamp),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "last change unknown");
                None
            }
        };
        let choice = license::classify(last_change, Some(self.cutoff));

        let block = header::synthesize(&contributors, self.config.licenses.id(choice), syntax);
        let updated = format!("{}{}", block.render(header::line_ending(&content)), body);
        if updated == content {
            return Ok(Outcome::Skipped(SkipReason::NoChange));
        }

        if !self.config.dry_run {
            write_atomically(&full_path, &updated)?;
        }
        Ok(Outcome::Updated(choice))
    }

    fn gather_contributors(&self, path: &Path, warnings: &mut Vec<String>) -> ContributorSet {
        let reason = match self.history.list_contributors(path) {
            Ok(contributors) if !contributors.is_empty() => return contributors,
            Ok(_) => "no recorded contributors".to_string(),
            Err(err) => err.to_string(),
        };

        let message = format!("Could not get authors for {}: {}", path.display(), reason);
        warn!("{}", message);
        warnings.push(message);

        let mut fallback = ContributorSet::new();
        if let Some(operator) = &self.config.operator {
            add_contributor(
                &mut fallback,
                &operator.identity(),
                YearSpan::single(self.config.current_year),
            );
        }
        fallback
    }
}

/// Replaces `path` via a temp file in the same directory, keeping permissions
fn write_atomically(path: &Path, content: &str) -> Result<(), ProcessError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let write = || -> std::io::Result<()> {
        let permissions = fs::metadata(path)?.permissions();
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.as_file().set_permissions(permissions)?;
        tmp.persist(path).map_err(|err| err.error)?;
        Ok(())
    };

    write().map_err(|source| ProcessError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::fake::FakeHistory;
    use tempfile::TempDir;

    const CUTOFF: Timestamp = 1_000;
    const JANE: &str = "Jane Doe <jane@x.com>";

    fn config(root: &Path) -> ProcessorConfig {
        ProcessorConfig {
            root: root.to_path_buf(),
            licenses: LicensePair {
                before: "WTFPL".to_string(),
                after: "AGPL-3.0-or-later".to_string(),
            },
            operator: Some(OperatorIdentity {
                name: "Op Erator".to_string(),
                email: "op@example.com".to_string(),
            }),
            current_year: 2026,
            dry_run: false,
        }
    }

    fn write(dir: &TempDir, name: &str, content: &[u8]) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn prepends_header_to_file_changed_after_cutoff() {
        let dir = TempDir::new().unwrap();
        write(&dir, "main.rs", b"fn main() {}\n");
        let history = FakeHistory::default().file("main.rs", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("main.rs"));

        assert_eq!(report.outcome, Outcome::Updated(LicenseChoice::After));
        assert!(report.warnings.is_empty());
        assert_eq!(
            read(&dir, "main.rs"),
            "// SPDX-FileCopyrightText: 2024 Jane Doe <jane@x.com>\n\
             //\n\
             // SPDX-License-Identifier: AGPL-3.0-or-later\n\
             \n\
             fn main() {}\n"
        );
    }

    #[test]
    fn file_changed_before_cutoff_gets_before_license() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Cargo.toml", b"[package]\n");
        let history = FakeHistory::default().file("Cargo.toml", JANE, 2020, CUTOFF);
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("Cargo.toml"));

        assert_eq!(report.outcome, Outcome::Updated(LicenseChoice::Before));
        assert!(read(&dir, "Cargo.toml").starts_with("# SPDX-FileCopyrightText: 2020 Jane Doe <jane@x.com>\n#\n# SPDX-License-Identifier: WTFPL\n\n[package]"));
    }

    #[test]
    fn unknown_last_change_falls_back_to_after_license() {
        let dir = TempDir::new().unwrap();
        write(&dir, "lib.rs", b"pub fn f() {}\n");
        let mut history = FakeHistory::default().file("lib.rs", JANE, 2019, 0);
        history.last_change.clear();
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, i64::MAX).process(Path::new("lib.rs"));

        assert_eq!(report.outcome, Outcome::Updated(LicenseChoice::After));
        assert!(read(&dir, "lib.rs").contains("// SPDX-License-Identifier: AGPL-3.0-or-later\n"));
    }

    #[test]
    fn existing_license_marker_skips_file() {
        let dir = TempDir::new().unwrap();
        let original = "# Title\n\n<!-- SPDX-License-Identifier: MIT -->\n";
        write(&dir, "README.md", original.as_bytes());
        let history = FakeHistory::default().file("README.md", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("README.md"));

        assert_eq!(report.outcome, Outcome::Skipped(SkipReason::HasHeader));
        assert_eq!(read(&dir, "README.md"), original);
    }

    #[test]
    fn unsupported_extension_never_touches_the_file_system() {
        let dir = TempDir::new().unwrap();
        let history = FakeHistory::default();
        let config = config(dir.path());

        // notes.txt does not exist; any read attempt would surface as an error
        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("notes.txt"));
        assert_eq!(report.outcome, Outcome::Skipped(SkipReason::Unsupported));
    }

    #[test]
    fn second_run_detects_its_own_header() {
        let dir = TempDir::new().unwrap();
        write(&dir, "deploy.sh", b"#!/bin/sh\necho hi\n");
        let history = FakeHistory::default().file("deploy.sh", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());
        let processor = FileProcessor::new(&config, &history, CUTOFF);

        assert_eq!(
            processor.process(Path::new("deploy.sh")).outcome,
            Outcome::Updated(LicenseChoice::After)
        );
        let after_first = read(&dir, "deploy.sh");

        assert_eq!(
            processor.process(Path::new("deploy.sh")).outcome,
            Outcome::Skipped(SkipReason::HasHeader)
        );
        assert_eq!(read(&dir, "deploy.sh"), after_first);
    }

    #[test]
    fn history_failure_falls_back_to_operator_identity() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ci.yml", b"on: push\n");
        let mut history = FakeHistory::default().file("ci.yml", JANE, 2024, CUTOFF + 1);
        history.failing.insert(PathBuf::from("ci.yml"));
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("ci.yml"));

        assert_eq!(report.outcome, Outcome::Updated(LicenseChoice::After));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("ci.yml"));
        assert!(read(&dir, "ci.yml").starts_with("# SPDX-FileCopyrightText: 2026 Op Erator <op@example.com>\n#\n"));
    }

    #[test]
    fn no_identity_at_all_still_writes_a_header() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.rs", b"fn a() {}\n");
        let history = FakeHistory::default();
        let mut config = config(dir.path());
        config.operator = None;

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("a.rs"));

        assert_eq!(report.outcome, Outcome::Updated(LicenseChoice::After));
        assert_eq!(
            read(&dir, "a.rs"),
            "//\n// SPDX-License-Identifier: AGPL-3.0-or-later\n\nfn a() {}\n"
        );
    }

    #[test]
    fn undecodable_content_is_an_error_and_left_alone() {
        let dir = TempDir::new().unwrap();
        write(&dir, "bad.rs", &[0x66, 0x6e, 0xff, 0xfe, 0x0a]);
        let history = FakeHistory::default().file("bad.rs", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("bad.rs"));

        assert!(matches!(report.outcome, Outcome::Error(ref reason) if reason.contains("UTF-8")));
        assert_eq!(fs::read(dir.path().join("bad.rs")).unwrap(), vec![0x66, 0x6e, 0xff, 0xfe, 0x0a]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let history = FakeHistory::default();
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("gone.rs"));
        assert!(matches!(report.outcome, Outcome::Error(ref reason) if reason.contains("gone.rs")));
    }

    #[test]
    fn partial_header_is_merged_not_duplicated() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "old.rs",
            b"// SPDX-FileCopyrightText: 2020 Old Timer <old@x.com>\n// SPDX-FileCopyrightText: 2021 Jane Doe <jane@x.com>\nfn old() {}\n",
        );
        let history = FakeHistory::default().file("old.rs", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("old.rs"));

        assert_eq!(report.outcome, Outcome::Updated(LicenseChoice::After));
        assert_eq!(
            read(&dir, "old.rs"),
            "// SPDX-FileCopyrightText: 2024 Jane Doe <jane@x.com>\n\
             // SPDX-FileCopyrightText: 2020 Old Timer <old@x.com>\n\
             //\n\
             // SPDX-License-Identifier: AGPL-3.0-or-later\n\
             \n\
             fn old() {}\n"
        );
    }

    #[test]
    fn leading_bare_comment_is_kept() {
        let dir = TempDir::new().unwrap();
        write(&dir, "c.rs", b"//\n// notes\nfn c() {}\n");
        let history = FakeHistory::default().file("c.rs", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());

        FileProcessor::new(&config, &history, CUTOFF).process(Path::new("c.rs"));
        assert!(read(&dir, "c.rs").ends_with("\n\n//\n// notes\nfn c() {}\n"));
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let dir = TempDir::new().unwrap();
        write(&dir, "main.rs", b"fn main() {}\n");
        let history = FakeHistory::default().file("main.rs", JANE, 2024, CUTOFF + 1);
        let mut config = config(dir.path());
        config.dry_run = true;

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("main.rs"));

        assert_eq!(report.outcome, Outcome::Updated(LicenseChoice::After));
        assert_eq!(read(&dir, "main.rs"), "fn main() {}\n");
    }

    #[test]
    fn markdown_header_is_closed_and_detected_on_rerun() {
        let dir = TempDir::new().unwrap();
        write(&dir, "README.md", b"# Project\n\nSome text.\n");
        let history = FakeHistory::default().file("README.md", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());
        let processor = FileProcessor::new(&config, &history, CUTOFF);

        assert_eq!(
            processor.process(Path::new("README.md")).outcome,
            Outcome::Updated(LicenseChoice::After)
        );
        let after_first = read(&dir, "README.md");
        assert_eq!(
            after_first,
            "<!-- SPDX-FileCopyrightText: 2024 Jane Doe <jane@x.com> -->\n\
             <!-- -->\n\
             <!-- SPDX-License-Identifier: AGPL-3.0-or-later -->\n\
             \n\
             # Project\n\nSome text.\n"
        );

        assert_eq!(
            processor.process(Path::new("README.md")).outcome,
            Outcome::Skipped(SkipReason::HasHeader)
        );
        assert_eq!(read(&dir, "README.md"), after_first);
    }

    #[test]
    fn crlf_file_gets_crlf_header() {
        let dir = TempDir::new().unwrap();
        write(&dir, "win.toml", b"[package]\r\nname = \"w\"\r\n");
        let history = FakeHistory::default().file("win.toml", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());

        let report = FileProcessor::new(&config, &history, CUTOFF).process(Path::new("win.toml"));

        assert_eq!(report.outcome, Outcome::Updated(LicenseChoice::After));
        let content = read(&dir, "win.toml");
        assert_eq!(
            content,
            "# SPDX-FileCopyrightText: 2024 Jane Doe <jane@x.com>\r\n\
             #\r\n\
             # SPDX-License-Identifier: AGPL-3.0-or-later\r\n\
             \r\n\
             [package]\r\nname = \"w\"\r\n"
        );
        assert_eq!(content.matches('\n').count(), content.matches("\r\n").count());
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        write(&dir, "run.sh", b"#!/bin/sh\n");
        let path = dir.path().join("run.sh");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        let history = FakeHistory::default().file("run.sh", JANE, 2024, CUTOFF + 1);
        let config = config(dir.path());

        FileProcessor::new(&config, &history, CUTOFF).process(Path::new("run.sh"));

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
