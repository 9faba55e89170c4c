// src/header.rs

use crate::model::*;

pub const COPYRIGHT_TAG: &str = "SPDX-FileCopyrightText:";
pub const LICENSE_TAG: &str = "SPDX-License-Identifier:";

/// How far into a file the license marker pre-check looks, in characters
pub const PRECHECK_CHARS: usize = 1000;

const LICENSE_MARKER: &str = "SPDX-License-Identifier";

/// Fast pre-check: does a license tag appear anywhere near the top of the file?
/// Does not care whether the surrounding header is in a shape `parse` accepts.
pub fn has_license_marker(content: &str) -> bool {
    let end = content
        .char_indices()
        .nth(PRECHECK_CHARS)
        .map_or(content.len(), |(idx, _)| idx);
    content[..end].contains(LICENSE_MARKER)
}

enum HeaderLine<'a> {
    Copyright { year: i32, identity: &'a str },
    Separator,
    License(&'a str),
}

fn classify_line<'a>(line: &'a str, prefix: &str) -> Option<HeaderLine<'a>> {
    let line = line.trim_end();
    if line == prefix {
        return Some(HeaderLine::Separator);
    }

    let body = line.strip_prefix(prefix)?.strip_prefix(' ')?;
    if let Some(rest) = body.strip_prefix(COPYRIGHT_TAG) {
        let rest = rest.trim_start();
        let digits = rest.get(..4)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let identity = &rest[4..];
        // "20245 ..." is not a year followed by an identity
        if !identity.is_empty() && !identity.starts_with(char::is_whitespace) {
            return None;
        }
        let year = digits.parse().ok()?;
        return Some(HeaderLine::Copyright { year, identity: identity.trim() });
    }
    if let Some(id) = body.strip_prefix(LICENSE_TAG) {
        let id = id.trim();
        return (!id.is_empty()).then_some(HeaderLine::License(id));
    }
    None
}

/// Scans the top of `content` for an existing header.
///
/// Scanning stops at the first line that is not a copyright line, a bare
/// separator or a license tag. A blank line directly after the license tag
/// is consumed as the header terminator; any other blank line ends the scan.
/// Comment styles with a closing token are never parsed.
pub fn parse(content: &str, syntax: CommentSyntax) -> ParsedHeader {
    let mut parsed = ParsedHeader::default();
    if syntax.suffix.is_some() {
        return parsed;
    }

    let mut after_license = false;
    for line in content.lines() {
        if line.trim().is_empty() {
            if after_license {
                parsed.consumed_lines += 1;
            }
            break;
        }

        after_license = false;
        match classify_line(line, syntax.prefix) {
            Some(HeaderLine::Copyright { year, identity }) => {
                add_contributor(&mut parsed.contributors, identity, YearSpan::single(year));
            }
            Some(HeaderLine::Separator) => {}
            Some(HeaderLine::License(id)) => {
                parsed.license = Some(id.to_string());
                after_license = true;
            }
            None => break,
        }
        parsed.consumed_lines += 1;
    }

    parsed
}

/// Line ending used by the first line of `content`; LF when there is none
pub fn line_ending(content: &str) -> &'static str {
    match content.find('\n') {
        Some(idx) if content[..idx].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Returns what follows the first `consumed` lines of `content`
pub fn body_after(content: &str, consumed: usize) -> &str {
    let offset: usize = content
        .split_inclusive('\n')
        .take(consumed)
        .map(str::len)
        .sum();
    &content[offset..]
}

fn comment_line(syntax: CommentSyntax, body: &str) -> String {
    match syntax.suffix {
        Some(suffix) => format!("{} {} {}", syntax.prefix, body, suffix),
        None => format!("{} {}", syntax.prefix, body),
    }
}

/// Builds the canonical header: one copyright line per contributor (sorted by
/// identity, latest year only), a bare separator, the license tag and a blank
/// line. Output depends only on the inputs.
pub fn synthesize(contributors: &ContributorSet, license: &str, syntax: CommentSyntax) -> HeaderBlock {
    let mut lines = Vec::with_capacity(contributors.len() + 3);
    let mut written = ContributorSet::new();

    for (identity, span) in contributors {
        lines.push(comment_line(syntax, &format!("{} {} {}", COPYRIGHT_TAG, span.last, identity)));
        written.insert(identity.clone(), YearSpan::single(span.last));
    }

    lines.push(match syntax.suffix {
        Some(suffix) => format!("{} {}", syntax.prefix, suffix),
        None => syntax.prefix.to_string(),
    });
    lines.push(comment_line(syntax, &format!("{} {}", LICENSE_TAG, license)));
    lines.push(String::new());

    HeaderBlock {
        lines,
        license: Some(license.to_string()),
        contributors: written,
    }
}
