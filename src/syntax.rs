// src/syntax.rs

use crate::model::CommentSyntax;
use std::path::Path;

const LINE_SLASH: CommentSyntax = CommentSyntax { prefix: "//", suffix: None };
const LINE_HASH: CommentSyntax = CommentSyntax { prefix: "#", suffix: None };
const HTML: CommentSyntax = CommentSyntax { prefix: "<!--", suffix: Some("-->") };

/// Looks up the comment syntax for a path by its (case-insensitive) extension.
/// JSON and lock files have no comment syntax and are left alone.
pub fn for_path(path: &Path) -> Option<CommentSyntax> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "rs" => Some(LINE_SLASH),
        "toml" | "sh" | "yml" | "yaml" => Some(LINE_HASH),
        "md" => Some(HTML),
        _ => None,
    }
}
