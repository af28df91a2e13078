//! File naming for generated documents and template copies.

#![allow(clippy::non_std_lazy_statics)]

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ILLEGAL_CHARS_RE: Regex = Regex::new(r#"[\\/*?:"<>|]"#).unwrap();
}

/// Characters replaced in template copy names.
const COPY_INVALID_CHARS: &str = r#"<>:"/\|?*"#;

/// Removes characters that are illegal in file names, trims, and keeps at
/// most `max_chars` characters.
pub fn sanitize_component(text: &str, max_chars: usize) -> String {
    ILLEGAL_CHARS_RE
        .replace_all(text, "")
        .trim()
        .chars()
        .take(max_chars)
        .collect()
}

/// Replaces characters that are illegal in file names with `_`.
pub fn replace_invalid_chars(text: &str) -> String {
    text.chars()
        .map(|c| if COPY_INVALID_CHARS.contains(c) { '_' } else { c })
        .collect()
}

/// File name of a generated rectification document.
pub fn document_file_name(
    prefix: &str,
    application_id: &str,
    account_name: &str,
    max_chars: usize,
) -> String {
    format!(
        "{prefix}-{}-{}.txt",
        sanitize_component(application_id, max_chars),
        sanitize_component(account_name, max_chars)
    )
}

/// File name of a per-case template copy.
pub fn copy_file_name(prefix: &str, first: &str, second: &str, extension: &str) -> String {
    let stem = format!(
        "{prefix}-{}-{}",
        replace_invalid_chars(first),
        replace_invalid_chars(second)
    );
    if extension.is_empty() {
        stem
    } else {
        format!("{stem}.{extension}")
    }
}

/// Appends `-{n}` before the extension of `file_name`.
pub fn with_suffix(file_name: &str, n: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{file_name}-{n}"),
    }
}
