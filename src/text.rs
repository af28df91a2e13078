//! Issue text pipeline: clean → split → refine → normalize.
//!
//! Every function here is pure. A process cell goes through
//! [`extract_problems`] to become zero or more issue descriptions, and each
//! composed `"{process}：{item}"` line is finished by [`normalize_statement`].

#![allow(clippy::non_std_lazy_statics)]

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    /// Numbering marker: anchor, digits, marker char, optional whitespace.
    /// The "next char is not a digit" lookahead is checked in [`find_markers`].
    static ref MARKER_RE: Regex = Regex::new(r"(?:^|[\s；;。])(\d+[.、)）])(\s*)").unwrap();
    static ref LEADING_DIGIT_RE: Regex = Regex::new(r"^\d").unwrap();
    static ref NUMBER_PREFIX_RE: Regex = Regex::new(r"^\d+[.、)）]\s*").unwrap();
    static ref PURE_NUMBER_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref LEADING_REMNANT_RE: Regex = Regex::new(r"^[\d\s.、)）]+").unwrap();
    static ref TRAILING_REMNANT_RE: Regex = Regex::new(r"[\s.。]+$").unwrap();
    static ref DOT_NUMBER_COLON_RE: Regex = Regex::new(r"：?\.\d+：").unwrap();
}

/// Items of this many characters or fewer are treated as noise.
const MIN_ITEM_CHARS: usize = 2;

/// Returns `true` for cells that carry no issue text.
pub fn is_blank_cell(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

/// Flattens line breaks and collapses whitespace runs to a single space.
pub fn clean_text(raw: &str) -> String {
    let flat = raw.replace("\r\n", " ").replace(['\r', '\n'], " ");
    WHITESPACE_RE.replace_all(&flat, " ").trim().to_string()
}

/// A numbering marker found in cleaned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    /// Start of the match, including the anchor character.
    start: usize,
    /// Start of the digits.
    body_start: usize,
}

/// Finds numbering markers such as `1.`, `2、`, `3)` or `4）`.
///
/// A marker must sit at the start of the text or after whitespace / `；;。`,
/// and must be followed by a non-digit so that `1.5米` or `S11` never count.
/// When the marker is followed by whitespace and then a digit, the trailing
/// whitespace satisfies the non-digit condition, matching how a backtracking
/// lookahead would resolve it.
fn find_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(caps) = MARKER_RE.captures_at(text, pos) else {
            break;
        };
        let (Some(whole), Some(body), Some(spaces)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            break;
        };

        let mut end = whole.end();
        let rest = &text[end..];
        let accepted = if !rest.is_empty() && !LEADING_DIGIT_RE.is_match(rest) {
            true
        } else if let Some(last) = spaces.as_str().chars().last() {
            end -= last.len_utf8();
            true
        } else {
            false
        };

        if accepted {
            markers.push(Marker {
                start: whole.start(),
                body_start: body.start(),
            });
            pos = end;
        } else {
            let step = text[whole.start()..].chars().next().map_or(1, char::len_utf8);
            pos = whole.start() + step;
        }
    }

    markers
}

/// Trims a split segment and drops its numbering prefix.
///
/// Returns `None` for segments that end up empty or purely numeric.
fn strip_segment(segment: &str) -> Option<String> {
    let trimmed = segment.trim();
    let item = NUMBER_PREFIX_RE.replace(trimmed, "");
    if item.is_empty() || PURE_NUMBER_RE.is_match(&item) {
        None
    } else {
        Some(item.into_owned())
    }
}

/// Splits cleaned text into numbered sub-items.
///
/// With fewer than two markers the whole (trimmed) text is the only item.
/// Otherwise the text is cut before every marker except the first, so any
/// text ahead of the first marker stays attached to item 1. The anchor
/// separator of a marker is dropped from both neighbouring items.
pub fn split_numbered_items(text: &str) -> Vec<String> {
    let whole = text.trim();
    if whole.is_empty() {
        return Vec::new();
    }

    let markers = find_markers(text);
    if markers.len() < 2 {
        return vec![whole.to_string()];
    }

    let mut items = Vec::new();
    let mut last = 0;
    for marker in &markers[1..] {
        items.extend(strip_segment(&text[last..marker.start]));
        last = marker.body_start;
    }
    items.extend(strip_segment(&text[last..]));

    if items.is_empty() {
        vec![whole.to_string()]
    } else {
        items
    }
}

/// Strips numbering/bullet remnants and trailing punctuation from one item.
///
/// Returns `None` when the remainder is too short to be a real issue.
pub fn refine_item(item: &str) -> Option<String> {
    let item = LEADING_REMNANT_RE.replace(item.trim(), "");
    let item = TRAILING_REMNANT_RE.replace(&item, "");
    if item.chars().count() > MIN_ITEM_CHARS {
        Some(item.into_owned())
    } else {
        None
    }
}

/// Turns one raw process cell into its issue descriptions.
///
/// Blank and `null` cells give nothing. A cell with content always gives at
/// least one item: if refinement filters everything out, the cleaned cell
/// text is returned whole.
pub fn extract_problems(raw: &str) -> Vec<String> {
    if is_blank_cell(raw) {
        return Vec::new();
    }

    let text = clean_text(raw);
    if text.is_empty() {
        return Vec::new();
    }

    let items: Vec<String> = split_numbered_items(&text)
        .iter()
        .filter_map(|item| refine_item(item))
        .collect();

    if items.is_empty() {
        vec![text]
    } else {
        items
    }
}

/// Final pass over a composed `"{process}：{item}"` line.
///
/// `.1：`-style suffixes (with or without a colon in front) collapse to a
/// single `：`, and literal `null` fragments are removed.
pub fn normalize_statement(line: &str) -> String {
    DOT_NUMBER_COLON_RE.replace_all(line, "：").replace("null", "")
}
