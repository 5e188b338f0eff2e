//! Selector normalization and segmentation.
//!
//! Selectors are canonicalized once at parse time: whitespace runs collapse
//! to single spaces and top-level combinators get exactly one space on each
//! side. Everything downstream (hashing, parent extraction, id derivation)
//! works on the canonical text.

use crate::chars;
use crate::stylesheet_parser::scanner::DepthTracker;
use crate::util::sanitize_identifier;

/// One compound selector plus the combinator that connects it to the
/// preceding segment. `None` is the descendant combinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSegment {
    pub combinator: Option<char>,
    pub text: String,
}

/// Canonicalize selector text.
///
/// Combinators inside functional pseudo-classes (`:nth-child(2n+1)`) are at
/// non-zero depth and stay untouched.
pub fn normalize_selector(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = DepthTracker::new();
    let mut pending_space = false;

    for ch in raw.trim().chars() {
        if depth.in_string() {
            out.push(ch);
            depth.advance(ch);
            continue;
        }
        if chars::is_whitespace(ch) {
            pending_space = true;
            continue;
        }
        if chars::is_combinator(ch) && depth.at_top_level() {
            while out.ends_with(chars::SPACE) {
                out.pop();
            }
            if !out.is_empty() {
                out.push(chars::SPACE);
            }
            out.push(ch);
            pending_space = true;
            depth.advance(ch);
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(chars::SPACE);
        }
        pending_space = false;
        out.push(ch);
        depth.advance(ch);
    }
    out
}

/// Split a canonical selector into combinator-separated segments.
pub fn segment_selector(selector: &str) -> Vec<SelectorSegment> {
    let mut segments = Vec::new();
    let mut pending: Option<char> = None;

    for part in split_top_level_spaces(selector) {
        let mut part_chars = part.chars();
        if let (Some(first), None) = (part_chars.next(), part_chars.next()) {
            if chars::is_combinator(first) {
                pending = Some(first);
                continue;
            }
        }
        segments.push(SelectorSegment {
            combinator: pending.take(),
            text: part,
        });
    }
    segments
}

/// Drop the trailing segment and its leading combinator.
///
/// Returns `None` when the selector has a single segment (no enclosing
/// selector can be derived from it).
pub fn extract_parent_selector(selector: &str) -> Option<String> {
    let segments = segment_selector(selector);
    if segments.len() <= 1 {
        return None;
    }
    Some(join_segments(&segments[..segments.len() - 1]))
}

fn join_segments(segments: &[SelectorSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        if !out.is_empty() {
            match segment.combinator {
                Some(c) => {
                    out.push(chars::SPACE);
                    out.push(c);
                    out.push(chars::SPACE);
                }
                None => out.push(chars::SPACE),
            }
        }
        out.push_str(&segment.text);
    }
    out
}

/// Derive the identifier stem for a rule from its rightmost compound.
///
/// `.layout .panel` yields `panel`, `tr:nth-child(even)` yields `tr`,
/// `:root` yields `root`. Falls back to `rule` when nothing usable remains.
pub fn rightmost_compound_stem(selector: &str) -> String {
    let segments = segment_selector(selector);
    let last = match segments.last() {
        Some(segment) => segment.text.as_str(),
        None => return "rule".to_string(),
    };

    // Cut the compound at its first top-level pseudo colon.
    let mut depth = DepthTracker::new();
    let mut base_end = last.len();
    for (idx, ch) in last.char_indices() {
        if ch == chars::COLON && depth.at_top_level() && idx > 0 {
            base_end = idx;
            break;
        }
        depth.advance(ch);
    }
    let mut base = &last[..base_end];
    base = base.trim_start_matches(chars::COLON);
    base = base.trim_start_matches(chars::PERIOD);
    base = base.trim_start_matches(chars::HASH);

    let stem = sanitize_identifier(base)
        .trim_matches('_')
        .to_string();
    if stem.is_empty() {
        "rule".to_string()
    } else {
        stem
    }
}

const STRUCTURAL_PSEUDO_CLASSES: &[&str] = &[
    ":nth-child",
    ":nth-last-child",
    ":nth-of-type",
    ":nth-last-of-type",
    ":first-child",
    ":last-child",
    ":only-child",
    ":has",
    ":empty",
];

/// True when the selector carries a structural pseudo-class that makes
/// matching depend on sibling/descendant structure.
pub fn has_structural_pseudo(selector: &str) -> bool {
    STRUCTURAL_PSEUDO_CLASSES
        .iter()
        .any(|pseudo| selector.contains(pseudo))
}

fn split_top_level_spaces(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = DepthTracker::new();
    let mut start = 0;
    for (idx, ch) in selector.char_indices() {
        if ch == chars::SPACE && depth.at_top_level() {
            if start < idx {
                parts.push(selector[start..idx].to_string());
            }
            start = idx + 1;
        } else {
            depth.advance(ch);
        }
    }
    if start < selector.len() {
        parts.push(selector[start..].to_string());
    }
    parts
}
