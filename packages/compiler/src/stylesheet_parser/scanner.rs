//! Depth-tracked scanning primitives.
//!
//! Every structural decision in the parser (splitting, brace matching,
//! declaration boundaries) only takes effect at depth zero: outside
//! parentheses, brackets, braces and string literals. These helpers share a
//! single tracker so the rules cannot drift apart.

use crate::chars;

/// Nesting state for a single scan.
///
/// `advance` must be fed every character in order; separator checks are done
/// before the character is fed (an opening brace is itself a top-level
/// character, the content after it is not).
#[derive(Debug, Default, Clone)]
pub struct DepthTracker {
    parens: u32,
    brackets: u32,
    braces: u32,
    quote: Option<char>,
    escaped: bool,
}

impl DepthTracker {
    pub fn new() -> Self {
        DepthTracker::default()
    }

    /// True when the scanner is outside every bracket pair and string.
    pub fn at_top_level(&self) -> bool {
        self.parens == 0 && self.brackets == 0 && self.braces == 0 && self.quote.is_none()
    }

    pub fn in_string(&self) -> bool {
        self.quote.is_some()
    }

    pub fn advance(&mut self, ch: char) {
        if self.escaped {
            self.escaped = false;
            return;
        }
        if let Some(quote) = self.quote {
            if ch == chars::BACKSLASH {
                self.escaped = true;
            } else if ch == quote {
                self.quote = None;
            }
            return;
        }
        match ch {
            chars::SQ | chars::DQ => self.quote = Some(ch),
            chars::BACKSLASH => self.escaped = true,
            chars::LPAREN => self.parens += 1,
            chars::RPAREN => self.parens = self.parens.saturating_sub(1),
            chars::LBRACKET => self.brackets += 1,
            chars::RBRACKET => self.brackets = self.brackets.saturating_sub(1),
            chars::LBRACE => self.braces += 1,
            chars::RBRACE => self.braces = self.braces.saturating_sub(1),
            _ => {}
        }
    }
}

/// Remove block comments, preserving string literals verbatim.
///
/// An unterminated comment swallows the rest of the input.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars_iter = source.char_indices().peekable();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    while let Some((_, ch)) = chars_iter.next() {
        if let Some(q) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == chars::BACKSLASH {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        if chars::is_quote(ch) {
            quote = Some(ch);
            out.push(ch);
            continue;
        }
        if ch == chars::SLASH {
            if let Some((_, chars::STAR)) = chars_iter.peek() {
                chars_iter.next();
                let mut prev_star = false;
                for (_, c) in chars_iter.by_ref() {
                    if prev_star && c == chars::SLASH {
                        break;
                    }
                    prev_star = c == chars::STAR;
                }
                // Comments separate tokens the way whitespace does.
                out.push(chars::SPACE);
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Find the next occurrence of any of `targets` at top level, starting at
/// byte offset `from`. Returns the byte offset and the character found.
pub fn find_top_level(text: &str, from: usize, targets: &[char]) -> Option<(usize, char)> {
    let mut depth = DepthTracker::new();
    for (idx, ch) in text[from..].char_indices() {
        if depth.at_top_level() && !depth.in_string() && targets.contains(&ch) {
            return Some((from + idx, ch));
        }
        depth.advance(ch);
    }
    None
}

/// Given the byte offset of an opening brace, find the byte offset of its
/// matching closing brace. Respects nested braces, brackets, parentheses
/// and strings. Returns `None` for an unterminated block.
pub fn matching_brace(text: &str, open: usize) -> Option<usize> {
    debug_assert!(text[open..].starts_with(chars::LBRACE));
    let mut depth = DepthTracker::new();
    for (idx, ch) in text[open..].char_indices() {
        depth.advance(ch);
        if ch == chars::RBRACE && depth.at_top_level() {
            return Some(open + idx);
        }
    }
    None
}

/// Given the byte offset of an opening parenthesis, find the byte offset
/// of its matching closing parenthesis. Returns `None` when unterminated.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    debug_assert!(text[open..].starts_with(chars::LPAREN));
    let mut depth = DepthTracker::new();
    for (idx, ch) in text[open..].char_indices() {
        depth.advance(ch);
        if ch == chars::RPAREN && depth.at_top_level() {
            return Some(open + idx);
        }
    }
    None
}

/// Split `text` on every top-level occurrence of `separator`.
///
/// Separators inside `:is(...)`, `[attr="a,b"]` and friends do not split.
/// Empty fragments are dropped after trimming.
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = DepthTracker::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if ch == separator && depth.at_top_level() {
            parts.push(text[start..idx].to_string());
            start = idx + ch.len_utf8();
        } else {
            depth.advance(ch);
        }
    }
    parts.push(text[start..].to_string());
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split a declaration into `(property, value)` at the first top-level
/// colon. Returns `None` when no colon is present.
pub fn split_declaration(text: &str) -> Option<(String, String)> {
    let (colon, _) = find_top_level(text, 0, &[chars::COLON])?;
    let property = text[..colon].trim();
    let value = text[colon + 1..].trim();
    if property.is_empty() {
        return None;
    }
    Some((property.to_string(), value.to_string()))
}
