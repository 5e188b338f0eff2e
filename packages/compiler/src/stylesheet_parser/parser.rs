//! Stylesheet rule parser.
//!
//! Extracts `{ selectors, declarations, media_query }` triples from source
//! text: top-level splitting on `;`/`{` at depth zero, at-rule scoping,
//! native nesting expansion, and raw token collection. The parser never
//! fails; malformed fragments are skipped locally and everything that
//! parsed cleanly is kept.

use crate::chars;
use crate::stylesheet_parser::ast::{ParseOutput, ParsedRule};
use crate::stylesheet_parser::scanner::{
    find_top_level, matching_brace, split_declaration, split_top_level, strip_comments,
};
use crate::stylesheet_parser::selector::normalize_selector;

/// At-rules whose condition wraps their body without contributing a media
/// condition of their own.
const TRANSPARENT_AT_RULES: &[&str] = &["@layer", "@supports"];

/// Parse a stylesheet into rules and a raw token table.
pub fn parse_stylesheet(source: &str) -> ParseOutput {
    let stripped = strip_comments(source);
    let mut out = ParseOutput::default();
    parse_block_list(&stripped, None, &mut out);
    tracing::debug!(
        rules = out.rules.len(),
        tokens = out.raw_tokens.len(),
        "stylesheet parsed"
    );
    out
}

/// Parse a run of top-level constructs: at-statements, at-rule blocks and
/// style rules.
fn parse_block_list(text: &str, media: Option<&str>, out: &mut ParseOutput) {
    let mut cursor = 0;
    while cursor < text.len() {
        match find_top_level(text, cursor, &[chars::SEMICOLON, chars::LBRACE]) {
            None => break,
            Some((idx, chars::SEMICOLON)) => {
                // At-statement (@import and friends): consumed, not lifted.
                cursor = idx + 1;
            }
            Some((open, _)) => {
                let prelude = text[cursor..open].trim();
                let close = matching_brace(text, open);
                let body_end = close.unwrap_or(text.len());
                let body = &text[open + 1..body_end];

                if let Some(at_rule) = prelude.strip_prefix(chars::AT) {
                    parse_at_rule(at_rule, body, media, out);
                } else if !prelude.is_empty() {
                    let selectors = split_top_level(prelude, chars::COMMA)
                        .iter()
                        .map(|s| normalize_selector(s))
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>();
                    if !selectors.is_empty() {
                        parse_rule_body(body, &selectors, media, out);
                    }
                }

                cursor = match close {
                    Some(end) => end + 1,
                    None => text.len(),
                };
            }
        }
    }
}

fn parse_at_rule(at_rule: &str, body: &str, media: Option<&str>, out: &mut ParseOutput) {
    let (name, condition) = match at_rule.find(|c: char| chars::is_whitespace(c) || c == '(') {
        Some(idx) => (&at_rule[..idx], at_rule[idx..].trim()),
        None => (at_rule, ""),
    };
    let name = format!("@{}", name.to_ascii_lowercase());

    if name == "@media" {
        let combined = combine_media(media, condition);
        parse_block_list(body, combined.as_deref(), out);
    } else if TRANSPARENT_AT_RULES.contains(&name.as_str()) {
        parse_block_list(body, media, out);
    }
    // @keyframes, @font-face and any other block at-rule: the body was
    // brace-matched already (no crash on malformed input); its inner
    // blocks are not lifted to rules.
}

fn combine_media(outer: Option<&str>, inner: &str) -> Option<String> {
    let inner = inner.trim();
    match (outer, inner.is_empty()) {
        (None, true) => None,
        (None, false) => Some(inner.to_string()),
        (Some(o), true) => Some(o.to_string()),
        (Some(o), false) => Some(format!("{} and {}", o, inner)),
    }
}

/// Parse a rule body: declarations plus nested blocks.
fn parse_rule_body(body: &str, selectors: &[String], media: Option<&str>, out: &mut ParseOutput) {
    // The rule slot is pushed before any nested rule so expansion keeps
    // source order: outer rule first, nested rules after it.
    let rule_slot = out.rules.len();
    out.rules
        .push(ParsedRule::new(selectors.to_vec(), media.map(str::to_string)));

    let mut cursor = 0;
    while cursor < body.len() {
        match find_top_level(body, cursor, &[chars::SEMICOLON, chars::LBRACE]) {
            None => {
                // Trailing declaration without a terminator.
                push_declaration(&body[cursor..], rule_slot, selectors, out);
                break;
            }
            Some((idx, chars::SEMICOLON)) => {
                push_declaration(&body[cursor..idx], rule_slot, selectors, out);
                cursor = idx + 1;
            }
            Some((open, _)) => {
                let prelude = body[cursor..open].trim();
                let close = matching_brace(body, open);
                let inner_end = close.unwrap_or(body.len());
                let inner = &body[open + 1..inner_end];

                if let Some(at_rule) = prelude.strip_prefix(chars::AT) {
                    parse_nested_at_rule(at_rule, inner, selectors, media, out);
                } else if !prelude.is_empty() {
                    let expanded = expand_nested_selectors(selectors, prelude);
                    if !expanded.is_empty() {
                        parse_rule_body(inner, &expanded, media, out);
                    }
                }

                cursor = match close {
                    Some(end) => end + 1,
                    None => body.len(),
                };
            }
        }
    }
}

fn parse_nested_at_rule(
    at_rule: &str,
    body: &str,
    selectors: &[String],
    media: Option<&str>,
    out: &mut ParseOutput,
) {
    let (name, condition) = match at_rule.find(|c: char| chars::is_whitespace(c) || c == '(') {
        Some(idx) => (&at_rule[..idx], at_rule[idx..].trim()),
        None => (at_rule, ""),
    };
    let name = format!("@{}", name.to_ascii_lowercase());

    if name == "@media" {
        let combined = combine_media(media, condition);
        parse_rule_body(body, selectors, combined.as_deref(), out);
    } else if TRANSPARENT_AT_RULES.contains(&name.as_str()) {
        parse_rule_body(body, selectors, media, out);
    }
}

/// Expand a nested prelude against the parent selector list.
///
/// `&` substitutes the parent; preludes led by a combinator or a bare
/// compound are concatenated as descendants. The cartesian product over
/// parent-list x inner-list is emitted.
fn expand_nested_selectors(parents: &[String], prelude: &str) -> Vec<String> {
    let inner_list = split_top_level(prelude, chars::COMMA);
    let mut expanded = Vec::with_capacity(parents.len() * inner_list.len());
    for parent in parents {
        for inner in &inner_list {
            let combined = if inner.contains(chars::AMPERSAND) {
                inner.replace(chars::AMPERSAND, parent)
            } else {
                format!("{} {}", parent, inner)
            };
            let normalized = normalize_selector(&combined);
            if !normalized.is_empty() {
                expanded.push(normalized);
            }
        }
    }
    expanded
}

fn push_declaration(fragment: &str, rule_slot: usize, selectors: &[String], out: &mut ParseOutput) {
    let Some((property, value)) = split_declaration(fragment) else {
        return;
    };
    if property.starts_with("--") && selectors.iter().any(|s| is_token_scope(s)) {
        out.raw_tokens.insert(property.clone(), value.clone());
    }
    out.rules[rule_slot].declarations.push((property, value));
}

/// Selectors whose custom-property declarations define global tokens.
fn is_token_scope(selector: &str) -> bool {
    selector == ":root" || selector == "*" || selector == "html"
}
