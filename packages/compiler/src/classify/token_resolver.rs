//! Custom-property chain resolution.
//!
//! Tokens can point at other tokens (`--a: var(--b)`); resolution walks the
//! chain with a visitation list so cycles surface as warnings instead of
//! hangs. The raw table is also flattened once per analysis into a
//! `TokenTable` whose records carry the ultimate resolved value.

use indexmap::IndexMap;

use crate::classify::value_classifier::SeenUnresolved;
use crate::diagnostics::{Warning, WarningKind};
use crate::stylesheet_parser::ast::RawTokenTable;
use crate::stylesheet_parser::scanner::{find_top_level, matching_paren};

/// Result of walking one reference chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// The chain ended at a token with a concrete value.
    Resolved { leaf_name: String, value: String },
    /// The chain hit a missing token but the pointing token wrote a
    /// fallback, which becomes the value.
    ResolvedViaFallback { value: String, missing: String },
    /// The chain hit a missing token and nothing supplied a fallback.
    Missing { missing: String },
    /// The chain revisited a token.
    Cycle { chain: Vec<String> },
}

/// Walk the reference chain starting at `name`.
pub fn resolve_chain(name: &str, table: &RawTokenTable) -> ChainOutcome {
    let mut chain: Vec<String> = vec![name.to_string()];
    let mut current = name.to_string();
    loop {
        let Some(raw) = table.get(&current) else {
            return ChainOutcome::Missing { missing: current };
        };
        match sole_var_reference(raw) {
            None => {
                return ChainOutcome::Resolved {
                    leaf_name: current,
                    value: raw.clone(),
                }
            }
            Some((next, fallback)) => {
                if chain.contains(&next) {
                    chain.push(next);
                    return ChainOutcome::Cycle { chain };
                }
                if !table.contains_key(&next) {
                    return match fallback {
                        Some(value) => ChainOutcome::ResolvedViaFallback {
                            value,
                            missing: next,
                        },
                        None => ChainOutcome::Missing { missing: next },
                    };
                }
                chain.push(next.clone());
                current = next;
            }
        }
    }
}

/// Parse a value that consists of nothing but a single `var()` reference.
///
/// Returns the referenced name and the optional fallback text. Values with
/// anything around the reference (`calc(var(--x) + 2px)`) are not pointers
/// and return `None`.
pub fn sole_var_reference(value: &str) -> Option<(String, Option<String>)> {
    let trimmed = value.trim();
    if trimmed.len() < 7 || !trimmed[..4].eq_ignore_ascii_case("var(") {
        return None;
    }
    let close = matching_paren(trimmed, 3)?;
    if close != trimmed.len() - 1 {
        return None;
    }
    let content = &trimmed[4..close];
    let (name, fallback) = match find_top_level(content, 0, &[',']) {
        Some((comma, _)) => (
            content[..comma].trim(),
            Some(content[comma + 1..].trim().to_string()),
        ),
        None => (content.trim(), None),
    };
    if !name.starts_with("--") {
        return None;
    }
    Some((name.to_string(), fallback))
}

/// One flattened token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Value exactly as written.
    pub raw: String,
    /// Ultimate value after collapsing indirections.
    pub resolved: String,
    /// Leaf token the value was inherited from, for pointer tokens.
    pub pointer_to: Option<String>,
}

/// The flattened custom-property table.
#[derive(Debug, Default, Clone)]
pub struct TokenTable {
    records: IndexMap<String, TokenRecord>,
}

impl TokenTable {
    /// Flatten a raw table: absolute leaves keep their value, pointer
    /// chains collapse onto the leaf value and remember the leaf name.
    pub fn flatten(raw: &RawTokenTable, seen_unresolved: &mut SeenUnresolved) -> (Self, Vec<Warning>) {
        let mut records = IndexMap::with_capacity(raw.len());
        let mut warnings = Vec::new();
        let mut reported_cycles: Vec<Vec<String>> = Vec::new();

        for (name, value) in raw {
            let record = match resolve_chain(name, raw) {
                ChainOutcome::Resolved { leaf_name, value: resolved } => TokenRecord {
                    raw: value.clone(),
                    resolved,
                    pointer_to: (leaf_name != *name).then_some(leaf_name),
                },
                ChainOutcome::ResolvedViaFallback { value: resolved, missing } => {
                    push_unresolved(name, &missing, &mut warnings, seen_unresolved);
                    TokenRecord {
                        raw: value.clone(),
                        resolved,
                        pointer_to: None,
                    }
                }
                ChainOutcome::Missing { missing } => {
                    push_unresolved(name, &missing, &mut warnings, seen_unresolved);
                    TokenRecord {
                        raw: value.clone(),
                        resolved: value.clone(),
                        pointer_to: None,
                    }
                }
                ChainOutcome::Cycle { chain } => {
                    let mut canonical = chain.clone();
                    canonical.sort();
                    canonical.dedup();
                    if !reported_cycles.contains(&canonical) {
                        reported_cycles.push(canonical);
                        warnings.push(
                            Warning::new(
                                WarningKind::TokenCycle,
                                format!("cyclic token chain: {}", chain.join(" -> ")),
                            )
                            .with_tokens(
                                name.clone(),
                                chain.last().cloned().unwrap_or_default(),
                            ),
                        );
                    }
                    TokenRecord {
                        raw: value.clone(),
                        resolved: value.clone(),
                        pointer_to: None,
                    }
                }
            };
            records.insert(name.clone(), record);
        }

        (TokenTable { records }, warnings)
    }

    pub fn get(&self, name: &str) -> Option<&TokenRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TokenRecord)> {
        self.records.iter()
    }
}

fn push_unresolved(
    name: &str,
    missing: &str,
    warnings: &mut Vec<Warning>,
    seen_unresolved: &mut SeenUnresolved,
) {
    let key = (name.to_string(), missing.to_string());
    if seen_unresolved.insert(key) {
        warnings.push(
            Warning::new(
                WarningKind::UnresolvedToken,
                format!("{} chains to missing token {}", name, missing),
            )
            .with_tokens(name, missing),
        );
    }
}
