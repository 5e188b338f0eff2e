//! Per-declaration value classification and dependency detection.
//!
//! A declaration value is scanned for runtime-dependent operands: relative
//! units, environment and custom-property functions, intrinsic sizing
//! keywords. The result is a classification (absolute vs
//! runtime-deterministic), the detected dependency signals and the
//! normalized value text.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::smallvec;

use crate::classify::color::normalize_value;
use crate::classify::token_resolver::{resolve_chain, ChainOutcome};
use crate::diagnostics::{Warning, WarningKind};
use crate::graph::component_node::{Classification, DepKind, PendingDep, PendingDeps};
use crate::stylesheet_parser::ast::RawTokenTable;
use crate::stylesheet_parser::scanner::{find_top_level, matching_paren};

/// Color-valued functions whose percentage arguments are channels, not
/// sizes. Changing this list changes classification results, so it is
/// versioned together with the binary format.
pub const OPAQUE_COLOR_FUNCTIONS: &[&str] = &[
    "rgb",
    "rgba",
    "hsl",
    "hsla",
    "hwb",
    "lab",
    "lch",
    "oklch",
    "oklab",
    "color",
    "color-mix",
    "light-dark",
];

static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\d+(?:\.\d+)?|\.\d+)(%|(?:svmin|svmax|lvmin|lvmax|dvmin|dvmax|cqmin|cqmax|vmin|vmax|svw|svh|svi|svb|lvw|lvh|lvi|lvb|dvw|dvh|dvi|dvb|cqw|cqh|cqi|cqb|rcap|rem|rex|rch|ric|rlh|cap|vw|vh|vi|vb|em|ex|ch|ic|lh)\b)",
    )
    .unwrap()
});

static PX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\d+(?:\.\d+)?|\.\d+)px\b").unwrap());

static ENV_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\benv\(").unwrap());

static VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bvar\(").unwrap());

static MATH_FN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:calc|min|max|clamp)\(").unwrap());

static INTRINSIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(min-content|max-content|fit-content|stretch)\b").unwrap()
});

static COLOR_FN_RE: Lazy<Regex> = Lazy::new(|| {
    // Longest names first so `color-mix(` is not eaten by `color(`.
    let mut names: Vec<&str> = OPAQUE_COLOR_FUNCTIONS.to_vec();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    let pattern = format!(r"(?i)\b(?:{})\(", names.join("|"));
    Regex::new(&pattern).unwrap()
});

static MEDIA_VIEWPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:min|max)-(?:width|height|aspect-ratio)|device-width|device-height|orientation|resolution)\b",
    )
    .unwrap()
});

static MEDIA_USER_PREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:prefers-[a-z-]+|forced-colors|inverted-colors)\b").unwrap());

/// Tracks which `(token_name, referenced_token)` pairs already produced an
/// `UNRESOLVED_TOKEN` warning within one analysis.
pub type SeenUnresolved = HashSet<(String, String)>;

/// Classification result of a single declaration.
#[derive(Debug, Clone)]
pub struct ValueOutcome {
    pub classification: Classification,
    pub deps: PendingDeps,
    pub normalized: String,
    pub portal_target: Option<String>,
    pub container_boundary: bool,
    pub warnings: Vec<Warning>,
}

impl ValueOutcome {
    fn inert(normalized: String) -> Self {
        ValueOutcome {
            classification: Classification::Static,
            deps: smallvec![],
            normalized,
            portal_target: None,
            container_boundary: false,
            warnings: Vec::new(),
        }
    }
}

/// Classify one `(property, value)` declaration.
pub fn classify_declaration(
    property: &str,
    raw_value: &str,
    tokens: &RawTokenTable,
    seen_unresolved: &mut SeenUnresolved,
) -> ValueOutcome {
    let normalized = normalize_value(raw_value);
    let property_lower = property.to_ascii_lowercase();

    // Custom-property definitions are inert on the consuming side; their
    // effects surface through the references that read them.
    if property.starts_with("--") {
        return ValueOutcome::inert(normalized);
    }

    // Vendor-prefixed properties are opaque strings.
    if property_lower.starts_with("-webkit-")
        || property_lower.starts_with("-moz-")
        || property_lower.starts_with("-ms-")
    {
        return ValueOutcome::inert(normalized);
    }

    let mut outcome = ValueOutcome::inert(normalized);

    if property_lower == "portal_id" || property_lower == "portal-id" {
        outcome.portal_target = Some(raw_value.trim().to_string());
        return outcome;
    }
    if property_lower == "container-type" && raw_value.contains("size") {
        // Covers both `inline-size` and `size`.
        outcome.container_boundary = true;
    }

    collect_value_deps(
        raw_value,
        tokens,
        &mut outcome.deps,
        &mut outcome.warnings,
        seen_unresolved,
        0,
    );

    if MATH_FN_RE.is_match(raw_value) {
        let has_absolute = PX_RE.is_match(raw_value);
        let has_runtime = outcome.deps.iter().any(|d| d.kind != DepKind::Theme);
        if has_absolute && has_runtime {
            outcome.warnings.push(
                Warning::new(
                    WarningKind::MixedOperands,
                    format!(
                        "math function mixes absolute and runtime operands: {}",
                        raw_value.trim()
                    ),
                )
                .with_property(property),
            );
        }
    }

    if outcome.deps.iter().any(|d| d.kind != DepKind::Theme) {
        outcome.classification = Classification::Deterministic;
    }
    outcome
}

/// Scan a value for dependency signals, resolving custom-property
/// references through the raw token table.
fn collect_value_deps(
    value: &str,
    tokens: &RawTokenTable,
    deps: &mut PendingDeps,
    warnings: &mut Vec<Warning>,
    seen_unresolved: &mut SeenUnresolved,
    depth: usize,
) {
    // Fallback texts can nest var() again; bail out on absurd nesting.
    if depth > 16 {
        return;
    }

    let var_spans = function_spans(value, &VAR_RE);
    let opaque_spans = function_spans(value, &COLOR_FN_RE);

    for caps in UNIT_RE.captures_iter(value) {
        let whole = caps.get(0).unwrap();
        if inside_any(whole.start(), &var_spans) {
            continue;
        }
        let unit = caps.get(1).unwrap().as_str().to_ascii_lowercase();
        if unit == "%" && inside_any(whole.start(), &opaque_spans) {
            continue;
        }
        if let Some(kind) = unit_dep_kind(&unit) {
            push_pending(deps, kind, whole.as_str());
        }
    }

    for m in ENV_RE.find_iter(value) {
        if inside_any(m.start(), &var_spans) {
            continue;
        }
        let expression = balanced_call(value, m.start(), m.end() - 1);
        push_pending(deps, DepKind::Env, &expression);
    }

    for m in INTRINSIC_RE.find_iter(value) {
        if inside_any(m.start(), &var_spans) {
            continue;
        }
        push_pending(deps, DepKind::IntrinsicSize, m.as_str());
    }

    for (open, _) in &var_spans {
        resolve_var_reference(
            value,
            *open,
            tokens,
            deps,
            warnings,
            seen_unresolved,
            depth,
        );
    }
}

/// Handle one `var(--name, fallback?)` reference starting at the byte
/// offset of its opening keyword.
#[allow(clippy::too_many_arguments)]
fn resolve_var_reference(
    value: &str,
    span_start: usize,
    tokens: &RawTokenTable,
    deps: &mut PendingDeps,
    warnings: &mut Vec<Warning>,
    seen_unresolved: &mut SeenUnresolved,
    depth: usize,
) {
    let open = match value[span_start..].find('(') {
        Some(rel) => span_start + rel,
        None => return,
    };
    let close = match balanced_paren_end(value, open) {
        Some(idx) => idx,
        None => value.len(),
    };
    let content = &value[open + 1..close.min(value.len())];

    let (name, fallback) = match find_top_level(content, 0, &[',']) {
        Some((comma, _)) => (
            content[..comma].trim().to_string(),
            Some(content[comma + 1..].trim().to_string()),
        ),
        None => (content.trim().to_string(), None),
    };
    if !name.starts_with("--") {
        return;
    }
    let reference = format!("var({})", name);

    // Every reference is a THEME dependency, whatever it resolves to.
    push_pending(deps, DepKind::Theme, &reference);

    match resolve_chain(&name, tokens) {
        ChainOutcome::Resolved { value: leaf, .. } => {
            adopt_resolved_deps(&leaf, &reference, deps);
        }
        ChainOutcome::ResolvedViaFallback {
            value: leaf,
            missing,
        } => {
            warn_unresolved(&name, &missing, warnings, seen_unresolved);
            adopt_resolved_deps(&leaf, &reference, deps);
        }
        ChainOutcome::Missing { missing } => {
            if let Some(fallback_text) = fallback {
                warn_unresolved(&name, &missing, warnings, seen_unresolved);
                collect_value_deps(
                    &fallback_text,
                    tokens,
                    deps,
                    warnings,
                    seen_unresolved,
                    depth + 1,
                );
            } else {
                warnings.push(
                    Warning::new(
                        WarningKind::UndefinedToken,
                        format!("{} is never defined and has no fallback", name),
                    )
                    .with_tokens(name.clone(), missing),
                );
            }
        }
        ChainOutcome::Cycle { chain } => {
            warnings.push(
                Warning::new(
                    WarningKind::TokenCycle,
                    format!("cyclic token chain: {}", chain.join(" -> ")),
                )
                .with_tokens(name.clone(), chain.last().cloned().unwrap_or_default()),
            );
        }
    }
}

/// Union the dep kinds of a resolved leaf value into the consumer, tagged
/// with the `var(--name)` sentinel expression.
fn adopt_resolved_deps(leaf_value: &str, reference: &str, deps: &mut PendingDeps) {
    let mut resolved: PendingDeps = smallvec![];
    let opaque_spans = function_spans(leaf_value, &COLOR_FN_RE);
    for caps in UNIT_RE.captures_iter(leaf_value) {
        let whole = caps.get(0).unwrap();
        let unit = caps.get(1).unwrap().as_str().to_ascii_lowercase();
        if unit == "%" && inside_any(whole.start(), &opaque_spans) {
            continue;
        }
        if let Some(kind) = unit_dep_kind(&unit) {
            resolved.push(PendingDep {
                kind,
                expression: String::new(),
            });
        }
    }
    for _ in ENV_RE.find_iter(leaf_value) {
        resolved.push(PendingDep {
            kind: DepKind::Env,
            expression: String::new(),
        });
    }
    for _ in INTRINSIC_RE.find_iter(leaf_value) {
        resolved.push(PendingDep {
            kind: DepKind::IntrinsicSize,
            expression: String::new(),
        });
    }
    for dep in resolved {
        push_pending(deps, dep.kind, reference);
    }
}

fn warn_unresolved(
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

fn push_pending(deps: &mut PendingDeps, kind: DepKind, expression: &str) {
    let pending = PendingDep {
        kind,
        expression: expression.to_string(),
    };
    if !deps.contains(&pending) {
        deps.push(pending);
    }
}

fn unit_dep_kind(unit: &str) -> Option<DepKind> {
    match unit {
        "%" => Some(DepKind::ParentSize),
        "vw" | "vh" | "vi" | "vb" | "vmin" | "vmax" | "svw" | "svh" | "svi" | "svb" | "svmin"
        | "svmax" | "lvw" | "lvh" | "lvi" | "lvb" | "lvmin" | "lvmax" | "dvw" | "dvh" | "dvi"
        | "dvb" | "dvmin" | "dvmax" => Some(DepKind::Viewport),
        "em" | "rem" | "ex" | "rex" | "ch" | "rch" | "cap" | "rcap" | "ic" | "ric" | "lh"
        | "rlh" => Some(DepKind::FontMetrics),
        "cqw" | "cqh" | "cqi" | "cqb" | "cqmin" | "cqmax" => Some(DepKind::ContainerSize),
        _ => None,
    }
}

/// Byte spans (open keyword .. matching close paren, inclusive) of every
/// call of the functions matched by `re`.
fn function_spans(value: &str, re: &Regex) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    for m in re.find_iter(value) {
        let open = m.end() - 1;
        let end = balanced_paren_end(value, open).unwrap_or(value.len().saturating_sub(1));
        spans.push((m.start(), end));
    }
    spans
}

fn inside_any(pos: usize, spans: &[(usize, usize)]) -> bool {
    spans.iter().any(|(start, end)| pos > *start && pos <= *end)
}

fn balanced_paren_end(text: &str, open: usize) -> Option<usize> {
    matching_paren(text, open)
}

fn balanced_call(text: &str, start: usize, open: usize) -> String {
    match balanced_paren_end(text, open) {
        Some(end) => text[start..=end].to_string(),
        None => text[start..].to_string(),
    }
}

/// Media-feature probes for the synthetic media dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSignals {
    pub viewport: bool,
    pub user_pref: bool,
}

/// Which synthetic dependencies a media condition contributes. A query can
/// yield both kinds.
pub fn media_signals(query: &str) -> MediaSignals {
    MediaSignals {
        viewport: MEDIA_VIEWPORT_RE.is_match(query),
        user_pref: MEDIA_USER_PREF_RE.is_match(query),
    }
}
