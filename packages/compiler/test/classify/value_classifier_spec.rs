//! Value classifier tests: units, functions, keywords, mixed operands.

use indexmap::IndexMap;
use som_compiler::classify::value_classifier::{
    classify_declaration, media_signals, SeenUnresolved, ValueOutcome,
};
use som_compiler::diagnostics::WarningKind;
use som_compiler::graph::component_node::{Classification, DepKind};
use som_compiler::stylesheet_parser::ast::RawTokenTable;

fn classify(property: &str, value: &str) -> ValueOutcome {
    classify_with(property, value, &[])
}

fn classify_with(property: &str, value: &str, tokens: &[(&str, &str)]) -> ValueOutcome {
    let mut table: RawTokenTable = IndexMap::new();
    for (name, raw) in tokens {
        table.insert(name.to_string(), raw.to_string());
    }
    let mut seen = SeenUnresolved::new();
    classify_declaration(property, value, &table, &mut seen)
}

fn kinds(outcome: &ValueOutcome) -> Vec<DepKind> {
    outcome.deps.iter().map(|dep| dep.kind).collect()
}

#[test]
fn absolute_values_are_static() {
    let outcome = classify("padding", "8px 16px");
    assert_eq!(outcome.classification, Classification::Static);
    assert!(outcome.deps.is_empty());
    assert_eq!(outcome.normalized, "8px 16px");
}

#[test]
fn percent_is_parent_size() {
    let outcome = classify("width", "100%");
    assert_eq!(outcome.classification, Classification::Deterministic);
    assert_eq!(kinds(&outcome), vec![DepKind::ParentSize]);
}

#[test]
fn viewport_units_and_variants() {
    for value in ["30vw", "10vh", "5vmin", "2svw", "4lvh", "7dvmax", "1vb"] {
        let outcome = classify("width", value);
        assert_eq!(kinds(&outcome), vec![DepKind::Viewport], "value {}", value);
    }
}

#[test]
fn font_relative_units() {
    for value in ["1rem", "2em", "3ex", "0.5ch", "1cap", "2ic", "1.2lh", "1rlh"] {
        let outcome = classify("font-size", value);
        assert_eq!(
            kinds(&outcome),
            vec![DepKind::FontMetrics],
            "value {}",
            value
        );
    }
}

#[test]
fn container_units() {
    for value in ["2cqw", "1cqh", "3cqi", "4cqb", "5cqmin", "6cqmax"] {
        let outcome = classify("font-size", value);
        assert_eq!(
            kinds(&outcome),
            vec![DepKind::ContainerSize],
            "value {}",
            value
        );
    }
}

#[test]
fn intrinsic_keywords() {
    for value in ["min-content", "max-content", "fit-content", "stretch"] {
        let outcome = classify("width", value);
        assert_eq!(
            kinds(&outcome),
            vec![DepKind::IntrinsicSize],
            "value {}",
            value
        );
    }
}

#[test]
fn env_function() {
    let outcome = classify("padding-top", "env(safe-area-inset-top)");
    assert_eq!(kinds(&outcome), vec![DepKind::Env]);
    assert_eq!(outcome.deps[0].expression, "env(safe-area-inset-top)");
}

#[test]
fn color_function_percentages_are_channels_not_sizes() {
    let outcome = classify("color", "rgb(100% 0% 0%)");
    assert_eq!(outcome.classification, Classification::Static);
    assert!(outcome.deps.is_empty());

    let outcome = classify("background", "hsl(200, 50%, 40%)");
    assert!(outcome.deps.is_empty());

    let outcome = classify("color", "color-mix(in srgb, red 40%, blue)");
    assert!(outcome.deps.is_empty());
}

#[test]
fn percent_outside_a_color_function_still_counts() {
    let outcome = classify("background", "linear-gradient(red 50%, blue)");
    assert_eq!(kinds(&outcome), vec![DepKind::ParentSize]);
}

#[test]
fn all_absolute_math_is_static() {
    let outcome = classify("width", "max(200px, 400px)");
    assert_eq!(outcome.classification, Classification::Static);
    assert!(outcome.deps.is_empty());
    assert!(outcome.warnings.is_empty());
}

#[test]
fn mixed_operand_math_is_dynamic_and_warns() {
    let outcome = classify("width", "max(200px, 50%)");
    assert_eq!(outcome.classification, Classification::Deterministic);
    assert_eq!(kinds(&outcome), vec![DepKind::ParentSize]);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::MixedOperands);

    let outcome = classify("width", "max(200px, 2cqw)");
    assert_eq!(kinds(&outcome), vec![DepKind::ContainerSize]);
}

#[test]
fn calc_with_only_runtime_operands_does_not_warn() {
    let outcome = classify("width", "calc(100% / 3)");
    assert_eq!(kinds(&outcome), vec![DepKind::ParentSize]);
    assert!(outcome.warnings.is_empty());
}

#[test]
fn vendor_prefixed_properties_are_opaque() {
    for property in ["-webkit-mask-size", "-moz-box-flex", "-ms-grid-columns"] {
        let outcome = classify(property, "50%");
        assert_eq!(
            outcome.classification,
            Classification::Static,
            "property {}",
            property
        );
        assert!(outcome.deps.is_empty());
    }
}

#[test]
fn var_resolving_to_absolute_is_static_with_theme_dep() {
    let outcome = classify_with("color", "var(--c)", &[("--c", "#2563EB")]);
    assert_eq!(outcome.classification, Classification::Static);
    assert_eq!(kinds(&outcome), vec![DepKind::Theme]);
    assert_eq!(outcome.deps[0].expression, "var(--c)");
    assert!(outcome.warnings.is_empty());
}

#[test]
fn var_resolving_to_runtime_unit_adopts_the_dep() {
    let outcome = classify_with("font-size", "var(--size)", &[("--size", "1.5rem")]);
    assert_eq!(outcome.classification, Classification::Deterministic);
    let mut got = kinds(&outcome);
    got.sort_by_key(|kind| kind.code());
    assert_eq!(got, vec![DepKind::FontMetrics, DepKind::Theme]);
    // Adopted deps carry the reference, not the resolved text.
    assert!(outcome
        .deps
        .iter()
        .all(|dep| dep.expression == "var(--size)"));
}

#[test]
fn var_through_indirection_chain() {
    let outcome = classify_with(
        "width",
        "var(--a)",
        &[("--a", "var(--b)"), ("--b", "50vw")],
    );
    assert!(kinds(&outcome).contains(&DepKind::Viewport));
}

#[test]
fn undefined_var_without_fallback() {
    let outcome = classify("color", "var(--missing)");
    assert_eq!(outcome.classification, Classification::Static);
    assert_eq!(kinds(&outcome), vec![DepKind::Theme]);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::UndefinedToken);
}

#[test]
fn undefined_var_with_absolute_fallback_is_static() {
    let outcome = classify("font-size", "var(--u, 16px)");
    assert_eq!(outcome.classification, Classification::Static);
    assert_eq!(kinds(&outcome), vec![DepKind::Theme]);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::UnresolvedToken);
}

#[test]
fn undefined_var_with_runtime_fallback_is_dynamic() {
    let outcome = classify("font-size", "var(--u, 1rem)");
    assert_eq!(outcome.classification, Classification::Deterministic);
    assert!(kinds(&outcome).contains(&DepKind::FontMetrics));
}

#[test]
fn token_cycle_falls_back_to_static() {
    let outcome = classify_with(
        "color",
        "var(--a)",
        &[("--a", "var(--b)"), ("--b", "var(--a)")],
    );
    assert_eq!(outcome.classification, Classification::Static);
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.kind == WarningKind::TokenCycle));
}

#[test]
fn unresolved_warnings_deduplicate_per_pair() {
    let mut table: RawTokenTable = IndexMap::new();
    let mut seen = SeenUnresolved::new();
    table.insert("--a".to_string(), "var(--gone)".to_string());
    let first = classify_declaration("color", "var(--a, red)", &table, &mut seen);
    let second = classify_declaration("background", "var(--a, blue)", &table, &mut seen);
    let total = first
        .warnings
        .iter()
        .chain(second.warnings.iter())
        .filter(|warning| warning.kind == WarningKind::UnresolvedToken)
        .count();
    assert_eq!(total, 1);
}

#[test]
fn env_with_fallback_is_still_env() {
    let outcome = classify("padding-bottom", "env(safe-area-inset-bottom, 12px)");
    assert_eq!(kinds(&outcome), vec![DepKind::Env]);
    assert_eq!(
        outcome.deps[0].expression,
        "env(safe-area-inset-bottom, 12px)"
    );
}

#[test]
fn nested_var_fallbacks_resolve_recursively() {
    let outcome = classify("font-size", "var(--a, var(--b, 1rem))");
    assert_eq!(outcome.classification, Classification::Deterministic);
    assert!(kinds(&outcome).contains(&DepKind::FontMetrics));
    // Both references register as THEME deps.
    let themes = outcome
        .deps
        .iter()
        .filter(|dep| dep.kind == DepKind::Theme)
        .count();
    assert_eq!(themes, 2);
}

#[test]
fn multiple_var_references_in_one_value() {
    let outcome = classify_with(
        "padding",
        "calc(var(--x) + var(--y))",
        &[("--x", "1rem"), ("--y", "4px")],
    );
    let themes: Vec<&str> = outcome
        .deps
        .iter()
        .filter(|dep| dep.kind == DepKind::Theme)
        .map(|dep| dep.expression.as_str())
        .collect();
    assert_eq!(themes, vec!["var(--x)", "var(--y)"]);
    assert!(kinds(&outcome).contains(&DepKind::FontMetrics));
}

#[test]
fn unit_deps_carry_the_matched_token_as_expression() {
    let outcome = classify("width", "calc(100% - 30vw)");
    let expressions: Vec<&str> = outcome
        .deps
        .iter()
        .map(|dep| dep.expression.as_str())
        .collect();
    assert!(expressions.contains(&"100%"));
    assert!(expressions.contains(&"30vw"));
}

#[test]
fn duplicate_signals_deduplicate_within_a_value() {
    let outcome = classify("margin", "10% 10% 10% 10%");
    assert_eq!(kinds(&outcome), vec![DepKind::ParentSize]);
    assert_eq!(outcome.deps.len(), 1);
}

#[test]
fn fallback_inside_a_resolved_var_is_inert() {
    // `--x` resolves, so the written fallback never participates.
    let outcome = classify_with("font-size", "var(--x, 1rem)", &[("--x", "16px")]);
    assert_eq!(outcome.classification, Classification::Static);
    assert_eq!(kinds(&outcome), vec![DepKind::Theme]);
}

#[test]
fn portal_property_sets_the_signal() {
    let outcome = classify("portal_id", "root");
    assert_eq!(outcome.portal_target.as_deref(), Some("root"));
    let outcome = classify("Portal-Id", "overlay");
    assert_eq!(outcome.portal_target.as_deref(), Some("overlay"));
}

#[test]
fn container_type_sets_the_signal() {
    assert!(classify("container-type", "inline-size").container_boundary);
    assert!(classify("container-type", "size").container_boundary);
    assert!(!classify("container-type", "normal").container_boundary);
}

#[test]
fn hex_and_keyword_colors_normalize() {
    assert_eq!(classify("color", "#fff").normalized, "#FFFFFFFF");
    assert_eq!(classify("color", "#2563EB").normalized, "#2563EBFF");
    assert_eq!(classify("color", "blue").normalized, "#0000FFFF");
}

#[test]
fn media_signal_probes() {
    assert!(media_signals("(min-width: 600px)").viewport);
    assert!(media_signals("(orientation: landscape)").viewport);
    assert!(media_signals("(resolution: 2dppx)").viewport);
    assert!(!media_signals("(min-width: 600px)").user_pref);

    assert!(media_signals("(prefers-color-scheme: dark)").user_pref);
    assert!(media_signals("(forced-colors: active)").user_pref);
    assert!(media_signals("(inverted-colors: inverted)").user_pref);

    let both = media_signals("(min-width: 600px) and (prefers-reduced-motion: reduce)");
    assert!(both.viewport && both.user_pref);
}
