//! Token resolver and table flattening tests.

use indexmap::IndexMap;
use som_compiler::analyze;
use som_compiler::classify::token_resolver::{resolve_chain, ChainOutcome};
use som_compiler::classify::value_classifier::SeenUnresolved;
use som_compiler::classify::TokenTable;
use som_compiler::diagnostics::WarningKind;
use som_compiler::stylesheet_parser::ast::RawTokenTable;
use som_compiler::{CompileOptions, StyleSource};

fn table(entries: &[(&str, &str)]) -> RawTokenTable {
    let mut map = IndexMap::new();
    for (name, value) in entries {
        map.insert(name.to_string(), value.to_string());
    }
    map
}

#[test]
fn leaf_values_resolve_to_themselves() {
    let raw = table(&[("--c", "#2563EB")]);
    assert_eq!(
        resolve_chain("--c", &raw),
        ChainOutcome::Resolved {
            leaf_name: "--c".to_string(),
            value: "#2563EB".to_string(),
        }
    );
}

#[test]
fn chains_collapse_through_multiple_indirections() {
    let raw = table(&[
        ("--a", "var(--b)"),
        ("--b", "var(--c)"),
        ("--c", "16px"),
    ]);
    assert_eq!(
        resolve_chain("--a", &raw),
        ChainOutcome::Resolved {
            leaf_name: "--c".to_string(),
            value: "16px".to_string(),
        }
    );
}

#[test]
fn pointer_fallback_is_used_when_target_is_missing() {
    let raw = table(&[("--a", "var(--gone, 12px)")]);
    assert_eq!(
        resolve_chain("--a", &raw),
        ChainOutcome::ResolvedViaFallback {
            value: "12px".to_string(),
            missing: "--gone".to_string(),
        }
    );
}

#[test]
fn missing_without_fallback() {
    let raw = table(&[("--a", "var(--gone)")]);
    assert_eq!(
        resolve_chain("--a", &raw),
        ChainOutcome::Missing {
            missing: "--gone".to_string(),
        }
    );
    assert_eq!(
        resolve_chain("--never", &raw),
        ChainOutcome::Missing {
            missing: "--never".to_string(),
        }
    );
}

#[test]
fn self_reference_is_a_cycle() {
    let raw = table(&[("--a", "var(--a)")]);
    match resolve_chain("--a", &raw) {
        ChainOutcome::Cycle { chain } => assert_eq!(chain, vec!["--a", "--a"]),
        other => panic!("expected cycle, got {:?}", other),
    }
}

#[test]
fn flattening_records_pointers() {
    let raw = table(&[
        ("--base", "8px"),
        ("--gap", "var(--base)"),
        ("--indirect", "var(--gap)"),
    ]);
    let mut seen = SeenUnresolved::new();
    let (flat, warnings) = TokenTable::flatten(&raw, &mut seen);
    assert!(warnings.is_empty());

    let base = flat.get("--base").unwrap();
    assert_eq!(base.pointer_to, None);
    assert_eq!(base.resolved, "8px");

    let indirect = flat.get("--indirect").unwrap();
    assert_eq!(indirect.raw, "var(--gap)");
    assert_eq!(indirect.resolved, "8px");
    assert_eq!(indirect.pointer_to.as_deref(), Some("--base"));
}

#[test]
fn analysis_exposes_the_flattened_table() {
    let sources = [StyleSource::new(
        "main.css",
        ":root { --brand: #2563EB; --accent: var(--brand); } .a { color: var(--accent); }",
    )];
    let analysis = analyze(&sources, &CompileOptions::default());
    let accent = analysis.token_table.get("--accent").unwrap();
    assert_eq!(accent.resolved, "#2563EB");
    assert_eq!(accent.pointer_to.as_deref(), Some("--brand"));
    assert!(analysis.warnings().is_empty());
}

#[test]
fn external_tokens_fill_gaps_but_do_not_override() {
    let mut options = CompileOptions::default();
    options
        .extra_tokens
        .insert("--brand".to_string(), "#FF0000".to_string());
    options
        .extra_tokens
        .insert("--extra".to_string(), "4px".to_string());

    let sources = [StyleSource::new(
        "main.css",
        ":root { --brand: #2563EB; } .a { color: var(--brand); margin: var(--extra); }",
    )];
    let analysis = analyze(&sources, &options);
    assert_eq!(
        analysis.token_table.get("--brand").unwrap().resolved,
        "#2563EB"
    );
    assert_eq!(analysis.token_table.get("--extra").unwrap().resolved, "4px");
}

#[test]
fn cycle_warnings_surface_once_at_analysis_level() {
    let sources = [StyleSource::new(
        "main.css",
        ":root { --a: var(--b); --b: var(--a); } .x { color: var(--a); }",
    )];
    let analysis = analyze(&sources, &CompileOptions::default());
    let cycles = analysis
        .analysis_warnings
        .iter()
        .filter(|warning| warning.kind == WarningKind::TokenCycle)
        .count();
    assert_eq!(cycles, 1);
}
