//! Boundary identification, subgraph collection and manifest assembly.

mod utils;
use utils::{analyze_css, index_of, node};

use som_compiler::graph::component_node::{DepKind, EmitType, ManifestFlags};

#[test]
fn dynamic_rule_without_dynamic_parent_is_a_boundary() {
    let analysis = analyze_css(".layout { width: 100%; }");
    let layout = index_of(&analysis, ".layout");
    assert_eq!(node(&analysis, ".layout").boundary, Some(layout));
    assert_eq!(
        node(&analysis, ".layout").emit_type,
        EmitType::DynamicBoundary
    );
}

#[test]
fn static_rules_have_no_boundary() {
    let analysis = analyze_css(".a { color: red; }");
    assert_eq!(node(&analysis, ".a").boundary, None);
    assert_eq!(node(&analysis, ".a").emit_type, EmitType::ResolvedStyleBlock);
}

#[test]
fn contaminated_children_inherit_the_boundary() {
    let analysis = analyze_css(
        ".layout { width: 100%; } .layout .panel { color: blue; } .layout .panel .title { color: red; }",
    );
    let layout = index_of(&analysis, ".layout");
    assert_eq!(node(&analysis, ".layout .panel").boundary, Some(layout));
    assert_eq!(
        node(&analysis, ".layout .panel .title").boundary,
        Some(layout)
    );
    assert_eq!(node(&analysis, ".layout .panel").emit_type, EmitType::RuleSet);
}

#[test]
fn subgraph_members_are_sorted_by_source_order() {
    let analysis = analyze_css(
        ".layout { width: 100%; } .layout .b { color: red; } .layout .a { color: blue; }",
    );
    let layout = index_of(&analysis, ".layout");
    let manifest = analysis.manifest_for(layout).expect("manifest");
    assert_eq!(
        manifest.subgraph,
        vec![
            layout,
            index_of(&analysis, ".layout .b"),
            index_of(&analysis, ".layout .a"),
        ]
    );
}

#[test]
fn every_dynamic_rule_belongs_to_exactly_one_boundary() {
    let analysis = analyze_css(
        ".a { width: 100%; } .a .x { color: red; } .b { height: 50vh; } .b .y { color: blue; }",
    );
    for (index, rule) in analysis.nodes.iter().enumerate() {
        let owning = analysis
            .manifests
            .iter()
            .filter(|manifest| manifest.subgraph.contains(&index))
            .count();
        if rule.final_class.is_dynamic() {
            assert_eq!(owning, 1, "rule {} must be in exactly one subgraph", rule.selector);
        } else {
            assert_eq!(owning, 0, "static rule {} must be in no subgraph", rule.selector);
        }
    }
}

#[test]
fn portal_descendants_are_not_subgraph_members_of_tree_ancestors() {
    let analysis = analyze_css(
        ".sidebar { width: 30vw; } .sidebar .modal { portal_id: root; background: #fff; } .root { display: block; }",
    );
    let sidebar = index_of(&analysis, ".sidebar");
    let modal = index_of(&analysis, ".sidebar .modal");
    let manifest = analysis.manifest_for(sidebar).expect("manifest");
    assert_eq!(manifest.subgraph, vec![sidebar]);
    assert!(!manifest.subgraph.contains(&modal));
}

#[test]
fn static_children_are_skipped_but_counted_nowhere() {
    let analysis = analyze_css(
        ".layout { width: 100%; } .layout .panel { portal_id: elsewhere; color: red; }",
    );
    // The portal is unresolved: the child has no effective parent, stays
    // static and joins no subgraph.
    let layout = index_of(&analysis, ".layout");
    let manifest = analysis.manifest_for(layout).expect("manifest");
    assert_eq!(manifest.subgraph, vec![layout]);
}

#[test]
fn manifest_deduplicates_and_excludes_theme() {
    let analysis = analyze_css(
        ":root { --c: #2563EB; } .layout { width: 100%; height: 100%; color: var(--c); } .layout .panel { color: blue; }",
    );
    let layout = index_of(&analysis, ".layout");
    let manifest = analysis.manifest_for(layout).expect("manifest");

    assert!(manifest
        .entries
        .iter()
        .all(|entry| entry.kind != DepKind::Theme));
    // width and height both contribute PARENT_SIZE with distinct
    // properties, so they stay separate entries.
    let parent_size = manifest
        .entries
        .iter()
        .filter(|entry| entry.kind == DepKind::ParentSize)
        .count();
    assert_eq!(parent_size, 2);
    assert!(manifest.flags.contains(ManifestFlags::THEME_DEPENDENCY));
}

#[test]
fn portal_flag_is_set_when_the_boundary_declares_a_portal() {
    let analysis = analyze_css(
        ".anchor { width: 50%; } .float { portal_id: anchor; height: 30vh; }",
    );
    // `.float` portals onto the dynamic `.anchor`, so it joins that
    // boundary; the manifest records the portal dependency.
    let anchor = index_of(&analysis, ".anchor");
    let manifest = analysis.manifest_for(anchor).expect("manifest");
    assert!(manifest.flags.contains(ManifestFlags::PORTAL_DEPENDENCY));
}

#[test]
fn separate_boundaries_for_separate_trees() {
    let analysis = analyze_css(".a { width: 100%; } .b { height: 50vh; }");
    assert_eq!(analysis.manifests.len(), 2);
    assert_eq!(
        node(&analysis, ".a").boundary,
        Some(index_of(&analysis, ".a"))
    );
    assert_eq!(
        node(&analysis, ".b").boundary,
        Some(index_of(&analysis, ".b"))
    );
}

#[test]
fn nondeterministic_rules_form_boundaries_too() {
    let analysis = analyze_css(".table tr:nth-child(even) { background: #f8fafc; }");
    assert_eq!(analysis.manifests.len(), 1);
    let row = index_of(&analysis, ".table tr:nth-child(even)");
    assert_eq!(node(&analysis, ".table tr:nth-child(even)").boundary, Some(row));
}
