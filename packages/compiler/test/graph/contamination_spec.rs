//! Contamination propagation tests: final classes, sources, portal
//! severance and cycle breaking.

mod utils;
use utils::{analyze_css, index_of, node};

use som_compiler::diagnostics::WarningKind;
use som_compiler::graph::component_node::{Classification, DepKind};

#[test]
fn local_classes_stand_without_parents() {
    let analysis = analyze_css(".a { color: red; } .b { width: 50%; }");
    assert_eq!(node(&analysis, ".a").final_class, Classification::Static);
    assert_eq!(
        node(&analysis, ".b").final_class,
        Classification::Deterministic
    );
}

#[test]
fn dynamic_parent_contaminates_static_child() {
    let analysis = analyze_css(".layout { width: 100%; } .layout .panel { color: blue; }");
    let panel = node(&analysis, ".layout .panel");
    assert_eq!(panel.local_class, Classification::Static);
    assert_eq!(panel.final_class, Classification::Deterministic);
    assert_eq!(
        panel.contamination_source,
        Some(index_of(&analysis, ".layout"))
    );
}

#[test]
fn contamination_source_points_at_the_origin() {
    let analysis = analyze_css(
        ".top { width: 100%; } .top .mid { color: red; } .top .mid .leaf { color: blue; }",
    );
    let top = index_of(&analysis, ".top");
    assert_eq!(node(&analysis, ".top .mid").contamination_source, Some(top));
    // The grandchild inherits the original source, not the intermediate.
    assert_eq!(
        node(&analysis, ".top .mid .leaf").contamination_source,
        Some(top)
    );
}

#[test]
fn stronger_local_class_is_not_demoted() {
    let analysis = analyze_css(
        ".layout { width: 100%; } .layout li:first-child { color: red; }",
    );
    let child = node(&analysis, ".layout li:first-child");
    assert_eq!(child.local_class, Classification::Nondeterministic);
    assert_eq!(child.final_class, Classification::Nondeterministic);
    assert_eq!(child.contamination_source, None);
}

#[test]
fn nondeterministic_parent_promotes_children() {
    let analysis = analyze_css(
        ".list:has(img) { color: red; } .list:has(img) .caption { color: blue; }",
    );
    let caption = node(&analysis, ".list:has(img) .caption");
    // The selector itself is structural too, but even the contamination
    // path alone would promote it.
    assert_eq!(caption.final_class, Classification::Nondeterministic);
}

#[test]
fn portal_severs_tree_contamination() {
    let analysis = analyze_css(
        ".sidebar { width: 30vw; } .sidebar .modal { portal_id: root; background: #fff; } .root { display: block; }",
    );
    let modal = node(&analysis, ".sidebar .modal");
    assert_eq!(modal.tree_parent, Some(index_of(&analysis, ".sidebar")));
    assert_eq!(modal.portal_target, Some(index_of(&analysis, ".root")));
    assert_eq!(modal.effective_parent, Some(index_of(&analysis, ".root")));
    // The portal target is static, so no contamination arrives.
    assert_eq!(modal.final_class, Classification::Static);
}

#[test]
fn portal_target_resolution_accepts_selector_forms() {
    let by_selector = analyze_css(
        ".a { width: 50%; } .a .x { portal_id: .dest; color: red; } .dest { color: blue; }",
    );
    assert_eq!(
        node(&by_selector, ".a .x").portal_target,
        Some(index_of(&by_selector, ".dest"))
    );

    let by_hash_form = analyze_css(
        ".a { width: 50%; } .a .x { portal_id: overlay; color: red; } #overlay { color: blue; }",
    );
    assert_eq!(
        node(&by_hash_form, ".a .x").portal_target,
        Some(index_of(&by_hash_form, "#overlay"))
    );
}

#[test]
fn unresolved_portal_warns_and_cuts_the_parent() {
    let analysis = analyze_css(".a { width: 50%; } .a .x { portal_id: nowhere; color: red; }");
    let x = node(&analysis, ".a .x");
    assert_eq!(x.portal_target, None);
    assert_eq!(x.effective_parent, None);
    assert_eq!(x.final_class, Classification::Static);
    assert!(x
        .warnings
        .iter()
        .any(|warning| warning.kind == WarningKind::PortalMissing));
}

#[test]
fn portal_cycles_break_with_a_warning() {
    let analysis = analyze_css(
        ".a { portal_id: b; width: 50%; } .b { portal_id: a; color: red; }",
    );
    // No hang; each keeps its local class.
    assert_eq!(
        node(&analysis, ".a").final_class,
        Classification::Deterministic
    );
    assert_eq!(node(&analysis, ".b").final_class, Classification::Deterministic);
    assert!(analysis
        .warnings()
        .iter()
        .any(|warning| warning.kind == WarningKind::DepWarning));
}

#[test]
fn container_units_find_the_nearest_container_ancestor() {
    let analysis = analyze_css(
        ".card { container-type: inline-size; width: 100%; } .card .title { font-size: max(14px, 2cqw); }",
    );
    let title = node(&analysis, ".card .title");
    let dep = title
        .deps
        .iter()
        .find(|dep| dep.kind == DepKind::ContainerSize)
        .expect("container dep");
    assert_eq!(dep.container, Some(index_of(&analysis, ".card")));
}

#[test]
fn missing_container_warns_but_keeps_the_dep() {
    let analysis = analyze_css(".w { width: max(200px, 2cqw); }");
    let w = node(&analysis, ".w");
    let dep = w
        .deps
        .iter()
        .find(|dep| dep.kind == DepKind::ContainerSize)
        .expect("container dep");
    assert_eq!(dep.container, None);
    assert!(w
        .warnings
        .iter()
        .any(|warning| warning.kind == WarningKind::MissingContainer));
}

#[test]
fn media_rules_get_synthetic_deps() {
    let analysis = analyze_css("@media (min-width: 600px) { .m { color: red; } }");
    let m = node(&analysis, ".m");
    assert_eq!(m.final_class, Classification::Deterministic);
    let dep = m
        .deps
        .iter()
        .find(|dep| dep.kind == DepKind::Viewport)
        .expect("viewport dep");
    assert_eq!(dep.property, "__media__");
    assert_eq!(dep.expression, "(min-width: 600px)");
}

#[test]
fn user_pref_media_uses_the_query_as_property() {
    let analysis = analyze_css("@media (prefers-color-scheme: dark) { .p { color: #000; } }");
    let p = node(&analysis, ".p");
    let dep = p
        .deps
        .iter()
        .find(|dep| dep.kind == DepKind::UserPref)
        .expect("user pref dep");
    assert_eq!(dep.property, "(prefers-color-scheme: dark)");
}

#[test]
fn structural_selectors_force_nondeterminism() {
    let analysis = analyze_css(".table tr:nth-child(even) { background: #f8fafc; }");
    let row = node(&analysis, ".table tr:nth-child(even)");
    assert_eq!(row.final_class, Classification::Nondeterministic);
    let dep = row
        .deps
        .iter()
        .find(|dep| dep.kind == DepKind::Structure)
        .expect("structure dep");
    assert_eq!(dep.property, "__selector__");
    assert_eq!(dep.invalidation_mask, 1 << 31);
    assert!(row
        .warnings
        .iter()
        .any(|warning| warning.kind == WarningKind::StructuralDynamic));
}

#[test]
fn invalidation_masks_derive_from_the_property_name() {
    let analysis = analyze_css(".b { width: 50%; }");
    let dep = &node(&analysis, ".b").deps[0];
    assert_eq!(
        dep.invalidation_mask,
        1 << (som_compiler::util::fnv1a_32("width") % 31)
    );
}

#[test]
fn declarations_merge_with_last_write_winning() {
    let analysis = analyze_css(".a { color: red; } .a { color: blue; width: 10px; }");
    let a = node(&analysis, ".a");
    assert_eq!(a.declarations.get("color").map(String::as_str), Some("blue"));
    assert_eq!(a.declarations.len(), 2);
}

#[test]
fn ids_deduplicate_with_suffixes() {
    let analysis = analyze_css(".panel { color: red; } #panel { color: blue; }");
    let first = node(&analysis, ".panel");
    let second = node(&analysis, "#panel");
    assert_eq!(first.id, "panel");
    assert_eq!(second.id, "panel_1");
}

#[test]
fn id_suffixes_skip_stems_that_are_already_taken() {
    // `.panel_1` claims the name a later collision would otherwise mint.
    let analysis = analyze_css(
        ".panel_1 { color: red; } .panel { color: blue; } #panel { color: green; }",
    );
    assert_eq!(node(&analysis, ".panel_1").id, "panel_1");
    assert_eq!(node(&analysis, ".panel").id, "panel");
    assert_eq!(node(&analysis, "#panel").id, "panel_2");

    let mut ids: Vec<String> = analysis.nodes.iter().map(|n| n.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), analysis.nodes.len(), "every id must be unique");
}
