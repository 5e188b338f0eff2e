//! Textual fallback output.
//!
//! Rules the binary cannot capture (structurally nondeterministic ones) are
//! carried as stylesheet text plus a hash-to-selector map, ordered by
//! selector hash ascending with the selector text breaking ties.

use indexmap::IndexMap;

use crate::graph::component_node::{Classification, ComponentNode};
use crate::util::format_hash;
use crate::Analysis;

/// Nondeterministic rules in fallback emission order.
pub fn nondeterministic_nodes(analysis: &Analysis) -> Vec<&ComponentNode> {
    let mut nodes: Vec<&ComponentNode> = analysis
        .nodes
        .iter()
        .filter(|node| node.final_class == Classification::Nondeterministic)
        .collect();
    nodes.sort_by(|a, b| {
        a.selector_hash()
            .cmp(&b.selector_hash())
            .then_with(|| a.selector.cmp(&b.selector))
    });
    nodes
}

/// Emit the fallback stylesheet: every nondeterministic rule with its raw
/// merged declarations in insertion order.
pub fn emit_fallback_text(analysis: &Analysis) -> String {
    let mut out = String::new();
    for node in nondeterministic_nodes(analysis) {
        out.push_str(&node.selector);
        out.push_str(" {\n");
        for (property, value) in &node.declarations {
            out.push_str("  ");
            out.push_str(property);
            out.push_str(": ");
            out.push_str(value);
            out.push_str(";\n");
        }
        out.push_str("}\n");
    }
    out
}

/// Emit the fallback map: `0x<hash>` (lower-case hex) to original selector.
pub fn emit_fallback_map(analysis: &Analysis) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for node in nondeterministic_nodes(analysis) {
        map.insert(format_hash(node.selector_hash()), node.selector.clone());
    }
    map
}
