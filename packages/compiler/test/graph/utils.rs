//! Shared helpers for the graph test suites.

use som_compiler::graph::component_node::{ComponentNode, NodeIndex};
use som_compiler::{analyze, Analysis, CompileOptions, StyleSource};

pub fn analyze_css(css: &str) -> Analysis {
    analyze(
        &[StyleSource::new("test.css", css)],
        &CompileOptions::default(),
    )
}

pub fn node<'a>(analysis: &'a Analysis, selector: &str) -> &'a ComponentNode {
    analysis
        .node_by_selector(selector)
        .unwrap_or_else(|| panic!("no rule for selector {:?}", selector))
}

#[allow(dead_code)]
pub fn index_of(analysis: &Analysis, selector: &str) -> NodeIndex {
    analysis
        .selector_index
        .get(selector)
        .copied()
        .unwrap_or_else(|| panic!("no rule for selector {:?}", selector))
}
