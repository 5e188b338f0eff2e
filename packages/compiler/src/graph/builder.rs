//! Rule graph construction.
//!
//! Parsed rules merge into one `ComponentNode` per unique canonical
//! selector. The builder derives stable ids, classifies every declaration,
//! wires tree-parent and portal edges and fills in container ancestors for
//! container-unit dependencies.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::classify::value_classifier::{classify_declaration, media_signals, SeenUnresolved};
use crate::diagnostics::{Warning, WarningKind};
use crate::graph::component_node::{
    Classification, ComponentNode, DepEntry, DepKind, NodeIndex, MEDIA_PROPERTY, SELECTOR_PROPERTY,
};
use crate::stylesheet_parser::ast::{ParsedRule, RawTokenTable};
use crate::stylesheet_parser::selector::{
    extract_parent_selector, has_structural_pseudo, rightmost_compound_stem,
};

/// The assembled rule graph.
#[derive(Debug, Default)]
pub struct RuleGraph {
    pub nodes: Vec<ComponentNode>,
    /// Canonical selector -> arena index.
    pub selector_index: IndexMap<String, NodeIndex>,
}

impl RuleGraph {
    pub fn node_by_selector(&self, selector: &str) -> Option<NodeIndex> {
        self.selector_index.get(selector).copied()
    }
}

/// Build the graph from the parsed rule stream.
pub fn build_graph(
    rules: &[ParsedRule],
    raw_tokens: &RawTokenTable,
    seen_unresolved: &mut SeenUnresolved,
) -> RuleGraph {
    let mut graph = RuleGraph::default();

    merge_rules(rules, &mut graph);
    derive_ids(&mut graph.nodes);
    classify_nodes(&mut graph.nodes, raw_tokens, seen_unresolved);
    link_tree_parents(&mut graph);
    resolve_portals(&mut graph.nodes);
    assign_containers(&mut graph.nodes);

    tracing::debug!(nodes = graph.nodes.len(), "rule graph built");
    graph
}

/// One node per unique selector; declarations merge with last write wins.
fn merge_rules(rules: &[ParsedRule], graph: &mut RuleGraph) {
    for rule in rules {
        for selector in &rule.selectors {
            let index = match graph.selector_index.get(selector) {
                Some(index) => *index,
                None => {
                    let index = graph.nodes.len();
                    graph
                        .nodes
                        .push(ComponentNode::new(selector.clone(), index));
                    graph.selector_index.insert(selector.clone(), index);
                    index
                }
            };
            let node = &mut graph.nodes[index];
            for (property, value) in &rule.declarations {
                node.declarations.insert(property.clone(), value.clone());
            }
            if let Some(query) = &rule.media_query {
                if !node.media_queries.contains(query) {
                    node.media_queries.push(query.clone());
                }
            }
        }
    }
}

/// Derive stable ids from the rightmost compound, suffixing on collision.
fn derive_ids(nodes: &mut [ComponentNode]) {
    let mut claimed: HashMap<String, u32> = HashMap::new();
    for node in nodes.iter_mut() {
        let stem = rightmost_compound_stem(&node.selector);
        let id = match claimed.get(&stem).copied() {
            None => {
                claimed.insert(stem.clone(), 0);
                stem
            }
            Some(mut count) => {
                // A generated suffix can itself be taken already, when an
                // earlier rule's stem happens to look suffixed (`.panel_1`
                // before the second `.panel`). Keep bumping until free.
                let unique = loop {
                    count += 1;
                    let candidate = format!("{}_{}", stem, count);
                    if !claimed.contains_key(&candidate) {
                        break candidate;
                    }
                };
                claimed.insert(stem.clone(), count);
                claimed.insert(unique.clone(), 0);
                unique
            }
        };
        node.id = id;
    }
}

/// Classify every declaration and synthesize selector- and media-derived
/// dependencies.
fn classify_nodes(
    nodes: &mut [ComponentNode],
    raw_tokens: &RawTokenTable,
    seen_unresolved: &mut SeenUnresolved,
) {
    for index in 0..nodes.len() {
        let declarations = nodes[index].declarations.clone();
        let mut local_class = Classification::Static;

        for (property, value) in &declarations {
            let outcome = classify_declaration(property, value, raw_tokens, seen_unresolved);
            local_class = local_class.max(outcome.classification);

            let node = &mut nodes[index];
            node.normalized_declarations
                .insert(property.clone(), outcome.normalized);
            if let Some(target) = outcome.portal_target {
                node.portal_target_raw = Some(target);
            }
            if outcome.container_boundary {
                node.is_container_boundary = true;
            }
            for pending in outcome.deps {
                node.push_dep(DepEntry::new(
                    index,
                    property.as_str(),
                    pending.kind,
                    pending.expression,
                ));
            }
            for warning in outcome.warnings {
                let warning = warning.with_node(node.id.clone());
                node.warnings.push(warning);
            }
        }

        // Structural pseudo-classes force the rule out of deterministic
        // territory; matching depends on sibling structure.
        if has_structural_pseudo(&nodes[index].selector) {
            local_class = Classification::Nondeterministic;
            let node = &mut nodes[index];
            let selector = node.selector.clone();
            node.push_dep(DepEntry::new(
                index,
                SELECTOR_PROPERTY,
                DepKind::Structure,
                selector.clone(),
            ));
            let id = node.id.clone();
            node.warnings.push(
                Warning::new(
                    WarningKind::StructuralDynamic,
                    format!("structural pseudo-class in selector {}", selector),
                )
                .with_node(id),
            );
        }

        // Media-derived synthetic deps, one per distinct condition.
        let queries = nodes[index].media_queries.clone();
        for query in queries {
            let signals = media_signals(&query);
            let node = &mut nodes[index];
            if signals.viewport {
                node.push_dep(DepEntry::new(
                    index,
                    MEDIA_PROPERTY,
                    DepKind::Viewport,
                    query.clone(),
                ));
                local_class = local_class.max(Classification::Deterministic);
            }
            if signals.user_pref {
                node.push_dep(DepEntry::new(
                    index,
                    query.clone(),
                    DepKind::UserPref,
                    query.clone(),
                ));
                local_class = local_class.max(Classification::Deterministic);
            }
        }

        nodes[index].local_class = local_class;
    }
}

/// Wire tree-parent edges: repeatedly drop the trailing segment until a
/// known selector is found.
fn link_tree_parents(graph: &mut RuleGraph) {
    let mut parents: Vec<Option<NodeIndex>> = vec![None; graph.nodes.len()];
    for (index, node) in graph.nodes.iter().enumerate() {
        let mut candidate = extract_parent_selector(&node.selector);
        while let Some(selector) = candidate {
            if let Some(parent) = graph.node_by_selector(&selector) {
                if parent != index {
                    parents[index] = Some(parent);
                }
                break;
            }
            candidate = extract_parent_selector(&selector);
        }
    }
    for (index, parent) in parents.iter().enumerate() {
        graph.nodes[index].tree_parent = *parent;
        if let Some(parent) = *parent {
            graph.nodes[parent].tree_children.push(index);
        }
    }
}

/// Resolve portal targets and compute effective parents.
///
/// A resolved portal replaces tree parenthood entirely; contamination along
/// the tree path is cut. An unresolved portal leaves the rule parentless.
fn resolve_portals(nodes: &mut [ComponentNode]) {
    let mut by_id: HashMap<String, NodeIndex> = HashMap::new();
    let mut by_selector: HashMap<String, NodeIndex> = HashMap::new();
    let mut by_alias: HashMap<String, NodeIndex> = HashMap::new();
    for (index, node) in nodes.iter().enumerate() {
        by_id.entry(node.id.clone()).or_insert(index);
        by_selector.entry(node.selector.clone()).or_insert(index);
        by_alias.entry(node.id.to_ascii_lowercase()).or_insert(index);
    }

    for index in 0..nodes.len() {
        let Some(raw) = nodes[index].portal_target_raw.clone() else {
            nodes[index].effective_parent = nodes[index].tree_parent;
            continue;
        };
        let raw = raw.trim().to_string();
        let target = by_id
            .get(&raw)
            .or_else(|| by_selector.get(&raw))
            .or_else(|| by_selector.get(&format!(".{}", raw)))
            .or_else(|| by_selector.get(&format!("#{}", raw)))
            .or_else(|| by_alias.get(&raw.to_ascii_lowercase()))
            .copied()
            .filter(|target| *target != index);

        match target {
            Some(target) => {
                nodes[index].portal_target = Some(target);
                nodes[index].effective_parent = Some(target);
            }
            None => {
                nodes[index].effective_parent = None;
                let id = nodes[index].id.clone();
                nodes[index].warnings.push(
                    Warning::new(
                        WarningKind::PortalMissing,
                        format!("portal target {:?} does not resolve to a rule", raw),
                    )
                    .with_node(id),
                );
            }
        }
    }
}

/// Fill the nearest registered container ancestor into every
/// container-unit dependency, walking the tree-parent chain.
fn assign_containers(nodes: &mut [ComponentNode]) {
    let mut assignments: Vec<(NodeIndex, usize, Option<NodeIndex>)> = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        for (dep_index, dep) in node.deps.iter().enumerate() {
            if dep.kind != DepKind::ContainerSize {
                continue;
            }
            let mut cursor = node.tree_parent;
            let mut container = None;
            while let Some(ancestor) = cursor {
                if nodes[ancestor].is_container_boundary {
                    container = Some(ancestor);
                    break;
                }
                cursor = nodes[ancestor].tree_parent;
            }
            assignments.push((index, dep_index, container));
        }
    }

    for (index, dep_index, container) in assignments {
        nodes[index].deps[dep_index].container = container;
        if container.is_none() {
            let id = nodes[index].id.clone();
            let expression = nodes[index].deps[dep_index].expression.clone();
            let property = nodes[index].deps[dep_index].property.clone();
            nodes[index].warnings.push(
                Warning::new(
                    WarningKind::MissingContainer,
                    format!(
                        "container-unit value {} has no registered container ancestor",
                        expression
                    ),
                )
                .with_node(id)
                .with_property(property),
            );
        }
    }
}
