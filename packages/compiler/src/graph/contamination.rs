//! Contamination propagation and boundary analysis.
//!
//! Final classes flow along effective-parent edges as a memoized max-walk.
//! Portal severance and cycle breaking keep the walked graph acyclic, so
//! every node is computed once.

use std::collections::HashSet;

use crate::diagnostics::{Warning, WarningKind};
use crate::graph::component_node::{
    BoundaryManifest, Classification, ComponentNode, DepKind, EmitType, ManifestFlags, NodeIndex,
};

/// Run the full contamination and boundary pass, returning the manifests
/// ordered by boundary source order.
pub fn run_contamination_pass(nodes: &mut Vec<ComponentNode>) -> Vec<BoundaryManifest> {
    propagate_final_classes(nodes);
    assign_boundaries(nodes);
    let manifests = build_manifests(nodes);
    assign_emit_types(nodes);

    tracing::debug!(
        boundaries = manifests.len(),
        nondeterministic = nodes
            .iter()
            .filter(|n| n.final_class == Classification::Nondeterministic)
            .count(),
        "contamination pass complete"
    );
    manifests
}

/// Memoized walk computing `final_class` and `contamination_source`.
fn propagate_final_classes(nodes: &mut [ComponentNode]) {
    let mut memo: Vec<Option<(Classification, Option<NodeIndex>)>> = vec![None; nodes.len()];
    let mut cycle_warnings: Vec<NodeIndex> = Vec::new();

    for index in 0..nodes.len() {
        let mut stack = Vec::new();
        walk_final_class(index, nodes, &mut memo, &mut stack, &mut cycle_warnings);
    }

    for index in 0..nodes.len() {
        let (final_class, source) = memo[index].unwrap_or((nodes[index].local_class, None));
        nodes[index].final_class = final_class;
        nodes[index].contamination_source = source;
    }
    for index in cycle_warnings {
        let id = nodes[index].id.clone();
        nodes[index].warnings.push(
            Warning::new(
                WarningKind::DepWarning,
                format!("cycle in effective-parent chain at {}", id),
            )
            .with_node(id),
        );
    }
}

fn walk_final_class(
    index: NodeIndex,
    nodes: &[ComponentNode],
    memo: &mut Vec<Option<(Classification, Option<NodeIndex>)>>,
    stack: &mut Vec<NodeIndex>,
    cycle_warnings: &mut Vec<NodeIndex>,
) -> (Classification, Option<NodeIndex>) {
    if let Some(result) = memo[index] {
        return result;
    }
    if stack.contains(&index) {
        // Effective-parent cycle: break it here, the rule keeps its local
        // class.
        if !cycle_warnings.contains(&index) {
            cycle_warnings.push(index);
        }
        return (nodes[index].local_class, None);
    }

    stack.push(index);
    let local = nodes[index].local_class;
    let result = match nodes[index].effective_parent {
        None => (local, None),
        Some(parent) => {
            let (parent_class, parent_source) =
                walk_final_class(parent, nodes, memo, stack, cycle_warnings);
            if parent_class > local {
                (parent_class, Some(parent_source.unwrap_or(parent)))
            } else {
                (local, None)
            }
        }
    };
    stack.pop();
    memo[index] = Some(result);
    result
}

/// A dynamic rule is a boundary iff it has no effective parent or its
/// effective parent is static; otherwise it inherits the parent's boundary.
fn assign_boundaries(nodes: &mut [ComponentNode]) {
    let mut memo: Vec<Option<Option<NodeIndex>>> = vec![None; nodes.len()];
    for index in 0..nodes.len() {
        let mut stack = Vec::new();
        walk_boundary(index, nodes, &mut memo, &mut stack);
    }
    for index in 0..nodes.len() {
        nodes[index].boundary = memo[index].flatten();
    }
}

fn walk_boundary(
    index: NodeIndex,
    nodes: &[ComponentNode],
    memo: &mut Vec<Option<Option<NodeIndex>>>,
    stack: &mut Vec<NodeIndex>,
) -> Option<NodeIndex> {
    if let Some(result) = memo[index] {
        return result;
    }
    if !nodes[index].final_class.is_dynamic() {
        memo[index] = Some(None);
        return None;
    }
    if stack.contains(&index) {
        return Some(index);
    }
    stack.push(index);
    let result = match nodes[index].effective_parent {
        None => Some(index),
        Some(parent) if !nodes[parent].final_class.is_dynamic() => Some(index),
        Some(parent) => walk_boundary(parent, nodes, memo, stack).or(Some(index)),
    };
    stack.pop();
    memo[index] = Some(result);
    result
}

/// Collect each boundary's subgraph and assemble its dependency manifest.
fn build_manifests(nodes: &[ComponentNode]) -> Vec<BoundaryManifest> {
    let mut boundaries: Vec<NodeIndex> = nodes
        .iter()
        .enumerate()
        .filter(|(index, node)| node.boundary == Some(*index))
        .map(|(index, _)| index)
        .collect();
    boundaries.sort_by_key(|index| nodes[*index].source_order);

    // Effective-child adjacency: tree children that do not portal away,
    // plus portal arrivals.
    let mut effective_children: Vec<Vec<NodeIndex>> = vec![Vec::new(); nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        if let Some(parent) = node.effective_parent {
            effective_children[parent].push(index);
        }
    }

    boundaries
        .into_iter()
        .map(|boundary| {
            let subgraph = collect_subgraph(nodes, &effective_children, boundary);
            assemble_manifest(nodes, boundary, subgraph)
        })
        .collect()
}

/// Depth-first traversal along effective-child edges, skipping static
/// children and children owned by a different boundary. Tree children that
/// portal elsewhere are not effective children, so the traversal never
/// crosses a portal; rules portaling into the subgraph are picked up.
fn collect_subgraph(
    nodes: &[ComponentNode],
    effective_children: &[Vec<NodeIndex>],
    boundary: NodeIndex,
) -> Vec<NodeIndex> {
    let mut members = vec![boundary];
    let mut pending = vec![boundary];
    while let Some(index) = pending.pop() {
        for &child in &effective_children[index] {
            if !nodes[child].final_class.is_dynamic() {
                continue;
            }
            if nodes[child].boundary != Some(boundary) {
                continue;
            }
            if members.contains(&child) {
                continue;
            }
            members.push(child);
            pending.push(child);
        }
    }
    members.sort_by_key(|index| nodes[*index].source_order);
    members
}

fn assemble_manifest(
    nodes: &[ComponentNode],
    boundary: NodeIndex,
    subgraph: Vec<NodeIndex>,
) -> BoundaryManifest {
    let mut entries = Vec::new();
    let mut seen: HashSet<(NodeIndex, String, DepKind, Option<NodeIndex>)> = HashSet::new();
    let mut flags = ManifestFlags::empty();

    for &member in &subgraph {
        if nodes[member].declares_portal() {
            flags |= ManifestFlags::PORTAL_DEPENDENCY;
        }
        for dep in &nodes[member].deps {
            if dep.kind == DepKind::Theme {
                // Theme-only updates are invalidated separately by the
                // runtime; record the presence, drop the entry.
                flags |= ManifestFlags::THEME_DEPENDENCY;
                continue;
            }
            let key = (dep.owner, dep.property.clone(), dep.kind, dep.container);
            if seen.insert(key) {
                entries.push(dep.clone());
            }
        }
    }

    if entries.is_empty() {
        flags |= ManifestFlags::CONTAMINATION_ONLY;
    }

    BoundaryManifest {
        boundary,
        subgraph,
        entries,
        flags,
    }
}

fn assign_emit_types(nodes: &mut [ComponentNode]) {
    for index in 0..nodes.len() {
        nodes[index].emit_type = if !nodes[index].final_class.is_dynamic() {
            EmitType::ResolvedStyleBlock
        } else if nodes[index].boundary == Some(index) {
            EmitType::DynamicBoundary
        } else {
            EmitType::RuleSet
        };
    }
}
