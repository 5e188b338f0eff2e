//! The rule graph data model.
//!
//! Rules live in an arena; every cross-reference (tree parent, portal
//! target, boundary) is an arena index rather than a pointer, which keeps
//! the graph free of ownership cycles.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::diagnostics::Warning;
use crate::util::fnv1a_32;

/// Arena index of a rule.
pub type NodeIndex = usize;

/// Binding tier of a rule or value.
///
/// The ranking is total and classification composes as a max-monoid:
/// a rule's final class is the maximum of its local class and its
/// effective parent's final class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Absolute-resolvable at compile time.
    #[default]
    Static,
    /// Runtime-computable from enumerable environmental inputs.
    Deterministic,
    /// Structurally nondeterministic; only the textual fallback can carry it.
    Nondeterministic,
}

impl Classification {
    pub fn is_dynamic(self) -> bool {
        self != Classification::Static
    }
}

/// The environmental input a dependency points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum DepKind {
    ParentSize = 0,
    Viewport = 1,
    FontMetrics = 2,
    Env = 3,
    Theme = 4,
    ContainerSize = 5,
    UserPref = 6,
    IntrinsicSize = 7,
    Structure = 8,
}

impl DepKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<DepKind> {
        match code {
            0 => Some(DepKind::ParentSize),
            1 => Some(DepKind::Viewport),
            2 => Some(DepKind::FontMetrics),
            3 => Some(DepKind::Env),
            4 => Some(DepKind::Theme),
            5 => Some(DepKind::ContainerSize),
            6 => Some(DepKind::UserPref),
            7 => Some(DepKind::IntrinsicSize),
            8 => Some(DepKind::Structure),
            _ => None,
        }
    }

    /// Name used by the summary's dependency histogram.
    pub fn name(self) -> &'static str {
        match self {
            DepKind::ParentSize => "PARENT_SIZE",
            DepKind::Viewport => "VIEWPORT",
            DepKind::FontMetrics => "FONT_METRICS",
            DepKind::Env => "ENV",
            DepKind::Theme => "THEME",
            DepKind::ContainerSize => "CONTAINER_SIZE",
            DepKind::UserPref => "USER_PREF",
            DepKind::IntrinsicSize => "INTRINSIC_SIZE",
            DepKind::Structure => "STRUCTURE",
        }
    }
}

/// Sentinel property for media-derived synthetic dependencies.
pub const MEDIA_PROPERTY: &str = "__media__";
/// Sentinel property for selector-derived structural dependencies.
pub const SELECTOR_PROPERTY: &str = "__selector__";

/// One typed edge from a rule to an environmental input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepEntry {
    pub owner: NodeIndex,
    pub property: String,
    pub kind: DepKind,
    pub invalidation_mask: u32,
    pub expression: String,
    pub container: Option<NodeIndex>,
}

impl DepEntry {
    pub fn new(
        owner: NodeIndex,
        property: impl Into<String>,
        kind: DepKind,
        expression: impl Into<String>,
    ) -> Self {
        let property = property.into();
        let invalidation_mask = invalidation_mask(&property, kind);
        DepEntry {
            owner,
            property,
            kind,
            invalidation_mask,
            expression: expression.into(),
            container: None,
        }
    }
}

/// Bit position a property invalidates. The low 31 bits are shared across
/// properties; bit 31 is reserved for structural invalidation.
pub fn invalidation_mask(property: &str, kind: DepKind) -> u32 {
    if kind == DepKind::Structure {
        1 << 31
    } else {
        1 << (fnv1a_32(property) % 31)
    }
}

/// How a rule is represented in the compiled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EmitType {
    /// Fully static: a resolved style block.
    #[default]
    ResolvedStyleBlock,
    /// Root of a contamination subgraph: boundary marker, rule set and
    /// dependency manifest.
    DynamicBoundary,
    /// Contaminated non-boundary rule: a rule set pointing at its boundary.
    RuleSet,
}

/// A single selector's accumulated declarations and analysis results.
#[derive(Debug, Clone)]
pub struct ComponentNode {
    /// Stable identifier derived from the rightmost compound, deduplicated
    /// by suffixing.
    pub id: String,
    /// Canonical, whitespace-normalized selector text.
    pub selector: String,
    pub source_order: usize,
    /// Distinct media conditions of every parsed rule merged into this node,
    /// in first-seen order.
    pub media_queries: Vec<String>,
    /// Raw declarations; unique keys, last write wins.
    pub declarations: IndexMap<String, String>,
    /// Normalized declarations, same keys as `declarations`.
    pub normalized_declarations: IndexMap<String, String>,
    pub tree_parent: Option<NodeIndex>,
    pub tree_children: Vec<NodeIndex>,
    pub portal_target_raw: Option<String>,
    pub portal_target: Option<NodeIndex>,
    pub effective_parent: Option<NodeIndex>,
    pub is_container_boundary: bool,
    pub local_class: Classification,
    pub final_class: Classification,
    pub contamination_source: Option<NodeIndex>,
    /// For dynamic rules, the nearest boundary in the effective-parent
    /// chain (self if this rule is itself a boundary).
    pub boundary: Option<NodeIndex>,
    pub deps: Vec<DepEntry>,
    pub warnings: Vec<Warning>,
    pub emit_type: EmitType,
}

impl ComponentNode {
    pub fn new(selector: String, source_order: usize) -> Self {
        ComponentNode {
            id: String::new(),
            selector,
            source_order,
            media_queries: Vec::new(),
            declarations: IndexMap::new(),
            normalized_declarations: IndexMap::new(),
            tree_parent: None,
            tree_children: Vec::new(),
            portal_target_raw: None,
            portal_target: None,
            effective_parent: None,
            is_container_boundary: false,
            local_class: Classification::Static,
            final_class: Classification::Static,
            contamination_source: None,
            boundary: None,
            deps: Vec::new(),
            warnings: Vec::new(),
            emit_type: EmitType::ResolvedStyleBlock,
        }
    }

    /// FNV-1a-32 of the canonical selector.
    pub fn selector_hash(&self) -> u32 {
        fnv1a_32(&self.selector)
    }

    /// True when the rule declares a portal destination, resolved or not.
    pub fn declares_portal(&self) -> bool {
        self.portal_target_raw.is_some()
    }

    /// Append a dependency unless an equal one (same property, kind,
    /// container and expression) is already present.
    pub fn push_dep(&mut self, dep: DepEntry) {
        let duplicate = self.deps.iter().any(|d| {
            d.property == dep.property
                && d.kind == dep.kind
                && d.container == dep.container
                && d.expression == dep.expression
        });
        if !duplicate {
            self.deps.push(dep);
        }
    }
}

bitflags::bitflags! {
    /// Flags carried by a boundary manifest.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ManifestFlags: u8 {
        /// Some subgraph member declares a portal destination.
        const PORTAL_DEPENDENCY = 1 << 0;
        /// A THEME dependency existed before the manifest exclusion.
        const THEME_DEPENDENCY = 1 << 1;
        /// The manifest has no runtime entries beyond contamination.
        const CONTAMINATION_ONLY = 1 << 2;
    }
}

/// The deduplicated dependency set emitted once per dynamic boundary.
#[derive(Debug, Clone)]
pub struct BoundaryManifest {
    pub boundary: NodeIndex,
    /// Subgraph members (boundary included), sorted by source order.
    pub subgraph: Vec<NodeIndex>,
    /// Deduplicated non-THEME dependencies across the subgraph.
    pub entries: Vec<DepEntry>,
    pub flags: ManifestFlags,
}

/// Per-rule dependency signal produced by the value classifier before the
/// owning node is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDep {
    pub kind: DepKind,
    pub expression: String,
}

pub type PendingDeps = SmallVec<[PendingDep; 4]>;
