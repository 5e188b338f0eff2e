//! The rule graph: arena data model, construction and contamination
//! analysis.

pub mod builder;
pub mod component_node;
pub mod contamination;

pub use builder::{build_graph, RuleGraph};
pub use component_node::{
    BoundaryManifest, Classification, ComponentNode, DepEntry, DepKind, EmitType, ManifestFlags,
    NodeIndex,
};
pub use contamination::run_contamination_pass;
