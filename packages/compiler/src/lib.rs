#![deny(clippy::all)]

//! Static analyzer and binary compiler for stylesheet rules.
//!
//! The pipeline classifies every rule into one of three binding tiers
//! (absolute-resolvable, runtime-deterministic, structurally
//! nondeterministic) and emits a compact self-describing binary artifact
//! plus a textual fallback for rules that cannot be statically captured:
//!
//! parse -> classify values -> resolve tokens -> build graph -> propagate
//! contamination -> assemble manifests -> intern pool -> emit tiers.

// Core modules
pub mod chars;
pub mod constant_pool;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod util;

// Pipeline modules
pub mod classify;
pub mod graph;
pub mod output;
pub mod stylesheet_parser;

use indexmap::IndexMap;

use classify::value_classifier::SeenUnresolved;
use classify::TokenTable;
use diagnostics::Warning;
use graph::component_node::{BoundaryManifest, ComponentNode, NodeIndex};
use output::CompileSummary;
use stylesheet_parser::ast::RawTokenTable;

pub use error::{EmitError, LoadError};
pub use graph::component_node::Classification;
pub use loader::CompiledStyles;

/// One named stylesheet input.
#[derive(Debug, Clone)]
pub struct StyleSource {
    pub name: String,
    pub content: String,
}

impl StyleSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        StyleSource {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Analysis options.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// External token table merged beneath the stylesheet-defined tokens:
    /// a stylesheet definition of the same name wins.
    pub extra_tokens: IndexMap<String, String>,
}

/// The analyzed rule graph together with everything derived from it.
#[derive(Debug)]
pub struct Analysis {
    pub nodes: Vec<ComponentNode>,
    /// Canonical selector -> arena index.
    pub selector_index: IndexMap<String, NodeIndex>,
    /// Flattened custom-property table.
    pub token_table: TokenTable,
    /// One manifest per dynamic boundary, ordered by boundary source order.
    pub manifests: Vec<BoundaryManifest>,
    /// Warnings not owned by any rule (token table flattening).
    pub analysis_warnings: Vec<Warning>,
    /// Input names in the order they were supplied.
    pub sources: Vec<String>,
}

impl Analysis {
    /// Every warning of the analysis in stable order: analysis-level
    /// warnings first, then per-rule warnings by source order.
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings = self.analysis_warnings.clone();
        for node in &self.nodes {
            warnings.extend(node.warnings.iter().cloned());
        }
        warnings
    }

    pub fn node_by_selector(&self, selector: &str) -> Option<&ComponentNode> {
        self.selector_index
            .get(selector)
            .map(|index| &self.nodes[*index])
    }

    pub fn manifest_for(&self, boundary: NodeIndex) -> Option<&BoundaryManifest> {
        self.manifests
            .iter()
            .find(|manifest| manifest.boundary == boundary)
    }
}

/// A finished compilation.
#[derive(Debug)]
pub struct CompileResult {
    pub analysis: Analysis,
    pub binary: Vec<u8>,
    pub fallback_css: String,
    pub fallback_map: IndexMap<String, String>,
    pub summary: CompileSummary,
}

/// Analyze one or more stylesheet sources into a rule graph.
pub fn analyze(sources: &[StyleSource], options: &CompileOptions) -> Analysis {
    let mut rules = Vec::new();
    let mut raw_tokens: RawTokenTable = options.extra_tokens.clone();

    for source in sources {
        let parsed = stylesheet_parser::parse_stylesheet(&source.content);
        rules.extend(parsed.rules);
        for (name, value) in parsed.raw_tokens {
            raw_tokens.insert(name, value);
        }
    }

    let mut seen_unresolved = SeenUnresolved::new();
    let (token_table, analysis_warnings) =
        TokenTable::flatten(&raw_tokens, &mut seen_unresolved);

    let rule_graph = graph::build_graph(&rules, &raw_tokens, &mut seen_unresolved);
    let graph::RuleGraph {
        mut nodes,
        selector_index,
    } = rule_graph;
    let manifests = graph::run_contamination_pass(&mut nodes);

    tracing::info!(
        sources = sources.len(),
        rules = nodes.len(),
        boundaries = manifests.len(),
        "analysis complete"
    );

    Analysis {
        nodes,
        selector_index,
        token_table,
        manifests,
        analysis_warnings,
        sources: sources.iter().map(|s| s.name.clone()).collect(),
    }
}

/// Analyze and emit: binary artifact, fallback text, fallback map and
/// summary record.
pub fn compile(
    sources: &[StyleSource],
    options: &CompileOptions,
) -> Result<CompileResult, EmitError> {
    let analysis = analyze(sources, options);
    let binary = output::emit_binary(&analysis)?;
    let fallback_css = output::emit_fallback_text(&analysis);
    let fallback_map = output::emit_fallback_map(&analysis);
    let summary = output::build_summary(
        &analysis,
        binary.len(),
        fallback_css.len(),
        output::current_timestamp(),
    );

    Ok(CompileResult {
        analysis,
        binary,
        fallback_css,
        fallback_map,
        summary,
    })
}
