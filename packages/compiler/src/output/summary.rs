//! Build summary.
//!
//! A serializable record emitted next to the binary: rule counts and
//! percentages per class, warnings as typed objects, boundary count and the
//! dependency-kind histogram.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Warning;
use crate::graph::component_node::Classification;
use crate::Analysis;

/// Rule counts per binding tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCounts {
    #[serde(rename = "static")]
    pub static_rules: usize,
    pub deterministic: usize,
    pub nondeterministic: usize,
    pub total: usize,
}

/// Percentage breakdown per class, rounded to one decimal. The rounded
/// values sum to at least 99 for any non-empty rule set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassPercentages {
    #[serde(rename = "static")]
    pub static_rules: f64,
    pub deterministic: f64,
    pub nondeterministic: f64,
}

/// The summary record emitted alongside the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileSummary {
    pub generated_at: String,
    pub sources: Vec<String>,
    pub binary_size: usize,
    pub fallback_size: usize,
    pub rule_counts: RuleCounts,
    pub percentages: ClassPercentages,
    pub warnings: Vec<Warning>,
    pub boundary_count: usize,
    pub dependency_histogram: IndexMap<String, usize>,
}

/// Assemble the summary for a finished compilation.
pub fn build_summary(
    analysis: &Analysis,
    binary_size: usize,
    fallback_size: usize,
    generated_at: String,
) -> CompileSummary {
    let mut counts = RuleCounts::default();
    for node in &analysis.nodes {
        counts.total += 1;
        match node.final_class {
            Classification::Static => counts.static_rules += 1,
            Classification::Deterministic => counts.deterministic += 1,
            Classification::Nondeterministic => counts.nondeterministic += 1,
        }
    }

    let percentages = if counts.total == 0 {
        ClassPercentages::default()
    } else {
        let total = counts.total as f64;
        ClassPercentages {
            static_rules: round1(counts.static_rules as f64 * 100.0 / total),
            deterministic: round1(counts.deterministic as f64 * 100.0 / total),
            nondeterministic: round1(counts.nondeterministic as f64 * 100.0 / total),
        }
    };

    let mut histogram: IndexMap<String, usize> = IndexMap::new();
    for node in &analysis.nodes {
        for dep in &node.deps {
            *histogram.entry(dep.kind.name().to_string()).or_insert(0) += 1;
        }
    }
    histogram.sort_keys();

    CompileSummary {
        generated_at,
        sources: analysis.sources.clone(),
        binary_size,
        fallback_size,
        rule_counts: counts,
        percentages,
        warnings: analysis.warnings(),
        boundary_count: analysis.manifests.len(),
        dependency_histogram: histogram,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Current timestamp in RFC 3339 form.
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
