//! `somc` driver: thin command-line surface over the compiler core.
//!
//! Exit statuses: 0 on success with no nondeterministic rules, 1 on
//! success with nondeterministic rules present, 2 on invocation errors.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indexmap::IndexMap;

use som_compiler::loader::LoaderStats;
use som_compiler::output::CompileSummary;
use som_compiler::{compile, CompileOptions, CompileResult, CompiledStyles, StyleSource};

#[derive(Debug, Parser)]
#[command(
    name = "somc",
    about = "Stylesheet static analyzer and binary compiler",
    version
)]
pub struct Cli {
    /// Stylesheet source files, analyzed as one rule set in argument order
    #[arg(required_unless_present = "stats")]
    pub inputs: Vec<PathBuf>,

    /// Load an existing compiled artifact, print its loader statistics
    /// and exit
    #[arg(long, value_name = "FILE", conflicts_with = "inputs")]
    pub stats: Option<PathBuf>,

    /// External token table: a JSON object mapping custom-property names
    /// (`--name`) to raw values. Stylesheet definitions override it.
    #[arg(long, value_name = "FILE")]
    pub tokens: Option<PathBuf>,

    /// Previous summary snapshot to diff against (watch mode)
    #[arg(long, value_name = "FILE")]
    pub diff: Option<PathBuf>,

    /// Print the summary record as JSON instead of the report
    #[arg(long)]
    pub json: bool,

    /// Write the binary artifact to this path
    #[arg(long, value_name = "FILE")]
    pub binary: Option<PathBuf>,

    /// Write the fallback stylesheet to this path
    #[arg(long, value_name = "FILE")]
    pub fallback: Option<PathBuf>,
}

/// Run the driver. Returns the process exit code for successful runs;
/// invocation failures surface as errors (exit code 2).
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    if let Some(path) = &cli.stats {
        let data = fs::read(path)
            .with_context(|| format!("failed to read artifact {}", path.display()))?;
        let loader = CompiledStyles::load(&data)
            .with_context(|| format!("invalid artifact {}", path.display()))?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(loader.stats())?);
        } else {
            print!("{}", render_stats(loader.stats()));
        }
        return Ok(0);
    }

    let mut sources = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read stylesheet {}", path.display()))?;
        sources.push(StyleSource::new(path.display().to_string(), content));
    }

    let mut options = CompileOptions::default();
    if let Some(path) = &cli.tokens {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read token table {}", path.display()))?;
        options.extra_tokens = parse_token_table(&text)
            .with_context(|| format!("invalid token table {}", path.display()))?;
    }

    let result = compile(&sources, &options).context("compilation failed")?;

    if let Some(path) = &cli.binary {
        fs::write(path, &result.binary)
            .with_context(|| format!("failed to write binary {}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = result.binary.len(), "binary written");
    }
    if let Some(path) = &cli.fallback {
        fs::write(path, &result.fallback_css)
            .with_context(|| format!("failed to write fallback {}", path.display()))?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.summary)?);
    } else {
        print!("{}", render_report(&result));
    }

    if let Some(path) = &cli.diff {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read diff snapshot {}", path.display()))?;
        let previous: CompileSummary = serde_json::from_str(&text)
            .with_context(|| format!("invalid diff snapshot {}", path.display()))?;
        print!("{}", render_diff(&previous, &result.summary));
    }

    let nondeterministic = result.summary.rule_counts.nondeterministic;
    Ok(if nondeterministic > 0 { 1 } else { 0 })
}

/// Parse the external token table JSON. Keys must be `--`-prefixed
/// custom-property names; values are raw value strings.
pub fn parse_token_table(text: &str) -> anyhow::Result<IndexMap<String, String>> {
    let table: IndexMap<String, String> = serde_json::from_str(text)?;
    for key in table.keys() {
        anyhow::ensure!(
            key.starts_with("--"),
            "token name {:?} must start with --",
            key
        );
    }
    Ok(table)
}

/// Human-readable report of one compilation.
pub fn render_report(result: &CompileResult) -> String {
    let summary = &result.summary;
    let counts = &summary.rule_counts;
    let mut out = String::new();

    out.push_str(&format!("sources: {}\n", summary.sources.join(", ")));
    out.push_str(&format!(
        "rules: {} total | static {} ({}%) | deterministic {} ({}%) | nondeterministic {} ({}%)\n",
        counts.total,
        counts.static_rules,
        summary.percentages.static_rules,
        counts.deterministic,
        summary.percentages.deterministic,
        counts.nondeterministic,
        summary.percentages.nondeterministic,
    ));
    out.push_str(&format!(
        "boundaries: {} | binary: {} bytes | fallback: {} bytes\n",
        summary.boundary_count, summary.binary_size, summary.fallback_size
    ));

    if !summary.dependency_histogram.is_empty() {
        out.push_str("dependencies:\n");
        for (kind, count) in &summary.dependency_histogram {
            out.push_str(&format!("  {:<16} {}\n", kind, count));
        }
    }
    if !summary.warnings.is_empty() {
        out.push_str(&format!("warnings ({}):\n", summary.warnings.len()));
        for warning in &summary.warnings {
            let node = warning.node_id.as_deref().unwrap_or("-");
            out.push_str(&format!("  [{:?}] {}: {}\n", warning.kind, node, warning.message));
        }
    }
    out
}

/// Loader statistics for a compiled artifact.
pub fn render_stats(stats: &LoaderStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("file size:       {} bytes\n", stats.file_size));
    out.push_str(&format!("pool entries:    {}\n", stats.pool_entries));
    out.push_str(&format!("static records:  {}\n", stats.static_count));
    out.push_str(&format!(
        "indexed dynamic: {}\n",
        stats.indexed_dynamic_count
    ));
    out.push_str(&format!("parse time:      {:.3} ms\n", stats.parse_time_ms));
    out
}

/// Diff report between the previous snapshot and the current run.
pub fn render_diff(previous: &CompileSummary, current: &CompileSummary) -> String {
    let mut out = String::new();
    out.push_str("diff against previous snapshot:\n");
    out.push_str(&format!(
        "  static          {:+}\n",
        current.rule_counts.static_rules as i64 - previous.rule_counts.static_rules as i64
    ));
    out.push_str(&format!(
        "  deterministic   {:+}\n",
        current.rule_counts.deterministic as i64 - previous.rule_counts.deterministic as i64
    ));
    out.push_str(&format!(
        "  nondeterministic {:+}\n",
        current.rule_counts.nondeterministic as i64
            - previous.rule_counts.nondeterministic as i64
    ));
    out.push_str(&format!(
        "  binary size     {:+} bytes\n",
        current.binary_size as i64 - previous.binary_size as i64
    ));
    out.push_str(&format!(
        "  warnings        {:+}\n",
        current.warnings.len() as i64 - previous.warnings.len() as i64
    ));
    out
}
