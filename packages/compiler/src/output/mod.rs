//! Artifact emission: the binary codec, the textual fallback and the build
//! summary.

pub mod binary_emitter;
pub mod fallback;
pub mod summary;

pub use binary_emitter::{
    emit_binary, DYNAMIC_INDEX_MAGIC, FILE_MAGIC, FORMAT_VERSION, RECORD_BOUNDARY_MARKER,
    RECORD_NONDETERMINISTIC, RECORD_RULE_SET, STATIC_MAGIC,
};
pub use fallback::{emit_fallback_map, emit_fallback_text};
pub use summary::{build_summary, current_timestamp, ClassPercentages, CompileSummary, RuleCounts};
