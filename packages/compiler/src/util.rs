//! Common utility functions shared across the compiler.

use once_cell::sync::Lazy;
use regex::Regex;

/// FNV-1a offset basis (32-bit).
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
/// FNV-1a prime (32-bit).
const FNV_PRIME: u32 = 0x0100_0193;

/// Hash the UTF-8 bytes of `input` with 32-bit FNV-1a.
///
/// Selector hashes throughout the binary format are produced by this
/// function; the result depends only on the input bytes.
pub fn fnv1a_32(input: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RUN.replace_all(input.trim(), " ").to_string()
}

/// Replace every character that cannot appear in an identifier with an
/// underscore.
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Format a 32-bit hash the way the fallback map keys it: lower-case hex
/// with a `0x` prefix and no leading zeros.
pub fn format_hash(hash: u32) -> String {
    format!("{:#x}", hash)
}
