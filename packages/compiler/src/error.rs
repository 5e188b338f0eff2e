//! Error types for the binary codec boundary.
//!
//! The analyzer itself never fails; only the emitter (on violated
//! invariants) and the loader (on corrupt input) surface errors.

use thiserror::Error;

/// Errors raised while serializing a compiled artifact.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    #[error("constant pool has not been finalized")]
    PoolNotFinalized,
    #[error("constant pool overflow: {0} entries exceeds the 24-bit index space")]
    PoolOverflow(usize),
    #[error("interned string of {0} bytes exceeds the 65535-byte entry limit")]
    StringTooLong(usize),
    #[error("string {0:?} was never interned before finalization")]
    UnknownString(String),
}

/// Errors raised while validating or reading a compiled artifact.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("invalid magic in {section} header")]
    InvalidMagic { section: &'static str },
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("unknown dynamic record type {0:#04x}")]
    UnknownRecordType(u8),
    #[error("truncated input while reading {context}")]
    Truncated { context: &'static str },
    #[error("section size mismatch in {section}: expected {expected} bytes, found {found}")]
    SectionSizeMismatch {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("constant pool entry count mismatch: header says {expected}, parsed {found}")]
    PoolCountMismatch { expected: usize, found: usize },
    #[error("pool reference {0:#08x} is out of range")]
    BadPoolRef(u32),
}
