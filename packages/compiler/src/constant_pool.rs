//! Constant pool.
//!
//! A self-contained, versioned section mapping integer indices to UTF-8
//! strings. The pool is a two-phase builder: interning only collects the
//! string set, finalization sorts it lexicographically by UTF-8 byte value
//! and assigns indices. Output bytes therefore depend only on the set of
//! interned strings, never on encounter order.

use std::collections::{BTreeSet, HashMap};
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{EmitError, LoadError};

/// Reserved index for null, undefined and empty strings.
pub const NULL_REF: u32 = 0x00FF_FFFF;

/// Pool section magic.
pub const POOL_MAGIC: &[u8; 4] = b"SOMP";

/// Pool format version.
pub const POOL_VERSION: u8 = 1;

/// Maximum byte length of one interned string.
pub const MAX_STRING_BYTES: usize = u16::MAX as usize;

/// Common property names interned unconditionally so pool indices stay
/// stable when individual property uses come and go between builds.
const SEED_VOCABULARY: &[&str] = &[
    "align-items",
    "align-self",
    "background",
    "background-color",
    "background-image",
    "background-position",
    "background-size",
    "border",
    "border-bottom",
    "border-color",
    "border-left",
    "border-radius",
    "border-right",
    "border-style",
    "border-top",
    "border-width",
    "bottom",
    "box-shadow",
    "box-sizing",
    "color",
    "cursor",
    "display",
    "flex",
    "flex-basis",
    "flex-direction",
    "flex-grow",
    "flex-shrink",
    "flex-wrap",
    "float",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "gap",
    "grid-column",
    "grid-row",
    "grid-template-columns",
    "grid-template-rows",
    "height",
    "justify-content",
    "left",
    "letter-spacing",
    "line-height",
    "margin",
    "margin-bottom",
    "margin-left",
    "margin-right",
    "margin-top",
    "max-height",
    "max-width",
    "min-height",
    "min-width",
    "opacity",
    "overflow",
    "padding",
    "padding-bottom",
    "padding-left",
    "padding-right",
    "padding-top",
    "position",
    "right",
    "text-align",
    "text-decoration",
    "top",
    "transform",
    "transition",
    "vertical-align",
    "visibility",
    "white-space",
    "width",
    "z-index",
];

/// The string pool builder.
#[derive(Debug)]
pub struct ConstantPool {
    strings: BTreeSet<String>,
    indices: Option<HashMap<String, u32>>,
}

impl ConstantPool {
    pub fn new() -> Self {
        let mut strings = BTreeSet::new();
        for word in SEED_VOCABULARY {
            strings.insert((*word).to_string());
        }
        ConstantPool {
            strings,
            indices: None,
        }
    }

    /// Intern a string. Null-ish values (the empty string) are not stored;
    /// they resolve to `NULL_REF` at reference time.
    pub fn intern(&mut self, value: &str) -> Result<(), EmitError> {
        if value.is_empty() {
            return Ok(());
        }
        if value.len() > MAX_STRING_BYTES {
            return Err(EmitError::StringTooLong(value.len()));
        }
        if !self.strings.contains(value) {
            self.strings.insert(value.to_string());
        }
        // Interning after finalization would invalidate assigned indices.
        self.indices = None;
        Ok(())
    }

    /// Assign indices: lexicographic by UTF-8 byte value.
    pub fn finalize(&mut self) -> Result<(), EmitError> {
        if self.strings.len() >= NULL_REF as usize {
            return Err(EmitError::PoolOverflow(self.strings.len()));
        }
        let mut indices = HashMap::with_capacity(self.strings.len());
        for (position, value) in self.strings.iter().enumerate() {
            indices.insert(value.clone(), position as u32);
        }
        self.indices = Some(indices);
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.indices.is_some()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Look up the index of an interned string. The empty string maps to
    /// `NULL_REF`; a string that was never interned is a programmer error.
    pub fn ref_of(&self, value: &str) -> Result<u32, EmitError> {
        if value.is_empty() {
            return Ok(NULL_REF);
        }
        let indices = self.indices.as_ref().ok_or(EmitError::PoolNotFinalized)?;
        indices
            .get(value)
            .copied()
            .ok_or_else(|| EmitError::UnknownString(value.to_string()))
    }

    /// Serialize the finalized pool: 16-byte header, then entries in index
    /// order as `{ index u24, byte_len u16, bytes }`.
    pub fn serialize(&self) -> Result<Vec<u8>, EmitError> {
        if !self.is_finalized() {
            return Err(EmitError::PoolNotFinalized);
        }

        let mut data = Vec::new();
        for (position, value) in self.strings.iter().enumerate() {
            write_u24(&mut data, position as u32);
            data.write_u16::<LittleEndian>(value.len() as u16)
                .expect("vec write");
            data.extend_from_slice(value.as_bytes());
        }

        let mut out = Vec::with_capacity(16 + data.len());
        out.extend_from_slice(POOL_MAGIC);
        out.push(POOL_VERSION);
        out.extend_from_slice(&[0, 0, 0]);
        out.write_u32::<LittleEndian>(self.strings.len() as u32)
            .expect("vec write");
        out.write_u32::<LittleEndian>(data.len() as u32)
            .expect("vec write");
        out.extend_from_slice(&data);
        Ok(out)
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a 24-bit little-endian unsigned integer.
pub fn write_u24(out: &mut Vec<u8>, value: u32) {
    out.push((value & 0xFF) as u8);
    out.push(((value >> 8) & 0xFF) as u8);
    out.push(((value >> 16) & 0xFF) as u8);
}

/// Read a 24-bit little-endian unsigned integer.
pub fn read_u24(cursor: &mut Cursor<&[u8]>) -> std::io::Result<u32> {
    let lo = cursor.read_u8()? as u32;
    let mid = cursor.read_u8()? as u32;
    let hi = cursor.read_u8()? as u32;
    Ok(lo | (mid << 8) | (hi << 16))
}

/// Deserialized pool view over a borrowed buffer.
#[derive(Debug)]
pub struct PoolReader<'a> {
    entries: Vec<&'a str>,
    /// Total bytes the pool section occupies, header included.
    pub section_len: usize,
}

impl<'a> PoolReader<'a> {
    /// Parse a pool section from the front of `data`.
    pub fn parse(data: &'a [u8]) -> Result<PoolReader<'a>, LoadError> {
        if data.len() < 16 {
            return Err(LoadError::Truncated { context: "pool header" });
        }
        if &data[0..4] != POOL_MAGIC {
            return Err(LoadError::InvalidMagic { section: "pool" });
        }
        if data[4] != POOL_VERSION {
            return Err(LoadError::UnsupportedVersion(data[4]));
        }
        let mut cursor = Cursor::new(&data[8..16]);
        let entry_count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| LoadError::Truncated { context: "pool header" })? as usize;
        let data_size = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| LoadError::Truncated { context: "pool header" })? as usize;

        let body_end = 16usize
            .checked_add(data_size)
            .ok_or(LoadError::Truncated { context: "pool data" })?;
        if data.len() < body_end {
            return Err(LoadError::SectionSizeMismatch {
                section: "pool",
                expected: data_size,
                found: data.len().saturating_sub(16),
            });
        }

        let body = &data[16..body_end];
        let mut entries: Vec<&'a str> = Vec::with_capacity(entry_count);
        let mut offset = 0usize;
        while offset < body.len() {
            if body.len() - offset < 5 {
                return Err(LoadError::Truncated { context: "pool entry header" });
            }
            let index = u32::from(body[offset])
                | (u32::from(body[offset + 1]) << 8)
                | (u32::from(body[offset + 2]) << 16);
            let length = u16::from_le_bytes([body[offset + 3], body[offset + 4]]) as usize;
            offset += 5;
            if body.len() - offset < length {
                return Err(LoadError::Truncated { context: "pool entry bytes" });
            }
            let bytes = &body[offset..offset + length];
            offset += length;
            let value = std::str::from_utf8(bytes)
                .map_err(|_| LoadError::Truncated { context: "pool entry utf-8" })?;
            if index as usize != entries.len() {
                return Err(LoadError::PoolCountMismatch {
                    expected: entry_count,
                    found: entries.len(),
                });
            }
            entries.push(value);
        }
        if entries.len() != entry_count {
            return Err(LoadError::PoolCountMismatch {
                expected: entry_count,
                found: entries.len(),
            });
        }

        Ok(PoolReader {
            entries,
            section_len: body_end,
        })
    }

    /// Resolve a pool reference. `NULL_REF` resolves to `None`.
    pub fn resolve(&self, reference: u32) -> Option<&'a str> {
        if reference == NULL_REF {
            return None;
        }
        self.entries.get(reference as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
