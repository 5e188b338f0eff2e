//! Artifact loader.
//!
//! Read-only view over a borrowed byte buffer: header validation, eager
//! pool and static-map construction, lazily parsed dynamic records cached
//! per hash. Any structural corruption fails the load; a truncated input
//! never yields a partial record.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use serde::Serialize;

use crate::constant_pool::{PoolReader, NULL_REF};
use crate::error::LoadError;
use crate::graph::component_node::DepKind;
use crate::output::binary_emitter::{
    DYNAMIC_INDEX_MAGIC, FILE_MAGIC, FORMAT_VERSION, RECORD_BOUNDARY_MARKER,
    RECORD_NONDETERMINISTIC, RECORD_RULE_SET, STATIC_MAGIC,
};
use crate::util::fnv1a_32;

/// One static tier record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRecord {
    pub selector_hash: u32,
    pub selector_ref: u32,
    /// `(name_ref, value_ref)` pairs, sorted by name reference.
    pub properties: Vec<(u32, u32)>,
}

/// One dependency entry of a boundary marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepRecord {
    pub kind: DepKind,
    pub property_ref: u32,
    /// FNV-1a of the resolution container's selector, zero when absent.
    pub container_hash: u32,
}

/// Boundary marker record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryRecord {
    pub selector_hash: u32,
    pub selector_ref: u32,
    pub flags: u8,
    pub deps: Vec<DepRecord>,
    /// Subgraph member hashes in source order.
    pub subgraph: Vec<u32>,
}

/// Rule set record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetRecord {
    pub selector_hash: u32,
    pub selector_ref: u32,
    pub boundary_hash: u32,
    pub properties: Vec<(u32, u32)>,
}

/// Nondeterministic marker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NondeterministicRecord {
    pub selector_hash: u32,
    pub selector_ref: u32,
    pub flags: u8,
}

/// A lazily parsed dynamic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicRecord {
    Boundary(BoundaryRecord),
    RuleSet(RuleSetRecord),
    Nondeterministic(NondeterministicRecord),
}

/// Loader statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoaderStats {
    pub file_size: usize,
    pub pool_entries: usize,
    pub static_count: usize,
    pub indexed_dynamic_count: usize,
    pub parse_time_ms: f64,
}

/// The loaded artifact.
///
/// Lookups are O(1) through prebuilt hash maps. The dynamic record cache
/// uses interior mutability, which makes the loader single-threaded by
/// construction; repeated lookups return the identical `Rc` record.
pub struct CompiledStyles<'a> {
    data: &'a [u8],
    pool: PoolReader<'a>,
    static_map: HashMap<u32, StaticRecord>,
    dynamic_index: HashMap<u32, u32>,
    dynamic_tier_start: usize,
    dynamic_cache: RefCell<HashMap<u32, Rc<DynamicRecord>>>,
    stats: LoaderStats,
}

impl<'a> CompiledStyles<'a> {
    /// Validate and index an artifact.
    pub fn load(data: &'a [u8]) -> Result<CompiledStyles<'a>, LoadError> {
        let started = Instant::now();

        if data.len() < 16 {
            return Err(LoadError::Truncated { context: "file header" });
        }
        if &data[0..4] != FILE_MAGIC {
            return Err(LoadError::InvalidMagic { section: "file" });
        }
        if data[4] != FORMAT_VERSION {
            return Err(LoadError::UnsupportedVersion(data[4]));
        }

        let pool = PoolReader::parse(&data[16..])?;
        let mut offset = 16 + pool.section_len;

        let static_map = parse_static_tier(data, &mut offset)?;
        let dynamic_index = parse_dynamic_index(data, &mut offset)?;
        let dynamic_tier_start = offset;

        let stats = LoaderStats {
            file_size: data.len(),
            pool_entries: pool.len(),
            static_count: static_map.len(),
            indexed_dynamic_count: dynamic_index.len(),
            parse_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        Ok(CompiledStyles {
            data,
            pool,
            static_map,
            dynamic_index,
            dynamic_tier_start,
            dynamic_cache: RefCell::new(HashMap::new()),
            stats,
        })
    }

    /// Look up a static record by selector text.
    pub fn get_static(&self, selector: &str) -> Option<&StaticRecord> {
        self.get_static_by_hash(fnv1a_32(selector))
    }

    /// Look up a static record by selector hash.
    pub fn get_static_by_hash(&self, hash: u32) -> Option<&StaticRecord> {
        self.static_map.get(&hash)
    }

    /// Look up an indexed dynamic record by selector text.
    pub fn get_dynamic(&self, selector: &str) -> Result<Option<Rc<DynamicRecord>>, LoadError> {
        self.get_dynamic_by_hash(fnv1a_32(selector))
    }

    /// Look up an indexed dynamic record by hash, parsing it on first touch.
    pub fn get_dynamic_by_hash(
        &self,
        hash: u32,
    ) -> Result<Option<Rc<DynamicRecord>>, LoadError> {
        if let Some(cached) = self.dynamic_cache.borrow().get(&hash) {
            return Ok(Some(Rc::clone(cached)));
        }
        let Some(offset) = self.dynamic_index.get(&hash) else {
            return Ok(None);
        };
        let record = self.parse_dynamic_record(self.dynamic_tier_start + *offset as usize)?;
        let record = Rc::new(record);
        self.dynamic_cache
            .borrow_mut()
            .insert(hash, Rc::clone(&record));
        Ok(Some(record))
    }

    /// Resolve a pool reference; `NULL_REF` is `None`.
    pub fn resolve_string(&self, reference: u32) -> Option<&'a str> {
        if reference == NULL_REF {
            return None;
        }
        self.pool.resolve(reference)
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    fn parse_dynamic_record(&self, offset: usize) -> Result<DynamicRecord, LoadError> {
        let mut pos = offset;
        let record_type = read_u8(self.data, &mut pos, "dynamic record type")?;
        match record_type {
            RECORD_BOUNDARY_MARKER => {
                let selector_hash = read_u32(self.data, &mut pos, "boundary header")?;
                let selector_ref = read_u24(self.data, &mut pos, "boundary header")?;
                let dep_count = read_u8(self.data, &mut pos, "boundary header")? as usize;
                let flags = read_u8(self.data, &mut pos, "boundary header")?;
                let subgraph_count =
                    read_u16(self.data, &mut pos, "boundary header")? as usize;

                let mut deps = Vec::with_capacity(dep_count);
                for _ in 0..dep_count {
                    let kind_code = read_u8(self.data, &mut pos, "boundary dep")?;
                    let kind = DepKind::from_code(kind_code)
                        .ok_or(LoadError::UnknownRecordType(kind_code))?;
                    let property_ref = read_u24(self.data, &mut pos, "boundary dep")?;
                    let container_hash = read_u32(self.data, &mut pos, "boundary dep")?;
                    deps.push(DepRecord {
                        kind,
                        property_ref,
                        container_hash,
                    });
                }
                let mut subgraph = Vec::with_capacity(subgraph_count);
                for _ in 0..subgraph_count {
                    subgraph.push(read_u32(self.data, &mut pos, "boundary subgraph")?);
                }
                Ok(DynamicRecord::Boundary(BoundaryRecord {
                    selector_hash,
                    selector_ref,
                    flags,
                    deps,
                    subgraph,
                }))
            }
            RECORD_RULE_SET => {
                let selector_hash = read_u32(self.data, &mut pos, "rule set header")?;
                let selector_ref = read_u24(self.data, &mut pos, "rule set header")?;
                let prop_count = read_u8(self.data, &mut pos, "rule set header")? as usize;
                let boundary_hash = read_u32(self.data, &mut pos, "rule set header")?;
                let mut properties = Vec::with_capacity(prop_count);
                for _ in 0..prop_count {
                    let name_ref = read_u24(self.data, &mut pos, "rule set property")?;
                    let value_ref = read_u24(self.data, &mut pos, "rule set property")?;
                    properties.push((name_ref, value_ref));
                }
                Ok(DynamicRecord::RuleSet(RuleSetRecord {
                    selector_hash,
                    selector_ref,
                    boundary_hash,
                    properties,
                }))
            }
            RECORD_NONDETERMINISTIC => {
                let selector_hash = read_u32(self.data, &mut pos, "nondeterministic record")?;
                let selector_ref = read_u24(self.data, &mut pos, "nondeterministic record")?;
                let flags = read_u8(self.data, &mut pos, "nondeterministic record")?;
                Ok(DynamicRecord::Nondeterministic(NondeterministicRecord {
                    selector_hash,
                    selector_ref,
                    flags,
                }))
            }
            unknown => Err(LoadError::UnknownRecordType(unknown)),
        }
    }
}

fn parse_static_tier(
    data: &[u8],
    offset: &mut usize,
) -> Result<HashMap<u32, StaticRecord>, LoadError> {
    expect_magic(data, offset, STATIC_MAGIC, "static tier")?;
    let count = read_u32(data, offset, "static tier header")? as usize;
    let size = read_u32(data, offset, "static tier header")? as usize;
    let section_end = offset
        .checked_add(size)
        .ok_or(LoadError::Truncated { context: "static tier" })?;
    if section_end > data.len() {
        return Err(LoadError::SectionSizeMismatch {
            section: "static tier",
            expected: size,
            found: data.len().saturating_sub(*offset),
        });
    }

    let mut map = HashMap::with_capacity(count);
    for _ in 0..count {
        let selector_hash = read_u32(data, offset, "static record")?;
        let selector_ref = read_u24(data, offset, "static record")?;
        let prop_count = read_u8(data, offset, "static record")? as usize;
        let mut properties = Vec::with_capacity(prop_count);
        for _ in 0..prop_count {
            let name_ref = read_u24(data, offset, "static property")?;
            let value_ref = read_u24(data, offset, "static property")?;
            properties.push((name_ref, value_ref));
        }
        map.insert(
            selector_hash,
            StaticRecord {
                selector_hash,
                selector_ref,
                properties,
            },
        );
    }

    if *offset != section_end {
        return Err(LoadError::SectionSizeMismatch {
            section: "static tier",
            expected: size,
            found: *offset - (section_end - size),
        });
    }
    Ok(map)
}

fn parse_dynamic_index(
    data: &[u8],
    offset: &mut usize,
) -> Result<HashMap<u32, u32>, LoadError> {
    expect_magic(data, offset, DYNAMIC_INDEX_MAGIC, "dynamic index")?;
    let count = read_u32(data, offset, "dynamic index header")? as usize;
    let size = read_u32(data, offset, "dynamic index header")? as usize;
    if size != count * 11 {
        return Err(LoadError::SectionSizeMismatch {
            section: "dynamic index",
            expected: count * 11,
            found: size,
        });
    }

    let mut map = HashMap::with_capacity(count);
    for _ in 0..count {
        let hash = read_u32(data, offset, "dynamic index entry")?;
        let _selector_ref = read_u24(data, offset, "dynamic index entry")?;
        let record_offset = read_u32(data, offset, "dynamic index entry")?;
        map.insert(hash, record_offset);
    }
    Ok(map)
}

fn expect_magic(
    data: &[u8],
    offset: &mut usize,
    magic: &[u8; 4],
    section: &'static str,
) -> Result<(), LoadError> {
    if data.len() < *offset + 4 {
        return Err(LoadError::Truncated { context: section });
    }
    if &data[*offset..*offset + 4] != magic {
        return Err(LoadError::InvalidMagic { section });
    }
    *offset += 4;
    Ok(())
}

fn read_u8(data: &[u8], pos: &mut usize, context: &'static str) -> Result<u8, LoadError> {
    let byte = *data
        .get(*pos)
        .ok_or(LoadError::Truncated { context })?;
    *pos += 1;
    Ok(byte)
}

fn read_u16(data: &[u8], pos: &mut usize, context: &'static str) -> Result<u16, LoadError> {
    if data.len() < *pos + 2 {
        return Err(LoadError::Truncated { context });
    }
    let value = u16::from_le_bytes([data[*pos], data[*pos + 1]]);
    *pos += 2;
    Ok(value)
}

fn read_u24(data: &[u8], pos: &mut usize, context: &'static str) -> Result<u32, LoadError> {
    if data.len() < *pos + 3 {
        return Err(LoadError::Truncated { context });
    }
    let value = u32::from(data[*pos])
        | (u32::from(data[*pos + 1]) << 8)
        | (u32::from(data[*pos + 2]) << 16);
    *pos += 3;
    Ok(value)
}

fn read_u32(data: &[u8], pos: &mut usize, context: &'static str) -> Result<u32, LoadError> {
    if data.len() < *pos + 4 {
        return Err(LoadError::Truncated { context });
    }
    let value = u32::from_le_bytes([
        data[*pos],
        data[*pos + 1],
        data[*pos + 2],
        data[*pos + 3],
    ]);
    *pos += 4;
    Ok(value)
}
