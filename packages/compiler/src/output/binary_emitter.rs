//! Binary artifact emitter.
//!
//! Serializes the analyzed rule graph into the section layout of §6.1:
//! file header, constant pool, static tier, dynamic index, dynamic tier.
//! All integers are little-endian; every sort key is explicit so two runs
//! over semantically equal inputs produce byte-identical output.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::constant_pool::{write_u24, ConstantPool};
use crate::error::EmitError;
use crate::graph::component_node::{
    Classification, ComponentNode, EmitType, ManifestFlags, NodeIndex,
};
use crate::util::fnv1a_32;
use crate::Analysis;

/// File magic.
pub const FILE_MAGIC: &[u8; 4] = b"BSOM";
/// Binary format version. Classification-affecting constants (such as the
/// opaque color-function list) are frozen per version.
pub const FORMAT_VERSION: u8 = 1;
/// Static tier magic.
pub const STATIC_MAGIC: &[u8; 4] = b"SOMS";
/// Dynamic index magic.
pub const DYNAMIC_INDEX_MAGIC: &[u8; 4] = b"SOMD";

/// Dynamic record type tags.
pub const RECORD_BOUNDARY_MARKER: u8 = 0x01;
pub const RECORD_RULE_SET: u8 = 0x02;
pub const RECORD_NONDETERMINISTIC: u8 = 0x03;

/// Number of sections following the file header.
const SECTION_COUNT: u32 = 3;

/// Serialize the analysis into the binary artifact.
pub fn emit_binary(analysis: &Analysis) -> Result<Vec<u8>, EmitError> {
    let mut pool = ConstantPool::new();
    intern_strings(analysis, &mut pool)?;
    pool.finalize()?;

    let static_tier = emit_static_tier(analysis, &pool)?;
    let (dynamic_tier, index_entries) = emit_dynamic_tier(analysis, &pool)?;
    let dynamic_index = emit_dynamic_index(&index_entries);
    let pool_bytes = pool.serialize()?;

    let mut out = Vec::with_capacity(
        16 + pool_bytes.len() + static_tier.len() + dynamic_index.len() + dynamic_tier.len(),
    );
    out.extend_from_slice(FILE_MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&[0, 0, 0]);
    out.write_u32::<LittleEndian>(0).expect("vec write"); // flags
    out.write_u32::<LittleEndian>(SECTION_COUNT).expect("vec write");
    out.extend_from_slice(&pool_bytes);
    out.extend_from_slice(&static_tier);
    out.extend_from_slice(&dynamic_index);
    out.extend_from_slice(&dynamic_tier);

    tracing::debug!(
        total = out.len(),
        pool = pool_bytes.len(),
        static_tier = static_tier.len(),
        dynamic_tier = dynamic_tier.len(),
        "binary artifact assembled"
    );
    Ok(out)
}

/// Intern every string any record will reference.
fn intern_strings(analysis: &Analysis, pool: &mut ConstantPool) -> Result<(), EmitError> {
    for node in &analysis.nodes {
        pool.intern(&node.selector)?;
        match node.final_class {
            Classification::Nondeterministic => {}
            _ => {
                for (property, value) in &node.normalized_declarations {
                    if property.starts_with("--") {
                        continue;
                    }
                    pool.intern(property)?;
                    pool.intern(value)?;
                }
            }
        }
    }
    for manifest in &analysis.manifests {
        for entry in &manifest.entries {
            pool.intern(&entry.property)?;
        }
    }
    Ok(())
}

/// Emittable property pairs of a rule: custom properties are omitted and
/// the remainder is sorted by name reference. Count is clamped to 255.
fn property_refs(
    node: &ComponentNode,
    pool: &ConstantPool,
) -> Result<Vec<(u32, u32)>, EmitError> {
    let mut pairs = Vec::new();
    for (property, value) in &node.normalized_declarations {
        if property.starts_with("--") {
            continue;
        }
        pairs.push((pool.ref_of(property)?, pool.ref_of(value)?));
    }
    pairs.sort_by_key(|(name_ref, _)| *name_ref);
    pairs.truncate(255);
    Ok(pairs)
}

fn emit_static_tier(analysis: &Analysis, pool: &ConstantPool) -> Result<Vec<u8>, EmitError> {
    let mut rules: Vec<&ComponentNode> = analysis
        .nodes
        .iter()
        .filter(|node| node.emit_type == EmitType::ResolvedStyleBlock)
        .collect();
    rules.sort_by(|a, b| {
        a.selector_hash()
            .cmp(&b.selector_hash())
            .then_with(|| a.selector.cmp(&b.selector))
    });

    let mut records = Vec::new();
    for node in &rules {
        let pairs = property_refs(node, pool)?;
        records
            .write_u32::<LittleEndian>(node.selector_hash())
            .expect("vec write");
        write_u24(&mut records, pool.ref_of(&node.selector)?);
        records.push(pairs.len() as u8);
        for (name_ref, value_ref) in pairs {
            write_u24(&mut records, name_ref);
            write_u24(&mut records, value_ref);
        }
    }

    let mut out = Vec::with_capacity(12 + records.len());
    out.extend_from_slice(STATIC_MAGIC);
    out.write_u32::<LittleEndian>(rules.len() as u32)
        .expect("vec write");
    out.write_u32::<LittleEndian>(records.len() as u32)
        .expect("vec write");
    out.extend_from_slice(&records);
    Ok(out)
}

/// An entry destined for the dynamic index.
struct IndexEntry {
    hash: u32,
    selector_ref: u32,
    offset: u32,
}

/// Serialize the dynamic tier, returning its bytes plus the index entries
/// (boundary markers and nondeterministic records only; rule sets are
/// reachable through their boundary's subgraph list).
fn emit_dynamic_tier(
    analysis: &Analysis,
    pool: &ConstantPool,
) -> Result<(Vec<u8>, Vec<IndexEntry>), EmitError> {
    // (hash, selector, type tag, node) sorted so markers precede their own
    // rule set on equal hashes.
    let mut plan: Vec<(u32, &str, u8, NodeIndex)> = Vec::new();
    for (index, node) in analysis.nodes.iter().enumerate() {
        if node.emit_type == EmitType::ResolvedStyleBlock {
            continue;
        }
        let hash = node.selector_hash();
        if node.final_class == Classification::Nondeterministic {
            plan.push((hash, &node.selector, RECORD_NONDETERMINISTIC, index));
        } else if node.emit_type == EmitType::DynamicBoundary {
            plan.push((hash, &node.selector, RECORD_BOUNDARY_MARKER, index));
            plan.push((hash, &node.selector, RECORD_RULE_SET, index));
        } else {
            plan.push((hash, &node.selector, RECORD_RULE_SET, index));
        }
    }
    plan.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)).then_with(|| a.2.cmp(&b.2)));

    let mut tier = Vec::new();
    let mut index_entries = Vec::new();
    for (hash, _, record_type, node_index) in plan {
        let node = &analysis.nodes[node_index];
        let selector_ref = pool.ref_of(&node.selector)?;
        let offset = tier.len() as u32;
        match record_type {
            RECORD_BOUNDARY_MARKER => {
                write_boundary_marker(analysis, node_index, pool, &mut tier)?;
                index_entries.push(IndexEntry {
                    hash,
                    selector_ref,
                    offset,
                });
            }
            RECORD_RULE_SET => {
                write_rule_set(analysis, node_index, pool, &mut tier)?;
            }
            _ => {
                tier.push(RECORD_NONDETERMINISTIC);
                tier.write_u32::<LittleEndian>(hash).expect("vec write");
                write_u24(&mut tier, selector_ref);
                tier.push(0); // flags
                index_entries.push(IndexEntry {
                    hash,
                    selector_ref,
                    offset,
                });
            }
        }
    }
    Ok((tier, index_entries))
}

fn write_boundary_marker(
    analysis: &Analysis,
    boundary: NodeIndex,
    pool: &ConstantPool,
    out: &mut Vec<u8>,
) -> Result<(), EmitError> {
    let node = &analysis.nodes[boundary];
    let manifest = analysis
        .manifests
        .iter()
        .find(|manifest| manifest.boundary == boundary);
    let empty_subgraph = vec![boundary];
    let (entries, subgraph, flags) = match manifest {
        Some(manifest) => (
            manifest.entries.as_slice(),
            manifest.subgraph.as_slice(),
            manifest.flags,
        ),
        None => (&[] as &[_], empty_subgraph.as_slice(), ManifestFlags::empty()),
    };

    let dep_count = entries.len().min(255);
    let subgraph_count = subgraph.len().min(u16::MAX as usize);
    let wire_flags =
        flags & (ManifestFlags::PORTAL_DEPENDENCY | ManifestFlags::THEME_DEPENDENCY);

    out.push(RECORD_BOUNDARY_MARKER);
    out.write_u32::<LittleEndian>(node.selector_hash())
        .expect("vec write");
    write_u24(out, pool.ref_of(&node.selector)?);
    out.push(dep_count as u8);
    out.push(wire_flags.bits());
    out.write_u16::<LittleEndian>(subgraph_count as u16)
        .expect("vec write");

    for entry in &entries[..dep_count] {
        out.push(entry.kind.code());
        write_u24(out, pool.ref_of(&entry.property)?);
        let container_hash = entry
            .container
            .map(|container| fnv1a_32(&analysis.nodes[container].selector))
            .unwrap_or(0);
        out.write_u32::<LittleEndian>(container_hash)
            .expect("vec write");
    }
    for &member in &subgraph[..subgraph_count] {
        out.write_u32::<LittleEndian>(analysis.nodes[member].selector_hash())
            .expect("vec write");
    }
    Ok(())
}

fn write_rule_set(
    analysis: &Analysis,
    node_index: NodeIndex,
    pool: &ConstantPool,
    out: &mut Vec<u8>,
) -> Result<(), EmitError> {
    let node = &analysis.nodes[node_index];
    let boundary_hash = node
        .boundary
        .map(|boundary| fnv1a_32(&analysis.nodes[boundary].selector))
        .unwrap_or(0);
    let pairs = property_refs(node, pool)?;

    out.push(RECORD_RULE_SET);
    out.write_u32::<LittleEndian>(node.selector_hash())
        .expect("vec write");
    write_u24(out, pool.ref_of(&node.selector)?);
    out.push(pairs.len() as u8);
    out.write_u32::<LittleEndian>(boundary_hash)
        .expect("vec write");
    for (name_ref, value_ref) in pairs {
        write_u24(out, name_ref);
        write_u24(out, value_ref);
    }
    Ok(())
}

fn emit_dynamic_index(entries: &[IndexEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + entries.len() * 11);
    out.extend_from_slice(DYNAMIC_INDEX_MAGIC);
    out.write_u32::<LittleEndian>(entries.len() as u32)
        .expect("vec write");
    out.write_u32::<LittleEndian>((entries.len() * 11) as u32)
        .expect("vec write");
    for entry in entries {
        out.write_u32::<LittleEndian>(entry.hash).expect("vec write");
        write_u24(&mut out, entry.selector_ref);
        out.write_u32::<LittleEndian>(entry.offset).expect("vec write");
    }
    out
}
