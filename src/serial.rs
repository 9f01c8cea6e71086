//! Binary serialization and deserialization of compiled world graphs.
//!
//! Parsing and validating large JSON rule documents dominates startup for
//! big worlds. This module provides a stable binary format for caching a
//! compiled [`WorldGraph`](crate::WorldGraph). The format consists of a
//! 32-byte fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"LGMP"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with [`DeserializeError::IncompatibleVersion`].
//! The engine version is informational only.
//!
//! The payload mirrors the rule tree with externally tagged enums: the
//! document form relies on internally tagged and untagged enums, which
//! bincode cannot decode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    CompareOp, Exit, GraphError, Location, Operand, Region, Rule, Value, WorldDocument, WorldGraph,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"LGMP";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`WorldGraph`](crate::WorldGraph) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode world graph: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`WorldGraph`](crate::WorldGraph) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a logicmap binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cached graph is invalid: {0}")]
    Graph(#[from] GraphError),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedWorld {
    metadata: WorldMetadata,
    start_regions: Vec<String>,
    item_groups: Vec<(String, Vec<String>)>,
    regions: Vec<SerializedRegion>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WorldMetadata {
    region_count: usize,
    exit_count: usize,
    location_count: usize,
    source_digest: Option<[u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRegion {
    name: String,
    exits: Vec<SerializedExit>,
    locations: Vec<SerializedLocation>,
    rules: Vec<SerializedRule>,
    flags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedExit {
    name: String,
    target: String,
    rule: Option<SerializedRule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedLocation {
    name: String,
    rule: Option<SerializedRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedRule {
    Constant(SerializedValue),
    ItemCheck(SerializedOperand),
    CountCheck(SerializedOperand, Option<SerializedOperand>),
    GroupCheck(SerializedOperand, Option<SerializedOperand>),
    Helper(String, Vec<SerializedOperand>),
    StateMethod(String, Vec<SerializedOperand>),
    Attribute(Box<SerializedRule>, String),
    Subscript(Box<SerializedRule>, SerializedOperand),
    FunctionCall(Box<SerializedRule>, Vec<SerializedOperand>),
    Name(String),
    And(Vec<SerializedRule>),
    Or(Vec<SerializedRule>),
    Not(Box<SerializedRule>),
    Compare(SerializedOperand, SerializedCompareOp, SerializedOperand),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedOperand {
    Rule(Box<SerializedRule>),
    Literal(SerializedValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<SerializedValue>),
    Map(Vec<(String, SerializedValue)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum SerializedCompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

// ---------------------------------------------------------------------------
// CompareOp conversion
// ---------------------------------------------------------------------------

fn serialize_op(op: CompareOp) -> SerializedCompareOp {
    match op {
        CompareOp::Eq => SerializedCompareOp::Eq,
        CompareOp::Neq => SerializedCompareOp::Neq,
        CompareOp::Gt => SerializedCompareOp::Gt,
        CompareOp::Gte => SerializedCompareOp::Gte,
        CompareOp::Lt => SerializedCompareOp::Lt,
        CompareOp::Lte => SerializedCompareOp::Lte,
        CompareOp::In => SerializedCompareOp::In,
    }
}

fn deserialize_op(op: SerializedCompareOp) -> CompareOp {
    match op {
        SerializedCompareOp::Eq => CompareOp::Eq,
        SerializedCompareOp::Neq => CompareOp::Neq,
        SerializedCompareOp::Gt => CompareOp::Gt,
        SerializedCompareOp::Gte => CompareOp::Gte,
        SerializedCompareOp::Lt => CompareOp::Lt,
        SerializedCompareOp::Lte => CompareOp::Lte,
        SerializedCompareOp::In => CompareOp::In,
    }
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn serialize_value(value: &Value) -> SerializedValue {
    match value {
        Value::None => SerializedValue::None,
        Value::Bool(b) => SerializedValue::Bool(*b),
        Value::Int(i) => SerializedValue::Int(*i),
        Value::Float(f) => SerializedValue::Float(*f),
        Value::String(s) => SerializedValue::Str(s.clone()),
        Value::List(items) => SerializedValue::List(items.iter().map(serialize_value).collect()),
        Value::Map(map) => SerializedValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), serialize_value(v)))
                .collect(),
        ),
    }
}

fn deserialize_value(value: SerializedValue) -> Value {
    match value {
        SerializedValue::None => Value::None,
        SerializedValue::Bool(b) => Value::Bool(b),
        SerializedValue::Int(i) => Value::Int(i),
        SerializedValue::Float(f) => Value::Float(f),
        SerializedValue::Str(s) => Value::String(s),
        SerializedValue::List(items) => {
            Value::List(items.into_iter().map(deserialize_value).collect())
        }
        SerializedValue::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, deserialize_value(v)))
                .collect(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Rule conversion
// ---------------------------------------------------------------------------

fn serialize_operand(operand: &Operand) -> SerializedOperand {
    match operand {
        Operand::Rule(rule) => SerializedOperand::Rule(Box::new(serialize_rule(rule))),
        Operand::Literal(value) => SerializedOperand::Literal(serialize_value(value)),
    }
}

fn serialize_operands(operands: &[Operand]) -> Vec<SerializedOperand> {
    operands.iter().map(serialize_operand).collect()
}

fn serialize_rule(rule: &Rule) -> SerializedRule {
    match rule {
        Rule::Constant { value } => SerializedRule::Constant(serialize_value(value)),
        Rule::ItemCheck { item } => SerializedRule::ItemCheck(serialize_operand(item)),
        Rule::CountCheck { item, count } => SerializedRule::CountCheck(
            serialize_operand(item),
            count.as_ref().map(serialize_operand),
        ),
        Rule::GroupCheck { group, count } => SerializedRule::GroupCheck(
            serialize_operand(group),
            count.as_ref().map(serialize_operand),
        ),
        Rule::Helper { name, args } => SerializedRule::Helper(name.clone(), serialize_operands(args)),
        Rule::StateMethod { method, args } => {
            SerializedRule::StateMethod(method.clone(), serialize_operands(args))
        }
        Rule::Attribute { object, attr } => {
            SerializedRule::Attribute(Box::new(serialize_rule(object)), attr.clone())
        }
        Rule::Subscript { value, index } => {
            SerializedRule::Subscript(Box::new(serialize_rule(value)), serialize_operand(index))
        }
        Rule::FunctionCall { function, args } => SerializedRule::FunctionCall(
            Box::new(serialize_rule(function)),
            serialize_operands(args),
        ),
        Rule::Name { name } => SerializedRule::Name(name.clone()),
        Rule::And { conditions } => SerializedRule::And(conditions.iter().map(serialize_rule).collect()),
        Rule::Or { conditions } => SerializedRule::Or(conditions.iter().map(serialize_rule).collect()),
        Rule::Not { condition } => SerializedRule::Not(Box::new(serialize_rule(condition))),
        Rule::Compare { left, op, right } => SerializedRule::Compare(
            serialize_operand(left),
            serialize_op(*op),
            serialize_operand(right),
        ),
        Rule::Unknown => SerializedRule::Unknown,
    }
}

fn deserialize_operand(operand: SerializedOperand) -> Operand {
    match operand {
        SerializedOperand::Rule(rule) => Operand::Rule(Box::new(deserialize_rule(*rule))),
        SerializedOperand::Literal(value) => Operand::Literal(deserialize_value(value)),
    }
}

fn deserialize_operands(operands: Vec<SerializedOperand>) -> Vec<Operand> {
    operands.into_iter().map(deserialize_operand).collect()
}

fn deserialize_rule(rule: SerializedRule) -> Rule {
    match rule {
        SerializedRule::Constant(value) => Rule::Constant {
            value: deserialize_value(value),
        },
        SerializedRule::ItemCheck(item) => Rule::ItemCheck {
            item: deserialize_operand(item),
        },
        SerializedRule::CountCheck(item, count) => Rule::CountCheck {
            item: deserialize_operand(item),
            count: count.map(deserialize_operand),
        },
        SerializedRule::GroupCheck(group, count) => Rule::GroupCheck {
            group: deserialize_operand(group),
            count: count.map(deserialize_operand),
        },
        SerializedRule::Helper(name, args) => Rule::Helper {
            name,
            args: deserialize_operands(args),
        },
        SerializedRule::StateMethod(method, args) => Rule::StateMethod {
            method,
            args: deserialize_operands(args),
        },
        SerializedRule::Attribute(object, attr) => Rule::Attribute {
            object: Box::new(deserialize_rule(*object)),
            attr,
        },
        SerializedRule::Subscript(value, index) => Rule::Subscript {
            value: Box::new(deserialize_rule(*value)),
            index: deserialize_operand(index),
        },
        SerializedRule::FunctionCall(function, args) => Rule::FunctionCall {
            function: Box::new(deserialize_rule(*function)),
            args: deserialize_operands(args),
        },
        SerializedRule::Name(name) => Rule::Name { name },
        SerializedRule::And(conditions) => Rule::And {
            conditions: conditions.into_iter().map(deserialize_rule).collect(),
        },
        SerializedRule::Or(conditions) => Rule::Or {
            conditions: conditions.into_iter().map(deserialize_rule).collect(),
        },
        SerializedRule::Not(condition) => Rule::Not {
            condition: Box::new(deserialize_rule(*condition)),
        },
        SerializedRule::Compare(left, op, right) => Rule::Compare {
            left: deserialize_operand(left),
            op: deserialize_op(op),
            right: deserialize_operand(right),
        },
        SerializedRule::Unknown => Rule::Unknown,
    }
}

// ---------------------------------------------------------------------------
// WorldGraph -> SerializedWorld
// ---------------------------------------------------------------------------

fn world_to_serialized(world: &WorldGraph, source_text: Option<&str>) -> SerializedWorld {
    let source_digest = source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes());

    let regions: Vec<SerializedRegion> = world
        .regions()
        .map(|region| SerializedRegion {
            name: region.name.clone(),
            exits: region
                .exits
                .iter()
                .map(|exit| SerializedExit {
                    name: exit.name.clone(),
                    target: exit.target.clone(),
                    rule: exit.rule.as_ref().map(serialize_rule),
                })
                .collect(),
            locations: region
                .locations
                .iter()
                .map(|location| SerializedLocation {
                    name: location.name.clone(),
                    rule: location.rule.as_ref().map(serialize_rule),
                })
                .collect(),
            rules: region.rules.iter().map(serialize_rule).collect(),
            flags: region.flags.iter().cloned().collect(),
        })
        .collect();

    SerializedWorld {
        metadata: WorldMetadata {
            region_count: world.region_count(),
            exit_count: regions.iter().map(|r| r.exits.len()).sum(),
            location_count: world.location_count(),
            source_digest,
        },
        start_regions: world.start_regions().map(str::to_owned).collect(),
        item_groups: world
            .item_groups
            .iter()
            .map(|(name, items)| (name.clone(), items.clone()))
            .collect(),
        regions,
    }
}

// ---------------------------------------------------------------------------
// SerializedWorld -> WorldGraph
// ---------------------------------------------------------------------------

fn serialized_to_world(ser: SerializedWorld) -> Result<WorldGraph, DeserializeError> {
    validate(&ser)?;

    let regions = ser
        .regions
        .into_iter()
        .map(|region| {
            let name = region.name;
            Region {
                exits: region
                    .exits
                    .into_iter()
                    .map(|exit| Exit {
                        name: exit.name,
                        target: exit.target,
                        rule: exit.rule.map(deserialize_rule),
                    })
                    .collect(),
                locations: region
                    .locations
                    .into_iter()
                    .map(|location| Location {
                        name: location.name,
                        region: name.clone(),
                        rule: location.rule.map(deserialize_rule),
                    })
                    .collect(),
                rules: region.rules.into_iter().map(deserialize_rule).collect(),
                flags: region.flags.into_iter().collect(),
                name,
            }
        })
        .collect();

    let document = WorldDocument {
        start_regions: ser.start_regions,
        item_groups: ser.item_groups.into_iter().collect(),
        regions,
    };
    Ok(crate::compile::compile(document)?)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Cross-check the metadata counts against the payload. Structural checks
/// (duplicates, start regions) run again when the graph is recompiled.
fn validate(ser: &SerializedWorld) -> Result<(), DeserializeError> {
    let meta = &ser.metadata;
    if meta.region_count != ser.regions.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata declares {} regions, payload has {}",
            meta.region_count,
            ser.regions.len()
        )));
    }
    let exits: usize = ser.regions.iter().map(|r| r.exits.len()).sum();
    if meta.exit_count != exits {
        return Err(DeserializeError::Validation(format!(
            "metadata declares {} exits, payload has {exits}",
            meta.exit_count
        )));
    }
    let locations: usize = ser.regions.iter().map(|r| r.locations.len()).sum();
    if meta.location_count != locations {
        return Err(DeserializeError::Validation(format!(
            "metadata declares {} locations, payload has {locations}",
            meta.location_count
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version, bytes[8..12] is flags
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(
    world: &WorldGraph,
    source_text: Option<&str>,
) -> Result<Vec<u8>, SerializeError> {
    let serialized = world_to_serialized(world, source_text);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<WorldGraph, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedWorld, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    log::debug!(
        "decoded cached world: {} regions, {} exits, {} locations",
        serialized.metadata.region_count,
        serialized.metadata.exit_count,
        serialized.metadata.location_count
    );
    serialized_to_world(serialized)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
