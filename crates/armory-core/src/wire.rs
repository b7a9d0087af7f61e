//! Binary wire codec for field bags and gun snapshots.
//!
//! # Layout
//!
//! ```text
//! snapshot := varint count, (id, bag) * count
//! id       := string "namespace:path"
//! bag      := varint len, (tag u8, string key, payload) * len
//! string   := varint byte_len, UTF-8 bytes
//! payload  := Bool  u8 (0 | 1)
//!           | Int   i64 big-endian
//!           | Float f64 bits big-endian
//!           | Str   string
//!           | List  varint len, (tag u8, payload) * len
//!           | Bag   bag
//! ```
//!
//! Varints are unsigned LEB128, at most 5 bytes. Bag keys are written in
//! sorted order, so encoding a bag is a pure function of its contents and
//! `encode(decode(bytes)) == bytes` for any bytes this codec produced.
//!
//! The value enum is closed and every variant has an encoding, so encoding
//! cannot fail. Decoding is total over its input: it never consults external
//! state, and malformed input yields a [`WireError`].

use crate::field_bag::{FieldBag, Value};
use crate::gun::GunConfig;
use crate::id::EntityId;
use crate::registry::Snapshot;
use crate::schema::ValidationError;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TAG_BOOL: u8 = 1;
pub const TAG_INT: u8 = 2;
pub const TAG_FLOAT: u8 = 3;
pub const TAG_STR: u8 = 4;
pub const TAG_LIST: u8 = 5;
pub const TAG_BAG: u8 = 6;

/// Maximum nesting of lists and bags accepted when decoding.
pub const MAX_DEPTH: usize = 512;

/// Maximum encoded size of a varint (a full `u32`).
const MAX_VARINT_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("unexpected end of input")]
    Truncated,
    #[error("unknown value tag {0}")]
    UnknownTag(u8),
    #[error("varint longer than {MAX_VARINT_LEN} bytes")]
    VarIntTooLong,
    #[error("invalid bool byte {0}")]
    InvalidBool(u8),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("nesting deeper than {MAX_DEPTH}")]
    TooDeep,
    #[error("duplicate key '{0}' in field bag")]
    DuplicateKey(String),
    #[error("invalid gun id '{0}'")]
    InvalidId(String),
    #[error("duplicate gun id {0}")]
    DuplicateId(EntityId),
    #[error("{count} entries exceeds the limit of {max}")]
    TooManyEntries { count: usize, max: usize },
    #[error("invalid record for {id}: {source}")]
    InvalidRecord {
        id: EntityId,
        #[source]
        source: ValidationError,
    },
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

// ---------------------------------------------------------------------------
// WireWriter
// ---------------------------------------------------------------------------

/// Appends encoded values to a growable buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_varint(&mut self, mut value: u32) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    /// Panics when `len` exceeds `u32::MAX`, the largest length the format
    /// can carry.
    fn write_len(&mut self, len: usize) {
        let Ok(len32) = u32::try_from(len) else {
            panic!("wire length {len} exceeds u32::MAX");
        };
        self.write_varint(len32);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_id(&mut self, id: &EntityId) {
        self.write_str(&id.to_string());
    }

    pub fn write_bag(&mut self, bag: &FieldBag) {
        self.write_len(bag.len());
        for (key, value) in bag.iter() {
            self.write_u8(tag_of(value));
            self.write_str(key);
            self.write_payload(value);
        }
    }

    fn write_payload(&mut self, value: &Value) {
        match value {
            Value::Bool(b) => self.write_u8(u8::from(*b)),
            Value::Int(i) => self.write_i64(*i),
            Value::Float(f) => self.write_f64(*f),
            Value::Str(s) => self.write_str(s),
            Value::List(items) => {
                self.write_len(items.len());
                for item in items {
                    self.write_u8(tag_of(item));
                    self.write_payload(item);
                }
            }
            Value::Bag(bag) => self.write_bag(bag),
        }
    }
}

fn tag_of(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => TAG_BOOL,
        Value::Int(_) => TAG_INT,
        Value::Float(_) => TAG_FLOAT,
        Value::Str(_) => TAG_STR,
        Value::List(_) => TAG_LIST,
        Value::Bag(_) => TAG_BAG,
    }
}

// ---------------------------------------------------------------------------
// WireReader
// ---------------------------------------------------------------------------

/// Reads encoded values from a byte slice.
#[derive(Debug)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if n > self.remaining() {
            return Err(WireError::Truncated);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_varint(&mut self) -> Result<u32, WireError> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WireError::VarIntTooLong)
    }

    /// A length prefix. Every element occupies at least one byte, so a
    /// length larger than the remaining input is rejected before any
    /// allocation.
    fn read_len(&mut self) -> Result<usize, WireError> {
        let len = self.read_varint()? as usize;
        if len > self.remaining() {
            return Err(WireError::Truncated);
        }
        Ok(len)
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_bits(u64::from_be_bytes(self.take_array()?)))
    }

    pub fn read_str(&mut self) -> Result<String, WireError> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| WireError::InvalidUtf8)
    }

    pub fn read_id(&mut self) -> Result<EntityId, WireError> {
        let raw = self.read_str()?;
        raw.parse().map_err(|_| WireError::InvalidId(raw))
    }

    pub fn read_bag(&mut self) -> Result<FieldBag, WireError> {
        self.read_bag_at(0)
    }

    fn read_bag_at(&mut self, depth: usize) -> Result<FieldBag, WireError> {
        if depth > MAX_DEPTH {
            return Err(WireError::TooDeep);
        }
        let len = self.read_len()?;
        let mut bag = FieldBag::new();
        for _ in 0..len {
            let tag = self.read_u8()?;
            let key = self.read_str()?;
            let value = self.read_payload(tag, depth)?;
            if bag.contains(&key) {
                return Err(WireError::DuplicateKey(key));
            }
            bag.insert(key, value);
        }
        Ok(bag)
    }

    fn read_payload(&mut self, tag: u8, depth: usize) -> Result<Value, WireError> {
        Ok(match tag {
            TAG_BOOL => match self.read_u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(WireError::InvalidBool(other)),
            },
            TAG_INT => Value::Int(self.read_i64()?),
            TAG_FLOAT => Value::Float(self.read_f64()?),
            TAG_STR => Value::Str(self.read_str()?),
            TAG_LIST => {
                if depth + 1 > MAX_DEPTH {
                    return Err(WireError::TooDeep);
                }
                let len = self.read_len()?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    let item_tag = self.read_u8()?;
                    items.push(self.read_payload(item_tag, depth + 1)?);
                }
                Value::List(items)
            }
            TAG_BAG => Value::Bag(self.read_bag_at(depth + 1)?),
            other => return Err(WireError::UnknownTag(other)),
        })
    }
}

// ---------------------------------------------------------------------------
// Field bag helpers
// ---------------------------------------------------------------------------

pub fn encode_bag(bag: &FieldBag) -> Vec<u8> {
    let mut writer = WireWriter::new();
    writer.write_bag(bag);
    writer.finish()
}

/// Decode a standalone bag; the input must contain exactly one.
pub fn decode_bag(data: &[u8]) -> Result<FieldBag, WireError> {
    let mut reader = WireReader::new(data);
    let bag = reader.read_bag()?;
    match reader.remaining() {
        0 => Ok(bag),
        n => Err(WireError::TrailingBytes(n)),
    }
}

// ---------------------------------------------------------------------------
// GunBatch
// ---------------------------------------------------------------------------

/// Decoded guns in wire order. Ids are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GunBatch {
    entries: Vec<(EntityId, GunConfig)>,
}

impl GunBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a snapshot's guns, in id order.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            entries: snapshot
                .iter()
                .map(|(id, gun)| (id.clone(), GunConfig::clone(gun)))
                .collect(),
        }
    }

    /// Append an entry; a repeated id is rejected.
    pub fn push(&mut self, id: EntityId, gun: GunConfig) -> Result<(), WireError> {
        if self.entries.iter().any(|(existing, _)| *existing == id) {
            return Err(WireError::DuplicateId(id));
        }
        self.entries.push((id, gun));
        Ok(())
    }

    pub fn get(&self, id: &EntityId) -> Option<&GunConfig> {
        self.entries.iter().find(|(e, _)| e == id).map(|(_, g)| g)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &GunConfig)> {
        self.entries.iter().map(|(id, gun)| (id, gun))
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<EntityId, GunConfig> {
        self.entries.into_iter().collect()
    }

    /// Encode in batch order.
    pub fn encode(&self) -> Vec<u8> {
        encode_entries(self.len(), self.iter())
    }
}

// ---------------------------------------------------------------------------
// Snapshot encode / decode
// ---------------------------------------------------------------------------

fn encode_entries<'a>(
    count: usize,
    entries: impl Iterator<Item = (&'a EntityId, &'a GunConfig)>,
) -> Vec<u8> {
    let mut writer = WireWriter::with_capacity(16 + count * 256);
    writer.write_len(count);
    for (id, gun) in entries {
        writer.write_id(id);
        writer.write_bag(&gun.to_bag());
    }
    writer.finish()
}

/// Encode every gun in a snapshot, in id order.
///
/// # Panics
///
/// If the snapshot, a string, or a list holds more than `u32::MAX` items or
/// bytes.
pub fn encode_snapshot(snapshot: &Snapshot) -> Vec<u8> {
    encode_entries(
        snapshot.len(),
        snapshot.iter().map(|(id, gun)| (id, gun.as_ref())),
    )
}

/// Decode a snapshot payload. Ids are checked for syntax and uniqueness
/// only; whether they name live guns is the acceptor's concern.
pub fn decode_snapshot(data: &[u8], max_entries: usize) -> Result<GunBatch, WireError> {
    let mut reader = WireReader::new(data);
    let count = reader.read_varint()? as usize;
    if count > max_entries {
        return Err(WireError::TooManyEntries {
            count,
            max: max_entries,
        });
    }
    if count > reader.remaining() {
        return Err(WireError::Truncated);
    }

    let mut batch = GunBatch {
        entries: Vec::with_capacity(count),
    };
    for _ in 0..count {
        let id = reader.read_id()?;
        let bag = reader.read_bag()?;
        let gun = GunConfig::from_bag(&bag).map_err(|source| WireError::InvalidRecord {
            id: id.clone(),
            source,
        })?;
        batch.push(id, gun)?;
    }

    match reader.remaining() {
        0 => Ok(batch),
        n => Err(WireError::TrailingBytes(n)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
