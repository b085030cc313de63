//! Decoded tuples and the shape they are validated against.
//!
//! A [`Record`] is a zero-copy view over one MessagePack array sliced out of a
//! source buffer, plus the offsets of its fields. Handles are reference
//! counted: cloning acquires, dropping releases, and the payload is freed when
//! the last handle goes away.

use std::{fmt, sync::Arc};

use bytes::Bytes;

use crate::{
    error::{MergeError, Result},
    key_def::KeyDef,
    mp::{MpValue, Reader},
};

/// Field requirements derived from a key definition.
///
/// Every record a merger decodes is checked against the shape, so comparisons
/// later never meet a missing non-nullable field or a value of the wrong type.
#[derive(Debug, Clone)]
pub struct RecordShape {
    key_def: Arc<KeyDef>,
    min_field_count: usize,
}

impl RecordShape {
    /// Derive the shape required by `key_def`.
    pub fn new(key_def: Arc<KeyDef>) -> Self {
        let min_field_count = key_def
            .parts()
            .iter()
            .filter(|part| !part.is_nullable())
            .map(|part| part.field_index() as usize + 1)
            .max()
            .unwrap_or(0);
        Self {
            key_def,
            min_field_count,
        }
    }

    /// Key definition the shape was derived from.
    pub fn key_def(&self) -> &Arc<KeyDef> {
        &self.key_def
    }

    /// Fewest fields a record may have.
    pub fn min_field_count(&self) -> usize {
        self.min_field_count
    }
}

struct RecordInner {
    data: Bytes,
    field_offsets: Box<[usize]>,
}

/// Shared handle over one decoded tuple.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

impl Record {
    /// Decode one tuple occupying exactly `data`.
    ///
    /// # Errors
    /// [`MergeError::CorruptStream`] when `data` is not a well-formed array,
    /// has trailing bytes, or does not satisfy `shape`.
    pub fn decode(data: Bytes, shape: &RecordShape) -> Result<Self> {
        let mut reader = Reader::new(&data);
        let field_count = reader
            .read_array_len()
            .map_err(|err| MergeError::CorruptStream(format!("record header: {err}")))?
            as usize;
        if field_count < shape.min_field_count {
            return Err(MergeError::CorruptStream(format!(
                "record has {field_count} fields, key definition requires {}",
                shape.min_field_count
            )));
        }

        // Every field takes at least one byte.
        if field_count > reader.remaining() {
            return Err(MergeError::CorruptStream(format!(
                "record claims {field_count} fields in {} bytes",
                reader.remaining()
            )));
        }
        let mut field_offsets = Vec::new();
        field_offsets.try_reserve_exact(field_count)?;
        for _ in 0..field_count {
            field_offsets.push(reader.position());
            reader
                .skip()
                .map_err(|err| MergeError::CorruptStream(format!("record field: {err}")))?;
        }
        if !reader.is_empty() {
            return Err(MergeError::CorruptStream(format!(
                "{} trailing bytes after record",
                reader.remaining()
            )));
        }

        let record = Self {
            inner: Arc::new(RecordInner {
                data,
                field_offsets: field_offsets.into_boxed_slice(),
            }),
        };
        record.check_key_fields(&shape.key_def)?;
        Ok(record)
    }

    fn check_key_fields(&self, key_def: &KeyDef) -> Result<()> {
        for part in key_def.parts() {
            match self.field(part.field_index()) {
                None | Some(MpValue::Nil) if part.is_nullable() => {}
                None | Some(MpValue::Nil) => {
                    return Err(MergeError::CorruptStream(format!(
                        "field {} is nil but the key part is not nullable",
                        part.field_index()
                    )));
                }
                Some(value) if !part.field_type().accepts(&value) => {
                    return Err(MergeError::CorruptStream(format!(
                        "field {} expects {}, found {:?}",
                        part.field_index(),
                        part.field_type(),
                        value
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Decoded value of field `index`, or `None` past the end of the tuple.
    pub fn field(&self, index: u32) -> Option<MpValue<'_>> {
        let offset = *self.inner.field_offsets.get(index as usize)?;
        Reader::at(&self.inner.data, offset).read_value().ok()
    }

    /// Number of fields in the tuple.
    pub fn field_count(&self) -> usize {
        self.inner.field_offsets.len()
    }

    /// Encoded tuple bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner.data
    }

    /// Encoded tuple bytes as a shared buffer.
    pub fn to_bytes(&self) -> Bytes {
        self.inner.data.clone()
    }

    /// Three-way comparison of `self` and `other` under `key_def`.
    pub fn compare(&self, other: &Record, key_def: &KeyDef) -> std::cmp::Ordering {
        key_def.compare(self, other)
    }

    /// Compare against an encoded key; see [`KeyDef::compare_with_key`].
    pub fn compare_with_key(&self, key: &[u8], key_def: &KeyDef) -> Result<std::cmp::Ordering> {
        key_def.compare_with_key(self, key)
    }

    /// Live handles to this tuple.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for index in 0..self.field_count() {
            list.entry(&self.field(index as u32));
        }
        list.finish()
    }
}
