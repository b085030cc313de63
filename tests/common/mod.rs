#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use shard_merger::{EnvelopeWriter, FieldType, KeyDef, KeyPart, MpValue, Record};

pub fn unsigned_key() -> Arc<KeyDef> {
    Arc::new(KeyDef::new(vec![KeyPart::new(0, FieldType::Unsigned)]).expect("key def"))
}

/// Buffer of `[key, tag]` tuples, in the given order.
pub fn tagged_buffer(rows: &[(u64, &str)]) -> Bytes {
    let mut writer = EnvelopeWriter::default();
    for (key, tag) in rows {
        writer.push(&[MpValue::from(*key), MpValue::from(*tag)]);
    }
    writer.finish()
}

/// Buffer of single-field `[key]` tuples.
pub fn key_buffer(keys: &[u64]) -> Bytes {
    let mut writer = EnvelopeWriter::default();
    for key in keys {
        writer.push(&[MpValue::from(*key)]);
    }
    writer.finish()
}

pub fn encode_key(values: &[MpValue<'_>]) -> Vec<u8> {
    let mut buf = Vec::new();
    shard_merger::mp::encode_array(&mut buf, values);
    buf
}

pub fn key_of(record: &Record) -> u64 {
    record.field(0).and_then(|v| v.as_u64()).expect("unsigned key")
}

pub fn tag_of(record: &Record) -> String {
    record
        .field(1)
        .and_then(|v| v.as_str())
        .expect("string tag")
        .to_owned()
}
