//! Dynamically typed entry points for scripting hosts.
//!
//! Arguments that a host passes as loosely typed values (key-part tables,
//! merge direction, `skip`/`limit`) arrive as [`serde_json::Value`]s. Values
//! of the wrong shape fail with [`MergeError::BadArguments`] naming the
//! expected call; well-shaped but meaningless key parts fail with
//! [`MergeError::InvalidSpec`].

use std::{cmp::Ordering, sync::Arc};

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{MergeError, Result},
    key_def::{Collation, FieldType, KeyDef, KeyPart},
    logging::{merger_log, Component, MergeEvent},
    merger::{BoundedWindowMerger, HeapMerger, Order},
    record::Record,
};

const NEW_USAGE: &str = "new({{fieldno, type [, is_nullable, collation]}, ...})";
const START_USAGE: &str = "start(merger, {buffers}, order)";
const BOUNDED_USAGE: &str =
    "bounded_merge({buffers}, skip, limit, order, {{fieldno, type [, is_nullable, collation]}, ...})";

/// Merger created by [`merge_new`] and driven by the other entry points.
#[derive(Debug)]
pub struct MergerHandle {
    merger: HeapMerger,
}

impl MergerHandle {
    /// Underlying streaming merger.
    pub fn merger(&self) -> &HeapMerger {
        &self.merger
    }

    /// Underlying streaming merger, mutably.
    pub fn merger_mut(&mut self) -> &mut HeapMerger {
        &mut self.merger
    }
}

/// A key-part table entry as hosts write it.
#[derive(Debug, Deserialize)]
struct KeyPartSpec {
    fieldno: Option<u32>,
    #[serde(rename = "type")]
    field_type: Option<IdOrName>,
    is_nullable: Option<bool>,
    collation: Option<IdOrName>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdOrName {
    Id(u32),
    Name(String),
}

impl KeyPartSpec {
    fn into_key_part(self) -> Result<KeyPart> {
        let field_index = self
            .fieldno
            .ok_or_else(|| MergeError::InvalidSpec("Fieldno must be defined in field".into()))?;
        let field_type = match self.field_type {
            None => {
                return Err(MergeError::InvalidSpec(
                    "Type must be defined in field".into(),
                ))
            }
            Some(IdOrName::Id(id)) => FieldType::from_id(id)
                .ok_or_else(|| MergeError::InvalidSpec(format!("unknown field type id {id}")))?,
            Some(IdOrName::Name(name)) => name.parse()?,
        };
        let collation = match self.collation {
            None => None,
            Some(IdOrName::Id(id)) => Collation::from_id(id)?,
            Some(IdOrName::Name(name)) => Some(name.parse()?),
        };

        let part = KeyPart::new(field_index, field_type).nullable(self.is_nullable.unwrap_or(false));
        Ok(match collation {
            Some(collation) => part.collation(collation),
            None => part,
        })
    }
}

fn parse_key_def(parts: &Value, usage: &'static str) -> Result<Arc<KeyDef>> {
    let Value::Array(entries) = parts else {
        return Err(MergeError::BadArguments(usage));
    };
    let mut key_parts = Vec::new();
    key_parts.try_reserve(entries.len())?;
    for entry in entries {
        if !entry.is_object() {
            return Err(MergeError::BadArguments(usage));
        }
        let spec = KeyPartSpec::deserialize(entry).map_err(|_| MergeError::BadArguments(usage))?;
        key_parts.push(spec.into_key_part()?);
    }
    KeyDef::new(key_parts).map(Arc::new)
}

fn parse_order(order: &Value, usage: &'static str) -> Result<Order> {
    if let Some(sign) = order.as_i64() {
        return Ok(Order::from_sign(sign));
    }
    // Fractional signs truncate toward zero, so `-0.5` is ascending.
    match order.as_f64() {
        Some(sign) if sign.is_finite() => Ok(Order::from_sign(sign.trunc() as i64)),
        _ => Err(MergeError::BadArguments(usage)),
    }
}

fn parse_count(count: &Value, usage: &'static str) -> Result<usize> {
    count
        .as_u64()
        .map(|count| usize::try_from(count).unwrap_or(usize::MAX))
        .ok_or(MergeError::BadArguments(usage))
}

/// Create a merger from a key-part table such as
/// `[{"fieldno": 0, "type": "unsigned"}, {"fieldno": 2, "type": 2, "collation": "unicode_ci"}]`.
pub fn merge_new(parts: &Value) -> Result<MergerHandle> {
    let key_def = parse_key_def(parts, NEW_USAGE)?;
    merger_log!(
        Component::Driver,
        MergeEvent::MergerCreated,
        "parts={}",
        key_def.len()
    );
    Ok(MergerHandle {
        merger: HeapMerger::new(key_def),
    })
}

/// Start a session over `buffers`; `order` is a number, negative meaning
/// descending. Always reports `true` on success.
pub fn merge_start(handle: &mut MergerHandle, buffers: &[Bytes], order: &Value) -> Result<bool> {
    let order = parse_order(order, START_USAGE)?;
    handle.merger.start(buffers.iter().cloned(), order)?;
    Ok(true)
}

/// Next record of the session, `None` once drained.
pub fn merge_next(handle: &mut MergerHandle) -> Result<Option<Record>> {
    handle.merger.next()
}

/// Sign of the comparison between the next record and an encoded key.
pub fn merge_cmp(handle: &MergerHandle, key: &[u8]) -> Result<Option<i32>> {
    Ok(handle
        .merger
        .compare_top_to_key(key)?
        .map(|ord| match ord {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }))
}

/// Destroy a merger, releasing every record it still holds.
pub fn merge_del(handle: MergerHandle) {
    merger_log!(
        Component::Driver,
        MergeEvent::MergerDestroyed,
        "active_sources={}",
        handle.merger.active_sources()
    );
    drop(handle);
}

/// One-shot window merge: `limit` records after skipping `skip`.
pub fn bounded_merge(
    buffers: &[Bytes],
    skip: &Value,
    limit: &Value,
    order: &Value,
    parts: &Value,
) -> Result<Vec<Record>> {
    let skip = parse_count(skip, BOUNDED_USAGE)?;
    let limit = parse_count(limit, BOUNDED_USAGE)?;
    let order = parse_order(order, BOUNDED_USAGE)?;
    let key_def = parse_key_def(parts, BOUNDED_USAGE)?;
    BoundedWindowMerger::new(key_def).merge(buffers.iter().cloned(), skip, limit, order)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{envelope::EnvelopeWriter, mp::MpValue};

    fn buffer(rows: &[(u64, &str)]) -> Bytes {
        let mut writer = EnvelopeWriter::default();
        for (id, name) in rows {
            writer.push(&[MpValue::from(*id), MpValue::from(*name)]);
        }
        writer.finish()
    }

    #[test]
    fn key_parts_accept_ids_and_names() {
        let handle = merge_new(&json!([
            {"fieldno": 1, "type": "string", "collation": "unicode_ci"},
            {"fieldno": 0, "type": 1, "is_nullable": true, "collation": null},
            {"fieldno": 2, "type": "str", "collation": 3},
        ]))
        .expect("new");
        let parts = handle.merger().key_def().parts();
        assert_eq!(parts[0].field_type(), FieldType::String);
        assert_eq!(parts[0].collation_kind(), Some(Collation::UnicodeCi));
        assert_eq!(parts[1].field_type(), FieldType::Unsigned);
        assert!(parts[1].is_nullable());
        assert_eq!(parts[2].collation_kind(), Some(Collation::Binary));
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let err = merge_new(&json!([{"type": "unsigned"}])).expect_err("no fieldno");
        assert_eq!(
            err.to_string(),
            "invalid key definition: Fieldno must be defined in field"
        );
        let err = merge_new(&json!([{"fieldno": 0}])).expect_err("no type");
        assert_eq!(
            err.to_string(),
            "invalid key definition: Type must be defined in field"
        );
        assert!(matches!(
            merge_new(&json!([])),
            Err(MergeError::InvalidSpec(_))
        ));
    }

    #[test]
    fn malformed_arguments_name_the_call() {
        let err = merge_new(&json!({"fieldno": 0})).expect_err("not a list");
        assert_eq!(
            err.to_string(),
            "Bad params, use: new({{fieldno, type [, is_nullable, collation]}, ...})"
        );
        assert!(matches!(
            merge_new(&json!([1, 2])),
            Err(MergeError::BadArguments(NEW_USAGE))
        ));
        assert!(matches!(
            merge_new(&json!([{"fieldno": "zero", "type": 1}])),
            Err(MergeError::BadArguments(NEW_USAGE))
        ));

        let mut handle = merge_new(&json!([{"fieldno": 0, "type": "unsigned"}])).expect("new");
        assert!(matches!(
            merge_start(&mut handle, &[], &json!("asc")),
            Err(MergeError::BadArguments(START_USAGE))
        ));
        assert!(matches!(
            bounded_merge(&[], &json!(-1), &json!(1), &json!(1), &json!([])),
            Err(MergeError::BadArguments(BOUNDED_USAGE))
        ));
    }

    #[test]
    fn fractional_order_truncates_toward_zero() {
        assert_eq!(parse_order(&json!(-0.5), START_USAGE).expect("order"), Order::Asc);
        assert_eq!(parse_order(&json!(0.9), START_USAGE).expect("order"), Order::Asc);
        assert_eq!(parse_order(&json!(-1.5), START_USAGE).expect("order"), Order::Desc);
        assert_eq!(parse_order(&json!(-3), START_USAGE).expect("order"), Order::Desc);
    }

    #[test]
    fn session_round_trip_through_the_driver() {
        let mut handle = merge_new(&json!([{"fieldno": 0, "type": "unsigned"}])).expect("new");
        let buffers = [buffer(&[(1, "a"), (4, "d")]), buffer(&[(2, "b"), (3, "c")])];
        assert!(merge_start(&mut handle, &buffers, &json!(-1)).is_ok());
        assert!(merge_start(&mut handle, &buffers, &json!(1)).expect("start"));

        let mut key = Vec::new();
        crate::mp::encode_array(&mut key, &[MpValue::from(2u64)]);
        assert_eq!(merge_cmp(&handle, &key).expect("cmp"), Some(-1));

        let mut names = Vec::new();
        while let Some(record) = merge_next(&mut handle).expect("next") {
            names.push(record.field(1).and_then(|v| v.as_str()).map(str::to_owned));
        }
        assert_eq!(names.len(), 4);
        assert_eq!(names[3].as_deref(), Some("d"));
        assert_eq!(merge_cmp(&handle, &key).expect("cmp"), None);
        merge_del(handle);
    }

    #[test]
    fn bounded_merge_pages_through_sources() {
        let ids = |page: Vec<Record>| -> Vec<Option<u64>> {
            page.iter()
                .map(|r| r.field(0).and_then(|v| v.as_u64()))
                .collect()
        };
        let parts = json!([{"fieldno": 0, "type": "unsigned"}]);

        let descending = [buffer(&[(3, "c"), (1, "a")]), buffer(&[(4, "d"), (2, "b")])];
        let page = bounded_merge(&descending, &json!(1), &json!(2), &json!(-1), &parts)
            .expect("merge");
        assert_eq!(ids(page), vec![Some(3), Some(2)]);

        let ascending = [buffer(&[(1, "a"), (3, "c")]), buffer(&[(2, "b"), (4, "d")])];
        let page = bounded_merge(&ascending, &json!(1), &json!(2), &json!(1), &parts)
            .expect("merge");
        assert_eq!(ids(page), vec![Some(2), Some(3)]);
    }
}
