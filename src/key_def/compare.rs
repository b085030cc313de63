use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions, Strength};
use once_cell::sync::OnceCell;

use super::{Collation, FieldType, KeyDef, KeyPart};
use crate::{
    error::{MergeError, Result},
    mp::{MpValue, Reader},
    record::Record,
};

impl FieldType {
    /// Whether a non-nil `value` may be stored in a field of this type.
    pub fn accepts(self, value: &MpValue<'_>) -> bool {
        match self {
            FieldType::Any => !value.is_nil(),
            FieldType::Unsigned => matches!(value, MpValue::Uint(_)),
            FieldType::Integer => matches!(value, MpValue::Uint(_) | MpValue::Int(_)),
            FieldType::Number => {
                matches!(value, MpValue::Uint(_) | MpValue::Int(_) | MpValue::Float(_))
            }
            FieldType::String => matches!(value, MpValue::Str(_)),
            FieldType::Boolean => matches!(value, MpValue::Bool(_)),
            FieldType::Varbinary => matches!(value, MpValue::Bin(_)),
            FieldType::Scalar => matches!(
                value,
                MpValue::Bool(_)
                    | MpValue::Uint(_)
                    | MpValue::Int(_)
                    | MpValue::Float(_)
                    | MpValue::Str(_)
                    | MpValue::Bin(_)
            ),
            FieldType::Array => matches!(value, MpValue::Array(_)),
            FieldType::Map => matches!(value, MpValue::Map(_)),
        }
    }
}

static UNICODE: OnceCell<Collator> = OnceCell::new();
static UNICODE_CI: OnceCell<Collator> = OnceCell::new();

impl Collation {
    /// Root-locale collator backing this collation; `None` for byte order.
    ///
    /// Collators are built on first use and shared process-wide.
    pub(crate) fn collator(self) -> Result<Option<&'static Collator>> {
        let (cell, strength) = match self {
            Collation::Binary => return Ok(None),
            Collation::Unicode => (&UNICODE, Strength::Tertiary),
            Collation::UnicodeCi => (&UNICODE_CI, Strength::Primary),
        };
        cell.get_or_try_init(|| {
            let mut options = CollatorOptions::new();
            options.strength = Some(strength);
            Collator::try_new(&Default::default(), options)
        })
        .map(Some)
        .map_err(|err| MergeError::InvalidSpec(format!("collation '{}': {err}", self.name())))
    }

    /// Order two string payloads under this collation.
    pub fn compare(self, lhs: &[u8], rhs: &[u8]) -> Ordering {
        match self.collator() {
            Ok(Some(collator)) => collator.compare_utf8(lhs, rhs),
            // Key definitions load their collators up front, so only `binary` lands here.
            Ok(None) | Err(_) => lhs.cmp(rhs),
        }
    }
}

impl KeyDef {
    /// Three-way comparison of two records, part by part.
    pub fn compare(&self, lhs: &Record, rhs: &Record) -> Ordering {
        for part in self.parts() {
            let ord = compare_part(
                part,
                lhs.field(part.field_index()),
                rhs.field(part.field_index()),
            );
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Compare a record against an encoded key (an array of part values).
    ///
    /// The key may hold fewer values than there are parts; only that prefix
    /// takes part in the comparison.
    ///
    /// # Errors
    /// [`MergeError::InvalidKey`] when the key is not an array, has more values
    /// than parts, or holds a value the matching part cannot compare.
    pub fn compare_with_key(&self, record: &Record, key: &[u8]) -> Result<Ordering> {
        let mut reader = Reader::new(key);
        let len = reader
            .read_array_len()
            .map_err(|err| MergeError::InvalidKey(err.to_string()))?;
        if len as usize > self.len() {
            return Err(MergeError::InvalidKey(format!(
                "key has {len} parts, key definition has {}",
                self.len()
            )));
        }
        for part in &self.parts()[..len as usize] {
            let value = reader
                .read_value()
                .map_err(|err| MergeError::InvalidKey(err.to_string()))?;
            if value.is_nil() {
                if !part.is_nullable() {
                    return Err(MergeError::InvalidKey(format!(
                        "nil supplied for non-nullable field {}",
                        part.field_index()
                    )));
                }
            } else if !part.field_type().accepts(&value) {
                return Err(MergeError::InvalidKey(format!(
                    "field {} expects {}, key holds {:?}",
                    part.field_index(),
                    part.field_type(),
                    value
                )));
            }
            let ord = compare_part(part, record.field(part.field_index()), Some(value));
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(Ordering::Equal)
    }
}

/// Compare one key part; a missing field or `nil` sorts before every value.
pub(crate) fn compare_part(
    part: &KeyPart,
    lhs: Option<MpValue<'_>>,
    rhs: Option<MpValue<'_>>,
) -> Ordering {
    let lhs = lhs.filter(|value| !value.is_nil());
    let rhs = rhs.filter(|value| !value.is_nil());
    match (lhs, rhs) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(lhs), Some(rhs)) => {
            compare_values(part.field_type(), part.collation_kind(), &lhs, &rhs)
        }
    }
}

fn compare_values(
    field_type: FieldType,
    collation: Option<Collation>,
    lhs: &MpValue<'_>,
    rhs: &MpValue<'_>,
) -> Ordering {
    match field_type {
        FieldType::Scalar => scalar_class(lhs)
            .cmp(&scalar_class(rhs))
            .then_with(|| compare_same_class(collation, lhs, rhs)),
        _ => compare_same_class(collation, lhs, rhs),
    }
}

/// Class rank used by `scalar` parts: booleans, numbers, strings, binaries.
fn scalar_class(value: &MpValue<'_>) -> u8 {
    match value {
        MpValue::Bool(_) => 0,
        MpValue::Uint(_) | MpValue::Int(_) | MpValue::Float(_) => 1,
        MpValue::Str(_) => 2,
        MpValue::Bin(_) => 3,
        _ => 4,
    }
}

fn compare_same_class(
    collation: Option<Collation>,
    lhs: &MpValue<'_>,
    rhs: &MpValue<'_>,
) -> Ordering {
    use MpValue::*;
    match (lhs, rhs) {
        (Bool(l), Bool(r)) => l.cmp(r),
        (Uint(l), Uint(r)) => l.cmp(r),
        (Int(l), Int(r)) => l.cmp(r),
        (Int(_), Uint(_)) => Ordering::Less,
        (Uint(_), Int(_)) => Ordering::Greater,
        (Float(l), Float(r)) => floats_cmp(*l, *r),
        (Uint(l), Float(r)) => int_float_cmp(i128::from(*l), *r),
        (Int(l), Float(r)) => int_float_cmp(i128::from(*l), *r),
        (Float(l), Uint(r)) => int_float_cmp(i128::from(*r), *l).reverse(),
        (Float(l), Int(r)) => int_float_cmp(i128::from(*r), *l).reverse(),
        (Str(l), Str(r)) => collation.unwrap_or(Collation::Binary).compare(l, r),
        (Bin(l), Bin(r)) => l.cmp(r),
        // Shape validation keeps other pairs out; fall back to a stable order.
        _ => scalar_class(lhs).cmp(&scalar_class(rhs)),
    }
}

/// Float order with NaN sorting before every number.
fn floats_cmp(lhs: f64, rhs: f64) -> Ordering {
    match (lhs.is_nan(), rhs.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => lhs.partial_cmp(&rhs).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a float.
fn int_float_cmp(int: i128, float: f64) -> Ordering {
    // 2^64 and -2^63 bound every integer MessagePack can carry.
    const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
    const MINUS_TWO_POW_63: f64 = -9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return Ordering::Greater;
    }
    if float >= TWO_POW_64 {
        return Ordering::Less;
    }
    if float < MINUS_TWO_POW_63 {
        return Ordering::Greater;
    }
    let truncated = float.trunc();
    match int.cmp(&(truncated as i128)) {
        Ordering::Equal if float > truncated => Ordering::Less,
        Ordering::Equal if float < truncated => Ordering::Greater,
        ord => ord,
    }
}
