//! Key definitions: the ordered list of tuple fields a merge sorts by.
//!
//! A [`KeyDef`] is built once per merge session and shared read-only by every
//! comparison through an `Arc`. Each [`KeyPart`] names a zero-based tuple
//! field, the type its values are compared as, whether `nil` is allowed and an
//! optional string [`Collation`].

mod compare;

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

/// Collation id meaning "no collation" in key-part tables.
pub const COLL_NONE: u32 = u32::MAX;

/// Type a key field is validated and compared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Any value; not usable in keys.
    Any,
    /// Non-negative integer.
    Unsigned,
    /// String.
    String,
    /// Integer or floating point number.
    Number,
    /// Signed or unsigned integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Binary blob.
    Varbinary,
    /// Any scalar, ordered by class first.
    Scalar,
    /// Array; not usable in keys.
    Array,
    /// Map; not usable in keys.
    Map,
}

impl FieldType {
    const ALL: [FieldType; 10] = [
        FieldType::Any,
        FieldType::Unsigned,
        FieldType::String,
        FieldType::Number,
        FieldType::Integer,
        FieldType::Boolean,
        FieldType::Varbinary,
        FieldType::Scalar,
        FieldType::Array,
        FieldType::Map,
    ];

    /// Numeric id used by key-part tables.
    pub const fn id(self) -> u32 {
        match self {
            FieldType::Any => 0,
            FieldType::Unsigned => 1,
            FieldType::String => 2,
            FieldType::Number => 3,
            FieldType::Integer => 4,
            FieldType::Boolean => 5,
            FieldType::Varbinary => 6,
            FieldType::Scalar => 7,
            FieldType::Array => 8,
            FieldType::Map => 9,
        }
    }

    /// Resolve a numeric id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Any => "any",
            FieldType::Unsigned => "unsigned",
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Varbinary => "varbinary",
            FieldType::Scalar => "scalar",
            FieldType::Array => "array",
            FieldType::Map => "map",
        }
    }

    /// Whether values of this type can be ordered inside a key.
    pub const fn is_keyable(self) -> bool {
        !matches!(self, FieldType::Any | FieldType::Array | FieldType::Map)
    }

    fn accepts_collation(self) -> bool {
        matches!(self, FieldType::String | FieldType::Scalar)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let alias = match lower.as_str() {
            "unsigned" | "uint" | "num" => Some(FieldType::Unsigned),
            "int" => Some(FieldType::Integer),
            "str" => Some(FieldType::String),
            "bool" => Some(FieldType::Boolean),
            _ => None,
        };
        alias
            .or_else(|| Self::ALL.into_iter().find(|ty| ty.name() == lower))
            .ok_or_else(|| MergeError::InvalidSpec(format!("unknown field type '{s}'")))
    }
}

/// String collation applied by `string` and `scalar` key parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collation {
    /// Unicode Collation Algorithm, root locale, tertiary strength.
    Unicode,
    /// Unicode Collation Algorithm, root locale, primary strength: case and
    /// accents are ignored.
    UnicodeCi,
    /// Plain byte order.
    Binary,
}

impl Collation {
    /// Numeric id used by key-part tables.
    pub const fn id(self) -> u32 {
        match self {
            Collation::Unicode => 1,
            Collation::UnicodeCi => 2,
            Collation::Binary => 3,
        }
    }

    /// Resolve a numeric id; [`COLL_NONE`] yields `Ok(None)`.
    pub fn from_id(id: u32) -> Result<Option<Self>> {
        match id {
            COLL_NONE => Ok(None),
            1 => Ok(Some(Collation::Unicode)),
            2 => Ok(Some(Collation::UnicodeCi)),
            3 => Ok(Some(Collation::Binary)),
            other => Err(MergeError::InvalidSpec(format!(
                "unknown collation id {other}"
            ))),
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Collation::Unicode => "unicode",
            Collation::UnicodeCi => "unicode_ci",
            Collation::Binary => "binary",
        }
    }
}

impl FromStr for Collation {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unicode" => Ok(Collation::Unicode),
            "unicode_ci" => Ok(Collation::UnicodeCi),
            "binary" => Ok(Collation::Binary),
            other => Err(MergeError::InvalidSpec(format!(
                "unknown collation '{other}'"
            ))),
        }
    }
}

/// One component of a key definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart {
    field_index: u32,
    field_type: FieldType,
    nullable: bool,
    collation: Option<Collation>,
}

impl KeyPart {
    /// Non-nullable part without collation.
    pub fn new(field_index: u32, field_type: FieldType) -> Self {
        Self {
            field_index,
            field_type,
            nullable: false,
            collation: None,
        }
    }

    /// Allow `nil` (or a missing field) in this part.
    pub fn nullable(self, nullable: bool) -> Self {
        Self { nullable, ..self }
    }

    /// Compare string values with `collation`.
    pub fn collation(self, collation: Collation) -> Self {
        Self {
            collation: Some(collation),
            ..self
        }
    }

    /// Zero-based tuple field index.
    pub fn field_index(&self) -> u32 {
        self.field_index
    }

    /// Declared field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Whether `nil` is allowed.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Collation applied to strings, if any.
    pub fn collation_kind(&self) -> Option<Collation> {
        self.collation
    }
}

/// Immutable, shareable multi-part comparator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    parts: Arc<[KeyPart]>,
}

impl KeyDef {
    /// Validate `parts` and build the key definition.
    ///
    /// # Errors
    /// [`MergeError::InvalidSpec`] when the list is empty, a part uses a type
    /// that cannot be ordered, or a collation is attached to a non-string part.
    pub fn new(parts: Vec<KeyPart>) -> Result<Self> {
        if parts.is_empty() {
            return Err(MergeError::InvalidSpec(
                "key definition needs at least one part".to_string(),
            ));
        }
        for (position, part) in parts.iter().enumerate() {
            if !part.field_type.is_keyable() {
                return Err(MergeError::InvalidSpec(format!(
                    "part {position}: field type '{}' cannot be used in a key",
                    part.field_type
                )));
            }
            if part.collation.is_some() && !part.field_type.accepts_collation() {
                return Err(MergeError::InvalidSpec(format!(
                    "part {position}: collation is only allowed on string and scalar fields, \
                     got '{}'",
                    part.field_type
                )));
            }
            if let Some(collation) = part.collation {
                collation.collator()?;
            }
        }
        Ok(Self {
            parts: parts.into(),
        })
    }

    /// Parts in priority order.
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Always `false`; construction rejects empty definitions.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
