/// Borrowed view of one decoded MessagePack value.
///
/// Non-negative integers are always reported as [`MpValue::Uint`], whatever
/// marker encoded them, so integer comparisons only have two shapes to handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MpValue<'a> {
    /// `nil`.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Non-negative integer.
    Uint(u64),
    /// Negative integer.
    Int(i64),
    /// Float or double, widened to `f64`.
    Float(f64),
    /// String payload (not validated as UTF-8).
    Str(&'a [u8]),
    /// Binary payload.
    Bin(&'a [u8]),
    /// Whole encoded array, header included.
    Array(&'a [u8]),
    /// Whole encoded map, header included.
    Map(&'a [u8]),
    /// Extension type id and payload.
    Ext(i8, &'a [u8]),
}

impl<'a> MpValue<'a> {
    pub(crate) fn from_signed(value: i64) -> Self {
        if value >= 0 {
            MpValue::Uint(value as u64)
        } else {
            MpValue::Int(value)
        }
    }

    /// Whether this is `nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, MpValue::Nil)
    }

    /// Unsigned integer payload.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MpValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer payload if it fits `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MpValue::Uint(v) => i64::try_from(*v).ok(),
            MpValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String payload as `&str` when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            MpValue::Str(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

impl From<bool> for MpValue<'_> {
    fn from(value: bool) -> Self {
        MpValue::Bool(value)
    }
}

impl From<u64> for MpValue<'_> {
    fn from(value: u64) -> Self {
        MpValue::Uint(value)
    }
}

impl From<i64> for MpValue<'_> {
    fn from(value: i64) -> Self {
        MpValue::from_signed(value)
    }
}

impl From<f64> for MpValue<'_> {
    fn from(value: f64) -> Self {
        MpValue::Float(value)
    }
}

impl<'a> From<&'a str> for MpValue<'a> {
    fn from(value: &'a str) -> Self {
        MpValue::Str(value.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for MpValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        MpValue::Bin(value)
    }
}

impl<'a, T> From<Option<T>> for MpValue<'a>
where
    T: Into<MpValue<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(MpValue::Nil, Into::into)
    }
}
