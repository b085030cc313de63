//! The `{tag: [record, ...]}` wrapper every source buffer arrives in.

use bytes::Bytes;
use thiserror::Error;

use crate::{
    mp::{encode_array, encode_map_len, encode_uint, MpError, MpValue, Reader},
    option::IPROTO_DATA,
};

/// Why a buffer was not accepted as a source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The buffer does not open with a map header.
    #[error("envelope is not a map: {0}")]
    NotMap(MpError),
    /// The map holds more or fewer than one entry.
    #[error("envelope map has {0} entries, expected 1")]
    MapSize(u32),
    /// The single key is not an unsigned integer.
    #[error("envelope key: {0}")]
    Key(MpError),
    /// The single key is not the payload tag.
    #[error("envelope key is {found:#x}, expected {expected:#x}")]
    Tag {
        /// Configured payload tag.
        expected: u64,
        /// Key present in the buffer.
        found: u64,
    },
    /// The payload is not an array.
    #[error("envelope payload: {0}")]
    Body(MpError),
}

/// Validate the envelope at the start of `buf` and return its length, i.e.
/// the offset of the first record.
///
/// The payload array length is not returned: sources are read until their
/// bytes run out.
pub fn strip(buf: &[u8], tag: u64) -> Result<usize, EnvelopeError> {
    let mut reader = Reader::new(buf);
    let entries = reader.read_map_len().map_err(EnvelopeError::NotMap)?;
    if entries != 1 {
        return Err(EnvelopeError::MapSize(entries));
    }
    let found = reader.read_uint().map_err(EnvelopeError::Key)?;
    if found != tag {
        return Err(EnvelopeError::Tag {
            expected: tag,
            found,
        });
    }
    reader.read_array_len().map_err(EnvelopeError::Body)?;
    Ok(reader.position())
}

/// Builds a well-formed source buffer record by record.
///
/// The payload header is written as a fixed-width `array32` so the record
/// count can be patched in by [`EnvelopeWriter::finish`].
#[derive(Debug)]
pub struct EnvelopeWriter {
    buf: Vec<u8>,
    count_offset: usize,
    count: u32,
}

impl Default for EnvelopeWriter {
    fn default() -> Self {
        Self::new(IPROTO_DATA)
    }
}

impl EnvelopeWriter {
    /// Start a buffer whose envelope key is `tag`.
    pub fn new(tag: u64) -> Self {
        let mut buf = Vec::new();
        encode_map_len(&mut buf, 1);
        encode_uint(&mut buf, tag);
        buf.push(0xdd);
        let count_offset = buf.len();
        buf.extend_from_slice(&0u32.to_be_bytes());
        Self {
            buf,
            count_offset,
            count: 0,
        }
    }

    /// Append one tuple built from `fields`.
    pub fn push(&mut self, fields: &[MpValue<'_>]) -> &mut Self {
        encode_array(&mut self.buf, fields);
        self.count += 1;
        self
    }

    /// Append one already encoded value verbatim.
    pub fn push_raw(&mut self, encoded: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(encoded);
        self.count += 1;
        self
    }

    /// Records appended so far.
    pub fn len(&self) -> u32 {
        self.count
    }

    /// Whether no record has been appended.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Patch the record count and hand out the buffer.
    pub fn finish(mut self) -> Bytes {
        let count = self.count.to_be_bytes();
        self.buf[self.count_offset..self.count_offset + count.len()].copy_from_slice(&count);
        Bytes::from(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp::{encode_array_len, encode_str};

    #[test]
    fn strip_returns_offset_of_first_record() {
        let mut writer = EnvelopeWriter::default();
        writer.push(&[MpValue::from(1u64)]);
        let buf = writer.finish();
        // fixmap(1) + tag 0x30 + array32 header
        assert_eq!(strip(&buf, IPROTO_DATA), Ok(7));
        assert_eq!(&buf[7..], &[0x91, 0x01]);
        assert_eq!(&buf[3..7], &1u32.to_be_bytes());
    }

    #[test]
    fn strip_rejects_malformed_envelopes() {
        let mut not_map = Vec::new();
        encode_array_len(&mut not_map, 0);
        assert!(matches!(
            strip(&not_map, IPROTO_DATA),
            Err(EnvelopeError::NotMap(_))
        ));

        let mut two_entries = Vec::new();
        encode_map_len(&mut two_entries, 2);
        assert_eq!(
            strip(&two_entries, IPROTO_DATA),
            Err(EnvelopeError::MapSize(2))
        );

        let mut string_key = Vec::new();
        encode_map_len(&mut string_key, 1);
        encode_str(&mut string_key, "data");
        assert!(matches!(
            strip(&string_key, IPROTO_DATA),
            Err(EnvelopeError::Key(_))
        ));

        let wrong_tag = EnvelopeWriter::new(0x31).finish();
        assert_eq!(
            strip(&wrong_tag, IPROTO_DATA),
            Err(EnvelopeError::Tag {
                expected: 0x30,
                found: 0x31
            })
        );

        let mut scalar_body = Vec::new();
        encode_map_len(&mut scalar_body, 1);
        encode_uint(&mut scalar_body, IPROTO_DATA);
        encode_uint(&mut scalar_body, 5);
        assert!(matches!(
            strip(&scalar_body, IPROTO_DATA),
            Err(EnvelopeError::Body(_))
        ));
    }

    #[test]
    fn custom_tags_are_honoured() {
        let buf = EnvelopeWriter::new(0x2a).finish();
        assert!(strip(&buf, 0x2a).is_ok());
        assert!(strip(&buf, IPROTO_DATA).is_err());
    }
}
