//! MessagePack primitives used to walk and decode source buffers.
//!
//! Only the subset needed by the merger lives here: peeking at a marker,
//! decoding container headers and scalars, and skipping one complete value
//! (the boundary scan that splits a buffer into records). Values are decoded
//! as borrowed [`MpValue`]s so comparisons never copy payload bytes.

mod encode;
mod value;

use std::fmt;

pub use encode::{
    encode_array, encode_array_len, encode_bin, encode_bool, encode_f64, encode_int,
    encode_map_len, encode_nil, encode_str, encode_uint, encode_value,
};
use thiserror::Error;
pub use value::MpValue;

/// Logical MessagePack type of a marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpType {
    /// `nil`.
    Nil,
    /// `true` / `false`.
    Bool,
    /// Non-negative integer.
    Uint,
    /// Negative integer.
    Int,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    Str,
    /// Raw binary.
    Bin,
    /// Array header.
    Array,
    /// Map header.
    Map,
    /// Extension value.
    Ext,
    /// The never-used `0xc1` marker.
    Reserved,
}

impl fmt::Display for MpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MpType::Nil => "nil",
            MpType::Bool => "bool",
            MpType::Uint => "uint",
            MpType::Int => "int",
            MpType::Float => "float",
            MpType::Double => "double",
            MpType::Str => "str",
            MpType::Bin => "bin",
            MpType::Array => "array",
            MpType::Map => "map",
            MpType::Ext => "ext",
            MpType::Reserved => "reserved",
        };
        f.write_str(name)
    }
}

/// Classify a marker byte.
pub const fn type_of(marker: u8) -> MpType {
    match marker {
        0x00..=0x7f | 0xcc..=0xcf => MpType::Uint,
        0x80..=0x8f | 0xde | 0xdf => MpType::Map,
        0x90..=0x9f | 0xdc | 0xdd => MpType::Array,
        0xa0..=0xbf | 0xd9..=0xdb => MpType::Str,
        0xc0 => MpType::Nil,
        0xc1 => MpType::Reserved,
        0xc2 | 0xc3 => MpType::Bool,
        0xc4..=0xc6 => MpType::Bin,
        0xc7..=0xc9 | 0xd4..=0xd8 => MpType::Ext,
        0xca => MpType::Float,
        0xcb => MpType::Double,
        0xd0..=0xd3 | 0xe0..=0xff => MpType::Int,
    }
}

/// Errors raised while walking MessagePack bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MpError {
    /// The value runs past the end of the buffer.
    #[error("truncated value at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        /// Offset the read started at.
        offset: usize,
        /// Bytes required by the read.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
    /// The reserved `0xc1` marker was found.
    #[error("reserved marker 0xc1 at offset {0}")]
    Reserved(usize),
    /// A header of a different type was expected.
    #[error("expected {expected} at offset {offset}, found {found}")]
    UnexpectedType {
        /// Type the caller asked for.
        expected: MpType,
        /// Type actually present.
        found: MpType,
        /// Offset of the marker byte.
        offset: usize,
    },
}

/// Decoded header of one value; scalars carry their payload.
enum Header<'a> {
    Value(MpValue<'a>),
    Array(u32),
    Map(u32),
}

/// Forward-only cursor over a MessagePack byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Read from the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::at(buf, 0)
    }

    /// Read from `pos` within `buf`.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Type of the next value without consuming it.
    pub fn peek_type(&self) -> Result<MpType, MpError> {
        self.buf
            .get(self.pos)
            .map(|marker| type_of(*marker))
            .ok_or(MpError::Truncated {
                offset: self.pos,
                needed: 1,
                available: 0,
            })
    }

    /// Consume an array header and return its element count.
    pub fn read_array_len(&mut self) -> Result<u32, MpError> {
        let offset = self.pos;
        match self.read_u8()? {
            marker @ 0x90..=0x9f => Ok(u32::from(marker & 0x0f)),
            0xdc => Ok(u32::from(self.be_u16()?)),
            0xdd => self.be_u32(),
            marker => Err(self.unexpected(MpType::Array, marker, offset)),
        }
    }

    /// Consume a map header and return its pair count.
    pub fn read_map_len(&mut self) -> Result<u32, MpError> {
        let offset = self.pos;
        match self.read_u8()? {
            marker @ 0x80..=0x8f => Ok(u32::from(marker & 0x0f)),
            0xde => Ok(u32::from(self.be_u16()?)),
            0xdf => self.be_u32(),
            marker => Err(self.unexpected(MpType::Map, marker, offset)),
        }
    }

    /// Consume an unsigned integer.
    pub fn read_uint(&mut self) -> Result<u64, MpError> {
        let offset = self.pos;
        match self.read_u8()? {
            marker @ 0x00..=0x7f => Ok(u64::from(marker)),
            0xcc => Ok(u64::from(self.read_u8()?)),
            0xcd => Ok(u64::from(self.be_u16()?)),
            0xce => Ok(u64::from(self.be_u32()?)),
            0xcf => self.be_u64(),
            marker => Err(self.unexpected(MpType::Uint, marker, offset)),
        }
    }

    /// Consume one complete value, containers included.
    pub fn read_value(&mut self) -> Result<MpValue<'a>, MpError> {
        let buf = self.buf;
        let start = self.pos;
        match self.read_header()? {
            Header::Value(value) => Ok(value),
            Header::Array(len) => {
                self.skip_items(u64::from(len))?;
                Ok(MpValue::Array(&buf[start..self.pos]))
            }
            Header::Map(len) => {
                self.skip_items(2 * u64::from(len))?;
                Ok(MpValue::Map(&buf[start..self.pos]))
            }
        }
    }

    /// Skip one complete value.
    pub fn skip(&mut self) -> Result<(), MpError> {
        self.skip_items(1)
    }

    fn skip_items(&mut self, mut pending: u64) -> Result<(), MpError> {
        while pending > 0 {
            pending -= 1;
            match self.read_header()? {
                Header::Value(_) => {}
                Header::Array(len) => pending += u64::from(len),
                Header::Map(len) => pending += 2 * u64::from(len),
            }
        }
        Ok(())
    }

    fn read_header(&mut self) -> Result<Header<'a>, MpError> {
        let offset = self.pos;
        let marker = self.read_u8()?;
        let value = match marker {
            0x00..=0x7f => MpValue::Uint(u64::from(marker)),
            0x80..=0x8f => return Ok(Header::Map(u32::from(marker & 0x0f))),
            0x90..=0x9f => return Ok(Header::Array(u32::from(marker & 0x0f))),
            0xa0..=0xbf => MpValue::Str(self.take(usize::from(marker & 0x1f))?),
            0xc0 => MpValue::Nil,
            0xc1 => return Err(MpError::Reserved(offset)),
            0xc2 => MpValue::Bool(false),
            0xc3 => MpValue::Bool(true),
            0xc4 => {
                let len = usize::from(self.read_u8()?);
                MpValue::Bin(self.take(len)?)
            }
            0xc5 => {
                let len = usize::from(self.be_u16()?);
                MpValue::Bin(self.take(len)?)
            }
            0xc6 => {
                let len = self.be_u32()? as usize;
                MpValue::Bin(self.take(len)?)
            }
            0xc7 => {
                let len = usize::from(self.read_u8()?);
                self.read_ext(len)?
            }
            0xc8 => {
                let len = usize::from(self.be_u16()?);
                self.read_ext(len)?
            }
            0xc9 => {
                let len = self.be_u32()? as usize;
                self.read_ext(len)?
            }
            0xca => MpValue::Float(f64::from(f32::from_bits(self.be_u32()?))),
            0xcb => MpValue::Float(f64::from_bits(self.be_u64()?)),
            0xcc => MpValue::Uint(u64::from(self.read_u8()?)),
            0xcd => MpValue::Uint(u64::from(self.be_u16()?)),
            0xce => MpValue::Uint(u64::from(self.be_u32()?)),
            0xcf => MpValue::Uint(self.be_u64()?),
            0xd0 => MpValue::from_signed(i64::from(self.read_u8()? as i8)),
            0xd1 => MpValue::from_signed(i64::from(self.be_u16()? as i16)),
            0xd2 => MpValue::from_signed(i64::from(self.be_u32()? as i32)),
            0xd3 => MpValue::from_signed(self.be_u64()? as i64),
            0xd4 => self.read_ext(1)?,
            0xd5 => self.read_ext(2)?,
            0xd6 => self.read_ext(4)?,
            0xd7 => self.read_ext(8)?,
            0xd8 => self.read_ext(16)?,
            0xd9 => {
                let len = usize::from(self.read_u8()?);
                MpValue::Str(self.take(len)?)
            }
            0xda => {
                let len = usize::from(self.be_u16()?);
                MpValue::Str(self.take(len)?)
            }
            0xdb => {
                let len = self.be_u32()? as usize;
                MpValue::Str(self.take(len)?)
            }
            0xdc => return Ok(Header::Array(u32::from(self.be_u16()?))),
            0xdd => return Ok(Header::Array(self.be_u32()?)),
            0xde => return Ok(Header::Map(u32::from(self.be_u16()?))),
            0xdf => return Ok(Header::Map(self.be_u32()?)),
            0xe0..=0xff => MpValue::Int(i64::from(marker as i8)),
        };
        Ok(Header::Value(value))
    }

    fn read_ext(&mut self, len: usize) -> Result<MpValue<'a>, MpError> {
        let kind = self.read_u8()? as i8;
        Ok(MpValue::Ext(kind, self.take(len)?))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], MpError> {
        let available = self.remaining();
        if len > available {
            return Err(MpError::Truncated {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let buf = self.buf;
        let bytes = &buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, MpError> {
        Ok(self.take(1)?[0])
    }

    fn be_u16(&mut self) -> Result<u16, MpError> {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(self.take(2)?);
        Ok(u16::from_be_bytes(bytes))
    }

    fn be_u32(&mut self) -> Result<u32, MpError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(bytes))
    }

    fn be_u64(&mut self) -> Result<u64, MpError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(bytes))
    }

    fn unexpected(&mut self, expected: MpType, marker: u8, offset: usize) -> MpError {
        // Leave the cursor on the offending marker.
        self.pos = offset;
        MpError::UnexpectedType {
            expected,
            found: type_of(marker),
            offset,
        }
    }
}

/// Offset just past the value starting at `start`.
///
/// Fails when the value would extend beyond the end of `buf`.
pub fn next(buf: &[u8], start: usize) -> Result<usize, MpError> {
    let mut reader = Reader::at(buf, start);
    reader.skip()?;
    Ok(reader.position())
}
