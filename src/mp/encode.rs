//! Minimal MessagePack encoder, always picking the shortest form.

use super::MpValue;

/// Append `nil`.
pub fn encode_nil(out: &mut Vec<u8>) {
    out.push(0xc0);
}

/// Append a boolean.
pub fn encode_bool(out: &mut Vec<u8>, value: bool) {
    out.push(if value { 0xc3 } else { 0xc2 });
}

/// Append an unsigned integer.
pub fn encode_uint(out: &mut Vec<u8>, value: u64) {
    if value <= 0x7f {
        out.push(value as u8);
    } else if value <= u64::from(u8::MAX) {
        out.extend_from_slice(&[0xcc, value as u8]);
    } else if value <= u64::from(u16::MAX) {
        out.push(0xcd);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u64::from(u32::MAX) {
        out.push(0xce);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(0xcf);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Append a signed integer; non-negative values use the unsigned forms.
pub fn encode_int(out: &mut Vec<u8>, value: i64) {
    if value >= 0 {
        encode_uint(out, value as u64);
    } else if value >= -32 {
        out.push(value as i8 as u8);
    } else if value >= i64::from(i8::MIN) {
        out.extend_from_slice(&[0xd0, value as i8 as u8]);
    } else if value >= i64::from(i16::MIN) {
        out.push(0xd1);
        out.extend_from_slice(&(value as i16).to_be_bytes());
    } else if value >= i64::from(i32::MIN) {
        out.push(0xd2);
        out.extend_from_slice(&(value as i32).to_be_bytes());
    } else {
        out.push(0xd3);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Append a double.
pub fn encode_f64(out: &mut Vec<u8>, value: f64) {
    out.push(0xcb);
    out.extend_from_slice(&value.to_bits().to_be_bytes());
}

/// Append a string.
pub fn encode_str(out: &mut Vec<u8>, value: &str) {
    encode_str_bytes(out, value.as_bytes());
}

fn encode_str_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    let len = bytes.len();
    if len <= 31 {
        out.push(0xa0 | len as u8);
    } else if len <= usize::from(u8::MAX) {
        out.extend_from_slice(&[0xd9, len as u8]);
    } else if len <= usize::from(u16::MAX) {
        out.push(0xda);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(0xdb);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
    out.extend_from_slice(bytes);
}

/// Append a binary blob.
pub fn encode_bin(out: &mut Vec<u8>, bytes: &[u8]) {
    let len = bytes.len();
    if len <= usize::from(u8::MAX) {
        out.extend_from_slice(&[0xc4, len as u8]);
    } else if len <= usize::from(u16::MAX) {
        out.push(0xc5);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(0xc6);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
    out.extend_from_slice(bytes);
}

/// Append an array header for `len` elements.
pub fn encode_array_len(out: &mut Vec<u8>, len: u32) {
    if len <= 15 {
        out.push(0x90 | len as u8);
    } else if len <= u32::from(u16::MAX) {
        out.push(0xdc);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(0xdd);
        out.extend_from_slice(&len.to_be_bytes());
    }
}

/// Append a map header for `len` pairs.
pub fn encode_map_len(out: &mut Vec<u8>, len: u32) {
    if len <= 15 {
        out.push(0x80 | len as u8);
    } else if len <= u32::from(u16::MAX) {
        out.push(0xde);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(0xdf);
        out.extend_from_slice(&len.to_be_bytes());
    }
}

/// Append any value; containers and extensions are copied verbatim.
pub fn encode_value(out: &mut Vec<u8>, value: &MpValue<'_>) {
    match value {
        MpValue::Nil => encode_nil(out),
        MpValue::Bool(v) => encode_bool(out, *v),
        MpValue::Uint(v) => encode_uint(out, *v),
        MpValue::Int(v) => encode_int(out, *v),
        MpValue::Float(v) => encode_f64(out, *v),
        MpValue::Str(bytes) => encode_str_bytes(out, bytes),
        MpValue::Bin(bytes) => encode_bin(out, bytes),
        MpValue::Array(raw) | MpValue::Map(raw) => out.extend_from_slice(raw),
        MpValue::Ext(kind, data) => {
            match data.len() {
                1 => out.push(0xd4),
                2 => out.push(0xd5),
                4 => out.push(0xd6),
                8 => out.push(0xd7),
                16 => out.push(0xd8),
                len if len <= usize::from(u8::MAX) => out.extend_from_slice(&[0xc7, len as u8]),
                len if len <= usize::from(u16::MAX) => {
                    out.push(0xc8);
                    out.extend_from_slice(&(len as u16).to_be_bytes());
                }
                len => {
                    out.push(0xc9);
                    out.extend_from_slice(&(len as u32).to_be_bytes());
                }
            }
            out.push(*kind as u8);
            out.extend_from_slice(data);
        }
    }
}

/// Append an array holding `values`, e.g. one tuple or one key.
pub fn encode_array(out: &mut Vec<u8>, values: &[MpValue<'_>]) {
    encode_array_len(out, values.len() as u32);
    for value in values {
        encode_value(out, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp::Reader;

    #[test]
    fn integers_use_the_shortest_marker() {
        let cases: [(i64, usize); 8] = [
            (0, 1),
            (127, 1),
            (128, 2),
            (65_535, 3),
            (-32, 1),
            (-33, 2),
            (-40_000, 5),
            (i64::MIN, 9),
        ];
        for (value, width) in cases {
            let mut buf = Vec::new();
            encode_int(&mut buf, value);
            assert_eq!(buf.len(), width, "width of {value}");
            let decoded = Reader::new(&buf).read_value().expect("decode");
            assert_eq!(decoded.as_i64(), Some(value));
        }
    }

    #[test]
    fn containers_are_copied_verbatim() {
        let mut inner = Vec::new();
        encode_array(&mut inner, &[MpValue::from(1u64), MpValue::from("x")]);
        let mut outer = Vec::new();
        encode_array(&mut outer, &[MpValue::Array(&inner), MpValue::Nil]);

        let mut reader = Reader::new(&outer);
        assert_eq!(reader.read_array_len().expect("outer"), 2);
        assert_eq!(
            reader.read_value().expect("inner"),
            MpValue::Array(&inner[..])
        );
        assert!(reader.read_value().expect("nil").is_nil());
    }

    #[test]
    fn long_strings_switch_to_length_prefixed_forms() {
        let text = "a".repeat(300);
        let mut buf = Vec::new();
        encode_str(&mut buf, &text);
        assert_eq!(buf[0], 0xda);
        let decoded = Reader::new(&buf).read_value().expect("str16");
        assert_eq!(decoded.as_str(), Some(text.as_str()));
    }
}
