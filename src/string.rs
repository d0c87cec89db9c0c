//! String encoding (Spec 7.1.10).
//!
//! Länge (Anzahl Zeichen, nicht Bytes) als Unsigned Integer, danach jeder
//! Unicode-Codepoint als Unsigned Integer. Restricted Character Sets
//! (Spec 7.1.10.1) und String Tables (Spec 7.3) liegen außerhalb dieses
//! Moduls.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, unsigned_integer};

/// Encodes a string as a length-prefixed code point sequence (Spec 7.1.10).
///
/// ASCII-Fast-Path: bei reinen ASCII-Strings ist jeder Codepoint exakt ein
/// Oktett ohne Continuation-Bit, also identisch mit dem Roh-Byte.
pub fn encode(writer: &mut BitWriter, value: &str) {
    encode_with_length_offset(writer, value, 0);
}

/// Encodiert mit Längen-Offset: geschrieben wird `char_count + offset`.
///
/// Die String-Table-Pfade nutzen das für Miss-Markierungen
/// (LocalName: Länge+1, Values: Länge+2; Spec 7.3.3).
pub(crate) fn encode_with_length_offset(writer: &mut BitWriter, value: &str, offset: u64) {
    if value.is_ascii() {
        unsigned_integer::encode(writer, value.len() as u64 + offset);
        writer.write_bytes_aligned(value.as_bytes());
    } else {
        let count = value.chars().count() as u64;
        unsigned_integer::encode(writer, count + offset);
        for ch in value.chars() {
            unsigned_integer::encode(writer, u64::from(u32::from(ch)));
        }
    }
}

/// Decodes a length-prefixed string (Spec 7.1.10).
pub fn decode(reader: &mut BitReader) -> Result<String> {
    let len = unsigned_integer::decode(reader)?;
    let len = usize::try_from(len).map_err(|_| Error::invalid_input("string length overflow"))?;
    decode_chars(reader, len)
}

/// Decodiert `len` Codepoints (die Länge wurde bereits gelesen).
///
/// ASCII-Fast-Path: wenn byte-aligned und alle `len` Bytes MSB=0 haben,
/// sind es Ein-Oktett-Codepoints und damit direkt gültiges UTF-8.
pub(crate) fn decode_chars(reader: &mut BitReader, len: usize) -> Result<String> {
    if let Some(bytes) = reader.peek_aligned_bytes(len) {
        if bytes.iter().all(|&b| b & 0x80 == 0) {
            // Fehlschlag ist hier unmöglich: ASCII ist valides UTF-8.
            let s = std::str::from_utf8(bytes)
                .map_err(|_| Error::unexpected("ascii fast path not utf-8"))?
                .to_string();
            reader.skip_aligned_bytes(len);
            return Ok(s);
        }
    }
    // Kapazität durch verbleibende Bytes begrenzen (korrupte Längenangaben)
    let remaining = reader.remaining_bits() / 8;
    let mut s = String::with_capacity(len.min(remaining));
    for _ in 0..len {
        let cp = unsigned_integer::decode(reader)?;
        let ch = u32::try_from(cp)
            .ok()
            .and_then(char::from_u32)
            .ok_or(Error::InvalidStringOperation(cp))?;
        s.push(ch);
    }
    Ok(s)
}
