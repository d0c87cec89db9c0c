//! Binary encoding (Spec 7.1.1).
//!
//! Länge als Unsigned Integer (Spec 7.1.6), dann die Oktette. Die
//! lexikalischen Formen base64Binary und hexBinary werden über
//! Konvertierungshelfer angebunden.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, unsigned_integer};

/// Encodes a byte sequence (Spec 7.1.1).
pub fn encode(writer: &mut BitWriter, data: &[u8]) {
    unsigned_integer::encode(writer, data.len() as u64);
    writer.write_bytes_aligned(data);
}

/// Decodes a byte sequence (Spec 7.1.1).
pub fn decode(reader: &mut BitReader) -> Result<Vec<u8>> {
    let len = unsigned_integer::decode(reader)?;
    let len = usize::try_from(len).map_err(|_| Error::invalid_input("binary length overflow"))?;
    // Längenangabe gegen den Restpuffer prüfen, bevor alloziert wird
    if len > reader.remaining_bits() / 8 + 1 {
        return Err(Error::BufferEndReached);
    }
    let mut buf = vec![0u8; len];
    reader.read_bytes_aligned(&mut buf)?;
    Ok(buf)
}

/// Parst eine lexikalische base64Binary-Form.
pub fn from_base64(s: &str) -> Option<Vec<u8>> {
    BASE64.decode(s.trim().as_bytes()).ok()
}

/// Die lexikalische base64Binary-Form.
pub fn to_base64(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Parst eine lexikalische hexBinary-Form (gerade Anzahl Hex-Ziffern).
pub fn from_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = (pair[0] as char).to_digit(16)?;
        let lo = (pair[1] as char).to_digit(16)?;
        out.push((hi * 16 + lo) as u8);
    }
    Some(out)
}

/// Die lexikalische hexBinary-Form (Großbuchstaben, XML-Schema-kanonisch).
pub fn to_hex(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for b in data {
        s.push_str(&format!("{b:02X}"));
    }
    s
}
