//! Signed integer encoding (Spec 7.1.5).
//!
//! Unbounded signed: ein Vorzeichen-Bit, dann der Betrag als Unsigned
//! Integer. Für negative Werte ist der Betrag `(-value - 1)`; Null hat damit
//! genau eine kanonische Form (Vorzeichen 0, Betrag 0).

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, unsigned_integer};

/// Encodes a signed integer (Spec 7.1.5, unbounded signed case).
pub fn encode(writer: &mut BitWriter, value: i64) {
    if value >= 0 {
        writer.write_bit(false);
        unsigned_integer::encode(writer, value as u64);
    } else {
        writer.write_bit(true);
        // (-value - 1) über Bit-Komplement, vermeidet Overflow bei i64::MIN
        unsigned_integer::encode(writer, !(value as u64));
    }
}

/// Decodes a signed integer (Spec 7.1.5, unbounded signed case).
pub fn decode(reader: &mut BitReader) -> Result<i64> {
    let negative = reader.read_bit()?;
    let magnitude = unsigned_integer::decode(reader)?;
    if negative {
        if magnitude > i64::MAX as u64 {
            return Err(Error::invalid_input("signed integer magnitude overflow"));
        }
        Ok(-(magnitude as i64) - 1)
    } else {
        if magnitude > i64::MAX as u64 {
            return Err(Error::invalid_input("signed integer magnitude overflow"));
        }
        Ok(magnitude as i64)
    }
}

/// Byte-aligned Variante: das Vorzeichen belegt ein ganzes Byte
/// (Spec 7.1.2, 7.1.9 — Boolean-Darstellung bei byte-alignment).
pub fn encode_byte_aligned(writer: &mut BitWriter, value: i64) {
    if value >= 0 {
        writer.write_byte_aligned(0);
        unsigned_integer::encode(writer, value as u64);
    } else {
        writer.write_byte_aligned(1);
        unsigned_integer::encode(writer, !(value as u64));
    }
}

/// Byte-aligned Gegenstück zu [`encode_byte_aligned`].
pub fn decode_byte_aligned(reader: &mut BitReader) -> Result<i64> {
    let negative = reader.read_byte_aligned()? != 0;
    let magnitude = unsigned_integer::decode(reader)?;
    if magnitude > i64::MAX as u64 {
        return Err(Error::invalid_input("signed integer magnitude overflow"));
    }
    if negative {
        Ok(-(magnitude as i64) - 1)
    } else {
        Ok(magnitude as i64)
    }
}
