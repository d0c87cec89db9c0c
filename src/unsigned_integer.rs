//! Variable-length unsigned integer encoding (Spec 7.1.6).
//!
//! Folge von Oktetten, niederwertigste 7-Bit-Gruppe zuerst; das MSB jedes
//! Oktetts ist das Continuation-Bit (1 = weitere Gruppe folgt, 0 = letzte).

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

/// Encodes a `u64` as an EXI Unsigned Integer (Spec 7.1.6).
#[inline]
pub fn encode(writer: &mut BitWriter, value: u64) {
    let mut v = value;
    loop {
        let group = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            writer.write_byte_aligned(group);
            return;
        }
        writer.write_byte_aligned(0x80 | group);
    }
}

/// Decodes an EXI Unsigned Integer into a `u64` (Spec 7.1.6).
///
/// Werte über 64 Bit sind in diesem Kern nicht darstellbar und werden als
/// `InvalidExiInput` abgelehnt.
#[inline]
pub fn decode(reader: &mut BitReader) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let octet = reader.read_byte_aligned()?;
        let group = u64::from(octet & 0x7F);
        // Ab shift 63 passt nur noch Daten-Bit 0 in ein u64, und kein
        // weiteres Continuation-Oktett.
        if shift == 63 && (group > 1 || octet & 0x80 != 0) {
            return Err(Error::invalid_input("unsigned integer exceeds 64 bits"));
        }
        if shift > 63 {
            return Err(Error::invalid_input("unsigned integer exceeds 64 bits"));
        }
        result |= group << shift;
        if octet & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}
