//! Event-code part I/O (Spec 6.2).
//!
//! Ein Event-Code besteht aus 1–3 Teilen. Jeder Teil wird in
//! `⌈log₂(m)⌉` Bits geschrieben, wobei `m` die Anzahl der Geschwister an
//! dieser Stelle ist ("two event codes are siblings at the i-th part iff
//! they share the same values in all preceding parts"). Byte-aligned und
//! (pre-)compressed Streams weiten jeden Teil auf ganze Bytes,
//! niederwertigstes Byte zuerst (Table 6-2, Spec 7.1.9).

use crate::bit_width;
use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, n_bit_unsigned_integer};

/// A 1–3 part event code, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCode {
    pub part1: u32,
    pub part2: Option<u32>,
    pub part3: Option<u32>,
}

impl EventCode {
    /// Einteiliger Code.
    pub fn one(part1: u32) -> Self {
        Self { part1, part2: None, part3: None }
    }

    /// Zweiteiliger Code.
    pub fn two(part1: u32, part2: u32) -> Self {
        Self { part1, part2: Some(part2), part3: None }
    }

    /// Dreiteiliger Code.
    pub fn three(part1: u32, part2: u32, part3: u32) -> Self {
        Self { part1, part2: Some(part2), part3: Some(part3) }
    }
}

impl std::fmt::Display for EventCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.part1)?;
        if let Some(p2) = self.part2 {
            write!(f, ".{p2}")?;
        }
        if let Some(p3) = self.part3 {
            write!(f, ".{p3}")?;
        }
        Ok(())
    }
}

/// Schreibt einen Code-Teil mit `distinct` Geschwistern.
///
/// # Panics
///
/// Panikt wenn `value` nicht unter `distinct` liegt.
pub fn write_part(writer: &mut BitWriter, value: u32, distinct: u32, byte_aligned: bool) {
    debug_assert!(
        distinct == 0 || value < distinct,
        "event code part {value} out of range 0..{distinct}"
    );
    let bits = bit_width::for_count_u32(distinct);
    if byte_aligned {
        n_bit_unsigned_integer::encode_byte_aligned(writer, u64::from(value), bits);
    } else {
        n_bit_unsigned_integer::encode(writer, u64::from(value), bits);
    }
}

/// Liest einen Code-Teil mit `distinct` Geschwistern.
///
/// Werte außerhalb `0..distinct` sind [`Error::InvalidExiInput`].
pub fn read_part(reader: &mut BitReader, distinct: u32, byte_aligned: bool) -> Result<u32> {
    let bits = bit_width::for_count_u32(distinct);
    let value = if byte_aligned {
        n_bit_unsigned_integer::decode_byte_aligned(reader, bits)?
    } else {
        n_bit_unsigned_integer::decode(reader, bits)?
    };
    if distinct > 0 && value >= u64::from(distinct) {
        return Err(Error::invalid_input("event code part out of range"));
    }
    Ok(value as u32)
}
