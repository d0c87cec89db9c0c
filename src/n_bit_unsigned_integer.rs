//! n-bit unsigned integer encoding (Spec 7.1.9).
//!
//! Bit-packed: exakt `n` Bits, big-endian. Byte-aligned (und bei
//! (Pre-)Compression): die minimale Anzahl ganzer Bytes für `n` Bits,
//! niederwertigstes Byte zuerst. `n = 0` lässt den Wert komplett weg.

use crate::bitstream::{BitReader, BitWriter};
use crate::Result;

/// Encodes an unsigned integer using exactly `n` bits (Spec 7.1.9).
///
/// # Panics
///
/// Panics if `n > 64` or if `value` does not fit in `n` bits.
#[inline]
pub fn encode(writer: &mut BitWriter, value: u64, n: u8) {
    assert!(n <= 64, "bit width must be 0..=64, got {n}");
    assert!(
        n == 64 || value < (1u64 << n),
        "value {value} does not fit in {n} bits"
    );
    writer.write_bits(value, n);
}

/// Decodes an unsigned integer from exactly `n` bits (Spec 7.1.9).
#[inline]
pub fn decode(reader: &mut BitReader, n: u8) -> Result<u64> {
    reader.read_bits(n)
}

/// Encodes an n-bit unsigned integer in byte-aligned form (Spec 7.1.9):
/// `⌈n/8⌉` Bytes, least significant byte first. Nothing for `n = 0`.
pub fn encode_byte_aligned(writer: &mut BitWriter, value: u64, n: u8) {
    assert!(n <= 64, "bit width must be 0..=64, got {n}");
    let num_bytes = n.div_ceil(8);
    for i in 0..num_bytes {
        writer.write_byte_aligned(((value >> (i * 8)) & 0xFF) as u8);
    }
}

/// Decodes an n-bit unsigned integer in byte-aligned form (Spec 7.1.9).
pub fn decode_byte_aligned(reader: &mut BitReader, n: u8) -> Result<u64> {
    assert!(n <= 64, "bit width must be 0..=64, got {n}");
    let num_bytes = n.div_ceil(8);
    let mut value = 0u64;
    for i in 0..num_bytes {
        let byte = reader.read_byte_aligned()?;
        value |= u64::from(byte) << (i * 8);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: u64, n: u8) -> u64 {
        let mut w = BitWriter::new();
        encode(&mut w, value, n);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r, n).unwrap()
    }

    /// Spec 7.1.9: n = 0, Wert wird weggelassen.
    #[test]
    fn zero_bits_omitted() {
        let mut w = BitWriter::new();
        encode(&mut w, 0, 0);
        assert_eq!(w.bit_position(), 0);

        let mut r = BitReader::new(&[]);
        assert_eq!(decode(&mut r, 0).unwrap(), 0);
    }

    #[test]
    fn small_widths() {
        for n in 1..=8u8 {
            let max = (1u64 << n) - 1;
            assert_eq!(round_trip(0, n), 0);
            assert_eq!(round_trip(max, n), max, "n={n}");
        }
    }

    /// Spec 7.1.9: Breiten über Byte-Grenzen.
    #[test]
    fn cross_byte_widths() {
        assert_eq!(round_trip(511, 9), 511);
        assert_eq!(round_trip(65_536, 17), 65_536);
        assert_eq!(round_trip(u64::MAX, 64), u64::MAX);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn encode_overflow_panics() {
        let mut w = BitWriter::new();
        encode(&mut w, 8, 3);
    }

    #[test]
    fn sequential_mixed_widths() {
        let mut w = BitWriter::new();
        encode(&mut w, 0b101, 3);
        encode(&mut w, 0xAB, 8);
        encode(&mut w, 0, 0);
        encode(&mut w, 0x1FF, 9);
        let data = w.into_vec();

        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r, 3).unwrap(), 0b101);
        assert_eq!(decode(&mut r, 8).unwrap(), 0xAB);
        assert_eq!(decode(&mut r, 0).unwrap(), 0);
        assert_eq!(decode(&mut r, 9).unwrap(), 0x1FF);
    }

    // --- Byte-aligned Variante (Spec 7.1.9, Table 6-2) ---

    /// Byte-aligned: LSB-Byte zuerst, minimale Byte-Anzahl.
    #[test]
    fn byte_aligned_lsb_first() {
        let mut w = BitWriter::new();
        encode_byte_aligned(&mut w, 0x0102, 9); // 9 Bits -> 2 Bytes
        let data = w.into_vec();
        assert_eq!(data, vec![0x02, 0x01]);

        let mut r = BitReader::new(&data);
        assert_eq!(decode_byte_aligned(&mut r, 9).unwrap(), 0x0102);
    }

    #[test]
    fn byte_aligned_zero_width_is_empty() {
        let mut w = BitWriter::new();
        encode_byte_aligned(&mut w, 0, 0);
        assert!(w.into_vec().is_empty());

        let mut r = BitReader::new(&[]);
        assert_eq!(decode_byte_aligned(&mut r, 0).unwrap(), 0);
    }

    #[test]
    fn byte_aligned_round_trip() {
        for &(v, n) in &[(0u64, 1u8), (1, 1), (200, 8), (4095, 12), (70_000, 17)] {
            let mut w = BitWriter::new();
            encode_byte_aligned(&mut w, v, n);
            let data = w.into_vec();
            assert_eq!(data.len(), n.div_ceil(8) as usize, "v={v} n={n}");
            let mut r = BitReader::new(&data);
            assert_eq!(decode_byte_aligned(&mut r, n).unwrap(), v, "v={v} n={n}");
        }
    }
}
