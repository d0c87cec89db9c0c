//! Boolean encoding (Spec 7.1.2).
//!
//! Standardfall: 1 Bit. Byte-aligned: 1 Byte (Spec 7.1.9). Für
//! `Preserve.lexicalValues` gibt es die 2-Bit-Form, die alle vier
//! lexikalischen Schreibweisen unterscheidet.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, n_bit_unsigned_integer};

/// The four lexical forms of an xsd:boolean (Spec 7.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanLexical {
    /// Lexical "false" (encoded as 0).
    False = 0,
    /// Lexical "0" (encoded as 1).
    Zero = 1,
    /// Lexical "true" (encoded as 2).
    True = 2,
    /// Lexical "1" (encoded as 3).
    One = 3,
}

impl BooleanLexical {
    /// Parst die lexikalische Form; whitespace-getrimmt.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "false" => Some(Self::False),
            "0" => Some(Self::Zero),
            "true" => Some(Self::True),
            "1" => Some(Self::One),
            _ => None,
        }
    }

    /// Die lexikalische Schreibweise.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::False => "false",
            Self::Zero => "0",
            Self::True => "true",
            Self::One => "1",
        }
    }

    /// Der Wahrheitswert hinter der Schreibweise.
    pub fn value(self) -> bool {
        matches!(self, Self::True | Self::One)
    }
}

/// Encodes a boolean as a single bit (Spec 7.1.2).
pub fn encode(writer: &mut BitWriter, value: bool) {
    writer.write_bit(value);
}

/// Decodes a boolean from a single bit (Spec 7.1.2).
pub fn decode(reader: &mut BitReader) -> Result<bool> {
    reader.read_bit()
}

/// Byte-aligned boolean: one byte, non-zero = true (Spec 7.1.2, 7.1.9).
pub fn encode_byte_aligned(writer: &mut BitWriter, value: bool) {
    writer.write_byte_aligned(u8::from(value));
}

/// Byte-aligned Gegenstück zu [`encode_byte_aligned`].
pub fn decode_byte_aligned(reader: &mut BitReader) -> Result<bool> {
    Ok(reader.read_byte_aligned()? != 0)
}

/// Encodes the 2-bit lexical form (Spec 7.1.2, pattern facets).
pub fn encode_lexical(writer: &mut BitWriter, value: BooleanLexical) {
    n_bit_unsigned_integer::encode(writer, value as u64, 2);
}

/// Decodes the 2-bit lexical form (Spec 7.1.2, pattern facets).
pub fn decode_lexical(reader: &mut BitReader) -> Result<BooleanLexical> {
    Ok(match n_bit_unsigned_integer::decode(reader, 2)? {
        0 => BooleanLexical::False,
        1 => BooleanLexical::Zero,
        2 => BooleanLexical::True,
        3 => BooleanLexical::One,
        _ => return Err(Error::unexpected("2-bit decode out of range")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spec 7.1.2: 1-Bit-Form, exaktes Bitmuster.
    #[test]
    fn single_bit_patterns() {
        let mut w = BitWriter::new();
        encode(&mut w, true);
        assert_eq!(w.bit_position(), 1);
        assert_eq!(w.into_vec(), vec![0x80]);

        let mut w = BitWriter::new();
        encode(&mut w, false);
        assert_eq!(w.into_vec(), vec![0x00]);
    }

    #[test]
    fn round_trip_both_values() {
        for v in [true, false] {
            let mut w = BitWriter::new();
            encode(&mut w, v);
            let data = w.into_vec();
            let mut r = BitReader::new(&data);
            assert_eq!(decode(&mut r).unwrap(), v);
        }
    }

    /// Spec 7.1.2, 7.1.9: byte-aligned belegt ein Byte.
    #[test]
    fn byte_aligned_form() {
        let mut w = BitWriter::new();
        encode_byte_aligned(&mut w, true);
        assert_eq!(w.into_vec(), vec![0x01]);

        let mut r = BitReader::new(&[0xFF]);
        assert!(decode_byte_aligned(&mut r).unwrap());
        let mut r = BitReader::new(&[0x00]);
        assert!(!decode_byte_aligned(&mut r).unwrap());
    }

    /// Spec 7.1.2: lexikalische 2-Bit-Form erhält die Schreibweise.
    #[test]
    fn lexical_round_trip() {
        for v in [
            BooleanLexical::False,
            BooleanLexical::Zero,
            BooleanLexical::True,
            BooleanLexical::One,
        ] {
            let mut w = BitWriter::new();
            encode_lexical(&mut w, v);
            assert_eq!(w.bit_position(), 2);
            let data = w.into_vec();
            let mut r = BitReader::new(&data);
            assert_eq!(decode_lexical(&mut r).unwrap(), v);
        }
    }

    #[test]
    fn lexical_parse_and_value() {
        assert_eq!(BooleanLexical::parse("true"), Some(BooleanLexical::True));
        assert_eq!(BooleanLexical::parse(" 0 "), Some(BooleanLexical::Zero));
        assert_eq!(BooleanLexical::parse("yes"), None);
        assert!(BooleanLexical::One.value());
        assert!(!BooleanLexical::Zero.value());
        assert_eq!(BooleanLexical::False.as_str(), "false");
    }

    #[test]
    fn decode_eof() {
        let mut r = BitReader::new(&[]);
        assert_eq!(decode(&mut r).unwrap_err(), Error::BufferEndReached);
        let mut r = BitReader::new(&[]);
        assert_eq!(decode_lexical(&mut r).unwrap_err(), Error::BufferEndReached);
    }
}
