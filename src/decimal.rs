//! Decimal encoding (Spec 7.1.3).
//!
//! Ein Boolean-Vorzeichen (Spec 7.1.2), dann zwei Unsigned Integers
//! (Spec 7.1.6): der ganzzahlige Anteil und der Nachkomma-Anteil mit
//! umgekehrter Ziffernfolge. Die Umkehrung erhält führende Nullen des
//! Bruchteils ("0.034" → fractional 430); abschließende Nullen sind nicht
//! darstellbar und fallen in den String-Kanal zurück.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Result, boolean, unsigned_integer};

/// A decoded EXI decimal value (Spec 7.1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    /// True für negative Werte (Minus-Null ist darstellbar).
    pub negative: bool,
    /// Ganzzahliger Anteil.
    pub integral: u64,
    /// Nachkomma-Anteil, Ziffern in umgekehrter Reihenfolge.
    pub fractional: u64,
}

/// Encodes a decimal value (Spec 7.1.3).
pub fn encode(writer: &mut BitWriter, value: Decimal, byte_aligned: bool) {
    if byte_aligned {
        boolean::encode_byte_aligned(writer, value.negative);
    } else {
        boolean::encode(writer, value.negative);
    }
    unsigned_integer::encode(writer, value.integral);
    unsigned_integer::encode(writer, value.fractional);
}

/// Decodes a decimal value (Spec 7.1.3).
pub fn decode(reader: &mut BitReader, byte_aligned: bool) -> Result<Decimal> {
    let negative = if byte_aligned {
        boolean::decode_byte_aligned(reader)?
    } else {
        boolean::decode(reader)?
    };
    let integral = unsigned_integer::decode(reader)?;
    let fractional = unsigned_integer::decode(reader)?;
    Ok(Decimal {
        negative,
        integral,
        fractional,
    })
}

impl Decimal {
    /// Parst eine lexikalische xsd:decimal-Form.
    ///
    /// `None` wenn die Form nicht exakt darstellbar ist (abschließende
    /// Nachkomma-Nullen, Überlauf, ungültige Zeichen) — dann muss der Wert
    /// über den String-Kanal laufen.
    pub fn parse_lexical(s: &str) -> Option<Self> {
        let s = s.trim();
        let (negative, rest) = match s.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if rest.is_empty() {
            return None;
        }
        let (int_part, frac_part) = match rest.split_once('.') {
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        // Abschließende Nullen des Bruchteils überleben die Umkehrung nicht.
        if frac_part.ends_with('0') {
            return None;
        }
        let integral: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        let reversed: String = frac_part.chars().rev().collect();
        let fractional: u64 = if reversed.is_empty() {
            0
        } else {
            reversed.parse().ok()?
        };
        Some(Self {
            negative,
            integral,
            fractional,
        })
    }

    /// Die kanonische lexikalische Form.
    pub fn to_lexical(self) -> String {
        let sign = if self.negative { "-" } else { "" };
        if self.fractional == 0 {
            format!("{sign}{}", self.integral)
        } else {
            let frac: String = self.fractional.to_string().chars().rev().collect();
            format!("{sign}{}.{frac}", self.integral)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Decimal) -> Decimal {
        let mut w = BitWriter::new();
        encode(&mut w, value, false);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r, false).unwrap()
    }

    /// Spec 7.1.3: 12.34 → sign=0, integral=12, fractional=43.
    #[test]
    fn basic_values() {
        for d in [
            Decimal { negative: false, integral: 12, fractional: 43 },
            Decimal { negative: true, integral: 5, fractional: 6 },
            Decimal { negative: false, integral: u64::MAX, fractional: u64::MAX },
        ] {
            assert_eq!(round_trip(d), d);
        }
    }

    /// Spec 7.1.3: Minus-Null ist darstellbar und von +0 verschieden.
    #[test]
    fn minus_zero_distinct() {
        let neg = Decimal { negative: true, integral: 0, fractional: 0 };
        let pos = Decimal { negative: false, integral: 0, fractional: 0 };
        assert_eq!(round_trip(neg), neg);
        assert_ne!(neg, pos);
    }

    #[test]
    fn byte_aligned_round_trip() {
        let d = Decimal { negative: true, integral: 7, fractional: 52 };
        let mut w = BitWriter::new();
        encode(&mut w, d, true);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r, true).unwrap(), d);
    }

    /// Lexikalische Brücke: führende Nullen des Bruchteils überleben.
    #[test]
    fn lexical_leading_fraction_zeros() {
        let d = Decimal::parse_lexical("0.034").unwrap();
        assert_eq!(d.fractional, 430);
        assert_eq!(d.to_lexical(), "0.034");
    }

    #[test]
    fn lexical_round_trip() {
        for s in ["0", "12.34", "-5.6", "1000", "-0.001"] {
            let d = Decimal::parse_lexical(s).unwrap();
            assert_eq!(d.to_lexical(), s, "lexical round-trip for {s}");
        }
    }

    /// Nicht exakt darstellbare Formen → None (String-Kanal-Fallback).
    #[test]
    fn lexical_rejects_unrepresentable() {
        assert!(Decimal::parse_lexical("12.340").is_none()); // trailing zero
        assert!(Decimal::parse_lexical("abc").is_none());
        assert!(Decimal::parse_lexical("").is_none());
        assert!(Decimal::parse_lexical("1e5").is_none());
    }

    #[test]
    fn lexical_plus_sign_and_bare_fraction() {
        assert_eq!(
            Decimal::parse_lexical("+3.5"),
            Some(Decimal { negative: false, integral: 3, fractional: 5 })
        );
        assert_eq!(
            Decimal::parse_lexical(".5"),
            Some(Decimal { negative: false, integral: 0, fractional: 5 })
        );
    }
}
