//! Float encoding (Spec 7.1.4).
//!
//! Zwei aufeinanderfolgende Integers (Spec 7.1.5): Mantisse und
//! Zehner-Exponent. Mantisse in -(2⁶³)..2⁶³-1, Exponent in
//! -(2¹⁴-1)..2¹⁴-1. Der Sonderwert -(2¹⁴) im Exponenten markiert
//! INF (Mantisse 1), -INF (Mantisse -1) und NaN (alles andere).

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, integer};

const EXPONENT_MIN: i64 = -(1 << 14) + 1; // -16383
const EXPONENT_MAX: i64 = (1 << 14) - 1; // 16383
const SPECIAL_EXPONENT: i64 = -(1 << 14); // -16384

/// A decoded EXI float value (Spec 7.1.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Float {
    /// Endlicher Wert m × 10^e.
    Value { mantissa: i64, exponent: i64 },
    /// Positive infinity (INF).
    Infinity,
    /// Negative infinity (-INF).
    NegativeInfinity,
    /// Not-a-Number (NaN).
    NaN,
}

/// Encodes a float value (Spec 7.1.4).
///
/// # Panics
///
/// Panics if a `Value` exponent is outside the accepted range.
pub fn encode(writer: &mut BitWriter, value: Float, byte_aligned: bool) {
    let (mantissa, exponent) = match value {
        Float::Value { mantissa, exponent } => {
            assert!(
                (EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent),
                "exponent {exponent} out of range"
            );
            (mantissa, exponent)
        }
        Float::Infinity => (1, SPECIAL_EXPONENT),
        Float::NegativeInfinity => (-1, SPECIAL_EXPONENT),
        Float::NaN => (0, SPECIAL_EXPONENT),
    };
    if byte_aligned {
        integer::encode_byte_aligned(writer, mantissa);
        integer::encode_byte_aligned(writer, exponent);
    } else {
        integer::encode(writer, mantissa);
        integer::encode(writer, exponent);
    }
}

/// Decodes a float value (Spec 7.1.4).
pub fn decode(reader: &mut BitReader, byte_aligned: bool) -> Result<Float> {
    let (mantissa, exponent) = if byte_aligned {
        (
            integer::decode_byte_aligned(reader)?,
            integer::decode_byte_aligned(reader)?,
        )
    } else {
        (integer::decode(reader)?, integer::decode(reader)?)
    };

    if exponent == SPECIAL_EXPONENT {
        return Ok(match mantissa {
            1 => Float::Infinity,
            -1 => Float::NegativeInfinity,
            _ => Float::NaN,
        });
    }
    if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
        return Err(Error::invalid_input("float exponent out of range"));
    }
    Ok(Float::Value { mantissa, exponent })
}

impl Float {
    /// Parst eine lexikalische xsd:float/double-Form in die EXI-Darstellung.
    ///
    /// `None` für Formen, die nicht exakt als m × 10^e darstellbar sind —
    /// solche Werte laufen über den String-Kanal.
    pub fn parse_lexical(s: &str) -> Option<Self> {
        let s = s.trim();
        match s {
            "INF" => return Some(Self::Infinity),
            "-INF" => return Some(Self::NegativeInfinity),
            "NaN" => return Some(Self::NaN),
            _ => {}
        }

        let (mantissa_str, exp_str) = match s.split_once(['e', 'E']) {
            Some((m, e)) => (m, Some(e)),
            None => (s, None),
        };
        let mut exponent: i64 = match exp_str {
            Some(e) => e.parse().ok()?,
            None => 0,
        };

        // Dezimalpunkt in den Exponenten verschieben: "1.5" → 15 × 10⁻¹
        let (neg, digits) = match mantissa_str.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, mantissa_str.strip_prefix('+').unwrap_or(mantissa_str)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        exponent = exponent.checked_sub(frac_part.len() as i64)?;

        let mut combined = String::with_capacity(int_part.len() + frac_part.len());
        combined.push_str(int_part);
        combined.push_str(frac_part);
        let trimmed = combined.trim_start_matches('0');
        let magnitude: u64 = if trimmed.is_empty() {
            0
        } else {
            trimmed.parse().ok()?
        };
        if magnitude > i64::MAX as u64 {
            return None;
        }
        let mantissa = if neg {
            -(magnitude as i64)
        } else {
            magnitude as i64
        };
        if mantissa == 0 {
            exponent = 0;
        }
        if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
            return None;
        }
        Some(Self::Value { mantissa, exponent })
    }

    /// Die lexikalische Form (Mantisse `E` Exponent für endliche Werte).
    pub fn to_lexical(self) -> String {
        match self {
            Self::Value { mantissa, exponent } => {
                if exponent == 0 {
                    mantissa.to_string()
                } else {
                    format!("{mantissa}E{exponent}")
                }
            }
            Self::Infinity => "INF".to_string(),
            Self::NegativeInfinity => "-INF".to_string(),
            Self::NaN => "NaN".to_string(),
        }
    }
}
