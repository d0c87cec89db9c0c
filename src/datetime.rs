//! Date-time encoding (Spec 7.1.8).
//!
//! Alle acht XML-Schema-Datumstypen (Table 7-4). Jeder Typ encodiert eine
//! Teilmenge der Komponenten Year, MonthDay, Time, FractionalSecs und
//! TimeZone gemäß Table 7-3. Year ist ein Integer-Offset von 2000;
//! MonthDay ist `month · 32 + day` in 9 Bits; Time ist
//! `(hour · 64 + minute) · 64 + second` in 17 Bits; die Zeitzone liegt in
//! 11 Bits mit Bias 896 (= 14 · 64).

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, boolean, integer, n_bit_unsigned_integer, unsigned_integer};

/// Which XML Schema date-time type a value carries (Spec 7.1.8, Table 7-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeKind {
    GYear,
    GYearMonth,
    Date,
    DateTime,
    GMonth,
    GMonthDay,
    GDay,
    Time,
}

impl DateTimeKind {
    fn has_year(self) -> bool {
        matches!(self, Self::GYear | Self::GYearMonth | Self::Date | Self::DateTime)
    }

    fn has_month_day(self) -> bool {
        !matches!(self, Self::GYear | Self::Time)
    }

    fn has_time(self) -> bool {
        matches!(self, Self::DateTime | Self::Time)
    }
}

/// A decoded EXI date-time value (Spec 7.1.8).
///
/// Komponenten, die der `kind` nicht führt, bleiben auf ihrem
/// Neutralwert (0 bzw. `None`) und werden nicht encodiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeValue {
    pub kind: DateTimeKind,
    /// Offset von 2000 (25 = Jahr 2025, -1 = Jahr 1999).
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Sekundenbruchteile, Ziffern in umgekehrter Reihenfolge (wie Decimal).
    pub fractional_secs: Option<u64>,
    /// Zeitzonen-Offset in Minuten (-14:00 .. +14:00).
    pub timezone_minutes: Option<i16>,
}

impl DateTimeValue {
    /// Ein Neutralwert für `kind`, zum Befüllen per Struct-Update.
    pub fn new(kind: DateTimeKind) -> Self {
        Self {
            kind,
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            fractional_secs: None,
            timezone_minutes: None,
        }
    }
}

/// Encodes a date-time value (Spec 7.1.8).
pub fn encode(writer: &mut BitWriter, value: &DateTimeValue, byte_aligned: bool) -> Result<()> {
    let kind = value.kind;

    if kind.has_year() {
        if byte_aligned {
            integer::encode_byte_aligned(writer, value.year);
        } else {
            integer::encode(writer, value.year);
        }
    }

    if kind.has_month_day() {
        if value.month > 12 || value.day > 31 {
            return Err(Error::proc_state(
                "month 0-12, day 0-31",
                "out-of-range month/day",
            ));
        }
        let md = u64::from(value.month) * 32 + u64::from(value.day);
        write_n_bit(writer, md, 9, byte_aligned);
    }

    if kind.has_time() {
        if value.hour > 24
            || value.minute > 59
            || value.second > 60
            || (value.hour == 24 && (value.minute != 0 || value.second != 0))
        {
            return Err(Error::proc_state("valid time of day", "out-of-range time"));
        }
        let t = (u64::from(value.hour) * 64 + u64::from(value.minute)) * 64
            + u64::from(value.second);
        write_n_bit(writer, t, 17, byte_aligned);

        write_bool(writer, value.fractional_secs.is_some(), byte_aligned);
        if let Some(frac) = value.fractional_secs {
            unsigned_integer::encode(writer, frac);
        }
    }

    write_bool(writer, value.timezone_minutes.is_some(), byte_aligned);
    if let Some(offset) = value.timezone_minutes {
        let hours = offset / 60;
        if !(-14..=14).contains(&hours) {
            return Err(Error::proc_state("timezone -14:00..+14:00", "out of range"));
        }
        let raw = (i32::from(hours) * 64 + i32::from(offset % 60) + 896) as u64;
        write_n_bit(writer, raw, 11, byte_aligned);
    }

    Ok(())
}

/// Decodes a date-time value (Spec 7.1.8).
pub fn decode(reader: &mut BitReader, kind: DateTimeKind, byte_aligned: bool) -> Result<DateTimeValue> {
    let mut value = DateTimeValue::new(kind);

    if kind.has_year() {
        value.year = if byte_aligned {
            integer::decode_byte_aligned(reader)?
        } else {
            integer::decode(reader)?
        };
    }

    if kind.has_month_day() {
        let md = read_n_bit(reader, 9, byte_aligned)?;
        value.month = (md / 32) as u8;
        value.day = (md % 32) as u8;
        if value.month > 12 {
            return Err(Error::invalid_input("month out of range"));
        }
        // Fehlende Komponenten stehen als 0 im MonthDay-Feld: gMonth ohne
        // Tag, gDay ohne Monat, gYearMonth ohne Tag. Volle Daten brauchen
        // beide.
        match kind {
            DateTimeKind::Date | DateTimeKind::DateTime | DateTimeKind::GMonthDay
                if value.month == 0 || value.day == 0 =>
            {
                return Err(Error::invalid_input("month/day must not be zero"));
            }
            DateTimeKind::GYearMonth if value.month == 0 => {
                return Err(Error::invalid_input("month must not be zero"));
            }
            _ => {}
        }
    }

    if kind.has_time() {
        let t = read_n_bit(reader, 17, byte_aligned)?;
        value.second = (t % 64) as u8;
        value.minute = ((t / 64) % 64) as u8;
        value.hour = (t / (64 * 64)) as u8;
        if value.hour > 24
            || value.minute > 59
            || value.second > 60
            || (value.hour == 24 && (value.minute != 0 || value.second != 0))
        {
            return Err(Error::invalid_input("time of day out of range"));
        }

        if read_bool(reader, byte_aligned)? {
            value.fractional_secs = Some(unsigned_integer::decode(reader)?);
        }
    }

    if read_bool(reader, byte_aligned)? {
        let raw = read_n_bit(reader, 11, byte_aligned)? as i32 - 896;
        let hours = raw / 64;
        let minutes = raw % 64;
        if !(-14..=14).contains(&hours) || !(-59..=59).contains(&minutes) {
            return Err(Error::invalid_input("timezone out of range"));
        }
        value.timezone_minutes = Some((hours * 60 + minutes) as i16);
    }

    Ok(value)
}

fn write_bool(writer: &mut BitWriter, v: bool, byte_aligned: bool) {
    if byte_aligned {
        boolean::encode_byte_aligned(writer, v);
    } else {
        boolean::encode(writer, v);
    }
}

fn read_bool(reader: &mut BitReader, byte_aligned: bool) -> Result<bool> {
    if byte_aligned {
        boolean::decode_byte_aligned(reader)
    } else {
        boolean::decode(reader)
    }
}

fn write_n_bit(writer: &mut BitWriter, v: u64, n: u8, byte_aligned: bool) {
    if byte_aligned {
        n_bit_unsigned_integer::encode_byte_aligned(writer, v, n);
    } else {
        n_bit_unsigned_integer::encode(writer, v, n);
    }
}

fn read_n_bit(reader: &mut BitReader, n: u8, byte_aligned: bool) -> Result<u64> {
    if byte_aligned {
        n_bit_unsigned_integer::decode_byte_aligned(reader, n)
    } else {
        n_bit_unsigned_integer::decode(reader, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: DateTimeValue) -> DateTimeValue {
        let mut w = BitWriter::new();
        encode(&mut w, &value, false).unwrap();
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r, value.kind, false).unwrap()
    }

    /// Spec 7.1.8: voller dateTime mit allen Komponenten.
    #[test]
    fn full_datetime() {
        let v = DateTimeValue {
            month: 7,
            day: 16,
            hour: 13,
            minute: 37,
            second: 42,
            fractional_secs: Some(521), // "125" reversed
            timezone_minutes: Some(120),
            year: 25,
            ..DateTimeValue::new(DateTimeKind::DateTime)
        };
        assert_eq!(round_trip(v), v);
    }

    /// Spec 7.1.8: Jahr als Offset von 2000, auch negativ.
    #[test]
    fn year_offsets() {
        for year in [0i64, 25, -1, -2000, 9999 - 2000] {
            let v = DateTimeValue {
                year,
                timezone_minutes: None,
                ..DateTimeValue::new(DateTimeKind::GYear)
            };
            assert_eq!(round_trip(v), v, "year={year}");
        }
    }

    #[test]
    fn date_without_time() {
        let v = DateTimeValue {
            year: 24,
            month: 12,
            day: 31,
            ..DateTimeValue::new(DateTimeKind::Date)
        };
        assert_eq!(round_trip(v), v);
    }

    /// gYearMonth trägt Tag 0 im MonthDay-Feld.
    #[test]
    fn g_year_month_without_day() {
        let v = DateTimeValue {
            year: 25,
            month: 8,
            ..DateTimeValue::new(DateTimeKind::GYearMonth)
        };
        assert_eq!(round_trip(v), v);
    }

    #[test]
    fn time_without_fraction() {
        let v = DateTimeValue {
            hour: 23,
            minute: 59,
            second: 60, // Schaltsekunde ist zulässig
            ..DateTimeValue::new(DateTimeKind::Time)
        };
        assert_eq!(round_trip(v), v);
    }

    /// gMonth/gDay führen die fehlende Komponente als 0 im MonthDay-Feld.
    #[test]
    fn g_month_and_g_day() {
        let m = DateTimeValue {
            month: 2,
            ..DateTimeValue::new(DateTimeKind::GMonth)
        };
        assert_eq!(round_trip(m), m);

        let d = DateTimeValue {
            day: 29,
            timezone_minutes: Some(-330),
            ..DateTimeValue::new(DateTimeKind::GDay)
        };
        assert_eq!(round_trip(d), d);
    }

    /// Spec 7.1.8 Table 7-3: Zeitzonen-Extrema ±14:00.
    #[test]
    fn timezone_extremes() {
        for tz in [-14 * 60i16, 0, 14 * 60, 330, -583] {
            let v = DateTimeValue {
                year: 1,
                timezone_minutes: Some(tz),
                ..DateTimeValue::new(DateTimeKind::GYear)
            };
            assert_eq!(round_trip(v), v, "tz={tz}");
        }
    }

    #[test]
    fn byte_aligned_round_trip() {
        let v = DateTimeValue {
            year: 25,
            month: 1,
            day: 2,
            hour: 3,
            minute: 4,
            second: 5,
            fractional_secs: Some(9),
            timezone_minutes: Some(60),
            ..DateTimeValue::new(DateTimeKind::DateTime)
        };
        let mut w = BitWriter::new();
        encode(&mut w, &v, true).unwrap();
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r, DateTimeKind::DateTime, true).unwrap(), v);
    }

    #[test]
    fn decode_rejects_bad_month() {
        // month=13: 13*32 = 416
        let mut w = BitWriter::new();
        n_bit_unsigned_integer::encode(&mut w, 13 * 32 + 1, 9);
        boolean::encode(&mut w, false);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert!(decode(&mut r, DateTimeKind::GMonthDay, false).is_err());
    }

    #[test]
    fn decode_rejects_bad_time() {
        // hour=25
        let mut w = BitWriter::new();
        n_bit_unsigned_integer::encode(&mut w, 25 * 64 * 64, 17);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert!(decode(&mut r, DateTimeKind::Time, false).is_err());
    }

    #[test]
    fn encode_rejects_out_of_range() {
        let mut w = BitWriter::new();
        let bad = DateTimeValue {
            month: 13,
            day: 1,
            ..DateTimeValue::new(DateTimeKind::GMonthDay)
        };
        assert!(encode(&mut w, &bad, false).is_err());
    }
}
