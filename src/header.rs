//! EXI header encoding/decoding (Spec 5, 5.1, 5.2, 5.3).
//!
//! Aufbau:
//! - optionaler Cookie `$EXI` (4 ASCII-Bytes, Spec 5.1)
//! - Distinguishing Bits `10` (Spec 5.2)
//! - Presence-Bit für EXI Options (Spec 5)
//! - Format-Version: Preview-Bit + 4-Bit-Gruppen (Spec 5.3)
//! - [EXI Options] — separates Modul (`options_codec`)
//! - Padding auf Byte-Grenze bei byte-alignment/(pre-)compression (Spec 5)
//!
//! Preview-Flag und Version werden beim Decode unverändert übernommen;
//! ob der Body eine Version verarbeiten kann, entscheidet der Body-Codec.

use crate::bitstream::{BitReader, BitWriter};
use crate::n_bit_unsigned_integer;
use crate::{Error, Result};

/// EXI cookie bytes: "$EXI" (Spec 5.1).
const EXI_COOKIE: [u8; 4] = [0x24, 0x45, 0x58, 0x49];

/// Distinguishing bits `10` (Spec 5.2).
const DISTINGUISHING_BITS: u64 = 0b10;

/// EXI header (Spec 5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExiHeader {
    /// Cookie `$EXI` vorhanden (Spec 5.1).
    pub has_cookie: bool,
    /// Preview- statt Final-Version (Spec 5.3).
    pub is_preview: bool,
    /// Format-Versionsnummer, ab 1 (Spec 5.3).
    pub version: u16,
    /// EXI Options folgen im Header (Spec 5).
    pub options_present: bool,
}

impl Default for ExiHeader {
    fn default() -> Self {
        Self {
            has_cookie: false,
            is_preview: false,
            version: 1,
            options_present: false,
        }
    }
}

impl ExiHeader {
    /// Header für EXI Final Version 1 ohne Cookie und ohne Options.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Encodes the EXI header up to (not including) the options document.
///
/// `needs_padding` hängt Padding-Bits an (byte-alignment/compression) —
/// nur sinnvoll, wenn KEINE Options folgen; sonst padded der Aufrufer nach
/// dem Options-Dokument.
pub fn encode(writer: &mut BitWriter, header: &ExiHeader, needs_padding: bool) -> Result<()> {
    if header.version == 0 {
        return Err(Error::invalid_header("version must be at least 1"));
    }

    // 1. Cookie (Spec 5.1)
    if header.has_cookie {
        writer.write_bytes_aligned(&EXI_COOKIE);
    }

    // 2. Distinguishing Bits (Spec 5.2)
    writer.write_bits(DISTINGUISHING_BITS, 2);

    // 3. Presence-Bit (Spec 5)
    writer.write_bit(header.options_present);

    // 4. Format-Version (Spec 5.3)
    writer.write_bit(header.is_preview);
    let mut remaining = header.version - 1;
    loop {
        if remaining <= 14 {
            n_bit_unsigned_integer::encode(writer, u64::from(remaining), 4);
            break;
        }
        n_bit_unsigned_integer::encode(writer, 15, 4);
        remaining -= 15;
    }

    // 5. Padding (Spec 5)
    if needs_padding {
        writer.align_to_byte();
    }

    Ok(())
}

/// Decodes the EXI header up to (not including) the options document.
///
/// # Errors
///
/// - [`Error::InvalidExiHeader`] wenn die Distinguishing Bits nicht `10` sind
/// - [`Error::BufferEndReached`] bei unerwartetem Stream-Ende
pub fn decode(reader: &mut BitReader, needs_padding: bool) -> Result<ExiHeader> {
    // 1. Cookie-Erkennung (Spec 5.1): vier Bytes probeweise lesen, bei
    //    Nicht-Cookie per Checkpoint zurückrollen.
    let cp = reader.save_checkpoint();
    let has_cookie = match read_four_bytes(reader) {
        Ok(bytes) if bytes == EXI_COOKIE => true,
        Ok(_) => {
            reader.restore_checkpoint(cp);
            false
        }
        Err(e) => {
            // '$'-Anfang mit abgeschnittenem Cookie ist ein echter Fehler;
            // kürzere Nicht-Cookie-Streams laufen regulär weiter.
            if reader.peek_aligned_bytes(1) == Some(&EXI_COOKIE[..1]) {
                return Err(e);
            }
            reader.restore_checkpoint(cp);
            false
        }
    };

    // 2. Distinguishing Bits (Spec 5.2)
    let bits = reader.read_bits(2)?;
    if bits != DISTINGUISHING_BITS {
        return Err(Error::invalid_header(format!(
            "distinguishing bits {bits:02b}, expected 10"
        )));
    }

    // 3. Presence-Bit (Spec 5)
    let options_present = reader.read_bit()?;

    // 4. Format-Version (Spec 5.3): 4-Bit-Gruppen, 15 = Fortsetzung
    let is_preview = reader.read_bit()?;
    let mut version: u16 = 1;
    loop {
        let group = n_bit_unsigned_integer::decode(reader, 4)? as u16;
        version = version.saturating_add(group);
        if group <= 14 {
            break;
        }
    }

    // 5. Padding überspringen (Spec 5)
    if needs_padding {
        reader.align_to_byte();
    }

    Ok(ExiHeader {
        has_cookie,
        is_preview,
        version,
        options_present,
    })
}

fn read_four_bytes(reader: &mut BitReader) -> Result<[u8; 4]> {
    let mut bytes = [0u8; 4];
    reader.read_bytes_aligned(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(header: &ExiHeader, needs_padding: bool) -> ExiHeader {
        let mut w = BitWriter::new();
        encode(&mut w, header, needs_padding).unwrap();
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r, needs_padding).unwrap()
    }

    fn encode_to_vec(header: &ExiHeader) -> Vec<u8> {
        let mut w = BitWriter::new();
        encode(&mut w, header, false).unwrap();
        w.into_vec()
    }

    // === Spec 5.1: Cookie ===

    #[test]
    fn cookie_round_trip() {
        let h = ExiHeader {
            has_cookie: true,
            ..Default::default()
        };
        let data = encode_to_vec(&h);
        assert_eq!(&data[0..4], b"$EXI");
        assert_eq!(round_trip(&h, false), h);

        let plain = ExiHeader::new();
        assert_eq!(round_trip(&plain, false), plain);
    }

    /// Spec 5: `$EXI` + Bits `10 0 0000 0000` ergibt Cookie,
    /// keine Preview, Version 1, keine Options.
    #[test]
    fn header_only_stream() {
        let data = [0x24, 0x45, 0x58, 0x49, 0b1000_0000];
        let mut r = BitReader::new(&data);
        let h = decode(&mut r, false).unwrap();
        assert!(h.has_cookie);
        assert!(!h.is_preview);
        assert_eq!(h.version, 1);
        assert!(!h.options_present);
        // Body beginnt direkt nach den 8 Header-Bits
        assert_eq!(r.bit_position(), 32 + 8);
    }

    /// Abgeschnittener Cookie ('$EX') ist ein Fehler, kein Rollback.
    #[test]
    fn truncated_cookie_is_error() {
        let data = [0x24, 0x45, 0x58];
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r, false).unwrap_err(), Error::BufferEndReached);
    }

    /// Kurzer Nicht-Cookie-Stream wird regulär decodiert.
    #[test]
    fn short_non_cookie_stream() {
        // 0x80 = 10 0 0 0000 → valider Header ohne Cookie
        let data = [0x80];
        let mut r = BitReader::new(&data);
        let h = decode(&mut r, false).unwrap();
        assert!(!h.has_cookie);
        assert_eq!(h.version, 1);
    }

    // === Spec 5.2: Distinguishing Bits ===

    #[test]
    fn distinguishing_bits_enforced() {
        for bits in [0b00u64, 0b01, 0b11] {
            let mut w = BitWriter::new();
            w.write_bits(bits, 2);
            w.write_bits(0, 6);
            let data = w.into_vec();
            let mut r = BitReader::new(&data);
            assert!(
                matches!(decode(&mut r, false).unwrap_err(), Error::InvalidExiHeader(_)),
                "bits={bits:02b}"
            );
        }
    }

    // === Spec 5.3: Version ===

    /// Spec 5.3 Example 5-1: Versionen 1, 15, 16, 17 und große Werte.
    #[test]
    fn version_round_trips() {
        for version in [1u16, 2, 14, 15, 16, 17, 30, 31, 100, 1000] {
            let h = ExiHeader {
                version,
                ..Default::default()
            };
            assert_eq!(round_trip(&h, false).version, version, "version={version}");
        }
    }

    /// Spec 5.3: exakte Bitmuster für Version 1, 15, 16.
    #[test]
    fn version_bit_patterns() {
        assert_eq!(encode_to_vec(&ExiHeader::new()), vec![0x80]);
        assert_eq!(
            encode_to_vec(&ExiHeader { version: 15, ..Default::default() }),
            vec![0x8E]
        );
        let v16 = encode_to_vec(&ExiHeader { version: 16, ..Default::default() });
        assert_eq!(v16[0], 0x8F);
        assert_eq!(v16[1] & 0xF0, 0x00);
    }

    /// Preview-Flag wird unverändert übernommen (Body-Codec entscheidet).
    #[test]
    fn preview_flag_round_trips() {
        let h = ExiHeader {
            is_preview: true,
            ..Default::default()
        };
        let decoded = round_trip(&h, false);
        assert!(decoded.is_preview);
    }

    #[test]
    fn version_zero_rejected_on_encode() {
        let mut w = BitWriter::new();
        let h = ExiHeader {
            version: 0,
            ..Default::default()
        };
        assert!(encode(&mut w, &h, false).is_err());
    }

    /// Version mit Fortsetzungsgruppe, aber abgeschnittenem Stream.
    #[test]
    fn truncated_version_continuation() {
        let mut w = BitWriter::new();
        w.write_bits(0b10, 2);
        w.write_bit(false);
        w.write_bit(false);
        w.write_bits(0b1111, 4); // Fortsetzung angekündigt, dann Ende
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r, false).unwrap_err(), Error::BufferEndReached);
    }

    // === Spec 5: Presence-Bit und Padding ===

    #[test]
    fn presence_bit_round_trips() {
        let h = ExiHeader {
            options_present: true,
            ..Default::default()
        };
        assert!(round_trip(&h, false).options_present);
        // Dist(10) + Presence(1) + Preview(0) + Version(0000) = 0xA0
        assert_eq!(encode_to_vec(&h), vec![0xA0]);
    }

    #[test]
    fn padding_extends_to_byte_boundary() {
        let mut w = BitWriter::new();
        encode(&mut w, &ExiHeader::new(), true).unwrap();
        assert_eq!(w.bit_position(), 8);

        // Version 16: 12 Header-Bits → 2 Bytes mit Padding
        let mut w = BitWriter::new();
        let h = ExiHeader { version: 16, ..Default::default() };
        encode(&mut w, &h, true).unwrap();
        assert_eq!(w.bit_position(), 16);

        assert_eq!(round_trip(&h, true), h);
    }

    #[test]
    fn decode_empty_stream() {
        let mut r = BitReader::new(&[]);
        assert_eq!(decode(&mut r, false).unwrap_err(), Error::BufferEndReached);
    }

    /// Header-Round-Trip für jede gültige Kombination.
    #[test]
    fn full_header_round_trip() {
        for has_cookie in [false, true] {
            for options_present in [false, true] {
                for is_preview in [false, true] {
                    let h = ExiHeader {
                        has_cookie,
                        options_present,
                        is_preview,
                        version: 1,
                    };
                    assert_eq!(round_trip(&h, false), h, "{h:?}");
                }
            }
        }
    }
}
