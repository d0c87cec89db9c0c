//! Diagnostic surface: one line per error.
//!
//! Fehler werden zeilenorientiert gemeldet: Fehlername, Bit-Offset (falls
//! bekannt) und die Kontextnachricht. Die Bibliothek meldet über die
//! `log`-Fassade; wer ein eigenes Ziel braucht, implementiert
//! [`DiagnosticSink`] (z.B. stderr im CLI). Der erste Fehler bricht die
//! laufende Operation ab; es wird nicht neu synchronisiert.

use std::io::Write;

use crate::Error;

/// Line-oriented sink for codec errors.
pub trait DiagnosticSink {
    /// Meldet einen Fehler; `bit_offset` ist die Stream-Position, sofern
    /// der Codec sie kennt.
    fn report(&mut self, error: &Error, bit_offset: Option<usize>);
}

/// Formatiert die kanonische Diagnose-Zeile.
pub fn format_line(error: &Error, bit_offset: Option<usize>) -> String {
    match bit_offset {
        Some(bits) => format!(
            "{} at bit {} (byte {}): {}",
            error.name(),
            bits,
            bits / 8,
            error
        ),
        None => format!("{}: {}", error.name(), error),
    }
}

/// Default sink: reports through the `log` facade at error level.
#[derive(Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, error: &Error, bit_offset: Option<usize>) {
        // Kontrollsignale sind keine Defekte
        if error.is_control() {
            log::debug!("{}", format_line(error, bit_offset));
        } else {
            log::error!("{}", format_line(error, bit_offset));
        }
    }
}

/// Sink über einen beliebigen `Write` (z.B. stderr im CLI).
pub struct WriteSink<W: Write> {
    out: W,
}

impl<W: Write> WriteSink<W> {
    /// Neuer Sink über `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> DiagnosticSink for WriteSink<W> {
    fn report(&mut self, error: &Error, bit_offset: Option<usize>) {
        // Diagnoseausgabe darf selbst nie fehlschlagen
        let _ = writeln!(self.out, "{}", format_line(error, bit_offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_contains_name_offset_and_message() {
        let line = format_line(&Error::BufferEndReached, Some(19));
        assert!(line.contains("BufferEndReached"), "{line}");
        assert!(line.contains("bit 19"), "{line}");
        assert!(line.contains("byte 2"), "{line}");

        let line = format_line(&Error::HandlerStop, None);
        assert!(line.starts_with("HandlerStop"), "{line}");
    }

    #[test]
    fn write_sink_emits_one_line_per_error() {
        let mut buf = Vec::new();
        {
            let mut sink = WriteSink::new(&mut buf);
            sink.report(&Error::invalid_input("bad varint"), Some(42));
            sink.report(&Error::MemoryAllocationError, None);
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("bad varint"));
    }
}
