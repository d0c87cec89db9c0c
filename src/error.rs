//! Central error taxonomy for the EXI codec core.
//!
//! Geschlossene Menge von Fehlerarten; Leaf-Funktionen geben `Result` zurück,
//! Call-Sites propagieren mit `?`. Kein Exception-Kontrollfluss, keine Panics
//! auf regulären Fehlerpfaden. `ParsingComplete` und `HandlerStop` sind
//! Kontrollsignale, keine Defekte.

use core::fmt;
use std::borrow::Cow;

/// All error kinds produced by the codec core.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Feature not available in this build (e.g. compressed bodies).
    NotImplemented(&'static str),
    /// Catch-all for internal errors that fit no other category.
    Unexpected(Cow<'static, str>),
    /// Arithmetic or index out of range.
    OutOfBoundBuffer {
        /// Der angefragte Index.
        index: usize,
        /// Die tatsächliche Länge.
        len: usize,
    },
    /// A required reference was absent.
    NullReference(&'static str),
    /// Allocator failure surfaced from a guarded growth path.
    MemoryAllocationError,
    /// EXI header prefix, distinguishing bits or version malformed (Spec 5).
    InvalidExiHeader(Cow<'static, str>),
    /// Encoder/decoder state does not match the event sequence.
    InconsistentProcState {
        /// Was der Prozessorzustand erwartet hätte (leer wenn unbekannt).
        expected: Cow<'static, str>,
        /// Was tatsächlich vorlag (leer wenn unbekannt).
        found: Cow<'static, str>,
    },
    /// Input violates the EXI wire format: out-of-range compact IDs, bad
    /// varints, event codes matching no production (Spec 6, 7.3).
    InvalidExiInput(Cow<'static, str>),
    /// Incremental I/O needs more data (reads) or more room (writes).
    ///
    /// Recoverable: der Aufrufer darf den Puffer erweitern und ab dem
    /// letzten Checkpoint erneut lesen.
    BufferEndReached,
    /// Successful end of stream; control signal, not a failure.
    ParsingComplete,
    /// Options combination invalid for this codec mode (Spec 5.4).
    InvalidExiConfiguration(Cow<'static, str>),
    /// Schema-qualified QName values present without `Preserve.prefixes`.
    NoPrefixesPreservedXmlSchema,
    /// String codec input malformed: surrogate or out-of-range code point
    /// (Spec 7.1.10).
    InvalidStringOperation(u64),
    /// Mutually exclusive header options set (Spec 5.4 MUST NOT rules).
    HeaderOptionsMismatch(&'static str),
    /// The event handler requested early termination.
    HandlerStop,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotImplemented(what) => write!(f, "not implemented: {what}"),
            Self::Unexpected(msg) => {
                if msg.is_empty() {
                    write!(f, "unexpected internal error")
                } else {
                    write!(f, "unexpected internal error: {msg}")
                }
            }
            Self::OutOfBoundBuffer { index, len } => {
                write!(f, "index {index} out of bounds (len {len})")
            }
            Self::NullReference(what) => write!(f, "required reference absent: {what}"),
            Self::MemoryAllocationError => write!(f, "memory allocation failed"),
            Self::InvalidExiHeader(msg) => {
                if msg.is_empty() {
                    write!(f, "invalid EXI header (Spec 5)")
                } else {
                    write!(f, "invalid EXI header: {msg} (Spec 5)")
                }
            }
            Self::InconsistentProcState { expected, found } => {
                if expected.is_empty() && found.is_empty() {
                    write!(f, "inconsistent processor state")
                } else {
                    write!(
                        f,
                        "inconsistent processor state: expected '{expected}', found '{found}'"
                    )
                }
            }
            Self::InvalidExiInput(msg) => {
                if msg.is_empty() {
                    write!(f, "invalid EXI input (Spec 6)")
                } else {
                    write!(f, "invalid EXI input: {msg} (Spec 6)")
                }
            }
            Self::BufferEndReached => write!(f, "buffer end reached, more data required"),
            Self::ParsingComplete => write!(f, "parsing complete"),
            Self::InvalidExiConfiguration(msg) => {
                write!(f, "invalid EXI configuration: {msg} (Spec 5.4)")
            }
            Self::NoPrefixesPreservedXmlSchema => write!(
                f,
                "qualified QName values require Preserve.prefixes (Spec 7.1.7)"
            ),
            Self::InvalidStringOperation(cp) => {
                write!(f, "invalid Unicode code point U+{cp:X} (Spec 7.1.10)")
            }
            Self::HeaderOptionsMismatch(rule) => {
                write!(f, "header options mismatch: {rule} (Spec 5.4)")
            }
            Self::HandlerStop => write!(f, "handler requested stop"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Unexpected(format!("I/O: {e}").into())
    }
}

impl Error {
    /// Erstellt einen `Unexpected`-Fehler mit Nachricht.
    pub fn unexpected(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Erstellt einen `InvalidExiInput`-Fehler mit Kontext.
    pub fn invalid_input(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidExiInput(msg.into())
    }

    /// Erstellt einen `InvalidExiHeader`-Fehler mit Kontext.
    pub fn invalid_header(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidExiHeader(msg.into())
    }

    /// Erstellt einen `InconsistentProcState`-Fehler mit Kontext.
    pub fn proc_state(
        expected: impl Into<Cow<'static, str>>,
        found: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InconsistentProcState {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Erstellt einen `InvalidExiConfiguration`-Fehler mit Nachricht.
    pub fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidExiConfiguration(msg.into())
    }

    /// Kurzer stabiler Name der Fehlerart (für die Diagnose-Zeile).
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotImplemented(_) => "NotImplemented",
            Self::Unexpected(_) => "Unexpected",
            Self::OutOfBoundBuffer { .. } => "OutOfBoundBuffer",
            Self::NullReference(_) => "NullReference",
            Self::MemoryAllocationError => "MemoryAllocationError",
            Self::InvalidExiHeader(_) => "InvalidExiHeader",
            Self::InconsistentProcState { .. } => "InconsistentProcState",
            Self::InvalidExiInput(_) => "InvalidExiInput",
            Self::BufferEndReached => "BufferEndReached",
            Self::ParsingComplete => "ParsingComplete",
            Self::InvalidExiConfiguration(_) => "InvalidExiConfiguration",
            Self::NoPrefixesPreservedXmlSchema => "NoPrefixesPreservedXmlSchema",
            Self::InvalidStringOperation(_) => "InvalidStringOperation",
            Self::HeaderOptionsMismatch(_) => "HeaderOptionsMismatch",
            Self::HandlerStop => "HandlerStop",
        }
    }

    /// Ob der Fehler ein Kontrollsignal ist (kein Defekt).
    pub fn is_control(&self) -> bool {
        matches!(self, Self::ParsingComplete | Self::HandlerStop)
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
