//! EXI Options data model (Spec 5.4, Table 5-1).
//!
//! # Beispiel
//!
//! ```
//! use exicore::options::{Alignment, ExiOptions, Preserve};
//!
//! let opts = ExiOptions {
//!     alignment: Alignment::ByteAlignment,
//!     preserve: Preserve { comments: true, ..Preserve::default() },
//!     value_max_length: Some(1024),
//!     ..ExiOptions::default()
//! };
//! assert!(opts.validate().is_ok());
//! ```

use crate::qname::QName;
use crate::{Error, Result};

/// Alignment of event codes and content items (Spec 5.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Event codes and content are packed in bits without padding (default).
    #[default]
    BitPacked,
    /// Event codes and content are aligned on byte boundaries.
    ByteAlignment,
    /// All compression steps except DEFLATE are applied.
    PreCompression,
}

/// Schema identification carried in the header (Spec 5.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaId {
    /// Explicitly schema-less (xsi:nil="true" in the options document).
    None,
    /// Empty schema id: only the built-in XML Schema types are available.
    BuiltinOnly,
    /// A user-defined schema identifier.
    Id(String),
}

/// Fidelity options (Spec 5.4, 6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preserve {
    /// CM events are preserved.
    pub comments: bool,
    /// PI events are preserved.
    pub pis: bool,
    /// DT and ER events are preserved.
    pub dtd: bool,
    /// NS events and namespace prefixes are preserved.
    pub prefixes: bool,
    /// Lexical form of values is preserved.
    pub lexical_values: bool,
    /// Insignifikanten Whitespace beibehalten. Lokales Steuerfeld des
    /// XML-Front-Ends, kein EXI-Header-Feld; `lexical_values` impliziert
    /// ebenfalls Whitespace-Erhalt.
    pub whitespace: bool,
}

impl Preserve {
    /// Ob eines der Header-relevanten Fidelity-Flags gesetzt ist.
    pub fn any_header_flag(&self) -> bool {
        self.comments || self.pis || self.dtd || self.prefixes || self.lexical_values
    }

    /// Ob Whitespace zwischen Elementen erhalten bleiben soll.
    pub fn keeps_whitespace(&self) -> bool {
        self.whitespace || self.lexical_values
    }
}

/// A datatype representation map entry (Spec 5.4, 7.4).
///
/// Wird im Header erkannt und round-getripped; auf den schema-less Body hat
/// die Map keinen Einfluss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtrmEntry {
    /// QName des XML-Schema-Datentyps.
    pub type_qname: QName,
    /// QName der Representation.
    pub representation_qname: QName,
}

/// EXI options controlling stream encoding/decoding (Spec 5.4, Table 5-1).
#[derive(Debug, Clone, PartialEq)]
pub struct ExiOptions {
    /// Alignment of event codes and content items.
    pub alignment: Alignment,
    /// EXI compression (DEFLATE) requested.
    pub compression: bool,
    /// Strict interpretation (excludes most preserve flags).
    pub strict: bool,
    /// Body is an EXI fragment.
    pub fragment: bool,
    /// Fidelity options.
    pub preserve: Preserve,
    /// Self-contained elements enabled.
    pub self_contained: bool,
    /// Schema identification (None = out-of-band / schema-less).
    pub schema_id: Option<SchemaId>,
    /// Datatype representation map entries.
    pub datatype_representation_map: Vec<DtrmEntry>,
    /// Block size for compression framing (Spec 9.1).
    pub block_size: u32,
    /// Maximum string length for value-table addition.
    pub value_max_length: Option<u32>,
    /// Total capacity of the value partitions.
    pub value_partition_capacity: Option<u32>,
}

impl Default for ExiOptions {
    /// All defaults as specified in Table 5-1.
    fn default() -> Self {
        Self {
            alignment: Alignment::BitPacked,
            compression: false,
            strict: false,
            fragment: false,
            preserve: Preserve::default(),
            self_contained: false,
            schema_id: None,
            datatype_representation_map: Vec::new(),
            block_size: 1_000_000,
            value_max_length: None,
            value_partition_capacity: None,
        }
    }
}

impl ExiOptions {
    /// Validates the option combination (Spec 5.4 MUST NOT rules).
    ///
    /// # Errors
    ///
    /// - [`Error::HeaderOptionsMismatch`] für gegenseitig ausgeschlossene
    ///   Kombinationen (alignment×compression, strict×preserve/SC,
    ///   selfContained×(pre-)compression)
    /// - [`Error::InvalidExiConfiguration`] für `block_size == 0` und leere
    ///   Schema-IDs
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::config("block size must be greater than zero"));
        }
        if matches!(self.schema_id, Some(SchemaId::Id(ref id)) if id.is_empty()) {
            // Leerer String heißt BuiltinOnly, nicht Id("")
            return Err(Error::config("empty schema id; use SchemaId::BuiltinOnly"));
        }

        // Spec 5.4: "alignment" MUST NOT appear when "compression" is present
        if self.compression && self.alignment != Alignment::BitPacked {
            return Err(Error::HeaderOptionsMismatch(
                "alignment must not appear together with compression",
            ));
        }

        // Spec 5.4: "strict" MUST NOT appear with dtd/prefixes/comments/pis
        // or selfContained; nur lexicalValues ist neben strict erlaubt
        let strict_conflict = self.preserve.comments
            || self.preserve.pis
            || self.preserve.dtd
            || self.preserve.prefixes
            || self.self_contained;
        if self.strict && strict_conflict {
            return Err(Error::HeaderOptionsMismatch(
                "strict excludes dtd/prefixes/comments/pis/selfContained",
            ));
        }

        // Spec 5.4: "selfContained" MUST NOT appear with compression,
        // pre-compression or strict
        if self.self_contained
            && (self.compression || self.alignment == Alignment::PreCompression)
        {
            return Err(Error::HeaderOptionsMismatch(
                "selfContained excludes compression and pre-compression",
            ));
        }

        Ok(())
    }

    /// Das effektive Alignment (Spec 6.2, 9): `compression=true` verhält sich
    /// bis auf den DEFLATE-Schritt wie Pre-Compression.
    pub fn effective_alignment(&self) -> Alignment {
        if self.compression {
            Alignment::PreCompression
        } else {
            self.alignment
        }
    }

    /// Ob Event-Codes und Werte byte-orientiert geschrieben werden.
    pub fn byte_aligned(&self) -> bool {
        !matches!(self.effective_alignment(), Alignment::BitPacked)
    }

    /// Ob der Header eine nicht-default Option trägt (steuert die
    /// automatische Options-Emission des Encoders).
    pub fn differs_from_default(&self) -> bool {
        self.alignment != Alignment::BitPacked
            || self.compression
            || self.strict
            || self.fragment
            || self.preserve.any_header_flag()
            || self.self_contained
            || self.schema_id.is_some()
            || !self.datatype_representation_map.is_empty()
            || self.block_size != 1_000_000
            || self.value_max_length.is_some()
            || self.value_partition_capacity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Defaults (Spec 5.4, Table 5-1) ===

    #[test]
    fn defaults_match_table_5_1() {
        let opts = ExiOptions::default();
        assert_eq!(opts.alignment, Alignment::BitPacked);
        assert!(!opts.compression);
        assert!(!opts.strict);
        assert!(!opts.fragment);
        assert_eq!(opts.preserve, Preserve::default());
        assert!(!opts.self_contained);
        assert!(opts.schema_id.is_none());
        assert!(opts.datatype_representation_map.is_empty());
        assert_eq!(opts.block_size, 1_000_000);
        assert!(opts.value_max_length.is_none());
        assert!(opts.value_partition_capacity.is_none());
        assert!(opts.validate().is_ok());
        assert!(!opts.differs_from_default());
    }

    // === Gültige Kombinationen ===

    #[test]
    fn valid_combinations() {
        for opts in [
            ExiOptions { compression: true, ..Default::default() },
            ExiOptions { alignment: Alignment::ByteAlignment, ..Default::default() },
            ExiOptions { alignment: Alignment::PreCompression, ..Default::default() },
            ExiOptions {
                strict: true,
                preserve: Preserve { lexical_values: true, ..Default::default() },
                ..Default::default()
            },
            ExiOptions { self_contained: true, ..Default::default() },
            ExiOptions {
                self_contained: true,
                alignment: Alignment::ByteAlignment,
                ..Default::default()
            },
            ExiOptions {
                preserve: Preserve {
                    comments: true,
                    pis: true,
                    dtd: true,
                    prefixes: true,
                    lexical_values: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        ] {
            assert!(opts.validate().is_ok(), "{opts:?}");
        }
    }

    // === Ungültige Kombinationen (Spec 5.4 MUST NOT) ===

    #[test]
    fn compression_excludes_alignment() {
        for alignment in [Alignment::ByteAlignment, Alignment::PreCompression] {
            let opts = ExiOptions {
                compression: true,
                alignment,
                ..Default::default()
            };
            assert!(matches!(
                opts.validate().unwrap_err(),
                Error::HeaderOptionsMismatch(_)
            ));
        }
    }

    #[test]
    fn strict_excludes_preserve_flags() {
        let flags: [fn(&mut Preserve); 4] = [
            |p| p.comments = true,
            |p| p.pis = true,
            |p| p.dtd = true,
            |p| p.prefixes = true,
        ];
        for set in flags {
            let mut preserve = Preserve::default();
            set(&mut preserve);
            let opts = ExiOptions {
                strict: true,
                preserve,
                ..Default::default()
            };
            assert!(matches!(
                opts.validate().unwrap_err(),
                Error::HeaderOptionsMismatch(_)
            ));
        }
    }

    #[test]
    fn strict_excludes_self_contained() {
        let opts = ExiOptions {
            strict: true,
            self_contained: true,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate().unwrap_err(),
            Error::HeaderOptionsMismatch(_)
        ));
    }

    #[test]
    fn self_contained_excludes_compression() {
        for opts in [
            ExiOptions {
                self_contained: true,
                compression: true,
                ..Default::default()
            },
            ExiOptions {
                self_contained: true,
                alignment: Alignment::PreCompression,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                opts.validate().unwrap_err(),
                Error::HeaderOptionsMismatch(_)
            ));
        }
    }

    // === Konfigurationsfehler ===

    #[test]
    fn block_size_zero_rejected() {
        let opts = ExiOptions {
            block_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate().unwrap_err(),
            Error::InvalidExiConfiguration(_)
        ));
    }

    #[test]
    fn empty_schema_id_rejected() {
        let opts = ExiOptions {
            schema_id: Some(SchemaId::Id(String::new())),
            ..Default::default()
        };
        assert!(matches!(
            opts.validate().unwrap_err(),
            Error::InvalidExiConfiguration(_)
        ));

        let ok = ExiOptions {
            schema_id: Some(SchemaId::BuiltinOnly),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    // === Abgeleitete Eigenschaften ===

    #[test]
    fn effective_alignment_of_compression() {
        let opts = ExiOptions {
            compression: true,
            ..Default::default()
        };
        assert_eq!(opts.effective_alignment(), Alignment::PreCompression);
        assert!(opts.byte_aligned());
        assert!(!ExiOptions::default().byte_aligned());
    }

    #[test]
    fn keeps_whitespace_via_lexical() {
        assert!(!Preserve::default().keeps_whitespace());
        let p = Preserve { lexical_values: true, ..Default::default() };
        assert!(p.keeps_whitespace());
        let p = Preserve { whitespace: true, ..Default::default() };
        assert!(p.keeps_whitespace());
        assert!(!p.any_header_flag()); // whitespace ist kein Header-Feld
    }

    #[test]
    fn differs_from_default_detects_each_field() {
        assert!(ExiOptions { fragment: true, ..Default::default() }.differs_from_default());
        assert!(ExiOptions { block_size: 42, ..Default::default() }.differs_from_default());
        assert!(ExiOptions { value_partition_capacity: Some(4), ..Default::default() }
            .differs_from_default());
    }
}
