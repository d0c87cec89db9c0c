//! exicore – W3C EXI 1.0 (Efficient XML Interchange) codec core.
//!
//! Schema-less EXI: built-in grammars, string tables, bit-packed and
//! byte-aligned streams. Schema-informed grammars sind nicht Teil dieses
//! Kerns; die zugehörigen Optionen werden erkannt und durchgereicht.
//!
//! # Beispiel
//!
//! ```
//! use std::rc::Rc;
//! use exicore::{ChContent, ExiEvent, ExiOptions, QName};
//! use exicore::encoder::encode;
//! use exicore::decoder::decode;
//!
//! let events = vec![
//!     ExiEvent::StartDocument,
//!     ExiEvent::StartElement(Rc::new(QName::new("", "greeting"))),
//!     ExiEvent::Characters(ChContent { value: "Hello".into() }),
//!     ExiEvent::EndElement,
//!     ExiEvent::EndDocument,
//! ];
//! let bytes = encode(&events, &ExiOptions::default()).unwrap();
//!
//! let (decoded, _opts) = decode(&bytes).unwrap();
//! assert_eq!(decoded.len(), 5);
//! ```

pub mod binary;
pub mod bit_width;
pub mod bitstream;
pub mod boolean;
pub mod datetime;
pub mod decimal;
pub mod decoder;
pub mod diag;
pub mod encoder;
pub mod error;
pub mod event;
pub mod event_code;
pub mod float;
pub mod grammar;
pub mod handler;
pub mod header;
pub mod integer;
pub mod n_bit_unsigned_integer;
pub mod options;
pub mod options_codec;
pub mod qname;
pub mod string;
pub mod string_table;
pub mod unsigned_integer;
pub mod xml;
pub mod xml_serializer;

pub use error::{Error, Result};

/// HashMap mit ahash (schnell, nicht DoS-resistent — nur für interne
/// Datenstrukturen wie String-Table-Lookups und Grammar-Caches).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

// Public API: Events und Handler
pub use event::{
    AtContent, ChContent, CmContent, DtContent, ErContent, ExiEvent, NsContent, PiContent,
};
pub use handler::{ContentHandler, EventCollector};

// Public API: Options und Header
pub use header::ExiHeader;
pub use options::{Alignment, ExiOptions, Preserve, SchemaId};

// Public API: Encoder/Decoder
pub use decoder::{decode, decode_with_options, Decoder};
pub use encoder::{encode, Encoder, EncoderConfig};

// Public API: Typen
pub use qname::QName;
pub use string_table::StringTable;

// Public API: XML-Integration
pub use xml::{parse_xml_events_from_reader, parse_xml_events_from_str};
pub use xml_serializer::{events_to_xml, events_to_xml_writer};
