//! EXI options document encoding/decoding (Spec 5.4, Appendix C).
//!
//! Das Options-Dokument ist ein EXI-Body ohne Header, schema-informed
//! durch das Options-Schema aus Appendix C mit `strict=true` und immer
//! bit-packed. SD/ED und die meisten EE sind implizit (0 Bits). Die
//! Element-Inhalte sind geordnete Folgen optionaler Elemente; der
//! Event-Code eines Elements ist sein Ordinal minus der Anzahl bereits
//! konsumierter Positionen, die Breite `⌈log₂(verbleibende Werte)⌉`.
//!
//! Default-Werte werden nicht encodiert (Spec 5.4): ein Element erscheint
//! nur, wenn die zugehörige Option vom Default abweicht.

use crate::bit_width;
use crate::bitstream::{BitReader, BitWriter};
use crate::options::{Alignment, DtrmEntry, ExiOptions, SchemaId};
use crate::qname::QName;
use crate::string_table::{URI_XML, URI_XSD, URI_XSI};
use crate::{boolean, n_bit_unsigned_integer, string, unsigned_integer, Error, Result};

/// EXI-Namespace, targetNamespace des Options-Schemas (Appendix C).
pub const EXI_NS: &str = "http://www.w3.org/2009/exi";

/// Längenlimit für schemaId-Strings (DoS-Schutz).
const MAX_SCHEMA_ID_LENGTH: usize = 65_536;

// ============================================================================
// Geordnete Folge optionaler Elemente (Appendix C, strict)
// ============================================================================

/// Event-Code-Zähler für eine geordnete Folge optionaler Elemente.
///
/// `total` zählt alle Positionen inklusive EE (letztes Ordinal). Nach
/// einem Element mit Ordinal `k` sind nur noch Ordinale > `k` erreichbar
/// (bzw. ≥ `k` für wiederholbare Elemente wie datatypeRepresentationMap).
struct OrderedSeq {
    total: usize,
    offset: usize,
}

impl OrderedSeq {
    fn new(total: usize) -> Self {
        Self { total, offset: 0 }
    }

    fn width(&self) -> u8 {
        bit_width::for_count(self.total - self.offset)
    }

    fn write(&mut self, writer: &mut BitWriter, ordinal: usize, repeatable: bool) {
        debug_assert!(ordinal >= self.offset && ordinal < self.total);
        n_bit_unsigned_integer::encode(writer, (ordinal - self.offset) as u64, self.width());
        self.offset = if repeatable { ordinal } else { ordinal + 1 };
    }

    /// Schreibt das abschließende EE (implizit, wenn keine Wahl mehr bleibt).
    fn write_ee(&mut self, writer: &mut BitWriter) {
        self.write(writer, self.total - 1, false);
    }

    fn read(&mut self, reader: &mut BitReader) -> Result<usize> {
        let code = n_bit_unsigned_integer::decode(reader, self.width())? as usize;
        let ordinal = self.offset + code;
        if ordinal >= self.total {
            return Err(Error::invalid_input("options element code out of range"));
        }
        Ok(ordinal)
    }

    fn advance(&mut self, ordinal: usize, repeatable: bool) {
        self.offset = if repeatable { ordinal } else { ordinal + 1 };
    }
}

// ============================================================================
// Mini-String-Table für DTRM-QNames (Spec D.1, D.3 + Options-Schema)
// ============================================================================

/// XSD-Built-in-Typnamen (Table D-5, alphabetisch).
const XSD_LOCAL_NAMES: &[&str] = &[
    "ENTITIES", "ENTITY", "ID", "IDREF", "IDREFS", "NCName", "NMTOKEN", "NMTOKENS",
    "NOTATION", "Name", "QName", "anySimpleType", "anyType", "anyURI", "base64Binary",
    "boolean", "byte", "date", "dateTime", "decimal", "double", "duration", "float",
    "gDay", "gMonth", "gMonthDay", "gYear", "gYearMonth", "hexBinary", "int", "integer",
    "language", "long", "negativeInteger", "nonNegativeInteger", "nonPositiveInteger",
    "normalizedString", "positiveInteger", "short", "string", "time", "token",
    "unsignedByte", "unsignedInt", "unsignedLong", "unsignedShort",
];

/// Element-Namen des Options-Schemas (Appendix C, alphabetisch).
const EXI_LOCAL_NAMES: &[&str] = &[
    "alignment", "blockSize", "byte", "comments", "common", "compression",
    "datatypeRepresentationMap", "dtd", "fragment", "header", "lesscommon",
    "lexicalValues", "pis", "pre-compress", "preserve", "prefixes",
    "schemaId", "selfContained", "strict", "uncommon", "valueMaxLength",
    "valuePartitionCapacity",
];

/// Minimale String-Tabelle für die QName-Paare der
/// datatypeRepresentationMap. Vorbesetzt nach D.1/D.3; das Options-Schema
/// bringt den EXI-Namespace als URI 4 mit.
struct DtrmStringTable {
    uris: Vec<String>,
    local_names: Vec<Vec<String>>,
}

impl DtrmStringTable {
    fn new() -> Self {
        Self {
            uris: vec![
                String::new(),
                URI_XML.to_string(),
                URI_XSI.to_string(),
                URI_XSD.to_string(),
                EXI_NS.to_string(),
            ],
            local_names: vec![
                Vec::new(),
                vec!["base".into(), "id".into(), "lang".into(), "space".into()],
                vec!["nil".into(), "type".into()],
                XSD_LOCAL_NAMES.iter().map(|s| s.to_string()).collect(),
                EXI_LOCAL_NAMES.iter().map(|s| s.to_string()).collect(),
            ],
        }
    }

    fn encode_qname(&mut self, writer: &mut BitWriter, qname: &QName) {
        // URI: Compact-ID mit Miss-Escape (Spec 7.3.2)
        let bits = bit_width::for_count(self.uris.len() + 1);
        let uri_idx = match self.uris.iter().position(|u| **u == *qname.uri) {
            Some(idx) => {
                n_bit_unsigned_integer::encode(writer, (idx + 1) as u64, bits);
                idx
            }
            None => {
                n_bit_unsigned_integer::encode(writer, 0, bits);
                string::encode(writer, &qname.uri);
                self.uris.push(qname.uri.to_string());
                self.local_names.push(Vec::new());
                self.uris.len() - 1
            }
        };
        // LocalName: Compact-ID mit Miss-Escape
        let partition = &self.local_names[uri_idx];
        let bits = bit_width::for_count(partition.len() + 1);
        match partition.iter().position(|n| **n == *qname.local_name) {
            Some(idx) => n_bit_unsigned_integer::encode(writer, (idx + 1) as u64, bits),
            None => {
                n_bit_unsigned_integer::encode(writer, 0, bits);
                string::encode(writer, &qname.local_name);
                self.local_names[uri_idx].push(qname.local_name.to_string());
            }
        }
    }

    fn decode_qname(&mut self, reader: &mut BitReader) -> Result<QName> {
        let bits = bit_width::for_count(self.uris.len() + 1);
        let code = n_bit_unsigned_integer::decode(reader, bits)? as usize;
        let uri_idx = if code == 0 {
            let uri = string::decode(reader)?;
            self.uris.push(uri);
            self.local_names.push(Vec::new());
            self.uris.len() - 1
        } else {
            let idx = code - 1;
            if idx >= self.uris.len() {
                return Err(Error::invalid_input("dtrm uri index out of range"));
            }
            idx
        };

        let partition = &self.local_names[uri_idx];
        let bits = bit_width::for_count(partition.len() + 1);
        let code = n_bit_unsigned_integer::decode(reader, bits)? as usize;
        let local = if code == 0 {
            let name = string::decode(reader)?;
            self.local_names[uri_idx].push(name.clone());
            name
        } else {
            let idx = code - 1;
            partition
                .get(idx)
                .cloned()
                .ok_or_else(|| Error::invalid_input("dtrm local-name index out of range"))?
        };
        Ok(QName::new(self.uris[uri_idx].clone(), local))
    }
}

// ============================================================================
// Welche Elemente braucht dieses Options-Set?
// ============================================================================

fn needs_uncommon(opts: &ExiOptions) -> bool {
    opts.alignment != Alignment::BitPacked
        || opts.self_contained
        || opts.value_max_length.is_some()
        || opts.value_partition_capacity.is_some()
        || !opts.datatype_representation_map.is_empty()
}

fn needs_preserve(opts: &ExiOptions) -> bool {
    opts.preserve.any_header_flag()
}

fn needs_lesscommon(opts: &ExiOptions) -> bool {
    needs_uncommon(opts) || needs_preserve(opts) || opts.block_size != 1_000_000
}

fn needs_common(opts: &ExiOptions) -> bool {
    opts.compression || opts.fragment || opts.schema_id.is_some()
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes the options document (Spec 5.4, Appendix C).
pub fn encode(writer: &mut BitWriter, opts: &ExiOptions) -> Result<()> {
    opts.validate()?;

    // SD implizit; DocContent: SE(header)=0, SE(*)=1 → 1 Bit
    n_bit_unsigned_integer::encode(writer, 0, 1);

    // HeaderContent: lesscommon(0), common(1), strict(2), EE(3)
    let mut seq = OrderedSeq::new(4);
    if needs_lesscommon(opts) {
        seq.write(writer, 0, false);
        encode_lesscommon(writer, opts)?;
    }
    if needs_common(opts) {
        seq.write(writer, 1, false);
        encode_common(writer, opts);
    }
    if opts.strict {
        seq.write(writer, 2, false);
        // strict ist ein leeres Element: EE implizit
    }
    seq.write_ee(writer);
    // EE(header) und ED sind implizit (einzige Productions)
    Ok(())
}

/// lesscommon: uncommon(0), preserve(1), blockSize(2), EE(3).
fn encode_lesscommon(writer: &mut BitWriter, opts: &ExiOptions) -> Result<()> {
    let mut seq = OrderedSeq::new(4);
    if needs_uncommon(opts) {
        seq.write(writer, 0, false);
        encode_uncommon(writer, opts)?;
    }
    if needs_preserve(opts) {
        seq.write(writer, 1, false);
        encode_preserve(writer, opts);
    }
    if opts.block_size != 1_000_000 {
        seq.write(writer, 2, false);
        unsigned_integer::encode(writer, u64::from(opts.block_size));
    }
    seq.write_ee(writer);
    Ok(())
}

/// uncommon: alignment(0), selfContained(1), valueMaxLength(2),
/// valuePartitionCapacity(3), datatypeRepresentationMap(4, wiederholbar),
/// EE(5).
fn encode_uncommon(writer: &mut BitWriter, opts: &ExiOptions) -> Result<()> {
    let mut seq = OrderedSeq::new(6);
    if opts.alignment != Alignment::BitPacked {
        seq.write(writer, 0, false);
        // alignment-Content: choice byte(0) | pre-compress(1), 1 Bit
        let code = match opts.alignment {
            Alignment::ByteAlignment => 0,
            Alignment::PreCompression => 1,
            Alignment::BitPacked => unreachable!("default alignment is not encoded"),
        };
        n_bit_unsigned_integer::encode(writer, code, 1);
    }
    if opts.self_contained {
        seq.write(writer, 1, false);
        // leeres Element: EE implizit
    }
    if let Some(len) = opts.value_max_length {
        seq.write(writer, 2, false);
        unsigned_integer::encode(writer, u64::from(len));
    }
    if let Some(cap) = opts.value_partition_capacity {
        seq.write(writer, 3, false);
        unsigned_integer::encode(writer, u64::from(cap));
    }
    if !opts.datatype_representation_map.is_empty() {
        let mut table = DtrmStringTable::new();
        for entry in &opts.datatype_representation_map {
            seq.write(writer, 4, true);
            table.encode_qname(writer, &entry.type_qname);
            table.encode_qname(writer, &entry.representation_qname);
        }
    }
    seq.write_ee(writer);
    Ok(())
}

/// preserve: dtd(0), prefixes(1), lexicalValues(2), comments(3), pis(4), EE(5).
fn encode_preserve(writer: &mut BitWriter, opts: &ExiOptions) {
    let mut seq = OrderedSeq::new(6);
    let p = &opts.preserve;
    if p.dtd {
        seq.write(writer, 0, false);
    }
    if p.prefixes {
        seq.write(writer, 1, false);
    }
    if p.lexical_values {
        seq.write(writer, 2, false);
    }
    if p.comments {
        seq.write(writer, 3, false);
    }
    if p.pis {
        seq.write(writer, 4, false);
    }
    seq.write_ee(writer);
}

/// common: compression(0), fragment(1), schemaId(2), EE(3).
fn encode_common(writer: &mut BitWriter, opts: &ExiOptions) {
    let mut seq = OrderedSeq::new(4);
    if opts.compression {
        seq.write(writer, 0, false);
    }
    if opts.fragment {
        seq.write(writer, 1, false);
    }
    if let Some(ref id) = opts.schema_id {
        seq.write(writer, 2, false);
        encode_schema_id(writer, id);
    }
    seq.write_ee(writer);
}

/// schemaId-Content (nillable string):
/// - CH = `0` → String-Value (Länge+2, Spec 7.3.3)
/// - AT(xsi:nil) = `10` → Boolean, dann CH(0)/EE(1)
/// - EE = `11` → leeres Element (BuiltinOnly)
fn encode_schema_id(writer: &mut BitWriter, id: &SchemaId) {
    match id {
        SchemaId::Id(s) => {
            n_bit_unsigned_integer::encode(writer, 0, 1); // CH
            string::encode_with_length_offset(writer, s, 2);
        }
        SchemaId::BuiltinOnly => {
            n_bit_unsigned_integer::encode(writer, 1, 1); // nicht CH
            n_bit_unsigned_integer::encode(writer, 1, 1); // EE
        }
        SchemaId::None => {
            n_bit_unsigned_integer::encode(writer, 1, 1); // nicht CH
            n_bit_unsigned_integer::encode(writer, 0, 1); // AT(xsi:nil)
            boolean::encode(writer, true);
            n_bit_unsigned_integer::encode(writer, 1, 1); // EE
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes the options document (Spec 5.4, Appendix C).
///
/// # Errors
///
/// - [`Error::InvalidExiInput`] für Codes außerhalb der Grammatik
/// - [`Error::HeaderOptionsMismatch`] wenn die decodierte Kombination die
///   Ausschlussregeln verletzt (via `validate`)
pub fn decode(reader: &mut BitReader) -> Result<ExiOptions> {
    let mut opts = ExiOptions::default();

    // DocContent: SE(header)=0, SE(*)=1
    if n_bit_unsigned_integer::decode(reader, 1)? != 0 {
        return Err(Error::invalid_input("expected header element in options"));
    }

    let mut seq = OrderedSeq::new(4);
    loop {
        let ordinal = seq.read(reader)?;
        seq.advance(ordinal, false);
        match ordinal {
            0 => decode_lesscommon(reader, &mut opts)?,
            1 => decode_common(reader, &mut opts)?,
            2 => opts.strict = true,
            _ => break, // EE
        }
    }

    opts.validate()?;
    Ok(opts)
}

fn decode_lesscommon(reader: &mut BitReader, opts: &mut ExiOptions) -> Result<()> {
    let mut seq = OrderedSeq::new(4);
    loop {
        let ordinal = seq.read(reader)?;
        seq.advance(ordinal, false);
        match ordinal {
            0 => decode_uncommon(reader, opts)?,
            1 => decode_preserve(reader, opts)?,
            2 => opts.block_size = decode_u32(reader)?,
            _ => return Ok(()), // EE
        }
    }
}

fn decode_uncommon(reader: &mut BitReader, opts: &mut ExiOptions) -> Result<()> {
    let mut seq = OrderedSeq::new(6);
    let mut dtrm_table: Option<DtrmStringTable> = None;
    loop {
        let ordinal = seq.read(reader)?;
        seq.advance(ordinal, ordinal == 4);
        match ordinal {
            0 => {
                opts.alignment = match n_bit_unsigned_integer::decode(reader, 1)? {
                    0 => Alignment::ByteAlignment,
                    _ => Alignment::PreCompression,
                };
            }
            1 => opts.self_contained = true,
            2 => opts.value_max_length = Some(decode_u32(reader)?),
            3 => opts.value_partition_capacity = Some(decode_u32(reader)?),
            4 => {
                let table = dtrm_table.get_or_insert_with(DtrmStringTable::new);
                let type_qname = table.decode_qname(reader)?;
                let representation_qname = table.decode_qname(reader)?;
                opts.datatype_representation_map.push(DtrmEntry {
                    type_qname,
                    representation_qname,
                });
            }
            _ => return Ok(()), // EE
        }
    }
}

fn decode_preserve(reader: &mut BitReader, opts: &mut ExiOptions) -> Result<()> {
    let mut seq = OrderedSeq::new(6);
    loop {
        let ordinal = seq.read(reader)?;
        seq.advance(ordinal, false);
        match ordinal {
            0 => opts.preserve.dtd = true,
            1 => opts.preserve.prefixes = true,
            2 => opts.preserve.lexical_values = true,
            3 => opts.preserve.comments = true,
            4 => opts.preserve.pis = true,
            _ => return Ok(()), // EE
        }
    }
}

fn decode_common(reader: &mut BitReader, opts: &mut ExiOptions) -> Result<()> {
    let mut seq = OrderedSeq::new(4);
    loop {
        let ordinal = seq.read(reader)?;
        seq.advance(ordinal, false);
        match ordinal {
            0 => opts.compression = true,
            1 => opts.fragment = true,
            2 => opts.schema_id = Some(decode_schema_id(reader)?),
            _ => return Ok(()), // EE
        }
    }
}

fn decode_schema_id(reader: &mut BitReader) -> Result<SchemaId> {
    if n_bit_unsigned_integer::decode(reader, 1)? == 0 {
        // CH: String-Value (Länge+2)
        let indicator = unsigned_integer::decode(reader)?;
        if indicator < 2 {
            return Err(Error::invalid_input("schemaId value must be a literal"));
        }
        let len = usize::try_from(indicator - 2)
            .map_err(|_| Error::invalid_input("schemaId length overflow"))?;
        if len > MAX_SCHEMA_ID_LENGTH {
            return Err(Error::invalid_input("schemaId length exceeds limit"));
        }
        let s = string::decode_chars(reader, len)?;
        // Leerer String heißt: nur Built-in-Typen (Spec 5.4)
        if s.is_empty() {
            return Ok(SchemaId::BuiltinOnly);
        }
        return Ok(SchemaId::Id(s));
    }
    // AT(xsi:nil) = 0 | EE = 1
    if n_bit_unsigned_integer::decode(reader, 1)? == 1 {
        return Ok(SchemaId::BuiltinOnly);
    }
    let nil = boolean::decode(reader)?;
    // AfterNilAttr: CH(0) | EE(1)
    if n_bit_unsigned_integer::decode(reader, 1)? == 1 {
        if nil {
            Ok(SchemaId::None)
        } else {
            Ok(SchemaId::BuiltinOnly)
        }
    } else {
        if nil {
            return Err(Error::invalid_input("schemaId content after xsi:nil"));
        }
        let indicator = unsigned_integer::decode(reader)?;
        if indicator < 2 {
            return Err(Error::invalid_input("schemaId value must be a literal"));
        }
        let len = usize::try_from(indicator - 2)
            .map_err(|_| Error::invalid_input("schemaId length overflow"))?;
        let s = string::decode_chars(reader, len)?;
        Ok(SchemaId::Id(s))
    }
}

fn decode_u32(reader: &mut BitReader) -> Result<u32> {
    let v = unsigned_integer::decode(reader)?;
    u32::try_from(v).map_err(|_| Error::invalid_input("unsignedInt exceeds u32 range"))
}
