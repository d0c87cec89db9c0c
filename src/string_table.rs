//! String table (Spec 7.3, Appendix D).
//!
//! EXI vergibt "compact identifiers" für Strings in Partitionen: URI,
//! Prefix (pro URI), Local-Name (pro URI), lokale Values (pro
//! (URI, LocalName)) und globale Values. Encoder und Decoder führen
//! dieselbe Tabelle im Gleichschritt; eine Tabelle gehört zu genau einem
//! Stream und ist nicht wiederverwendbar.
//!
//! Bit-Breiten werden in Zählern gecacht und wachsen um genau ein Bit,
//! wenn die Elementanzahl eine Zweierpotenz überschreitet. Bei endlicher
//! `valuePartitionCapacity` wird die globale Value-Partition zum
//! FIFO-Ring: neue Einträge verdrängen den ältesten Slot, auch aus dessen
//! lokaler Partition.

use std::rc::Rc;

use crate::bit_width;
use crate::options::ExiOptions;
use crate::FastHashMap;

/// Well-known URIs (Spec Table D-1, D-2).
pub const URI_XML: &str = "http://www.w3.org/XML/1998/namespace";
/// XSI namespace (xsi:nil / xsi:type).
pub const URI_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// XSD namespace; nur bei deklarierter Schema-ID vorbesetzt (Table D-2).
pub const URI_XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// Table D-5: die 46 XSD-Built-in-Typnamen, alphabetisch.
const XSD_BUILTIN_TYPES: [&str; 46] = [
    "ENTITIES",
    "ENTITY",
    "ID",
    "IDREF",
    "IDREFS",
    "NCName",
    "NMTOKEN",
    "NMTOKENS",
    "NOTATION",
    "Name",
    "QName",
    "anySimpleType",
    "anyType",
    "anyURI",
    "base64Binary",
    "boolean",
    "byte",
    "date",
    "dateTime",
    "decimal",
    "double",
    "duration",
    "float",
    "gDay",
    "gMonth",
    "gMonthDay",
    "gYear",
    "gYearMonth",
    "hexBinary",
    "int",
    "integer",
    "language",
    "long",
    "negativeInteger",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "normalizedString",
    "positiveInteger",
    "short",
    "string",
    "time",
    "token",
    "unsignedByte",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
];

/// Zähler mit gecachter Bit-Breite (Spec 7.3.2).
///
/// `bits_exact` ist ⌈log₂(count)⌉ (String-Literal-Partitionen),
/// `bits_plus_one` ist ⌈log₂(count+1)⌉ (Compact-ID-Partitionen mit
/// Miss-Escape). Beide wachsen monoton um je ein Bit pro
/// Zweierpotenz-Übergang.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactIdCounter {
    count: u32,
    bits_exact: u8,
    bits_plus_one: u8,
}

impl CompactIdCounter {
    fn with_count(count: u32) -> Self {
        Self {
            count,
            bits_exact: bit_width::for_count_u32(count),
            bits_plus_one: bit_width::for_count_u32(count + 1),
        }
    }

    #[inline]
    fn grow(&mut self) {
        self.count += 1;
        // Nachziehen statt Neuberechnen: genau ein Bit pro Überschreitung
        if bit_width::for_count_u32(self.count) > self.bits_exact {
            self.bits_exact += 1;
        }
        if bit_width::for_count_u32(self.count + 1) > self.bits_plus_one {
            self.bits_plus_one += 1;
        }
    }

    /// Aktuelle Elementanzahl.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// ⌈log₂(count)⌉ — Breite für Hit-IDs ohne Escape.
    pub fn bits(&self) -> u8 {
        self.bits_exact
    }

    /// ⌈log₂(count+1)⌉ — Breite für Compact-IDs mit Miss-Escape.
    pub fn bits_plus_one(&self) -> u8 {
        self.bits_plus_one
    }
}

/// Ein Local-Name mit seiner lokalen Value-Partition (Spec 7.3.1).
#[derive(Debug)]
struct LocalNameEntry {
    name: Rc<str>,
    /// Lokale Values; Löcher entstehen durch globale Eviction.
    values: Vec<Option<Rc<str>>>,
    /// Vergebene lokale IDs (wächst monoton, zählt Löcher mit).
    value_ids: CompactIdCounter,
}

impl LocalNameEntry {
    fn new(name: Rc<str>) -> Self {
        Self {
            name,
            values: Vec::new(),
            value_ids: CompactIdCounter::default(),
        }
    }
}

/// Eine URI mit ihren Prefix- und Local-Name-Partitionen.
///
/// Die drei Partitionen sind hier strukturell aneinander gebunden; die
/// Invariante |URI| == |Prefix| == |LocalName| gilt damit per Konstruktion.
#[derive(Debug)]
struct UriEntry {
    name: Rc<str>,
    prefixes: Vec<Rc<str>>,
    local_names: Vec<LocalNameEntry>,
    local_name_lookup: FastHashMap<Rc<str>, usize>,
    local_name_ids: CompactIdCounter,
}

impl UriEntry {
    fn new(name: Rc<str>) -> Self {
        Self {
            name,
            prefixes: Vec::new(),
            local_names: Vec::new(),
            local_name_lookup: FastHashMap::default(),
            local_name_ids: CompactIdCounter::default(),
        }
    }

    fn with_seed(name: &str, prefixes: &[&str], local_names: &[&str]) -> Self {
        let mut entry = Self::new(Rc::from(name));
        for p in prefixes {
            entry.prefixes.push(Rc::from(*p));
        }
        for ln in local_names {
            entry.push_local_name(Rc::from(*ln));
        }
        entry
    }

    fn push_local_name(&mut self, name: Rc<str>) -> usize {
        let id = self.local_names.len();
        self.local_name_lookup.insert(Rc::clone(&name), id);
        self.local_names.push(LocalNameEntry::new(name));
        self.local_name_ids.grow();
        id
    }
}

/// Rückverweis eines globalen Value-Slots in seine lokale Partition.
#[derive(Clone, Copy, Debug)]
struct GlobalSlotOrigin {
    uri_id: usize,
    local_id: usize,
    local_value_id: usize,
}

/// Encoder-seitiger Value-Index: String → Fundort.
#[derive(Clone, Copy, Debug)]
struct ValueInfo {
    uri_id: usize,
    local_id: usize,
    local_value_id: usize,
    global_id: usize,
}

/// Ergebnis eines Value-Lookups beim Encoden (Spec 7.3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueLookup {
    /// In der lokalen (URI, LocalName)-Partition gefunden.
    LocalHit(usize),
    /// In der globalen Partition gefunden.
    GlobalHit(usize),
    /// Nicht gefunden; der String läuft als Literal und wird danach
    /// (modulo Optionen) mit `add_value` aufgenommen.
    Miss,
}

/// String table (Spec 7.3).
#[derive(Debug)]
pub struct StringTable {
    uris: Vec<UriEntry>,
    uri_lookup: FastHashMap<Rc<str>, usize>,
    uri_ids: CompactIdCounter,

    /// Globale Value-Partition; bounded als Ring mit Slot-Rückverweisen.
    global_values: Vec<Option<Rc<str>>>,
    global_origins: Vec<Option<GlobalSlotOrigin>>,
    global_ids: CompactIdCounter,
    /// Nächster globaler Slot (modulo capacity bei bounded Partitionen).
    next_global_slot: usize,

    /// String → Fundort, nur für den Encoder gepflegt.
    value_lookup: FastHashMap<Rc<str>, ValueInfo>,
    /// Decode-only: `value_lookup` bleibt leer (Decoder braucht nur ID→String).
    decode_only: bool,

    value_max_length: Option<usize>,
    value_partition_capacity: Option<usize>,
}

impl StringTable {
    /// Schema-less Tabelle mit Pre-Population nach Appendix D.
    pub fn new() -> Self {
        Self::with_options(None, None, false)
    }

    /// Tabelle gemäß den EXI-Options des Streams.
    ///
    /// Eine deklarierte Schema-ID besetzt zusätzlich die XSD-Partitionen vor
    /// (Table D-2, D-5); die Grammatiken bleiben built-in.
    pub fn from_options(opts: &ExiOptions) -> Self {
        Self::with_options(
            opts.value_max_length.map(|v| v as usize),
            opts.value_partition_capacity.map(|v| v as usize),
            opts.schema_id.is_some(),
        )
    }

    /// Tabelle mit expliziten Value-Limits (Spec 7.3.3) und optionaler
    /// XSD-Vorbesetzung.
    pub fn with_options(
        value_max_length: Option<usize>,
        value_partition_capacity: Option<usize>,
        seed_xsd: bool,
    ) -> Self {
        // Spec D.1–D.3: "", XML und XSI sind IMMER vorbesetzt
        let mut uris = vec![
            UriEntry::with_seed("", &[""], &[]),
            UriEntry::with_seed(URI_XML, &["xml"], &["base", "id", "lang", "space"]),
            UriEntry::with_seed(URI_XSI, &["xsi"], &["nil", "type"]),
        ];
        if seed_xsd {
            uris.push(UriEntry::with_seed(URI_XSD, &[], &XSD_BUILTIN_TYPES));
        }

        let mut uri_lookup = FastHashMap::default();
        for (id, entry) in uris.iter().enumerate() {
            uri_lookup.insert(Rc::clone(&entry.name), id);
        }
        let uri_ids = CompactIdCounter::with_count(uris.len() as u32);

        Self {
            uris,
            uri_lookup,
            uri_ids,
            global_values: Vec::new(),
            global_origins: Vec::new(),
            global_ids: CompactIdCounter::default(),
            next_global_slot: 0,
            value_lookup: FastHashMap::default(),
            decode_only: false,
            value_max_length,
            value_partition_capacity,
        }
    }

    /// Decode-only: spart den String→ID-Index (der Decoder liest nur ID→String).
    pub fn set_decode_only(&mut self, decode_only: bool) {
        self.decode_only = decode_only;
        if decode_only {
            self.value_lookup = FastHashMap::default();
        }
    }

    // === URI partition (Spec 7.3.2) ===

    /// Anzahl URIs.
    pub fn uri_count(&self) -> usize {
        self.uris.len()
    }

    /// Breite einer URI-Compact-ID: ⌈log₂(count+1)⌉ (0 = Miss-Escape).
    pub fn uri_bits(&self) -> u8 {
        self.uri_ids.bits_plus_one()
    }

    /// URI → Compact-ID.
    pub fn lookup_uri(&self, uri: &str) -> Option<usize> {
        self.uri_lookup.get(uri).copied()
    }

    /// Fügt eine URI hinzu (idempotent) und gibt ihre ID zurück.
    pub fn add_uri(&mut self, uri: &str) -> usize {
        if let Some(&id) = self.uri_lookup.get(uri) {
            return id;
        }
        let id = self.uris.len();
        let entry = UriEntry::new(Rc::from(uri));
        self.uri_lookup.insert(Rc::clone(&entry.name), id);
        self.uris.push(entry);
        self.uri_ids.grow();
        id
    }

    /// URI zu einer Compact-ID.
    pub fn get_uri(&self, id: usize) -> Option<&str> {
        self.uris.get(id).map(|e| &*e.name)
    }

    /// Wie [`get_uri`](Self::get_uri), als `Rc<str>`.
    pub fn get_uri_rc(&self, id: usize) -> Option<Rc<str>> {
        self.uris.get(id).map(|e| Rc::clone(&e.name))
    }

    // === Prefix partitions (Spec 7.3.2, D.2) ===

    /// Anzahl Prefixe der URI.
    pub fn prefix_count(&self, uri_id: usize) -> usize {
        self.uris.get(uri_id).map_or(0, |e| e.prefixes.len())
    }

    /// Breite einer Prefix-Hit-ID im QName-Kontext: ⌈log₂(count)⌉.
    pub fn prefix_bits(&self, uri_id: usize) -> u8 {
        bit_width::for_count(self.prefix_count(uri_id))
    }

    /// Breite einer Prefix-Compact-ID im NS-Kontext: ⌈log₂(count+1)⌉.
    pub fn prefix_bits_with_miss(&self, uri_id: usize) -> u8 {
        bit_width::for_count(self.prefix_count(uri_id) + 1)
    }

    /// Prefix → Compact-ID innerhalb der URI-Partition.
    pub fn lookup_prefix(&self, uri_id: usize, prefix: &str) -> Option<usize> {
        self.uris
            .get(uri_id)?
            .prefixes
            .iter()
            .position(|p| &**p == prefix)
    }

    /// Fügt einen Prefix hinzu (idempotent).
    pub fn add_prefix(&mut self, uri_id: usize, prefix: &str) -> usize {
        if let Some(id) = self.lookup_prefix(uri_id, prefix) {
            return id;
        }
        let entry = &mut self.uris[uri_id];
        entry.prefixes.push(Rc::from(prefix));
        entry.prefixes.len() - 1
    }

    /// Prefix zu einer Compact-ID.
    pub fn get_prefix_rc(&self, uri_id: usize, id: usize) -> Option<Rc<str>> {
        self.uris.get(uri_id)?.prefixes.get(id).cloned()
    }

    // === Local-name partitions (Spec 7.3.3, D.3) ===

    /// Anzahl Local-Names der URI.
    pub fn local_name_count(&self, uri_id: usize) -> usize {
        self.uris.get(uri_id).map_or(0, |e| e.local_names.len())
    }

    /// Breite einer Local-Name-Hit-ID: ⌈log₂(count)⌉.
    pub fn local_name_bits(&self, uri_id: usize) -> u8 {
        self.uris.get(uri_id).map_or(0, |e| e.local_name_ids.bits())
    }

    /// Local-Name → Compact-ID.
    pub fn lookup_local_name(&self, uri_id: usize, local_name: &str) -> Option<usize> {
        self.uris
            .get(uri_id)?
            .local_name_lookup
            .get(local_name)
            .copied()
    }

    /// Fügt einen Local-Name hinzu (idempotent), mit leerer Value-Liste.
    pub fn add_local_name(&mut self, uri_id: usize, local_name: &str) -> usize {
        if let Some(id) = self.lookup_local_name(uri_id, local_name) {
            return id;
        }
        self.uris[uri_id].push_local_name(Rc::from(local_name))
    }

    /// Local-Name zu einer Compact-ID.
    pub fn get_local_name_rc(&self, uri_id: usize, id: usize) -> Option<Rc<str>> {
        self.uris
            .get(uri_id)?
            .local_names
            .get(id)
            .map(|ln| Rc::clone(&ln.name))
    }

    // === Value partitions (Spec 7.3.3) ===

    /// Größe der lokalen Value-Partition für die Breitenrechnung.
    ///
    /// Zählt vergebene IDs inklusive Eviction-Löcher — die ID-Vergabe läuft
    /// monoton weiter, damit Encoder und Decoder dieselben Breiten sehen.
    pub fn local_value_size(&self, uri_id: usize, local_id: usize) -> usize {
        self.uris
            .get(uri_id)
            .and_then(|e| e.local_names.get(local_id))
            .map_or(0, |ln| ln.value_ids.count() as usize)
    }

    /// Breite einer lokalen Value-Hit-ID: ⌈log₂(size)⌉.
    pub fn local_value_bits(&self, uri_id: usize, local_id: usize) -> u8 {
        self.uris
            .get(uri_id)
            .and_then(|e| e.local_names.get(local_id))
            .map_or(0, |ln| ln.value_ids.bits())
    }

    /// Größe der globalen Value-Partition für die Breitenrechnung.
    ///
    /// Bounded nach dem ersten Wrap: die Capacity, nicht die Belegung.
    pub fn global_value_size(&self) -> usize {
        match self.value_partition_capacity {
            Some(cap) => (self.global_ids.count() as usize).min(cap),
            None => self.global_ids.count() as usize,
        }
    }

    /// Breite einer globalen Value-Hit-ID: ⌈log₂(size)⌉.
    pub fn global_value_bits(&self) -> u8 {
        match self.value_partition_capacity {
            Some(cap) if self.global_ids.count() as usize >= cap => {
                bit_width::for_count(cap)
            }
            _ => self.global_ids.bits(),
        }
    }

    /// Lokaler Value zu einer Compact-ID (None bei Loch oder unbekannter ID).
    pub fn get_local_value(&self, uri_id: usize, local_id: usize, value_id: usize) -> Option<Rc<str>> {
        self.uris
            .get(uri_id)?
            .local_names
            .get(local_id)?
            .values
            .get(value_id)?
            .clone()
    }

    /// Globaler Value zu einer Compact-ID (None bei evicted Slot).
    pub fn get_global_value(&self, global_id: usize) -> Option<Rc<str>> {
        self.global_values.get(global_id)?.clone()
    }

    /// Encoder-Lookup: Fundort eines Werts unter dem aktuellen QName.
    pub fn lookup_value(&self, uri_id: usize, local_id: usize, value: &str) -> ValueLookup {
        match self.value_lookup.get(value) {
            Some(info) if info.uri_id == uri_id && info.local_id == local_id => {
                ValueLookup::LocalHit(info.local_value_id)
            }
            Some(info) => ValueLookup::GlobalHit(info.global_id),
            None => ValueLookup::Miss,
        }
    }

    /// Ob ein Wert gemäß Optionen nicht in die Tabellen aufgenommen wird.
    fn skips_value(&self, value: &str) -> bool {
        if self.value_partition_capacity == Some(0) || value.is_empty() {
            return true;
        }
        match self.value_max_length {
            // UTF-8: Bytes ≥ Zeichen, Längen-Check erst bei Verdacht
            Some(max) => value.len() > max && value.chars().count() > max,
            None => false,
        }
    }

    /// Nimmt einen Miss-Wert in lokale und globale Partition auf
    /// (Spec 7.3.3), unter Beachtung von `valueMaxLength` und
    /// `valuePartitionCapacity`. Encoder und Decoder rufen dies nach jedem
    /// Miss identisch auf — die Tabellen bleiben im Gleichschritt.
    pub fn add_value(&mut self, uri_id: usize, local_id: usize, value: &str) {
        if self.skips_value(value) {
            return;
        }

        let rc: Rc<str> = value.into();

        // Bounded: Ziel-Slot räumen (FIFO-Eviction)
        let global_id = self.next_global_slot;
        if self.value_partition_capacity.is_some() {
            self.evict_global_slot(global_id);
        }

        // Lokale Partition: nächste monotone ID
        let entry = &mut self.uris[uri_id].local_names[local_id];
        let local_value_id = entry.value_ids.count() as usize;
        entry.values.push(Some(Rc::clone(&rc)));
        entry.value_ids.grow();

        // Globale Partition
        let origin = GlobalSlotOrigin {
            uri_id,
            local_id,
            local_value_id,
        };
        if global_id < self.global_values.len() {
            self.global_values[global_id] = Some(Rc::clone(&rc));
            self.global_origins[global_id] = Some(origin);
        } else {
            self.global_values.push(Some(Rc::clone(&rc)));
            self.global_origins.push(Some(origin));
        }
        self.global_ids.grow();
        self.next_global_slot = match self.value_partition_capacity {
            Some(cap) => (global_id + 1) % cap,
            None => global_id + 1,
        };

        if !self.decode_only {
            self.value_lookup.insert(
                rc,
                ValueInfo {
                    uri_id,
                    local_id,
                    local_value_id,
                    global_id,
                },
            );
        }
    }

    /// Räumt einen globalen Slot samt lokalem Eintrag und Lookup.
    fn evict_global_slot(&mut self, slot: usize) {
        let Some(origin) = self.global_origins.get_mut(slot).and_then(Option::take) else {
            return;
        };
        if let Some(old) = self.global_values.get_mut(slot).and_then(Option::take) {
            if !self.decode_only {
                self.value_lookup.remove(&old);
            }
        }
        if let Some(ln) = self
            .uris
            .get_mut(origin.uri_id)
            .and_then(|e| e.local_names.get_mut(origin.local_id))
        {
            if let Some(v) = ln.values.get_mut(origin.local_value_id) {
                *v = None;
            }
        }
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}
