//! QName- und NS-Encoding mit String-Tabelle (Spec 7.1.7, 7.3.2, 7.3.3).

use crate::encoder::Encoder;
use crate::event::NsContent;
use crate::qname::QName;
use crate::{string, unsigned_integer, Result};

impl Encoder {
    /// Encodiert einen vollständigen QName: URI → LocalName → Prefix.
    ///
    /// Breiten werden VOR der jeweiligen Tabellen-Mutation berechnet —
    /// der Decoder sieht beim Lesen denselben Stand.
    pub(crate) fn encode_qname(&mut self, q: &QName) -> Result<(u32, u32)> {
        let uri_id = self.encode_uri(&q.uri);
        let local_id = self.encode_local_name(uri_id, &q.local_name);
        self.encode_qname_prefix_only(uri_id, q)?;
        Ok((uri_id as u32, local_id as u32))
    }

    /// URI-Partition (Spec 7.3.2): Hit → n-bit(i+1); Miss → n-bit(0) + Literal.
    pub(crate) fn encode_uri(&mut self, uri: &str) -> usize {
        let bits = self.table.uri_bits();
        match self.table.lookup_uri(uri) {
            Some(id) => {
                self.write_n_bits((id + 1) as u64, bits);
                id
            }
            None => {
                self.write_n_bits(0, bits);
                string::encode(&mut self.writer, uri);
                self.table.add_uri(uri)
            }
        }
    }

    /// Local-Name-Partition (Spec 7.3.3): Hit → Varint 0 + n-bit Compact-ID;
    /// Miss → Literal mit Länge+1.
    fn encode_local_name(&mut self, uri_id: usize, local_name: &str) -> usize {
        match self.table.lookup_local_name(uri_id, local_name) {
            Some(id) => {
                unsigned_integer::encode(&mut self.writer, 0);
                let bits = self.table.local_name_bits(uri_id);
                self.write_n_bits(id as u64, bits);
                id
            }
            None => {
                string::encode_with_length_offset(&mut self.writer, local_name, 1);
                self.table.add_local_name(uri_id, local_name)
            }
        }
    }

    /// QName-Prefix (Spec 7.1.7): reine Compact-ID ohne Miss-Option.
    ///
    /// Elided wenn `Preserve.prefixes` aus ist oder die Partition leer ist.
    /// Ein noch nicht deklarierter Prefix fällt auf Eintrag 0 zurück — das
    /// nachfolgende NS-Event mit `local_element_ns` trägt dann die gültige
    /// Bindung (Spec 4, Table 4-2).
    pub(crate) fn encode_qname_prefix_only(&mut self, uri_id: usize, q: &QName) -> Result<()> {
        if !self.options.preserve.prefixes {
            return Ok(());
        }
        let count = self.table.prefix_count(uri_id);
        if count == 0 {
            return Ok(());
        }
        let prefix = q.prefix.as_deref().unwrap_or("");
        let id = self.table.lookup_prefix(uri_id, prefix).unwrap_or(0);
        let bits = self.table.prefix_bits(uri_id);
        self.write_n_bits(id as u64, bits);
        Ok(())
    }

    /// NS-Event-Content (Table 4-2): URI, Prefix MIT Miss-Option,
    /// local-element-ns-Flag.
    pub(crate) fn encode_ns_content(&mut self, ns: &NsContent) -> Result<()> {
        let uri_id = self.encode_uri(&ns.uri);

        let bits = self.table.prefix_bits_with_miss(uri_id);
        match self.table.lookup_prefix(uri_id, &ns.prefix) {
            Some(id) => self.write_n_bits((id + 1) as u64, bits),
            None => {
                self.write_n_bits(0, bits);
                string::encode(&mut self.writer, &ns.prefix);
                self.table.add_prefix(uri_id, &ns.prefix);
            }
        }

        self.write_n_bits(u64::from(ns.local_element_ns), 1);
        Ok(())
    }
}
