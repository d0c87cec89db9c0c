//! QName- und NS-Decoding mit String-Tabelle (Spec 7.1.7, 7.3.2, 7.3.3).

use std::rc::Rc;

use crate::decoder::{Decoder, PendingNs};
use crate::qname::QName;
use crate::{string, unsigned_integer, Error, Result};

impl<'a> Decoder<'a> {
    /// Decodiert einen QName: URI → LocalName → Prefix (Spec 7.1.7).
    ///
    /// Misses werden interniert; die IDs kommen für Grammar-Learning und
    /// Value-Partitionen zurück.
    pub(crate) fn decode_qname(&mut self) -> Result<(QName, u32, u32)> {
        let (uri, uri_id) = self.decode_uri()?;
        let (local_name, local_id) = self.decode_local_name(uri_id)?;
        let prefix = self.decode_qname_prefix(uri_id)?;
        Ok((
            QName::with_optional_prefix(uri, local_name, prefix),
            uri_id as u32,
            local_id as u32,
        ))
    }

    /// QName eines gelernten SE/AT: Strings aus der Tabelle, nur der
    /// Prefix steht ggf. im Stream (Spec 8.4.3).
    pub(crate) fn known_qname(&mut self, uri_id: u32, local_id: u32) -> Result<QName> {
        let uri = self
            .table
            .get_uri_rc(uri_id as usize)
            .ok_or_else(|| Error::proc_state("interned uri", "missing id"))?;
        let local = self
            .table
            .get_local_name_rc(uri_id as usize, local_id as usize)
            .ok_or_else(|| Error::proc_state("interned local name", "missing id"))?;
        let prefix = self.decode_qname_prefix(uri_id as usize)?;
        Ok(QName::with_optional_prefix(uri, local, prefix))
    }

    /// URI-Partition (Spec 7.3.2): 0 = Miss + Literal, i+1 = Hit.
    pub(crate) fn decode_uri(&mut self) -> Result<(Rc<str>, usize)> {
        let count = self.table.uri_count();
        let index = self.read_n_bits(self.table.uri_bits())? as usize;
        if index == 0 {
            let uri = string::decode(&mut self.reader)?;
            let uri_id = self.table.add_uri(&uri);
            Ok((uri.into(), uri_id))
        } else if index > count {
            Err(Error::invalid_input("uri compact id out of range"))
        } else {
            let id = index - 1;
            let uri = self
                .table
                .get_uri_rc(id)
                .ok_or_else(|| Error::invalid_input("uri compact id out of range"))?;
            Ok((uri, id))
        }
    }

    /// Local-Name-Partition (Spec 7.3.3): 0 = Hit + Compact-ID,
    /// Länge+1 = Miss + Zeichen.
    fn decode_local_name(&mut self, uri_id: usize) -> Result<(Rc<str>, usize)> {
        let hit_or_len = unsigned_integer::decode(&mut self.reader)?;
        if hit_or_len == 0 {
            let id = self.read_n_bits(self.table.local_name_bits(uri_id))? as usize;
            let name = self
                .table
                .get_local_name_rc(uri_id, id)
                .ok_or_else(|| Error::invalid_input("local-name compact id out of range"))?;
            Ok((name, id))
        } else {
            let len = usize::try_from(hit_or_len - 1)
                .map_err(|_| Error::invalid_input("local-name length overflow"))?;
            let name = string::decode_chars(&mut self.reader, len)?;
            let id = self.table.add_local_name(uri_id, &name);
            Ok((name.into(), id))
        }
    }

    /// QName-Prefix (Spec 7.1.7): reine Compact-ID ohne Miss; elided wenn
    /// `Preserve.prefixes` aus ist oder die Partition leer ist.
    fn decode_qname_prefix(&mut self, uri_id: usize) -> Result<Option<Rc<str>>> {
        if !self.options.preserve.prefixes {
            return Ok(None);
        }
        let count = self.table.prefix_count(uri_id);
        if count == 0 {
            return Ok(None);
        }
        let id = self.read_n_bits(self.table.prefix_bits(uri_id))? as usize;
        let prefix = self
            .table
            .get_prefix_rc(uri_id, id)
            .ok_or_else(|| Error::invalid_input("prefix compact id out of range"))?;
        Ok(Some(prefix))
    }

    /// NS-Event-Content (Table 4-2): URI, Prefix MIT Miss-Option,
    /// local-element-ns-Flag.
    pub(crate) fn decode_ns_content(&mut self) -> Result<PendingNs> {
        let (uri, uri_id) = self.decode_uri()?;

        let count = self.table.prefix_count(uri_id);
        let index = self.read_n_bits(self.table.prefix_bits_with_miss(uri_id))? as usize;
        let prefix: Rc<str> = if index == 0 {
            let prefix = string::decode(&mut self.reader)?;
            self.table.add_prefix(uri_id, &prefix);
            prefix.into()
        } else if index > count {
            return Err(Error::invalid_input("ns prefix compact id out of range"));
        } else {
            self.table
                .get_prefix_rc(uri_id, index - 1)
                .ok_or_else(|| Error::invalid_input("ns prefix compact id out of range"))?
        };

        let local_element_ns = self.read_n_bits(1)? != 0;
        Ok(PendingNs {
            uri,
            prefix,
            local_element_ns,
        })
    }
}
