//! Value-Decoding mit String-Tabelle (Spec 7.3.3).

use std::rc::Rc;

use crate::decoder::Decoder;
use crate::{string, unsigned_integer, Error, Result};

impl<'a> Decoder<'a> {
    /// Decodiert einen AT/CH-Wert gegen die (URI, LocalName)-Partition.
    ///
    /// Format (Spec 7.3.3):
    /// - 0 → lokaler Hit, n-Bit Compact-ID
    /// - 1 → globaler Hit, m-Bit Compact-ID
    /// - n ≥ 2 → Miss, String mit `n − 2` Zeichen; anschließend Aufnahme in
    ///   beide Partitionen (modulo `valueMaxLength`/`valuePartitionCapacity`)
    pub(crate) fn decode_value(&mut self, uri: u32, local: u32) -> Result<Rc<str>> {
        let indicator = unsigned_integer::decode(&mut self.reader)?;
        match indicator {
            0 => {
                let bits = self.table.local_value_bits(uri as usize, local as usize);
                let id = self.read_n_bits(bits)? as usize;
                self.table
                    .get_local_value(uri as usize, local as usize, id)
                    .ok_or_else(|| Error::invalid_input("local value compact id out of range"))
            }
            1 => {
                let bits = self.table.global_value_bits();
                let id = self.read_n_bits(bits)? as usize;
                self.table
                    .get_global_value(id)
                    .ok_or_else(|| Error::invalid_input("global value compact id out of range"))
            }
            n => {
                let len = usize::try_from(n - 2)
                    .map_err(|_| Error::invalid_input("value length overflow"))?;
                let value = string::decode_chars(&mut self.reader, len)?;
                self.table.add_value(uri as usize, local as usize, &value);
                Ok(value.into())
            }
        }
    }
}
