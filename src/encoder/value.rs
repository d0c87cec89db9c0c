//! Value-Encoding mit String-Tabelle (Spec 7.3.3).

use crate::encoder::Encoder;
use crate::string_table::ValueLookup;
use crate::{string, unsigned_integer, Result};

impl Encoder {
    /// Encodiert einen AT/CH-Wert gegen die (URI, LocalName)-Partition.
    ///
    /// Pfade in Reihenfolge (Spec 7.3.3):
    /// 1. lokaler Hit → Varint 0 + n-Bit Compact-ID
    /// 2. globaler Hit → Varint 1 + m-Bit Compact-ID
    /// 3. Miss → Länge+2 als Varint, dann die Zeichen; der Wert wandert in
    ///    beide Partitionen (modulo `valueMaxLength`/`valuePartitionCapacity`)
    pub(crate) fn encode_value(&mut self, uri: u32, local: u32, value: &str) -> Result<()> {
        match self.table.lookup_value(uri as usize, local as usize, value) {
            ValueLookup::LocalHit(id) => {
                unsigned_integer::encode(&mut self.writer, 0);
                let bits = self.table.local_value_bits(uri as usize, local as usize);
                self.write_n_bits(id as u64, bits);
            }
            ValueLookup::GlobalHit(id) => {
                unsigned_integer::encode(&mut self.writer, 1);
                let bits = self.table.global_value_bits();
                self.write_n_bits(id as u64, bits);
            }
            ValueLookup::Miss => {
                string::encode_with_length_offset(&mut self.writer, value, 2);
                self.table.add_value(uri as usize, local as usize, value);
            }
        }
        Ok(())
    }
}
