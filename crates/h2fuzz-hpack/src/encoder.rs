use bytes::BytesMut;

use crate::error::{HpackError, Result};
use crate::field::{HeaderField, IndexingType, PrefixType};
use crate::primitives::{encode_integer, encode_string};
use crate::table::DynamicTable;

/// Stream-wide HPACK encoder. One instance must see every header block of a
/// stream in wire order so that its table mirrors the peer's.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    table: DynamicTable,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_table_size(max_size: usize) -> Self {
        Self {
            table: DynamicTable::new(max_size),
        }
    }

    pub fn table(&self) -> &DynamicTable {
        &self.table
    }

    /// Encode one header block: leading size updates, then `fields` with the
    /// exact prefix and indexing each one carries. Returns the number of
    /// bytes appended to `dst`.
    ///
    /// Fails with [`HpackError::IllegalEncoding`] when a field references a
    /// table entry that is not present. Nothing is coerced.
    pub fn encode(
        &mut self,
        size_updates: &[u32],
        fields: &[HeaderField],
        dst: &mut BytesMut,
    ) -> Result<usize> {
        let start = dst.len();
        for &update in size_updates {
            self.table.update_limit(u64::from(update))?;
            let prefix = PrefixType::TableSizeUpdate;
            encode_integer(u64::from(update), prefix.prefix_bits(), prefix.opcode(), dst);
        }
        for (position, field) in fields.iter().enumerate() {
            self.encode_field(position, field, dst)?;
        }
        Ok(dst.len() - start)
    }

    /// Encode a single field and apply its table side effect.
    pub fn encode_field(
        &mut self,
        position: usize,
        field: &HeaderField,
        dst: &mut BytesMut,
    ) -> Result<()> {
        let illegal = |reason| HpackError::IllegalEncoding { position, reason };

        if field.prefix == PrefixType::TableSizeUpdate || field.indexing == IndexingType::Other {
            return Err(illegal("size update used as a header field"));
        }
        if (field.prefix == PrefixType::IndexedHeader) != (field.indexing == IndexingType::All) {
            return Err(illegal("indexed prefix and full indexing must go together"));
        }

        let bits = field.prefix.prefix_bits();
        let opcode = field.prefix.opcode();
        match field.indexing {
            IndexingType::All => {
                let index = self
                    .hinted_index(field, true)
                    .or_else(|| {
                        self.table
                            .find(&field.name, &field.value)
                            .filter(|m| m.value_matches)
                            .map(|m| m.index)
                    })
                    .ok_or_else(|| illegal("indexed pair not in table"))?;
                encode_integer(index as u64, bits, opcode, dst);
            }
            IndexingType::Name => {
                let index = self
                    .hinted_index(field, false)
                    .or_else(|| self.table.find(&field.name, &field.value).map(|m| m.index))
                    .ok_or_else(|| illegal("indexed name not in table"))?;
                encode_integer(index as u64, bits, opcode, dst);
                encode_string(&field.value, dst);
            }
            IndexingType::None | IndexingType::Other => {
                encode_integer(0, bits, opcode, dst);
                encode_string(&field.name, dst);
                encode_string(&field.value, dst);
            }
        }

        self.table.observe(field);
        Ok(())
    }

    /// The decoded index of `field`, if it still names the same entry.
    fn hinted_index(&self, field: &HeaderField, whole: bool) -> Option<usize> {
        let index = field.wire_index?;
        let (name, value) = self.table.get(index)?;
        (name == field.name.as_slice() && (!whole || value == field.value.as_slice()))
            .then_some(index)
    }
}
