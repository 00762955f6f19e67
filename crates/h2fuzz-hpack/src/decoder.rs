use crate::error::{HpackError, Result};
use crate::field::{HeaderField, IndexingType, PrefixType};
use crate::primitives::{decode_integer, decode_string};
use crate::table::DynamicTable;

/// One decoded header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBlock {
    /// Leading dynamic table size updates, in wire order.
    pub size_updates: Vec<u32>,
    pub fields: Vec<HeaderField>,
}

/// Stream-wide HPACK decoder. Feed it every header block of a stream in wire
/// order.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    table: DynamicTable,
}

impl Decoder {
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

    /// Decode a complete header block, recording the prefix and indexing of
    /// every field.
    pub fn decode(&mut self, src: &[u8]) -> Result<DecodedBlock> {
        let mut block = DecodedBlock::default();
        let mut pos = 0;

        while pos < src.len() {
            let rest = &src[pos..];
            let prefix = PrefixType::from_first_byte(rest[0]);
            let (index, mut used) = decode_integer(rest, prefix.prefix_bits())?;

            match prefix {
                PrefixType::TableSizeUpdate => {
                    if !block.fields.is_empty() {
                        return Err(HpackError::SizeUpdateAfterField);
                    }
                    self.table.update_limit(index)?;
                    tracing::trace!(limit = index, "dynamic table size update");
                    block.size_updates.push(index as u32);
                }
                PrefixType::IndexedHeader => {
                    let (name, value) = self.lookup(index)?;
                    let field = HeaderField::indexed(name, value).with_wire_index(index as usize);
                    block.fields.push(field);
                }
                _ => {
                    let (name, indexing) = if index == 0 {
                        let (name, n) = decode_string(&rest[used..])?;
                        used += n;
                        (name.to_vec(), IndexingType::None)
                    } else {
                        (self.lookup(index)?.0, IndexingType::Name)
                    };
                    let (value, n) = decode_string(&rest[used..])?;
                    used += n;
                    let mut field = HeaderField::new(name, value, prefix, indexing);
                    if indexing == IndexingType::Name {
                        field.wire_index = Some(index as usize);
                    }
                    self.table.observe(&field);
                    block.fields.push(field);
                }
            }
            pos += used;
        }

        Ok(block)
    }

    fn lookup(&self, index: u64) -> Result<(Vec<u8>, Vec<u8>)> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.table.get(i))
            .map(|(n, v)| (n.to_vec(), v.to_vec()))
            .ok_or(HpackError::InvalidIndex(index))
    }
}
