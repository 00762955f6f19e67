use crate::primitives::{integer_len, string_len};
use crate::table::MAX_WIRE_INDEX;

/// HPACK representation opcode of one header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixType {
    /// `1xxxxxxx`, fully indexed.
    IndexedHeader,
    /// `01xxxxxx`, literal added to the dynamic table.
    LiteralWithIndexing,
    /// `0000xxxx`, literal not added to the table.
    LiteralWithoutIndexing,
    /// `0001xxxx`, literal that intermediaries must never index.
    LiteralNeverIndexed,
    /// `001xxxxx`, dynamic table size update.
    TableSizeUpdate,
}

impl PrefixType {
    /// Opcode bits placed above the integer prefix.
    pub fn opcode(self) -> u8 {
        match self {
            PrefixType::IndexedHeader => 0x80,
            PrefixType::LiteralWithIndexing => 0x40,
            PrefixType::LiteralWithoutIndexing => 0x00,
            PrefixType::LiteralNeverIndexed => 0x10,
            PrefixType::TableSizeUpdate => 0x20,
        }
    }

    /// Width of the integer prefix that follows the opcode.
    pub fn prefix_bits(self) -> u8 {
        match self {
            PrefixType::IndexedHeader => 7,
            PrefixType::LiteralWithIndexing => 6,
            PrefixType::TableSizeUpdate => 5,
            PrefixType::LiteralWithoutIndexing | PrefixType::LiteralNeverIndexed => 4,
        }
    }

    /// Classify the first byte of a representation.
    pub fn from_first_byte(byte: u8) -> Self {
        if byte & 0x80 != 0 {
            PrefixType::IndexedHeader
        } else if byte & 0x40 != 0 {
            PrefixType::LiteralWithIndexing
        } else if byte & 0x20 != 0 {
            PrefixType::TableSizeUpdate
        } else if byte & 0x10 != 0 {
            PrefixType::LiteralNeverIndexed
        } else {
            PrefixType::LiteralWithoutIndexing
        }
    }
}

/// Which parts of a field are taken from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexingType {
    /// Name and value are both literals.
    None,
    /// Name comes from the table, value is a literal.
    Name,
    /// Name and value come from the table.
    All,
    /// Not a header field (size updates).
    Other,
}

/// One header field together with the encoding chosen for it.
///
/// Equality and hashing ignore `wire_index`.
#[derive(Debug, Clone)]
pub struct HeaderField {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub prefix: PrefixType,
    pub indexing: IndexingType,
    /// Table index the field was decoded with. The encoder reuses it while
    /// it still resolves to this field's name (and value, when fully
    /// indexed), so a decoded block re-encodes to the same bytes.
    pub wire_index: Option<usize>,
}

impl PartialEq for HeaderField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.value == other.value
            && self.prefix == other.prefix
            && self.indexing == other.indexing
    }
}

impl Eq for HeaderField {}

impl std::hash::Hash for HeaderField {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.value.hash(state);
        self.prefix.hash(state);
        self.indexing.hash(state);
    }
}

impl HeaderField {
    pub fn new(
        name: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        prefix: PrefixType,
        indexing: IndexingType,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            prefix,
            indexing,
            wire_index: None,
        }
    }

    /// Attach the table index the field was read with.
    pub fn with_wire_index(mut self, index: usize) -> Self {
        self.wire_index = Some(index);
        self
    }

    /// `IndexedHeader` / `All`.
    pub fn indexed(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(name, value, PrefixType::IndexedHeader, IndexingType::All)
    }

    /// Literal with a literal name.
    pub fn literal(
        name: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        prefix: PrefixType,
    ) -> Self {
        Self::new(name, value, prefix, IndexingType::None)
    }

    /// True when this field inserts into the dynamic table.
    pub fn inserts(&self) -> bool {
        self.prefix == PrefixType::LiteralWithIndexing
    }

    pub fn pair(&self) -> (&[u8], &[u8]) {
        (&self.name, &self.value)
    }

    /// Size of the field encoded with a literal name and value. For a
    /// non-empty name no indexed encoding is larger.
    pub fn literal_size(&self) -> usize {
        literal_size(&self.name, &self.value)
    }

    /// Upper bound of the field size under `indexing`, for any index a
    /// default-sized table can hand out.
    pub fn estimated_size(&self, indexing: IndexingType) -> usize {
        let index = MAX_WIRE_INDEX as u64;
        match indexing {
            IndexingType::All => integer_len(index, PrefixType::IndexedHeader.prefix_bits()),
            IndexingType::Name => {
                integer_len(index, PrefixType::LiteralWithoutIndexing.prefix_bits())
                    + string_len(&self.value)
            }
            IndexingType::None | IndexingType::Other => self.literal_size(),
        }
    }
}

/// Worst-case encoded size of a `(name, value)` pair.
pub fn literal_size(name: &[u8], value: &[u8]) -> usize {
    1 + string_len(name) + string_len(value)
}

/// Bytes needed for a length-prefixed string of `len` bytes.
pub fn string_prefix_len(len: usize) -> usize {
    integer_len(len as u64, crate::primitives::STRING_PREFIX_BITS)
}
