use h2fuzz_hpack::{literal_size, HeaderField};

/// The header block fragment carried by HEADERS, PUSH_PROMISE and
/// CONTINUATION frames.
///
/// `block_len` is the encoded size of the block as currently accounted for
/// in the owning frame's length and in the stream size. It is set when the
/// frame is decoded and refreshed whenever the stream re-encodes its blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    /// Dynamic table size updates emitted ahead of the first field.
    pub size_updates: Vec<u32>,
    pub fields: Vec<HeaderField>,
    block_len: usize,
}

impl HeaderList {
    pub fn new(fields: Vec<HeaderField>) -> Self {
        Self {
            size_updates: Vec::new(),
            fields,
            block_len: 0,
        }
    }

    pub(crate) fn with_block_len(
        size_updates: Vec<u32>,
        fields: Vec<HeaderField>,
        block_len: usize,
    ) -> Self {
        Self {
            size_updates,
            fields,
            block_len,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Accounted encoded size of the block.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub(crate) fn set_block_len(&mut self, len: usize) {
        self.block_len = len;
    }

    /// Size of the block if every field were re-encoded as a literal with a
    /// literal name. Size updates are not counted.
    pub fn literal_size(&self) -> usize {
        self.fields
            .iter()
            .map(|h| literal_size(&h.name, &h.value))
            .sum()
    }

    /// Move `fields[at..]` into a new list. The size updates stay here and
    /// both `block_len`s are left for the next refresh.
    pub fn split_off(&mut self, at: usize) -> HeaderList {
        HeaderList::new(self.fields.split_off(at))
    }
}
