use std::collections::VecDeque;

use crate::error::{HpackError, Result};
use crate::field::HeaderField;
use crate::static_table::{self, STATIC_LEN};

/// SETTINGS_HEADER_TABLE_SIZE default (RFC 7540 section 6.5.2).
pub const DEFAULT_MAX_TABLE_SIZE: usize = 4096;

/// Per-entry accounting overhead (RFC 7541 section 4.1).
pub const ENTRY_OVERHEAD: usize = 32;

/// Largest wire index a table of [`DEFAULT_MAX_TABLE_SIZE`] can hold: the
/// static entries plus as many empty-string entries as fit.
pub const MAX_WIRE_INDEX: usize = STATIC_LEN + DEFAULT_MAX_TABLE_SIZE / ENTRY_OVERHEAD;

/// Result of looking a header up in the combined static + dynamic table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMatch {
    /// 1-based wire index.
    pub index: usize,
    /// Whether the entry at `index` also carries the requested value.
    pub value_matches: bool,
}

/// Bounded HPACK dynamic table. The newest entry sits at dynamic position 0,
/// which is wire index 62. Entries are evicted oldest first.
#[derive(Debug, Clone)]
pub struct DynamicTable {
    entries: VecDeque<(Vec<u8>, Vec<u8>)>,
    size: usize,
    limit: usize,
    max_size: usize,
}

impl Default for DynamicTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TABLE_SIZE)
    }
}

impl DynamicTable {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            size: 0,
            limit: max_size,
            max_size,
        }
    }

    /// Number of dynamic entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Accounted size of all dynamic entries.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current limit, as last set by a size update.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Add an entry, evicting from the oldest end until it fits. An entry
    /// larger than the limit empties the table and is not stored.
    pub fn insert(&mut self, name: &[u8], value: &[u8]) {
        let entry_size = entry_size(name, value);
        if entry_size > self.limit {
            tracing::trace!(entry_size, limit = self.limit, "oversized entry empties table");
            self.entries.clear();
            self.size = 0;
            return;
        }
        self.evict_to(self.limit - entry_size);
        self.entries.push_front((name.to_vec(), value.to_vec()));
        self.size += entry_size;
    }

    /// Apply a dynamic table size update.
    pub fn update_limit(&mut self, limit: u64) -> Result<()> {
        if limit > self.max_size as u64 {
            return Err(HpackError::SizeUpdateTooLarge {
                size: limit,
                max: self.max_size,
            });
        }
        self.limit = limit as usize;
        self.evict_to(self.limit);
        Ok(())
    }

    /// Replay the table side effect of `field`.
    pub fn observe(&mut self, field: &HeaderField) {
        if field.inserts() {
            self.insert(&field.name, &field.value);
        }
    }

    /// Entry at a 1-based wire index, static entries first.
    pub fn get(&self, index: usize) -> Option<(&[u8], &[u8])> {
        if index <= STATIC_LEN {
            return static_table::get(index);
        }
        self.entries
            .get(index - STATIC_LEN - 1)
            .map(|(n, v)| (n.as_slice(), v.as_slice()))
    }

    /// Best index for `(name, value)`: an exact match in the dynamic table,
    /// then in the static table, then a name match in the same order.
    pub fn find(&self, name: &[u8], value: &[u8]) -> Option<TableMatch> {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|(n, v)| n.as_slice() == name && v.as_slice() == value)
        {
            return Some(TableMatch {
                index: STATIC_LEN + 1 + pos,
                value_matches: true,
            });
        }
        if let Some(index) = static_table::find_exact(name, value) {
            return Some(TableMatch {
                index,
                value_matches: true,
            });
        }
        if let Some(pos) = self.entries.iter().position(|(n, _)| n.as_slice() == name) {
            return Some(TableMatch {
                index: STATIC_LEN + 1 + pos,
                value_matches: false,
            });
        }
        static_table::find_name(name).map(|index| TableMatch {
            index,
            value_matches: false,
        })
    }

    /// Whether `(name, value)` can be encoded fully indexed.
    pub fn contains(&self, name: &[u8], value: &[u8]) -> bool {
        self.find(name, value).is_some_and(|m| m.value_matches)
    }

    /// Whether `name` can be encoded as a name reference.
    pub fn contains_name(&self, name: &[u8]) -> bool {
        self.find(name, b"").is_some()
    }

    /// Dynamic entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(n, v)| (n.as_slice(), v.as_slice()))
    }

    fn evict_to(&mut self, target: usize) {
        while self.size > target {
            match self.entries.pop_back() {
                Some((n, v)) => self.size -= entry_size(&n, &v),
                None => {
                    self.size = 0;
                    break;
                }
            }
        }
    }
}

/// Accounted size of one entry.
pub fn entry_size(name: &[u8], value: &[u8]) -> usize {
    name.len() + value.len() + ENTRY_OVERHEAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::PrefixType;

    #[test]
    fn newest_entry_gets_first_dynamic_index() {
        let mut table = DynamicTable::default();
        table.insert(b"a", b"1");
        table.insert(b"b", b"2");
        assert_eq!(table.get(62), Some((&b"b"[..], &b"2"[..])));
        assert_eq!(table.get(63), Some((&b"a"[..], &b"1"[..])));
        assert_eq!(table.get(64), None);
        assert_eq!(table.size(), 2 * (2 + ENTRY_OVERHEAD));
    }

    #[test]
    fn eviction_is_fifo_by_size() {
        let mut table = DynamicTable::new(2 * (2 + ENTRY_OVERHEAD));
        table.insert(b"a", b"1");
        table.insert(b"b", b"2");
        table.insert(b"c", b"3");
        assert_eq!(table.len(), 2);
        assert!(!table.contains(b"a", b"1"));
        assert!(table.contains(b"b", b"2"));
        assert!(table.contains(b"c", b"3"));
    }

    #[test]
    fn oversized_entry_clears_table() {
        let mut table = DynamicTable::new(40);
        table.insert(b"a", b"1");
        table.insert(b"long-name", b"long-value");
        assert!(table.is_empty());
        assert_eq!(table.size(), 0);
    }

    #[test]
    fn size_update_evicts_and_is_bounded() {
        let mut table = DynamicTable::default();
        table.insert(b"a", b"1");
        table.update_limit(0).unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            table.update_limit(4097),
            Err(HpackError::SizeUpdateTooLarge { size: 4097, max: 4096 })
        ));
    }

    #[test]
    fn lookup_prefers_dynamic_exact_then_static() {
        let mut table = DynamicTable::default();
        assert_eq!(
            table.find(b":method", b"GET"),
            Some(TableMatch { index: 2, value_matches: true })
        );
        table.insert(b":method", b"GET");
        assert_eq!(
            table.find(b":method", b"GET"),
            Some(TableMatch { index: 62, value_matches: true })
        );
        assert_eq!(
            table.find(b":method", b"PATCH"),
            Some(TableMatch { index: 62, value_matches: false })
        );
        assert_eq!(table.find(b"x-none", b""), None);
    }

    #[test]
    fn observe_only_inserts_with_indexing() {
        let mut table = DynamicTable::default();
        table.observe(&HeaderField::literal("k", "v", PrefixType::LiteralNeverIndexed));
        assert!(table.is_empty());
        table.observe(&HeaderField::literal("k", "v", PrefixType::LiteralWithIndexing));
        assert!(table.contains(b"k", b"v"));
        assert!(table.contains_name(b"k"));
    }
}
