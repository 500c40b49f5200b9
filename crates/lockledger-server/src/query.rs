//! Search and pagination over a loaded ledger.

use lockledger_types::{LedgerEntries, LockEntry};

/// Whether `needle` occurs in the entry's name or any metadata key or value.
///
/// Case-sensitive substring match. An empty needle matches everything.
pub fn matches(entry: &LockEntry, needle: &str) -> bool {
    needle.is_empty()
        || entry.name.contains(needle)
        || entry
            .metadata
            .iter()
            .any(|(key, value)| key.contains(needle) || value.contains(needle))
}

/// Page size limits from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
}

impl PageLimits {
    /// Resolve a requested page and size; page numbers start at 1.
    pub fn resolve(&self, page: Option<usize>, limit: Option<usize>) -> (usize, usize) {
        let size = limit
            .unwrap_or(self.default_size)
            .clamp(1, self.max_size.max(1));
        (page.unwrap_or(1).max(1), size)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
    pub pages: usize,
}

/// Filter entries by `needle` and cut out one page, in name order.
///
/// An empty result still reports one page.
pub fn search(entries: &LedgerEntries, needle: &str, page: usize, size: usize) -> Page<LockEntry> {
    let hits: Vec<&LockEntry> = entries.values().filter(|e| matches(e, needle)).collect();
    let total = hits.len();
    let start = page.saturating_sub(1).saturating_mul(size);
    let items = hits
        .into_iter()
        .skip(start)
        .take(size)
        .cloned()
        .collect();
    Page {
        items,
        page,
        size,
        total,
        pages: total.max(1).div_ceil(size),
    }
}
