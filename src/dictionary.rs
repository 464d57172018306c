//! Bijective mapping between surface tokens and dense term ids.

use ahash::{AHashMap, AHashSet};

/// Dense identifier of a term. Stable for the lifetime of one index.
pub type TermId = u32;

/// Assigns an ascending [`TermId`] to each distinct token on first sight.
///
/// Removed ids are never reused: `intern` keeps allocating from the
/// high-water mark after a bulk removal, so postings written with old ids
/// stay consistent.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    known: AHashMap<String, TermId>,
    next_id: TermId,
}

impl TermDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a dictionary from persisted entries.
    ///
    /// `next_id` must be the persisted high-water mark; it can exceed the
    /// largest entry id when terms were pruned before persisting.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, TermId)>, next_id: TermId) -> Self {
        let known: AHashMap<String, TermId> = entries.into_iter().collect();
        Self { known, next_id }
    }

    /// Return the id for `term`, allocating the next one on first sight.
    /// Idempotent per term.
    pub fn intern(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.known.get(term) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.known.insert(term.to_string(), id);
        id
    }

    /// Look up `term` without side effects. Unknown terms at query time
    /// must not pollute the dictionary.
    pub fn lookup(&self, term: &str) -> Option<TermId> {
        self.known.get(term).copied()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.known.contains_key(term)
    }

    /// Bulk-remove entries by id. The high-water mark is preserved.
    pub fn remove_by_ids(&mut self, ids: &AHashSet<TermId>) {
        if ids.is_empty() {
            return;
        }
        self.known.retain(|_, id| !ids.contains(id));
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Next id that `intern` would allocate (persisted in the sidecar).
    pub fn next_term_id(&self) -> TermId {
        self.next_id
    }

    /// Iterate over `(term, id)` entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, TermId)> + '_ {
        self.known.iter().map(|(term, &id)| (term.as_str(), id))
    }
}
