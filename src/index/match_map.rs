use std::collections::BTreeMap;
use crate::core::types::{DocumentId, FieldId, IndexedToken};
use crate::index::persistent_map::DocumentIdMap;

/// Immutable map from document id to the token occurrences recorded at one
/// trie node. Iterates in ascending document id order so query results can
/// be built without sorting. Versions share structure, so recording one more
/// document copies a handful of small nodes rather than every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTokenMatchMap {
    entries: DocumentIdMap<Vec<IndexedToken>>,  // Tokens ascending by field id
}

impl DocumentTokenMatchMap {
    pub fn new(entries: Vec<(DocumentId, Vec<IndexedToken>)>) -> Self {
        debug_assert!(
            entries.windows(2).all(|w| w[0].0 < w[1].0),
            "match map must be ascending by document id"
        );
        DocumentTokenMatchMap { entries: entries.into_iter().collect() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, document_id: DocumentId) -> Option<&[IndexedToken]> {
        self.entries.get(&document_id).map(Vec::as_slice)
    }

    pub fn contains(&self, document_id: DocumentId) -> bool {
        self.entries.contains_key(&document_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentId, &Vec<IndexedToken>)> {
        self.entries.iter()
    }

    pub fn document_ids(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.entries.keys().copied()
    }

    /// Record a token occurrence set, merging locations when the document
    /// already has the field here.
    pub fn add(&mut self, document_id: DocumentId, token: IndexedToken) {
        match self.entries.get_mut(&document_id) {
            Some(tokens) => match tokens.iter_mut().find(|t| t.field_id == token.field_id) {
                Some(existing) => existing.merge_locations(&token.locations),
                None => {
                    tokens.push(token);
                    tokens.sort_by_key(|t| t.field_id);
                }
            },
            None => {
                self.entries.insert(document_id, vec![token]);
            }
        }
    }

    /// Returns true if the document had matches here.
    pub fn remove(&mut self, document_id: DocumentId) -> bool {
        self.entries.remove(&document_id).is_some()
    }

    /// Keep only the tokens of one field, dropping documents left without any.
    pub fn restrict_to_field(&self, field_id: FieldId) -> DocumentTokenMatchMap {
        DocumentTokenMatchMap {
            entries: self.entries
                .iter()
                .filter_map(|(id, tokens)| {
                    tokens
                        .iter()
                        .find(|t| t.field_id == field_id)
                        .map(|token| (*id, vec![token.clone()]))
                })
                .collect(),
        }
    }
}

/// Accumulates matches from several trie nodes into one map, merging the
/// locations of a document's tokens per field.
#[derive(Debug, Default)]
pub struct DocumentTokenMatchCollector {
    collected: BTreeMap<DocumentId, Vec<IndexedToken>>,
}

impl DocumentTokenMatchCollector {
    pub fn add_map(&mut self, matches: &DocumentTokenMatchMap) {
        for (document_id, tokens) in matches.iter() {
            let entry = self.collected.entry(*document_id).or_default();
            for token in tokens {
                match entry.iter_mut().find(|t| t.field_id == token.field_id) {
                    Some(existing) => existing.merge_locations(&token.locations),
                    None => entry.push(token.clone()),
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }

    pub fn finish(self) -> DocumentTokenMatchMap {
        DocumentTokenMatchMap::new(
            self.collected
                .into_iter()
                .map(|(id, mut tokens)| {
                    tokens.sort_by_key(|t| t.field_id);
                    (id, tokens)
                })
                .collect(),
        )
    }
}
