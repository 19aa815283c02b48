use serde::{Serialize, Deserialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Internal document id. Dense and reused: a removed document's id goes back
/// to the pool and may be handed to a different key later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u32);

impl DocumentId {
    pub fn new(id: u32) -> Self {
        DocumentId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocumentId {
    fn from(id: u32) -> Self {
        DocumentId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId(pub u8);

impl FieldId {
    /// Field used for text indexed without an object definition
    pub const DEFAULT: FieldId = FieldId(0);

    pub fn value(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectTypeId(pub u8);

/// Where a token occurred in a field's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenLocation {
    pub token_index: u32,  // Ordinal of the token within the field
    pub start: u32,        // Char offset in the original field text
    pub length: u32,       // Length in chars
}

impl TokenLocation {
    pub fn new(token_index: u32, start: u32, length: u32) -> Self {
        TokenLocation { token_index, start, length }
    }
}

impl PartialOrd for TokenLocation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenLocation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.token_index.cmp(&other.token_index)
            .then(self.start.cmp(&other.start))
            .then(self.length.cmp(&other.length))
    }
}

/// All occurrences of one token in one field of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedToken {
    pub field_id: FieldId,
    pub locations: Vec<TokenLocation>,  // Ascending by token index
}

impl IndexedToken {
    pub fn new(field_id: FieldId, mut locations: Vec<TokenLocation>) -> Self {
        locations.sort_unstable();
        locations.dedup();
        IndexedToken { field_id, locations }
    }

    /// Fold another set of locations for the same field into this one.
    pub fn merge_locations(&mut self, locations: &[TokenLocation]) {
        self.locations.extend_from_slice(locations);
        self.locations.sort_unstable();
        self.locations.dedup();
    }
}

/// Bounds required of the caller's document key type.
pub trait IndexKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> IndexKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}
