use serde::{Serialize, Deserialize};
use crate::core::types::{DocumentId, FieldId, TokenLocation};

/// A matched position in a field: one token, or a run of tokens produced by
/// a positional merge. Composite locations keep every original location so
/// they can be merged again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenMatchLocation {
    Single(TokenLocation),
    Composite(Vec<TokenLocation>),  // Ascending, at least two entries
}

impl TokenMatchLocation {
    /// Combine two locations into one composite that keeps both.
    pub fn compose(left: &TokenMatchLocation, right: &TokenMatchLocation) -> TokenMatchLocation {
        let mut locations: Vec<TokenLocation> = left.locations()
            .iter()
            .chain(right.locations())
            .copied()
            .collect();
        locations.sort_unstable();
        locations.dedup();

        if locations.len() == 1 {
            TokenMatchLocation::Single(locations[0])
        } else {
            TokenMatchLocation::Composite(locations)
        }
    }

    pub fn locations(&self) -> &[TokenLocation] {
        match self {
            TokenMatchLocation::Single(location) => std::slice::from_ref(location),
            TokenMatchLocation::Composite(locations) => locations,
        }
    }

    pub fn min_token_index(&self) -> u32 {
        self.locations().first().map_or(0, |l| l.token_index)
    }

    pub fn max_token_index(&self) -> u32 {
        self.locations().last().map_or(0, |l| l.token_index)
    }

    /// Char range covered in the field text, as (start, length)
    pub fn span(&self) -> (u32, u32) {
        let locations = self.locations();
        let start = locations.iter().map(|l| l.start).min().unwrap_or(0);
        let end = locations.iter().map(|l| l.start + l.length).max().unwrap_or(start);
        (start, end - start)
    }

    fn sort_key(&self) -> (u32, u32) {
        (self.min_token_index(), self.max_token_index())
    }
}

/// Sort by token position and drop duplicates.
pub fn normalize_locations(locations: &mut Vec<TokenMatchLocation>) {
    locations.sort_by(|a, b| {
        a.sort_key()
            .cmp(&b.sort_key())
            .then_with(|| a.locations().cmp(b.locations()))
    });
    locations.dedup();
}

/// Score and matched locations of one field of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFieldMatch {
    pub field_id: FieldId,
    pub score: f64,
    pub locations: Vec<TokenMatchLocation>,  // Ascending by token position
}

impl ScoredFieldMatch {
    pub fn new(field_id: FieldId, score: f64, mut locations: Vec<TokenMatchLocation>) -> Self {
        normalize_locations(&mut locations);
        ScoredFieldMatch { field_id, score, locations }
    }

    /// Add another match for the same field: scores sum, locations merge.
    pub fn merge(&mut self, other: &ScoredFieldMatch) {
        debug_assert_eq!(self.field_id, other.field_id);
        self.score += other.score;
        self.locations.extend(other.locations.iter().cloned());
        normalize_locations(&mut self.locations);
    }
}

/// One matched document with its per-field matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredToken {
    pub document_id: DocumentId,
    pub field_matches: Vec<ScoredFieldMatch>,  // Ascending by field id
}

impl ScoredToken {
    pub fn new(document_id: DocumentId, mut field_matches: Vec<ScoredFieldMatch>) -> Self {
        field_matches.sort_by_key(|m| m.field_id);
        ScoredToken { document_id, field_matches }
    }

    pub fn score(&self) -> f64 {
        self.field_matches.iter().map(|m| m.score).sum()
    }

    pub fn field(&self, field_id: FieldId) -> Option<&ScoredFieldMatch> {
        self.field_matches.iter().find(|m| m.field_id == field_id)
    }

    /// Union of both documents' fields; shared fields are merged.
    pub fn merge(&self, other: &ScoredToken) -> ScoredToken {
        debug_assert_eq!(self.document_id, other.document_id);
        let mut fields = self.field_matches.clone();
        for field in &other.field_matches {
            match fields.iter_mut().find(|m| m.field_id == field.field_id) {
                Some(existing) => existing.merge(field),
                None => fields.push(field.clone()),
            }
        }
        ScoredToken::new(self.document_id, fields)
    }
}

/// Partial result of a query: matched documents ascending by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntermediateQueryResult {
    matches: Vec<ScoredToken>,
}

impl IntermediateQueryResult {
    pub fn new(matches: Vec<ScoredToken>) -> Self {
        debug_assert!(
            matches.windows(2).all(|w| w[0].document_id < w[1].document_id),
            "intermediate results must be ascending by document id"
        );
        IntermediateQueryResult { matches }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn matches(&self) -> &[ScoredToken] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<ScoredToken> {
        self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn document_ids(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.matches.iter().map(|m| m.document_id)
    }
}
