use std::cell::RefCell;
use std::collections::HashMap;
use crate::core::error::Result;
use crate::core::types::{DocumentId, FieldId, IndexKey};
use crate::index::match_map::DocumentTokenMatchMap;
use crate::index::snapshot::IndexSnapshot;
use crate::search::intermediate::{IntermediateQueryResult, ScoredFieldMatch, ScoredToken, TokenMatchLocation};

/// Scorer trait
pub trait Scorer: Send + Sync {
    fn score(&self, term: &TermStats, field: &FieldStats) -> f64;

    fn name(&self) -> &str;
}

/// Corpus-wide statistics of one query term
#[derive(Debug, Clone, Copy)]
pub struct TermStats {
    pub document_count: usize,     // Documents in the snapshot
    pub matching_documents: usize, // Documents the term matched
}

/// Statistics of one field of one matched document
#[derive(Debug, Clone, Copy)]
pub struct FieldStats {
    pub term_frequency: usize,
    pub field_length: u32,
    pub average_field_length: f64,
}

/// BM25 Scorer
#[derive(Debug, Clone)]
pub struct Bm25Scorer {
    pub k1: f64,  // Term frequency saturation (default: 1.2)
    pub b: f64,   // Length normalization strength (default: 0.75)
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Bm25Scorer {
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl Bm25Scorer {
    pub fn new(k1: f64, b: f64) -> Self {
        Bm25Scorer { k1, b }
    }

    pub fn idf(&self, term: &TermStats) -> f64 {
        let n = term.matching_documents as f64;
        let total = term.document_count as f64;
        (1.0 + (total - n + 0.5) / (n + 0.5)).ln()
    }
}

impl Scorer for Bm25Scorer {
    fn score(&self, term: &TermStats, field: &FieldStats) -> f64 {
        let tf = field.term_frequency as f64;
        let length_ratio = if field.average_field_length > 0.0 {
            field.field_length as f64 / field.average_field_length
        } else {
            1.0
        };

        let numerator = tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * length_ratio);

        self.idf(term) * numerator / denominator
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

/// Turns raw trie matches into scored results for one query over one
/// snapshot. Values that cannot change while the snapshot lives are
/// computed once per query.
pub struct QueryScorer<'a, K: IndexKey> {
    scorer: &'a dyn Scorer,
    snapshot: &'a IndexSnapshot<K>,
    average_field_lengths: RefCell<HashMap<FieldId, f64>>,
    document_boosts: RefCell<HashMap<DocumentId, f64>>,  // Freshness/magnitude multipliers
}

impl<'a, K: IndexKey> QueryScorer<'a, K> {
    pub fn new(scorer: &'a dyn Scorer, snapshot: &'a IndexSnapshot<K>) -> Self {
        QueryScorer {
            scorer,
            snapshot,
            average_field_lengths: RefCell::new(HashMap::new()),
            document_boosts: RefCell::new(HashMap::new()),
        }
    }

    fn average_field_length(&self, field_id: FieldId) -> f64 {
        *self.average_field_lengths
            .borrow_mut()
            .entry(field_id)
            .or_insert_with(|| {
                let metadata = self.snapshot.metadata();
                metadata.statistics().average_field_length(field_id, metadata.document_count())
            })
    }

    fn document_boost(&self, document_id: DocumentId) -> Result<f64> {
        if let Some(boost) = self.document_boosts.borrow().get(&document_id) {
            return Ok(*boost);
        }

        let metadata = self.snapshot.metadata();
        let boost = metadata.object_score_boost(metadata.get(document_id)?);
        self.document_boosts.borrow_mut().insert(document_id, boost);
        Ok(boost)
    }

    /// Score every document in `matches` as one term. `weight` scales the
    /// result (query boosts, fuzzy edit penalties).
    pub fn score(&self, matches: &DocumentTokenMatchMap, weight: f64) -> Result<IntermediateQueryResult> {
        let term = TermStats {
            document_count: self.snapshot.document_count(),
            matching_documents: matches.len(),
        };
        let metadata = self.snapshot.metadata();
        let fields = self.snapshot.fields();

        let mut scored = Vec::with_capacity(matches.len());
        for (document_id, tokens) in matches.iter() {
            let document = metadata.get(*document_id)?;
            let document_boost = self.document_boost(*document_id)?;

            let field_matches = tokens
                .iter()
                .map(|token| {
                    let stats = FieldStats {
                        term_frequency: token.locations.len(),
                        field_length: document.statistics.field_token_count(token.field_id),
                        average_field_length: self.average_field_length(token.field_id),
                    };
                    let score = self.scorer.score(&term, &stats)
                        * fields.score_boost(token.field_id)
                        * document_boost
                        * weight;
                    let locations = token.locations.iter().map(|l| TokenMatchLocation::Single(*l)).collect();
                    ScoredFieldMatch::new(token.field_id, score, locations)
                })
                .collect();

            scored.push(ScoredToken::new(*document_id, field_matches));
        }

        Ok(IntermediateQueryResult::new(scored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarer_terms_score_higher() {
        let scorer = Bm25Scorer::default();
        let field = FieldStats { term_frequency: 1, field_length: 10, average_field_length: 10.0 };

        let rare = scorer.score(&TermStats { document_count: 100, matching_documents: 1 }, &field);
        let common = scorer.score(&TermStats { document_count: 100, matching_documents: 90 }, &field);
        assert!(rare > common);
        assert!(common > 0.0);
    }

    #[test]
    fn test_idf_formula() {
        let scorer = Bm25Scorer::default();
        let idf = scorer.idf(&TermStats { document_count: 2, matching_documents: 1 });
        assert!((idf - (1.0f64 + 1.5 / 1.5).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_shorter_fields_score_higher() {
        let scorer = Bm25Scorer::default();
        let term = TermStats { document_count: 10, matching_documents: 2 };
        let short = scorer.score(&term, &FieldStats { term_frequency: 1, field_length: 3, average_field_length: 6.0 });
        let long = scorer.score(&term, &FieldStats { term_frequency: 1, field_length: 12, average_field_length: 6.0 });
        assert!(short > long);
    }

    #[test]
    fn test_term_frequency_saturates() {
        let scorer = Bm25Scorer::default();
        let term = TermStats { document_count: 10, matching_documents: 2 };
        let stats = |tf| FieldStats { term_frequency: tf, field_length: 10, average_field_length: 10.0 };

        let one = scorer.score(&term, &stats(1));
        let two = scorer.score(&term, &stats(2));
        let twenty = scorer.score(&term, &stats(20));
        assert!(two > one);
        assert!(twenty < one * (scorer.k1 + 1.0));
    }
}
