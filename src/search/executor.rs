use crate::analysis::token::TextFragment;
use crate::core::error::{Error, Result};
use crate::core::fields::FieldInfo;
use crate::core::types::IndexKey;
use crate::index::match_map::DocumentTokenMatchMap;
use crate::index::snapshot::IndexSnapshot;
use crate::query::ast::{BinaryOperator, QueryPart, WordQueryPart};
use crate::query::wildcard::{match_wildcard, normalize_fragments};
use crate::scoring::scorer::{QueryScorer, Scorer};
use crate::search::fuzzy::{fuzzy_match, FuzzyMatchOptions};
use crate::search::intermediate::IntermediateQueryResult;
use crate::search::merger::{composite_positional_intersect, merge, union};

/// Executes parsed queries against one snapshot. Statistics gathered while
/// scoring are kept for the executor's lifetime, so create one per query.
pub struct QueryExecutor<'a, K: IndexKey> {
    snapshot: &'a IndexSnapshot<K>,
    scorer: QueryScorer<'a, K>,
}

impl<'a, K: IndexKey> QueryExecutor<'a, K> {
    pub fn new(snapshot: &'a IndexSnapshot<K>, scorer: &'a dyn Scorer) -> Self {
        QueryExecutor {
            snapshot,
            scorer: QueryScorer::new(scorer, snapshot),
        }
    }

    /// Matched documents, ascending by document id. A query that reduces to
    /// nothing (no indexable terms) matches nothing.
    pub fn execute(&self, query: &QueryPart) -> Result<IntermediateQueryResult> {
        Ok(self.evaluate(query, None, 1.0)?.unwrap_or_default())
    }

    /// `None` when the part contributes no constraint at all, e.g. a word
    /// made only of characters the tokenizer discards.
    fn evaluate(
        &self,
        part: &QueryPart,
        field: Option<&FieldInfo>,
        weight: f64,
    ) -> Result<Option<IntermediateQueryResult>> {
        match part {
            QueryPart::Empty => Ok(None),
            QueryPart::Word(word) => self.evaluate_word(word, field, weight),
            QueryPart::Adjacent { words, score_boost } => {
                self.evaluate_adjacent(words, field, weight * score_boost.unwrap_or(1.0))
            }
            QueryPart::Field { field_name, statement } => {
                let info = self.snapshot
                    .fields()
                    .get_by_name(field_name)
                    .ok_or_else(|| Error::query_parse(format!("Unknown field '{}'", field_name)))?;
                self.evaluate(statement, Some(info), weight)
            }
            QueryPart::Bracketed(statement) => self.evaluate(statement, field, weight),
            QueryPart::Binary { operator, left, right } => {
                let left = self.evaluate(left, field, weight)?;
                let right = self.evaluate(right, field, weight)?;
                Ok(match (left, right) {
                    (Some(left), Some(right)) => Some(merge(*operator, &left, &right)),
                    (left, None) => left,
                    // Nothing to exclude from
                    (None, _) if *operator == BinaryOperator::AndNot => None,
                    (None, right) => right,
                })
            }
        }
    }

    fn evaluate_word(
        &self,
        word: &WordQueryPart,
        field: Option<&FieldInfo>,
        weight: f64,
    ) -> Result<Option<IntermediateQueryResult>> {
        let weight = weight * word.score_boost().unwrap_or(1.0);
        let tokenizer = field.unwrap_or_else(|| self.snapshot.fields().default_field()).tokenizer.as_ref();

        match word {
            WordQueryPart::Exact { word, .. } => {
                let mut tokens: Vec<(u32, String)> = tokenizer
                    .tokenize(&[TextFragment::whole(word.as_str())])
                    .into_iter()
                    .flat_map(|group| {
                        let value = group.value;
                        group.locations.into_iter().map(move |l| (l.token_index, value.clone()))
                    })
                    .collect();
                tokens.sort();

                let mut phrase: Option<IntermediateQueryResult> = None;
                for (_, token) in &tokens {
                    let next = self.exact_token(token, field, weight)?;
                    phrase = Some(match phrase {
                        Some(previous) => composite_positional_intersect(&previous, &next, 1, true),
                        None => next,
                    });
                }
                Ok(phrase)
            }
            WordQueryPart::Fuzzy { word, max_edit_distance, max_sequential_edits, .. } => {
                let normalized = tokenizer.normalize(word);
                if normalized.is_empty() {
                    return Ok(None);
                }

                let options = FuzzyMatchOptions {
                    max_edit_distance: *max_edit_distance,
                    max_sequential_edits: *max_sequential_edits,
                };
                let matches = {
                    let mut navigator = self.snapshot.create_navigator();
                    fuzzy_match(&mut navigator, &normalized, options)
                };

                let mut result = IntermediateQueryResult::empty();
                for found in &matches {
                    let scored = self.scorer.score(&restrict(&found.matches, field), weight * found.weight())?;
                    result = union(&result, &scored);
                }
                Ok(Some(result))
            }
            WordQueryPart::Wildcard { fragments, .. } => {
                let fragments = normalize_fragments(fragments, tokenizer);
                if fragments.is_empty() {
                    return Ok(None);
                }

                let matches = {
                    let mut navigator = self.snapshot.create_navigator();
                    match_wildcard(&mut navigator, &fragments)
                };
                Ok(Some(self.scorer.score(&restrict(&matches, field), weight)?))
            }
        }
    }

    /// Consecutive words: each word must start one token after the previous ends.
    fn evaluate_adjacent(
        &self,
        words: &[WordQueryPart],
        field: Option<&FieldInfo>,
        weight: f64,
    ) -> Result<Option<IntermediateQueryResult>> {
        let mut phrase: Option<IntermediateQueryResult> = None;
        for word in words {
            if let Some(next) = self.evaluate_word(word, field, weight)? {
                phrase = Some(match phrase {
                    Some(previous) => composite_positional_intersect(&previous, &next, 1, true),
                    None => next,
                });
            }
        }
        Ok(phrase)
    }

    fn exact_token(&self, token: &str, field: Option<&FieldInfo>, weight: f64) -> Result<IntermediateQueryResult> {
        let matches = {
            let mut navigator = self.snapshot.create_navigator();
            if !navigator.process_str(token) {
                return Ok(IntermediateQueryResult::empty());
            }
            navigator.get_exact_matches()
        };
        self.scorer.score(&restrict(&matches, field), weight)
    }
}

fn restrict(matches: &DocumentTokenMatchMap, field: Option<&FieldInfo>) -> DocumentTokenMatchMap {
    match field {
        Some(field) => matches.restrict_to_field(field.id),
        None => matches.clone(),
    }
}
