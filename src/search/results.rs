use std::collections::HashMap;
use serde::Serialize;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{FieldId, IndexKey, TokenLocation};
use crate::index::snapshot::IndexSnapshot;
use crate::search::intermediate::{IntermediateQueryResult, TokenMatchLocation};

/// Search results container
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults<K> {
    pub hits: Vec<SearchResult<K>>,  // Best score first
    pub total_hits: usize,
    pub max_score: f64,
    pub took_ms: u64,
}

/// One matched document
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult<K> {
    pub key: K,
    pub score: f64,
    pub field_matches: Vec<FieldMatch>,
}

/// Where a document matched within one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatch {
    pub field_id: FieldId,
    pub field_name: String,
    pub score: f64,
    pub locations: Vec<TokenMatchLocation>,
}

/// A run of matched text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchPhrase {
    pub start: u32,   // Char offset in the field text
    pub length: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPhrases {
    pub field_name: String,
    pub phrases: Vec<MatchPhrase>,
}

/// Matched text of one result, per field
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultPhrases<K> {
    pub key: K,
    pub score: f64,
    pub fields: Vec<FieldPhrases>,
}

impl<K: IndexKey> SearchResults<K> {
    /// Resolve keys and field names, then order by score (ties by document id).
    pub fn from_intermediate(
        result: IntermediateQueryResult,
        snapshot: &IndexSnapshot<K>,
        took_ms: u64,
    ) -> Result<Self> {
        let mut matches = result.into_matches();
        matches.sort_by(|a, b| b.score().total_cmp(&a.score()).then(a.document_id.cmp(&b.document_id)));

        let metadata = snapshot.metadata();
        let fields = snapshot.fields();
        let mut hits = Vec::with_capacity(matches.len());

        for document in matches {
            let key = metadata.get(document.document_id)?.key.clone();
            let score = document.score();
            let field_matches = document.field_matches
                .into_iter()
                .map(|m| FieldMatch {
                    field_id: m.field_id,
                    field_name: fields.get(m.field_id).map(|f| f.name.clone()).unwrap_or_default(),
                    score: m.score,
                    locations: m.locations,
                })
                .collect();
            hits.push(SearchResult { key, score, field_matches });
        }

        Ok(SearchResults {
            total_hits: hits.len(),
            max_score: hits.first().map_or(0.0, |h| h.score),
            hits,
            took_ms,
        })
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchResult<K>> {
        self.hits.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.hits.iter().map(|h| &h.key)
    }

    /// Cut the matched text out of each result's fields. `loader` is given
    /// every result key and must return the field texts (by field name) that
    /// were indexed for each of them.
    pub fn create_match_phrases<F>(&self, loader: F) -> Result<Vec<SearchResultPhrases<K>>>
    where
        F: FnOnce(&[K]) -> HashMap<K, HashMap<String, String>>,
    {
        let keys: Vec<K> = self.keys().cloned().collect();
        let texts = loader(&keys);

        self.hits
            .iter()
            .map(|hit| {
                let field_texts = texts.get(&hit.key).ok_or_else(|| {
                    Error::new(ErrorKind::CallerContract, format!("Loader returned no text for key {:?}", hit.key))
                })?;

                let mut fields = Vec::new();
                for field in &hit.field_matches {
                    let Some(text) = field_texts.get(&field.field_name) else {
                        continue;
                    };
                    fields.push(FieldPhrases {
                        field_name: field.field_name.clone(),
                        phrases: extract_phrases(text, &field.locations).map_err(|context| {
                            Error::new(ErrorKind::CallerContract, format!("{} (key {:?})", context, hit.key))
                        })?,
                    });
                }

                Ok(SearchResultPhrases { key: hit.key.clone(), score: hit.score, fields })
            })
            .collect()
    }
}

/// Matched tokens with consecutive token indices form one phrase; the words
/// between the parts of a `~n` match are not part of any phrase.
fn extract_phrases(text: &str, locations: &[TokenMatchLocation]) -> std::result::Result<Vec<MatchPhrase>, String> {
    let mut tokens: Vec<TokenLocation> = locations
        .iter()
        .flat_map(|l| l.locations().iter().copied())
        .collect();
    tokens.sort_unstable_by_key(|t| (t.token_index, t.start));
    tokens.dedup_by_key(|t| t.token_index);

    let mut joined: Vec<(u32, u32, u32)> = Vec::with_capacity(tokens.len());  // (last token index, start, end)
    for token in tokens {
        let end = token.start + token.length;
        match joined.last_mut() {
            Some(run) if token.token_index == run.0 + 1 => {
                run.0 = token.token_index;
                run.2 = run.2.max(end);
            }
            _ => joined.push((token.token_index, token.start, end)),
        }
    }

    let chars: Vec<char> = text.chars().collect();
    joined
        .into_iter()
        .map(|(_, start, end)| {
            let slice = chars.get(start as usize..end as usize).ok_or_else(|| {
                format!("Loaded text is shorter than the indexed text ({} chars, match ends at {})", chars.len(), end)
            })?;
            Ok(MatchPhrase {
                start,
                length: end - start,
                text: slice.iter().collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TokenLocation;

    fn single(index: u32, start: u32, length: u32) -> TokenMatchLocation {
        TokenMatchLocation::Single(TokenLocation::new(index, start, length))
    }

    #[test]
    fn test_phrases_follow_char_offsets() {
        let text = "naïve café owners";
        let phrases = extract_phrases(text, &[single(1, 6, 4)]).unwrap();
        assert_eq!(phrases, vec![MatchPhrase { start: 6, length: 4, text: "café".to_string() }]);
    }

    #[test]
    fn test_composite_locations_become_one_phrase() {
        let text = "the quick brown fox";
        let composite = TokenMatchLocation::compose(&single(1, 4, 5), &single(3, 16, 3));
        let phrases = extract_phrases(text, &[composite, single(2, 10, 5)]).unwrap();

        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].text, "quick brown fox");
    }

    #[test]
    fn test_near_match_leaves_out_words_in_between() {
        let text = "alpha one two three beta";
        let composite = TokenMatchLocation::compose(&single(0, 0, 5), &single(4, 20, 4));
        let phrases = extract_phrases(text, &[composite]).unwrap();

        let texts: Vec<&str> = phrases.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_short_text_is_reported() {
        assert!(extract_phrases("tiny", &[single(3, 10, 4)]).is_err());
    }
}
