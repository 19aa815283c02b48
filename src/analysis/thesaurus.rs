use std::collections::{HashMap, HashSet};
use crate::analysis::tokenizer::IndexTokenizer;

/// Expands a normalized token into the set of values it is indexed under.
pub trait Thesaurus: Send + Sync {
    /// The result always contains the token itself.
    fn expand(&self, token: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoThesaurus;

impl Thesaurus for NoThesaurus {
    fn expand(&self, token: &str) -> Vec<String> {
        vec![token.to_string()]
    }
}

/// Bidirectional synonym sets: every word in a set expands to the whole set.
#[derive(Debug, Clone, Default)]
pub struct SynonymThesaurus {
    synonyms: HashMap<String, Vec<String>>,
}

impl SynonymThesaurus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synonym set, normalizing each word with the tokenizer that
    /// will produce the indexed tokens.
    pub fn with_synonyms<I, S>(mut self, tokenizer: &dyn IndexTokenizer, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: Vec<String> = words.into_iter()
            .map(|w| tokenizer.normalize(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();

        for word in &set {
            let entry = self.synonyms.entry(word.clone()).or_default();
            for synonym in &set {
                if !entry.contains(synonym) {
                    entry.push(synonym.clone());
                }
            }
        }

        self
    }
}

impl Thesaurus for SynonymThesaurus {
    fn expand(&self, token: &str) -> Vec<String> {
        let mut expanded = vec![token.to_string()];
        if let Some(synonyms) = self.synonyms.get(token) {
            let mut seen: HashSet<&str> = HashSet::from([token]);
            for synonym in synonyms {
                if seen.insert(synonym.as_str()) {
                    expanded.push(synonym.clone());
                }
            }
        }
        expanded
    }
}
