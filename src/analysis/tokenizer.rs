use std::collections::HashMap;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use unicode_segmentation::UnicodeSegmentation;
use crate::analysis::token::{TextFragment, TokenGroup};
use crate::core::types::TokenLocation;

/// Splits field text into normalized tokens. The index only relies on this
/// contract, never on how a tokenizer does its work.
pub trait IndexTokenizer: Send + Sync {
    /// Tokenize all fragments of one field. Token indices continue across
    /// fragments; each distinct value appears once with all of its locations.
    fn tokenize(&self, fragments: &[TextFragment]) -> Vec<TokenGroup>;

    /// Normalize a single query word without splitting it.
    fn normalize(&self, text: &str) -> String;

    fn name(&self) -> &str;
}

/// Unicode word tokenizer with optional case/accent folding and stemming
#[derive(Debug, Clone)]
pub struct StandardTokenizer {
    pub case_insensitive: bool,
    pub accent_insensitive: bool,
    pub stemming: Option<Algorithm>,
    pub max_token_length: usize,  // In chars, longer words are skipped
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            case_insensitive: true,
            accent_insensitive: true,
            stemming: None,
            max_token_length: 255,
        }
    }
}

impl StandardTokenizer {
    pub fn with_stemming(mut self, algorithm: Algorithm) -> Self {
        self.stemming = Some(algorithm);
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    fn normalize_word(&self, word: &str, stemmer: Option<&Stemmer>) -> String {
        let mut value = if self.accent_insensitive {
            word.nfd().filter(|c| !is_combining_mark(*c)).collect::<String>()
        } else {
            word.to_string()
        };

        if self.case_insensitive {
            value = value.to_lowercase();
        }

        match stemmer {
            Some(stemmer) => stemmer.stem(&value).into_owned(),
            None => value,
        }
    }
}

impl IndexTokenizer for StandardTokenizer {
    fn tokenize(&self, fragments: &[TextFragment]) -> Vec<TokenGroup> {
        let stemmer = self.stemming.map(Stemmer::create);
        let mut groups: Vec<TokenGroup> = Vec::new();
        let mut lookup: HashMap<String, usize> = HashMap::new();
        let mut token_index = 0u32;

        for fragment in fragments {
            // unicode_word_indices yields byte offsets; locations are in chars
            let mut chars_seen = 0u32;
            let mut bytes_seen = 0usize;

            for (byte_offset, word) in fragment.text.unicode_word_indices() {
                chars_seen += fragment.text[bytes_seen..byte_offset].chars().count() as u32;
                bytes_seen = byte_offset;

                let length = word.chars().count();
                if length > self.max_token_length {
                    continue;
                }

                let value = self.normalize_word(word, stemmer.as_ref());
                if value.is_empty() {
                    continue;
                }

                let location = TokenLocation::new(
                    token_index,
                    fragment.offset + chars_seen,
                    length as u32,
                );
                token_index += 1;

                match lookup.get(&value) {
                    Some(&idx) => groups[idx].locations.push(location),
                    None => {
                        lookup.insert(value.clone(), groups.len());
                        groups.push(TokenGroup::new(value, vec![location]));
                    }
                }
            }
        }

        groups
    }

    fn normalize(&self, text: &str) -> String {
        let stemmer = self.stemming.map(Stemmer::create);
        self.normalize_word(text, stemmer.as_ref())
    }

    fn name(&self) -> &str {
        "standard"
    }
}
