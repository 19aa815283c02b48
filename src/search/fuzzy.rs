use std::collections::HashMap;
use crate::index::match_map::DocumentTokenMatchMap;
use crate::index::navigator::{IndexNavigator, IndexNavigatorBookmark};

/// Limits for a fuzzy match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatchOptions {
    pub max_edit_distance: u16,
    pub max_sequential_edits: u16,  // Edits allowed without an exact character in between
}

/// One indexed token within the edit limits
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub edits: u16,
    pub matches: DocumentTokenMatchMap,
}

impl FuzzyMatch {
    /// Score multiplier: exact tokens count fully, each edit dilutes.
    pub fn weight(&self) -> f64 {
        1.0 / (1.0 + self.edits as f64)
    }
}

/// Move from a bookmark by `chars`, returning the new position.
fn advance(navigator: &mut IndexNavigator, from: &IndexNavigatorBookmark, chars: &[char]) -> Option<IndexNavigatorBookmark> {
    navigator.apply_bookmark(from);
    chars.iter().all(|ch| navigator.process(*ch)).then(|| navigator.create_bookmark())
}

struct SearchState {
    bookmark: IndexNavigatorBookmark,
    word_index: usize,
    edits: u16,
    sequential_edits: u16,
}

/// Depth-first walk of the trie allowing substitutions, insertions,
/// deletions and adjacent transpositions of `word`. Each distinct token is
/// reported once, with the fewest edits that reach it.
pub fn fuzzy_match(navigator: &mut IndexNavigator, word: &str, options: FuzzyMatchOptions) -> Vec<FuzzyMatch> {
    let word: Vec<char> = word.chars().collect();
    let mut found: HashMap<(usize, usize), FuzzyMatch> = HashMap::new();
    let mut stack = vec![SearchState {
        bookmark: navigator.create_bookmark(),
        word_index: 0,
        edits: 0,
        sequential_edits: 0,
    }];

    while let Some(state) = stack.pop() {
        navigator.apply_bookmark(&state.bookmark);

        if state.word_index == word.len() && navigator.has_exact_matches() {
            if let Some(key) = navigator.position_key() {
                let better = found.get(&key).is_none_or(|existing| state.edits < existing.edits);
                if better {
                    found.insert(key, FuzzyMatch { edits: state.edits, matches: navigator.get_exact_matches() });
                }
            }
        }

        let next_characters = navigator.next_characters();
        let can_edit = state.edits < options.max_edit_distance
            && state.sequential_edits < options.max_sequential_edits;
        let edited = |bookmark, word_index| SearchState {
            bookmark,
            word_index,
            edits: state.edits + 1,
            sequential_edits: state.sequential_edits + 1,
        };

        if let Some(&expected) = word.get(state.word_index) {
            if next_characters.contains(&expected) {
                if let Some(bookmark) = advance(navigator, &state.bookmark, &[expected]) {
                    stack.push(SearchState {
                        bookmark,
                        word_index: state.word_index + 1,
                        edits: state.edits,
                        sequential_edits: 0,
                    });
                }
            }

            if can_edit {
                // Substitution
                for &ch in next_characters.iter().filter(|ch| **ch != expected) {
                    if let Some(bookmark) = advance(navigator, &state.bookmark, &[ch]) {
                        stack.push(edited(bookmark, state.word_index + 1));
                    }
                }

                // Deletion of the word character
                stack.push(edited(state.bookmark.clone(), state.word_index + 1));

                // Transposition with the following character
                if let Some(&following) = word.get(state.word_index + 1) {
                    if following != expected {
                        if let Some(bookmark) = advance(navigator, &state.bookmark, &[following, expected]) {
                            stack.push(edited(bookmark, state.word_index + 2));
                        }
                    }
                }
            }
        }

        if can_edit {
            // Insertion of an extra indexed character
            for &ch in &next_characters {
                if let Some(bookmark) = advance(navigator, &state.bookmark, &[ch]) {
                    stack.push(edited(bookmark, state.word_index));
                }
            }
        }
    }

    let mut matches: Vec<FuzzyMatch> = found.into_values().collect();
    matches.sort_by_key(|m| m.edits);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::core::types::{DocumentId, FieldId, TokenLocation};
    use crate::index::mutation::IndexMutation;
    use crate::index::node::IndexNode;

    fn navigator(words: &[(u32, &str)]) -> IndexNavigator {
        let mut mutation = IndexMutation::new(Arc::new(IndexNode::empty()), 4);
        for (doc, word) in words {
            mutation.index(DocumentId(*doc), FieldId(0), word, &[TokenLocation::new(0, 0, 1)]);
        }
        IndexNavigator::new(mutation.apply())
    }

    fn found(words: &[(u32, &str)], word: &str, max_edit_distance: u16, max_sequential_edits: u16) -> Vec<(u32, u16)> {
        let mut nav = navigator(words);
        let options = FuzzyMatchOptions { max_edit_distance, max_sequential_edits };
        let mut result: Vec<(u32, u16)> = fuzzy_match(&mut nav, word, options)
            .into_iter()
            .flat_map(|m| m.matches.document_ids().map(move |id| (id.0, m.edits)).collect::<Vec<_>>())
            .collect();
        result.sort();
        result
    }

    #[test]
    fn test_exact_word_has_no_edits() {
        assert_eq!(found(&[(1, "search")], "search", 2, 1), vec![(1, 0)]);
    }

    #[test]
    fn test_single_edit_kinds() {
        let words = [(1, "search")];
        assert_eq!(found(&words, "seerch", 1, 1), vec![(1, 1)]);  // substitution
        assert_eq!(found(&words, "searh", 1, 1), vec![(1, 1)]);   // insertion
        assert_eq!(found(&words, "searrch", 1, 1), vec![(1, 1)]); // deletion
        assert_eq!(found(&words, "saerch", 1, 1), vec![(1, 1)]);  // transposition
    }

    #[test]
    fn test_edit_distance_limit() {
        let words = [(1, "search")];
        assert!(found(&words, "saerhc", 1, 1).is_empty());
        assert_eq!(found(&words, "saerhc", 2, 1), vec![(1, 2)]);
    }

    #[test]
    fn test_sequential_edit_limit() {
        let words = [(1, "search")];
        // Two substitutions in a row
        assert!(found(&words, "sxxrch", 2, 1).is_empty());
        assert_eq!(found(&words, "sxxrch", 2, 2), vec![(1, 2)]);
        // Same count with a match in between
        assert_eq!(found(&words, "sxaxch", 2, 1), vec![(1, 2)]);
    }

    #[test]
    fn test_reports_each_token_once_with_fewest_edits() {
        let words = [(1, "cat"), (2, "cart"), (3, "dog")];
        assert_eq!(found(&words, "cat", 2, 1), vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn test_weight_dilutes_with_edits() {
        let exact = FuzzyMatch { edits: 0, matches: DocumentTokenMatchMap::empty() };
        let two = FuzzyMatch { edits: 2, matches: DocumentTokenMatchMap::empty() };
        assert_eq!(exact.weight(), 1.0);
        assert!((two.weight() - 1.0 / 3.0).abs() < 1e-12);
    }
}
