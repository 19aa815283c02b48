use std::collections::HashSet;
use std::fmt;
use crate::analysis::tokenizer::IndexTokenizer;
use crate::index::match_map::{DocumentTokenMatchCollector, DocumentTokenMatchMap};
use crate::index::navigator::{IndexNavigator, IndexNavigatorBookmark};

pub const MULTI_CHARACTER_WILDCARD: char = '*';
pub const SINGLE_CHARACTER_WILDCARD: char = '%';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardFragment {
    Text(String),
    AnyRun,          // `*`: zero or more characters
    SingleCharacter, // `%`: exactly one character
}

impl fmt::Display for WildcardFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WildcardFragment::Text(text) => write!(f, "{}", text),
            WildcardFragment::AnyRun => write!(f, "{}", MULTI_CHARACTER_WILDCARD),
            WildcardFragment::SingleCharacter => write!(f, "{}", SINGLE_CHARACTER_WILDCARD),
        }
    }
}

pub fn contains_wildcard(text: &str) -> bool {
    text.contains([MULTI_CHARACTER_WILDCARD, SINGLE_CHARACTER_WILDCARD])
}

/// Split a query word into wildcard fragments. Consecutive `*` collapse into
/// one run; consecutive `%` each count for one character.
pub fn parse_fragments(text: &str) -> Vec<WildcardFragment> {
    let mut fragments = Vec::new();
    let mut literal = String::new();

    for ch in text.chars() {
        let wildcard = match ch {
            MULTI_CHARACTER_WILDCARD => WildcardFragment::AnyRun,
            SINGLE_CHARACTER_WILDCARD => WildcardFragment::SingleCharacter,
            _ => {
                literal.push(ch);
                continue;
            }
        };

        if !literal.is_empty() {
            fragments.push(WildcardFragment::Text(std::mem::take(&mut literal)));
        }
        if wildcard == WildcardFragment::AnyRun && fragments.last() == Some(&WildcardFragment::AnyRun) {
            continue;
        }
        fragments.push(wildcard);
    }

    if !literal.is_empty() {
        fragments.push(WildcardFragment::Text(literal));
    }
    fragments
}

/// Run the literal parts of the pattern through a tokenizer's normalization
/// so they line up with indexed token values.
pub fn normalize_fragments(fragments: &[WildcardFragment], tokenizer: &dyn IndexTokenizer) -> Vec<WildcardFragment> {
    fragments
        .iter()
        .map(|fragment| match fragment {
            WildcardFragment::Text(text) => WildcardFragment::Text(tokenizer.normalize(text)),
            other => other.clone(),
        })
        .filter(|fragment| !matches!(fragment, WildcardFragment::Text(text) if text.is_empty()))
        .collect()
}

struct PatternState {
    bookmark: IndexNavigatorBookmark,
    fragment: usize,
    offset: usize,  // Chars consumed of a text fragment
}

/// Every document indexed under a token matching the pattern, starting from
/// the navigator's current position.
pub fn match_wildcard(navigator: &mut IndexNavigator, fragments: &[WildcardFragment]) -> DocumentTokenMatchMap {
    let patterns: Vec<Vec<char>> = fragments
        .iter()
        .map(|fragment| match fragment {
            WildcardFragment::Text(text) => text.chars().collect(),
            _ => Vec::new(),
        })
        .collect();

    let mut collector = DocumentTokenMatchCollector::default();
    let mut collected = HashSet::new();
    let mut visited = HashSet::new();
    let mut stack = vec![PatternState {
        bookmark: navigator.create_bookmark(),
        fragment: 0,
        offset: 0,
    }];

    while let Some(state) = stack.pop() {
        navigator.apply_bookmark(&state.bookmark);
        let Some(position) = navigator.position_key() else {
            continue;
        };
        if !visited.insert((position, state.fragment, state.offset)) {
            continue;
        }

        if state.fragment == fragments.len() {
            if collected.insert(position) && navigator.has_exact_matches() {
                collector.add_map(&navigator.get_exact_matches());
            }
            continue;
        }

        match &fragments[state.fragment] {
            WildcardFragment::Text(_) => {
                let text = &patterns[state.fragment];
                if navigator.process(text[state.offset]) {
                    let (fragment, offset) = if state.offset + 1 == text.len() {
                        (state.fragment + 1, 0)
                    } else {
                        (state.fragment, state.offset + 1)
                    };
                    stack.push(PatternState { bookmark: navigator.create_bookmark(), fragment, offset });
                }
            }
            WildcardFragment::SingleCharacter => {
                for ch in navigator.next_characters() {
                    navigator.apply_bookmark(&state.bookmark);
                    if navigator.process(ch) {
                        stack.push(PatternState {
                            bookmark: navigator.create_bookmark(),
                            fragment: state.fragment + 1,
                            offset: 0,
                        });
                    }
                }
            }
            WildcardFragment::AnyRun if state.fragment + 1 == fragments.len() => {
                // Trailing run: everything at and below this position
                if collected.insert(position) {
                    collector.add_map(&navigator.get_exact_and_child_matches());
                }
            }
            WildcardFragment::AnyRun => {
                stack.push(PatternState {
                    bookmark: state.bookmark.clone(),
                    fragment: state.fragment + 1,
                    offset: 0,
                });
                for ch in navigator.next_characters() {
                    navigator.apply_bookmark(&state.bookmark);
                    if navigator.process(ch) {
                        stack.push(PatternState {
                            bookmark: navigator.create_bookmark(),
                            fragment: state.fragment,
                            offset: 0,
                        });
                    }
                }
            }
        }
    }

    collector.finish()
}
