use std::sync::Arc;
use crate::index::node::IndexNode;

/// Immutable child edges of a trie node, strictly ascending by character.
/// The map itself belongs to one node version; the child nodes may be shared
/// with other versions of the trie.
#[derive(Debug, Clone, Default)]
pub struct ChildNodeMap {
    entries: Box<[(char, Arc<IndexNode>)]>,
}

impl ChildNodeMap {
    pub fn new(entries: Vec<(char, Arc<IndexNode>)>) -> Self {
        debug_assert!(
            entries.windows(2).all(|w| w[0].0 < w[1].0),
            "child characters must be strictly ascending"
        );
        ChildNodeMap { entries: entries.into_boxed_slice() }
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

    pub fn get(&self, ch: char) -> Option<&Arc<IndexNode>> {
        // Fan-out is usually tiny, so skip the binary search for 0-2 children
        match self.entries.len() {
            0 => None,
            1 => {
                let (c, node) = &self.entries[0];
                (*c == ch).then_some(node)
            }
            2 => {
                let (c0, n0) = &self.entries[0];
                if *c0 == ch {
                    return Some(n0);
                }
                let (c1, n1) = &self.entries[1];
                (*c1 == ch).then_some(n1)
            }
            _ => self.entries
                .binary_search_by(|(c, _)| c.cmp(&ch))
                .ok()
                .map(|idx| &self.entries[idx].1),
        }
    }

    pub fn contains(&self, ch: char) -> bool {
        self.get(ch).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(char, Arc<IndexNode>)> {
        self.entries.iter()
    }

    pub fn characters(&self) -> impl Iterator<Item = char> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(chars: &str) -> ChildNodeMap {
        ChildNodeMap::new(chars.chars().map(|c| (c, Arc::new(IndexNode::empty()))).collect())
    }

    #[test]
    fn test_lookup_for_each_size_class() {
        for chars in ["", "a", "ab", "abcdefg"] {
            let map = map_of(chars);
            for c in chars.chars() {
                assert!(map.contains(c), "missing {} in {:?}", c, chars);
            }
            assert!(!map.contains('z'));
        }
    }

    #[test]
    fn test_characters_are_ordered() {
        let map = map_of("bdf");
        assert_eq!(map.characters().collect::<String>(), "bdf");
        assert_eq!(map.len(), 3);
    }
}
