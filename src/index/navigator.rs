use std::collections::VecDeque;
use std::sync::Arc;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::match_map::{DocumentTokenMatchCollector, DocumentTokenMatchMap};
use crate::index::node::IndexNode;

/// Saved navigator position for backtracking.
#[derive(Debug, Clone)]
pub struct IndexNavigatorBookmark {
    node: Option<Arc<IndexNode>>,
    intra_node_text_position: usize,
}

impl IndexNavigatorBookmark {
    pub fn is_valid(&self) -> bool {
        self.node.is_some()
    }
}

/// Character-by-character cursor over one immutable trie version.
///
/// Once a character fails to match, the navigator is dead: every later call
/// returns false or an empty result until it is initialized again.
#[derive(Debug, Default)]
pub struct IndexNavigator {
    current: Option<Arc<IndexNode>>,
    intra_node_text_position: usize,
    navigated_text: String,   // Only meaningful until a bookmark is applied
    bookmark_applied: bool,
}

impl IndexNavigator {
    pub fn new(root: Arc<IndexNode>) -> Self {
        let mut navigator = IndexNavigator::default();
        navigator.initialize(root);
        navigator
    }

    pub fn initialize(&mut self, root: Arc<IndexNode>) {
        self.current = Some(root);
        self.intra_node_text_position = 0;
        self.navigated_text.clear();
        self.bookmark_applied = false;
    }

    /// Drop every reference to the trie; a reset navigator is
    /// indistinguishable from a newly constructed one.
    pub fn reset(&mut self) {
        self.current = None;
        self.intra_node_text_position = 0;
        self.navigated_text.clear();
        self.bookmark_applied = false;
    }

    pub fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    pub fn process(&mut self, ch: char) -> bool {
        let Some(node) = &self.current else {
            return false;
        };

        let text = node.intra_node_text();
        if self.intra_node_text_position < text.len() {
            if text[self.intra_node_text_position] == ch {
                self.intra_node_text_position += 1;
                self.navigated_text.push(ch);
                return true;
            }
            self.current = None;
            return false;
        }

        match node.children().get(ch) {
            Some(child) => {
                let child = child.clone();
                self.current = Some(child);
                self.intra_node_text_position = 0;
                self.navigated_text.push(ch);
                true
            }
            None => {
                self.current = None;
                false
            }
        }
    }

    pub fn process_str(&mut self, text: &str) -> bool {
        text.chars().all(|ch| self.process(ch))
    }

    /// Characters that `process` would accept from here.
    pub fn next_characters(&self) -> Vec<char> {
        let Some(node) = &self.current else {
            return Vec::new();
        };

        let text = node.intra_node_text();
        if self.intra_node_text_position < text.len() {
            vec![text[self.intra_node_text_position]]
        } else {
            node.children().characters().collect()
        }
    }

    fn at_token_end(&self) -> Option<&Arc<IndexNode>> {
        self.current
            .as_ref()
            .filter(|node| self.intra_node_text_position == node.intra_node_text().len())
    }

    pub fn has_exact_matches(&self) -> bool {
        self.at_token_end().is_some_and(|node| node.has_matches())
    }

    /// Documents indexed exactly at the current position.
    pub fn get_exact_matches(&self) -> DocumentTokenMatchMap {
        match self.at_token_end() {
            Some(node) => node.matches().clone(),
            None => DocumentTokenMatchMap::empty(),
        }
    }

    /// Documents indexed at or anywhere below the current position, with the
    /// locations of every matched token merged per field.
    pub fn get_exact_and_child_matches(&self) -> DocumentTokenMatchMap {
        let Some(start) = &self.current else {
            return DocumentTokenMatchMap::empty();
        };

        let mut collector = DocumentTokenMatchCollector::default();
        let mut queue: VecDeque<&Arc<IndexNode>> = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            collector.add_map(node.matches());
            queue.extend(node.children().iter().map(|(_, child)| child));
        }

        collector.finish()
    }

    /// Every complete token reachable from here, including the text already
    /// navigated. Not available after a bookmark has been applied.
    pub fn enumerate_indexed_tokens(&self) -> Result<Vec<String>> {
        if self.bookmark_applied {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "Indexed tokens cannot be enumerated after a bookmark has been applied".to_string(),
            ));
        }

        let Some(node) = &self.current else {
            return Ok(Vec::new());
        };

        let mut prefix = self.navigated_text.clone();
        prefix.extend(&node.intra_node_text()[self.intra_node_text_position..]);

        let mut tokens = Vec::new();
        Self::collect_tokens(node, &mut prefix, &mut tokens);
        Ok(tokens)
    }

    fn collect_tokens(node: &IndexNode, prefix: &mut String, tokens: &mut Vec<String>) {
        if node.has_matches() {
            tokens.push(prefix.clone());
        }

        for (ch, child) in node.children().iter() {
            let restore = prefix.len();
            prefix.push(*ch);
            prefix.extend(child.intra_node_text());
            Self::collect_tokens(child, prefix, tokens);
            prefix.truncate(restore);
        }
    }

    pub fn create_bookmark(&self) -> IndexNavigatorBookmark {
        IndexNavigatorBookmark {
            node: self.current.clone(),
            intra_node_text_position: self.intra_node_text_position,
        }
    }

    pub fn apply_bookmark(&mut self, bookmark: &IndexNavigatorBookmark) {
        self.current = bookmark.node.clone();
        self.intra_node_text_position = bookmark.intra_node_text_position;
        self.bookmark_applied = true;
    }

    /// Identity of the current position, stable for one trie version.
    pub fn position_key(&self) -> Option<(usize, usize)> {
        self.current
            .as_ref()
            .map(|node| (Arc::as_ptr(node) as usize, self.intra_node_text_position))
    }
}
