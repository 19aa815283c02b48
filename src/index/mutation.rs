use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use log::trace;
use crate::core::types::{DocumentId, FieldId, IndexedToken, TokenLocation};
use crate::index::child_map::ChildNodeMap;
use crate::index::match_map::DocumentTokenMatchMap;
use crate::index::node::IndexNode;

/// Staged changes to one node's match map. The working copy shares
/// structure with the original until the first write touches it.
#[derive(Debug, Default)]
pub struct DocumentTokenMatchMapMutation {
    matches: Option<DocumentTokenMatchMap>,
}

impl DocumentTokenMatchMapMutation {
    pub fn is_mutated(&self) -> bool {
        self.matches.is_some()
    }

    fn working(&mut self, original: Option<&DocumentTokenMatchMap>) -> &mut DocumentTokenMatchMap {
        self.matches.get_or_insert_with(|| original.cloned().unwrap_or_default())
    }

    pub fn add(
        &mut self,
        original: Option<&DocumentTokenMatchMap>,
        document_id: DocumentId,
        token: IndexedToken,
    ) {
        self.working(original).add(document_id, token);
    }

    /// Returns true if the document had matches here.
    pub fn remove(&mut self, original: Option<&DocumentTokenMatchMap>, document_id: DocumentId) -> bool {
        if let Some(matches) = &mut self.matches {
            return matches.remove(document_id);
        }
        original.is_some_and(|m| m.contains(document_id)) && self.working(original).remove(document_id)
    }

    /// True if any document survives once the staged changes are applied.
    pub fn has_matches(&self, original: Option<&DocumentTokenMatchMap>) -> bool {
        match &self.matches {
            Some(matches) => !matches.is_empty(),
            None => original.is_some_and(|m| !m.is_empty()),
        }
    }

    pub fn apply(self, original: Option<&DocumentTokenMatchMap>) -> DocumentTokenMatchMap {
        self.matches
            .or_else(|| original.cloned())
            .unwrap_or_default()
    }
}

/// Staged child nodes, keyed by edge character. Children not listed here are
/// taken unchanged from the original node.
#[derive(Debug, Default)]
pub struct ChildNodeMapMutation {
    mutated: BTreeMap<char, IndexNodeMutation>,
}

impl ChildNodeMapMutation {
    pub fn is_mutated(&self) -> bool {
        !self.mutated.is_empty()
    }

    pub fn get_mut(&mut self, ch: char) -> Option<&mut IndexNodeMutation> {
        self.mutated.get_mut(&ch)
    }

    pub fn contains(&self, ch: char) -> bool {
        self.mutated.contains_key(&ch)
    }

    pub fn insert(&mut self, ch: char, mutation: IndexNodeMutation) {
        self.mutated.insert(ch, mutation);
    }

    pub fn apply(self, original: Option<&ChildNodeMap>) -> ChildNodeMap {
        let mut applied: BTreeMap<char, Arc<IndexNode>> = self.mutated
            .into_iter()
            .map(|(ch, mutation)| (ch, mutation.apply()))
            .collect();

        let mut entries = Vec::with_capacity(original.map_or(0, ChildNodeMap::len) + applied.len());
        if let Some(original) = original {
            for (ch, node) in original.iter() {
                match applied.remove(ch) {
                    // Empty nodes are pruned rather than recreated
                    Some(replacement) => {
                        if !replacement.is_empty() {
                            entries.push((*ch, replacement));
                        }
                    }
                    None => entries.push((*ch, node.clone())),
                }
            }
        }

        entries.extend(applied.into_iter().filter(|(_, node)| !node.is_empty()));
        entries.sort_unstable_by_key(|(ch, _)| *ch);
        ChildNodeMap::new(entries)
    }
}

/// Copy-on-write staging for one trie node. Created lazily the first time a
/// change reaches the node; unchanged subtrees are never copied.
#[derive(Debug, Default)]
pub struct IndexNodeMutation {
    depth: usize,                       // Characters consumed before this node's text
    original: Option<Arc<IndexNode>>,   // Source of unmutated children and matches
    intra_node_text: Vec<char>,
    text_mutated: bool,
    children: ChildNodeMapMutation,
    matches: DocumentTokenMatchMapMutation,
}

impl IndexNodeMutation {
    pub fn new(depth: usize) -> Self {
        IndexNodeMutation { depth, ..Default::default() }
    }

    pub fn from_original(original: Arc<IndexNode>, depth: usize) -> Self {
        IndexNodeMutation {
            depth,
            intra_node_text: original.intra_node_text().to_vec(),
            original: Some(original),
            ..Default::default()
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_mutated(&self) -> bool {
        self.text_mutated || self.children.is_mutated() || self.matches.is_mutated()
    }

    fn original_children(&self) -> Option<&ChildNodeMap> {
        self.original.as_deref().map(IndexNode::children)
    }

    fn original_matches(&self) -> Option<&DocumentTokenMatchMap> {
        self.original.as_deref().map(IndexNode::matches)
    }

    fn is_empty(&self) -> bool {
        let has_children = self.children.is_mutated()
            || self.original_children().is_some_and(|c| !c.is_empty());
        !has_children && !self.matches.has_matches(self.original_matches())
    }

    fn child_depth(&self) -> usize {
        self.depth + self.intra_node_text.len() + 1
    }

    /// Index one token occurrence set for a document, starting at this node.
    pub fn index(
        &mut self,
        document_id: DocumentId,
        field_id: FieldId,
        locations: &[TokenLocation],
        remaining: &[char],
        intra_text_from_depth: usize,
    ) {
        if self.depth >= intra_text_from_depth {
            self.index_with_intra_node_text(document_id, field_id, locations, remaining, intra_text_from_depth);
        } else {
            self.index_from_character(document_id, field_id, locations, remaining, intra_text_from_depth);
        }
    }

    fn index_from_character(
        &mut self,
        document_id: DocumentId,
        field_id: FieldId,
        locations: &[TokenLocation],
        remaining: &[char],
        intra_text_from_depth: usize,
    ) {
        match remaining.split_first() {
            None => self.add_match(document_id, field_id, locations),
            Some((&ch, rest)) => {
                self.get_or_create_child(ch)
                    .index(document_id, field_id, locations, rest, intra_text_from_depth);
            }
        }
    }

    fn index_with_intra_node_text(
        &mut self,
        document_id: DocumentId,
        field_id: FieldId,
        locations: &[TokenLocation],
        remaining: &[char],
        intra_text_from_depth: usize,
    ) {
        if self.intra_node_text.is_empty() {
            if !remaining.is_empty() && self.is_empty() {
                // A fresh leaf takes the whole tail in one step
                self.intra_node_text = remaining.to_vec();
                self.text_mutated = true;
                self.add_match(document_id, field_id, locations);
            } else {
                self.index_from_character(document_id, field_id, locations, remaining, intra_text_from_depth);
            }
            return;
        }

        let shared = self.intra_node_text
            .iter()
            .zip(remaining)
            .take_while(|(a, b)| a == b)
            .count();

        if shared < self.intra_node_text.len() {
            self.split_at(shared);
        }

        // `shared` chars of the (possibly shortened) text are now consumed
        self.index_from_character(document_id, field_id, locations, &remaining[shared..], intra_text_from_depth);
    }

    /// Split so that this node keeps `intra_node_text[..at]` and a new child
    /// keyed by `intra_node_text[at]` inherits the rest, with all of this
    /// node's children and matches.
    fn split_at(&mut self, at: usize) {
        debug_assert!(at < self.intra_node_text.len());
        trace!("splitting intra-node text at depth {} offset {}", self.depth, at);

        let edge = self.intra_node_text[at];
        let child = IndexNodeMutation {
            depth: self.depth + at + 1,
            original: self.original.take(),
            intra_node_text: self.intra_node_text[at + 1..].to_vec(),
            text_mutated: true,
            children: mem::take(&mut self.children),
            matches: mem::take(&mut self.matches),
        };

        self.intra_node_text.truncate(at);
        self.text_mutated = true;
        self.children.insert(edge, child);
    }

    fn get_or_create_child(&mut self, ch: char) -> &mut IndexNodeMutation {
        if !self.children.contains(ch) {
            let depth = self.child_depth();
            let mutation = match self.original_children().and_then(|c| c.get(ch)) {
                Some(original) => IndexNodeMutation::from_original(original.clone(), depth),
                None => IndexNodeMutation::new(depth),
            };
            self.children.insert(ch, mutation);
        }

        match self.children.get_mut(ch) {
            Some(child) => child,
            None => unreachable!("child was inserted above"),
        }
    }

    fn add_match(&mut self, document_id: DocumentId, field_id: FieldId, locations: &[TokenLocation]) {
        let original = self.original.as_deref().map(IndexNode::matches);
        self.matches.add(original, document_id, IndexedToken::new(field_id, locations.to_vec()));
    }

    /// Remove every match for the document at or below this node. Only
    /// branches that actually contain the document become mutations.
    pub fn remove(&mut self, document_id: DocumentId) -> bool {
        let original_matches = self.original.as_deref().map(IndexNode::matches);
        let mut removed = self.matches.remove(original_matches, document_id);

        for child in self.children.mutated.values_mut() {
            removed |= child.remove(document_id);
        }

        let child_depth = self.child_depth();
        if let Some(original) = &self.original {
            for (ch, child) in original.children().iter() {
                if self.children.contains(*ch) {
                    continue;
                }
                if let Some(mutation) = Self::remove_from_original(child, document_id, child_depth) {
                    self.children.insert(*ch, mutation);
                    removed = true;
                }
            }
        }

        removed
    }

    fn remove_from_original(node: &Arc<IndexNode>, document_id: DocumentId, depth: usize) -> Option<Self> {
        let child_depth = depth + node.intra_node_text().len() + 1;
        let mut child_mutations = BTreeMap::new();
        for (ch, child) in node.children().iter() {
            if let Some(mutation) = Self::remove_from_original(child, document_id, child_depth) {
                child_mutations.insert(*ch, mutation);
            }
        }

        let has_match = node.matches().contains(document_id);
        if !has_match && child_mutations.is_empty() {
            return None;
        }

        let mut mutation = Self::from_original(node.clone(), depth);
        mutation.children.mutated = child_mutations;
        if has_match {
            mutation.matches.remove(Some(node.matches()), document_id);
        }
        Some(mutation)
    }

    /// Materialize a new immutable node. Untouched nodes come back as the
    /// very same `Arc` they were created from.
    pub fn apply(self) -> Arc<IndexNode> {
        if !self.is_mutated() {
            if let Some(original) = self.original {
                return original;
            }
        }

        let original = self.original;
        let children = self.children.apply(original.as_deref().map(IndexNode::children));
        let matches = self.matches.apply(original.as_deref().map(IndexNode::matches));

        Arc::new(IndexNode::new(self.intra_node_text, children, matches))
    }
}

/// A pending set of trie changes over one base root.
#[derive(Debug)]
pub struct IndexMutation {
    root: IndexNodeMutation,
    intra_text_from_depth: usize,
}

impl IndexMutation {
    pub fn new(root: Arc<IndexNode>, intra_text_from_depth: usize) -> Self {
        IndexMutation {
            root: IndexNodeMutation::from_original(root, 0),
            intra_text_from_depth,
        }
    }

    pub fn index(&mut self, document_id: DocumentId, field_id: FieldId, token: &str, locations: &[TokenLocation]) {
        let chars: Vec<char> = token.chars().collect();
        self.root.index(document_id, field_id, locations, &chars, self.intra_text_from_depth);
    }

    pub fn remove(&mut self, document_id: DocumentId) -> bool {
        self.root.remove(document_id)
    }

    pub fn is_mutated(&self) -> bool {
        self.root.is_mutated()
    }

    pub fn apply(self) -> Arc<IndexNode> {
        self.root.apply()
    }
}
