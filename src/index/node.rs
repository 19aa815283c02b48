use std::fmt::Write;
use crate::core::types::DocumentId;
use crate::index::child_map::ChildNodeMap;
use crate::index::match_map::DocumentTokenMatchMap;

/// Immutable trie node. A new version of the trie copies the nodes on the
/// path to each change and shares every other node with the previous version.
#[derive(Debug, Clone, Default)]
pub struct IndexNode {
    intra_node_text: Box<[char]>,  // Compressed run consumed before any child edge
    children: ChildNodeMap,
    matches: DocumentTokenMatchMap,
}

impl IndexNode {
    pub fn new(intra_node_text: Vec<char>, children: ChildNodeMap, matches: DocumentTokenMatchMap) -> Self {
        IndexNode {
            intra_node_text: intra_node_text.into_boxed_slice(),
            children,
            matches,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn intra_node_text(&self) -> &[char] {
        &self.intra_node_text
    }

    pub fn children(&self) -> &ChildNodeMap {
        &self.children
    }

    pub fn matches(&self) -> &DocumentTokenMatchMap {
        &self.matches
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// A node with neither children nor matches carries no information and
    /// is never kept below the root.
    pub fn is_empty(&self) -> bool {
        !self.has_children() && !self.has_matches()
    }

    pub fn contains_document(&self, document_id: DocumentId) -> bool {
        self.matches.contains(document_id)
            || self.children.iter().any(|(_, child)| child.contains_document(document_id))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|(_, child)| child.node_count()).sum::<usize>()
    }

    /// Render the subtree one node per line, for tests and debugging.
    pub fn format_tree(&self) -> String {
        let mut out = String::new();
        self.format_into(&mut out, 0, None);
        out
    }

    fn format_into(&self, out: &mut String, indent: usize, edge: Option<char>) {
        let text: String = self.intra_node_text.iter().collect();
        let _ = write!(out, "{:indent$}", "", indent = indent * 2);
        if let Some(edge) = edge {
            out.push(edge);
        }
        if !text.is_empty() {
            let _ = write!(out, " [{}]", text);
        }
        if self.has_matches() {
            let ids: Vec<String> = self.matches.document_ids().map(|id| id.0.to_string()).collect();
            let _ = write!(out, " #{}", ids.join(","));
        }
        out.push('\n');

        for (ch, child) in self.children.iter() {
            child.format_into(out, indent + 1, Some(*ch));
        }
    }
}
