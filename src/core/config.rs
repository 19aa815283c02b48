use std::time::Duration;

/// Operator used to join adjacent query terms that have no explicit operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOperator {
    And,
    Or,
}

/// What to do when a key that is already indexed is added again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKeyBehavior {
    Replace,  // Remove the old document, then index the new one
    Throw,    // Fail with a consistency error
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    // Trie layout
    pub intra_node_text_support_from_depth: usize,  // 0 = always, usize::MAX = never

    // Query parsing
    pub default_join_operator: JoinOperator,
    pub near_default_tolerance: u32,
    pub fuzzy_max_edit_distance: u16,
    pub fuzzy_max_sequential_edits: u16,

    // Writes
    pub duplicate_key_behavior: DuplicateKeyBehavior,
    pub write_lock_timeout: Duration,

    // Reads
    pub navigator_pool_capacity: usize,
    pub bm25_k1: f64,
    pub bm25_b: f64,

    // Prefix applied to field names produced by dynamic field readers
    pub dynamic_field_prefix: String,
}

impl IndexConfig {
    /// Whether a node reached after `depth` characters may hold intra-node text.
    pub fn supports_intra_node_text(&self, depth: usize) -> bool {
        depth >= self.intra_node_text_support_from_depth
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            intra_node_text_support_from_depth: 4,

            default_join_operator: JoinOperator::And,
            near_default_tolerance: 5,
            fuzzy_max_edit_distance: 4,
            fuzzy_max_sequential_edits: 1,

            duplicate_key_behavior: DuplicateKeyBehavior::Replace,
            write_lock_timeout: Duration::from_secs(10),

            navigator_pool_capacity: 16,
            bm25_k1: 1.2,
            bm25_b: 0.75,

            dynamic_field_prefix: String::new(),
        }
    }
}
