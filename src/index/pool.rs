use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use crossbeam::queue::ArrayQueue;
use crate::index::navigator::IndexNavigator;
use crate::index::node::IndexNode;

/// Bounded pool of navigators shared by concurrent queries. When the pool is
/// full, returning a navigator discards the oldest pooled one.
pub struct NavigatorPool {
    navigators: ArrayQueue<IndexNavigator>,
}

impl NavigatorPool {
    pub fn new(capacity: usize) -> Self {
        NavigatorPool {
            navigators: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Take a navigator positioned at `root`.
    pub fn take(&self, root: &Arc<IndexNode>) -> PooledNavigator<'_> {
        let mut navigator = self.navigators.pop().unwrap_or_default();
        navigator.initialize(root.clone());
        PooledNavigator { pool: self, navigator }
    }

    /// Navigators currently waiting for reuse.
    pub fn available(&self) -> usize {
        self.navigators.len()
    }

    pub fn capacity(&self) -> usize {
        self.navigators.capacity()
    }

    fn release(&self, mut navigator: IndexNavigator) {
        navigator.reset();
        // Displaced oldest navigator, if any, is simply dropped
        let _ = self.navigators.force_push(navigator);
    }
}

/// A navigator on loan from a [`NavigatorPool`]; goes back on drop.
pub struct PooledNavigator<'a> {
    pool: &'a NavigatorPool,
    navigator: IndexNavigator,
}

impl Deref for PooledNavigator<'_> {
    type Target = IndexNavigator;

    fn deref(&self) -> &Self::Target {
        &self.navigator
    }
}

impl DerefMut for PooledNavigator<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.navigator
    }
}

impl Drop for PooledNavigator<'_> {
    fn drop(&mut self) {
        self.pool.release(mem::take(&mut self.navigator));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocumentId, FieldId, TokenLocation};
    use crate::index::mutation::IndexMutation;

    #[test]
    fn test_navigators_are_returned_reset() {
        let pool = NavigatorPool::new(2);
        let mut mutation = IndexMutation::new(Arc::new(IndexNode::empty()), 4);
        mutation.index(DocumentId(0), FieldId(0), "hello", &[TokenLocation::new(0, 0, 5)]);
        let root = mutation.apply();

        {
            let mut navigator = pool.take(&root);
            assert!(navigator.process_str("hel"));
        }
        assert_eq!(pool.available(), 1);
        assert_eq!(Arc::strong_count(&root), 1);

        let mut navigator = pool.take(&root);
        assert_eq!(pool.available(), 0);
        assert!(navigator.process_str("hello"));
        assert!(navigator.has_exact_matches());
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = NavigatorPool::new(2);
        let root = Arc::new(IndexNode::empty());
        {
            let _a = pool.take(&root);
            let _b = pool.take(&root);
            let _c = pool.take(&root);
        }
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.capacity(), 2);
    }
}
