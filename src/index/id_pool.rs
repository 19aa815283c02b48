use std::collections::VecDeque;
use crate::core::types::DocumentId;

/// Hands out dense document ids, reusing released ones first.
#[derive(Debug, Clone, Default)]
pub struct IdPool {
    next: u32,
    released: VecDeque<u32>,
}

impl IdPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> DocumentId {
        match self.released.pop_front() {
            Some(id) => DocumentId(id),
            None => {
                let id = self.next;
                self.next += 1;
                DocumentId(id)
            }
        }
    }

    pub fn release(&mut self, id: DocumentId) {
        debug_assert!(id.0 < self.next && !self.released.contains(&id.0));
        self.released.push_back(id.0);
    }

    /// Ids currently in use.
    pub fn allocated_count(&self) -> usize {
        self.next as usize - self.released.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_ids_are_reused_in_release_order() {
        let mut pool = IdPool::new();
        let a = pool.allocate();
        let b = pool.allocate();
        let c = pool.allocate();
        assert_eq!((a.0, b.0, c.0), (0, 1, 2));

        pool.release(c);
        pool.release(a);
        assert_eq!(pool.allocated_count(), 1);
        assert_eq!(pool.allocate(), c);
        assert_eq!(pool.allocate(), a);
        assert_eq!(pool.allocate(), DocumentId(3));
    }
}
