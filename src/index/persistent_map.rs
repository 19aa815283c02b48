use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;
use crate::core::types::DocumentId;

const BITS_PER_LEVEL: u32 = 5;
const LEVEL_MASK: u64 = (1 << BITS_PER_LEVEL) - 1;

/// Maps a key onto the bit path it is stored under. Paths are consumed most
/// significant bits first, so keys whose paths sort in key order also
/// iterate in key order.
pub trait KeyPath<K> {
    const BITS: u32;

    fn path(key: &K) -> u64;
}

/// Document ids, iterated in ascending order.
pub struct DocumentIdPath;

impl KeyPath<DocumentId> for DocumentIdPath {
    const BITS: u32 = 32;

    fn path(key: &DocumentId) -> u64 {
        key.0 as u64
    }
}

/// Any hashable key, iterated in hash order.
pub struct HashPath;

impl<K: Hash> KeyPath<K> for HashPath {
    const BITS: u32 = 64;

    fn path(key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone)]
struct Leaf<K, V> {
    path: u64,
    entries: Vec<(K, V)>,  // More than one only when full paths collide
}

enum Slot<K, V> {
    Leaf(Arc<Leaf<K, V>>),
    Branch(Arc<Node<K, V>>),
}

impl<K, V> Clone for Slot<K, V> {
    fn clone(&self) -> Self {
        match self {
            Slot::Leaf(leaf) => Slot::Leaf(leaf.clone()),
            Slot::Branch(node) => Slot::Branch(node.clone()),
        }
    }
}

/// 32-way node holding only its occupied slots, in chunk order.
struct Node<K, V> {
    bitmap: u32,
    slots: Vec<Slot<K, V>>,
}

impl<K, V> Clone for Node<K, V> {
    fn clone(&self) -> Self {
        Node { bitmap: self.bitmap, slots: self.slots.clone() }
    }
}

impl<K, V> Default for Node<K, V> {
    fn default() -> Self {
        Node { bitmap: 0, slots: Vec::new() }
    }
}

impl<K, V> Node<K, V> {
    fn position(&self, bit: u32) -> usize {
        (self.bitmap & (bit - 1)).count_ones() as usize
    }

    fn slot(&self, chunk: u32) -> Option<&Slot<K, V>> {
        let bit = 1 << chunk;
        if self.bitmap & bit == 0 {
            return None;
        }
        Some(&self.slots[self.position(bit)])
    }
}

/// Immutable map with structural sharing. Cloning is O(1); a write copies
/// only the nodes on the path to the changed key, so older clones stay valid
/// and share everything else.
pub struct PersistentMap<K, V, P> {
    root: Arc<Node<K, V>>,
    len: usize,
    _path: PhantomData<fn() -> P>,
}

pub type DocumentIdMap<V> = PersistentMap<DocumentId, V, DocumentIdPath>;
pub type HashedMap<K, V> = PersistentMap<K, V, HashPath>;

impl<K, V, P> Clone for PersistentMap<K, V, P> {
    fn clone(&self) -> Self {
        PersistentMap { root: self.root.clone(), len: self.len, _path: PhantomData }
    }
}

impl<K, V, P> Default for PersistentMap<K, V, P> {
    fn default() -> Self {
        PersistentMap { root: Arc::new(Node::default()), len: 0, _path: PhantomData }
    }
}

impl<K, V, P> PersistentMap<K, V, P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            stack: vec![self.root.slots.iter()],
            entries: Default::default(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_ref();
        loop {
            match node.slots.last()? {
                Slot::Branch(child) => node = child.as_ref(),
                Slot::Leaf(leaf) => return leaf.entries.last().map(|(key, value)| (key, value)),
            }
        }
    }
}

fn chunk(path: u64, level: u32, levels: u32) -> u32 {
    let shift = (levels - level - 1) * BITS_PER_LEVEL;
    ((path >> shift) & LEVEL_MASK) as u32
}

impl<K: Eq, V, P: KeyPath<K>> PersistentMap<K, V, P> {
    const LEVELS: u32 = P::BITS.div_ceil(BITS_PER_LEVEL);

    pub fn get(&self, key: &K) -> Option<&V> {
        let path = P::path(key);
        let mut node = self.root.as_ref();
        for level in 0..Self::LEVELS {
            match node.slot(chunk(path, level, Self::LEVELS))? {
                Slot::Branch(child) => node = child.as_ref(),
                Slot::Leaf(leaf) if leaf.path == path => {
                    return leaf.entries.iter().find(|(k, _)| k == key).map(|(_, value)| value);
                }
                Slot::Leaf(_) => return None,
            }
        }
        None
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K: Eq + Clone, V: Clone, P: KeyPath<K>> PersistentMap<K, V, P> {
    /// Insert or replace, returning the replaced value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let path = P::path(&key);
        let replaced = insert_at(&mut self.root, 0, Self::LEVELS, path, key, value);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        // Absent keys must not copy the path
        if !self.contains_key(key) {
            return None;
        }
        get_mut_at(&mut self.root, 0, Self::LEVELS, P::path(key), key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.contains_key(key) {
            return None;
        }
        let removed = remove_at(&mut self.root, 0, Self::LEVELS, P::path(key), key);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }
}

fn insert_at<K: Eq + Clone, V: Clone>(
    node: &mut Arc<Node<K, V>>,
    level: u32,
    levels: u32,
    path: u64,
    key: K,
    value: V,
) -> Option<V> {
    debug_assert!(level < levels, "distinct paths must diverge before the last level");
    let node = Arc::make_mut(node);
    let bit = 1 << chunk(path, level, levels);
    let position = node.position(bit);

    if node.bitmap & bit == 0 {
        node.bitmap |= bit;
        node.slots.insert(position, Slot::Leaf(Arc::new(Leaf { path, entries: vec![(key, value)] })));
        return None;
    }

    match &mut node.slots[position] {
        Slot::Branch(child) => insert_at(child, level + 1, levels, path, key, value),
        Slot::Leaf(leaf) if leaf.path == path => {
            let leaf = Arc::make_mut(leaf);
            match leaf.entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => Some(mem::replace(existing, value)),
                None => {
                    leaf.entries.push((key, value));
                    None
                }
            }
        }
        Slot::Leaf(leaf) => {
            // Push the resident leaf one level down and retry there
            let resident = leaf.clone();
            let mut branch = Arc::new(Node {
                bitmap: 1 << chunk(resident.path, level + 1, levels),
                slots: vec![Slot::Leaf(resident)],
            });
            let replaced = insert_at(&mut branch, level + 1, levels, path, key, value);
            node.slots[position] = Slot::Branch(branch);
            replaced
        }
    }
}

fn get_mut_at<'a, K: Eq + Clone, V: Clone>(
    node: &'a mut Arc<Node<K, V>>,
    level: u32,
    levels: u32,
    path: u64,
    key: &K,
) -> Option<&'a mut V> {
    let node = Arc::make_mut(node);
    let bit = 1 << chunk(path, level, levels);
    if node.bitmap & bit == 0 {
        return None;
    }
    let position = node.position(bit);

    match &mut node.slots[position] {
        Slot::Branch(child) => get_mut_at(child, level + 1, levels, path, key),
        Slot::Leaf(leaf) if leaf.path == path => Arc::make_mut(leaf)
            .entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value),
        Slot::Leaf(_) => None,
    }
}

/// Remove a key known to be present. Branches left holding a single leaf
/// are collapsed so the shape only depends on the keys present.
fn remove_at<K: Eq + Clone, V: Clone>(
    node: &mut Arc<Node<K, V>>,
    level: u32,
    levels: u32,
    path: u64,
    key: &K,
) -> Option<V> {
    let node = Arc::make_mut(node);
    let bit = 1 << chunk(path, level, levels);
    if node.bitmap & bit == 0 {
        return None;
    }
    let position = node.position(bit);

    let removed = match &mut node.slots[position] {
        Slot::Leaf(leaf) => {
            if leaf.path != path {
                return None;
            }
            let leaf = Arc::make_mut(leaf);
            let index = leaf.entries.iter().position(|(k, _)| k == key)?;
            let (_, value) = leaf.entries.remove(index);
            if !leaf.entries.is_empty() {
                return Some(value);
            }
            value
        }
        Slot::Branch(child) => {
            let value = remove_at(child, level + 1, levels, path, key)?;
            let lifted = match child.slots.as_slice() {
                [] => None,
                [Slot::Leaf(only)] => Some(only.clone()),
                _ => return Some(value),
            };
            if let Some(only) = lifted {
                node.slots[position] = Slot::Leaf(only);
                return Some(value);
            }
            value
        }
    };

    node.bitmap &= !bit;
    node.slots.remove(position);
    Some(removed)
}

/// Iterates entries in path order.
pub struct Iter<'a, K, V> {
    stack: Vec<std::slice::Iter<'a, Slot<K, V>>>,
    entries: std::slice::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.entries.next() {
                return Some((key, value));
            }
            match self.stack.last_mut()?.next() {
                None => {
                    self.stack.pop();
                }
                Some(Slot::Leaf(leaf)) => self.entries = leaf.entries.iter(),
                Some(Slot::Branch(node)) => self.stack.push(node.slots.iter()),
            }
        }
    }
}

impl<K: Eq + Clone, V: Clone, P: KeyPath<K>> FromIterator<(K, V)> for PersistentMap<K, V, P> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PersistentMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K: PartialEq, V: PartialEq, P> PartialEq for PersistentMap<K, V, P> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, P> Eq for PersistentMap<K, V, P> {}

impl<K: fmt::Debug, V: fmt::Debug, P> fmt::Debug for PersistentMap<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
