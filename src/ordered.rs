//! Shared plumbing for the three policies built on an arena order list and a
//! hashbrown-raw-table index: LRU, MRU and FIFO. They differ only in which
//! end `get` reorders to (if at all) and which end `popitem` drains from;
//! everything else -- size accounting, the insert/evict loop, the hash index
//! -- is identical, so it lives here once.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};

use hashbrown::raw::RawTable;

use crate::error::CacheError;
use crate::list::OrderList;
use crate::store::{MissingFn, SizeFn};

pub(crate) struct OrderedCore<K, V> {
    table: RawTable<usize>,
    hash_builder: RandomState,
    pub(crate) order: OrderList<(K, V)>,
    sizes: OrderList<usize>, // parallel arena: sizes.get(i) is the size of order.get(i)
    pub(crate) maxsize: usize,
    pub(crate) currsize: usize,
    pub(crate) sizeof: SizeFn<V>,
    pub(crate) missing: Option<MissingFn<K, V>>,
}

impl<K: Hash + Eq + Clone, V> OrderedCore<K, V> {
    pub(crate) fn with_capacity(maxsize: usize, sizeof: SizeFn<V>) -> Self {
        if maxsize == 0 {
            panic!("cache maxsize must be greater than zero");
        }
        OrderedCore {
            table: RawTable::with_capacity(maxsize),
            hash_builder: RandomState::new(),
            order: OrderList::with_capacity(maxsize),
            sizes: OrderList::with_capacity(maxsize),
            maxsize,
            currsize: 0,
            sizeof,
            missing: None,
        }
    }

    fn hash(&self, key: &K) -> u64 {
        let hasher = &mut self.hash_builder.build_hasher();
        key.hash(hasher);
        hasher.finish()
    }

    fn insert_index(&mut self, hash: u64, index: usize) {
        let Self {
            ref mut table,
            ref order,
            ref hash_builder,
            ..
        } = *self;
        table.insert(hash, index, move |&i| {
            let hasher = &mut hash_builder.build_hasher();
            order.get(i).0.hash(hasher);
            hasher.finish()
        });
    }

    pub(crate) fn find(&self, key: &K) -> Option<usize> {
        let Self { table, order, .. } = self;
        table.get(self.hash(key), |&i| *key == order.get(i).0).copied()
    }

    /// Inserts a brand new slot at the front and indexes it. Caller must
    /// already know `key` is absent.
    fn push_new(&mut self, key: K, value: V, size: usize) -> usize {
        let hash = self.hash(&key);
        let index = self.order.push_front((key, value));
        self.sizes.push_front(size);
        self.insert_index(hash, index);
        self.currsize += size;
        index
    }

    /// Removes the slot at arena index `i` from both lists and the hash
    /// index, returning the freed key/value.
    pub(crate) fn evict_at(&mut self, i: usize) -> (K, V) {
        let key = self.order.get(i).0.clone();
        let hash = self.hash(&key);
        let Self { table, order, .. } = self;
        let erased = table.erase_entry(hash, |&j| j == i && order.get(j).0 == key);
        debug_assert!(erased, "order list and hash index disagree");
        let size = self.sizes.remove(i);
        self.currsize -= size;
        self.order.remove(i)
    }

    pub(crate) fn delete(&mut self, k: &K) -> Result<V, CacheError> {
        match self.find(k) {
            Some(i) => Ok(self.evict_at(i).1),
            None => Err(CacheError::KeyNotPresent),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.table.clear();
        self.order.clear();
        self.sizes.clear();
        self.currsize = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    /// Implements the `insert` contract from the Store trait (`§4.1`):
    /// reject oversized values atomically, replace in place when the new
    /// value isn't larger, otherwise evict via `victim` until there's room.
    ///
    /// `victim` returns the arena index of the next eviction candidate; it
    /// is never called when the key being inserted already fits. `reorder`
    /// controls whether an in-place replacement also moves the entry to the
    /// front, per §4.2's "insert of an existing key … moving the node to the
    /// tail" (`Lru`/`Mru` pass `true`; `Fifo`, which never reorders on
    /// access, passes `false`).
    pub(crate) fn insert_with_victim(
        &mut self,
        k: K,
        v: V,
        victim: impl Fn(&Self) -> Option<usize>,
        reorder: bool,
    ) -> Result<(), CacheError> {
        let size = (self.sizeof)(&v);
        if size > self.maxsize {
            return Err(CacheError::ValueTooLarge {
                size,
                maxsize: self.maxsize,
            });
        }
        if let Some(i) = self.find(&k) {
            let old_size = *self.sizes.get(i);
            if old_size >= size {
                self.order.set(i, (k, v));
                self.sizes.set(i, size);
                self.currsize -= old_size - size;
                if reorder {
                    self.order.move_to_front(i);
                }
                return Ok(());
            }
            // Larger replacement: free the old slot first, evict until the
            // new size fits, then reinsert fresh at the front.
            self.evict_at(i);
            while self.currsize + size > self.maxsize {
                match victim(self) {
                    Some(vi) => {
                        self.evict_at(vi);
                    }
                    None => break,
                }
            }
            self.push_new(k, v, size);
            return Ok(());
        }
        while self.currsize + size > self.maxsize {
            match victim(self) {
                Some(vi) => {
                    self.evict_at(vi);
                }
                None => break,
            }
        }
        self.push_new(k, v, size);
        Ok(())
    }
}
