//! Compact variable-length id lists.
//!
//! An [`IdArray`] is a small copyable descriptor of a list of `u32` ids. Lists with zero or one
//! element live entirely inside the descriptor. Longer lists are stored in an [`IdArrayHeap`]: a
//! set of pools of fixed-capacity slots whose capacities are powers of two. A list of `n > 1` ids
//! always lives in the pool for capacity `n.next_power_of_two()`, moving to the next (or previous)
//! pool when it grows past (or shrinks below) a power of two.
//!
//! ```text
//! count 0:  IdArray { count: 0, value: - }
//! count 1:  IdArray { count: 1, value: id }
//! count 5:  IdArray { count: 5, value: slot }  ──►  pool[3] (capacity 8): slot * 8 .. slot * 8 + 5
//! ```

/// A list of ids, either empty, a single inline id or a slot in an [`IdArrayHeap`] pool.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdArray {
    count: u32,
    /// The id itself when `count == 1`, otherwise the slot within the pool for `count`.
    value: u32,
}

/// Pool index for a list of `count > 1` ids. Pool `k` holds slots of capacity `2^k`.
#[inline]
fn pool_index(count: usize) -> usize {
    count.next_power_of_two().trailing_zeros() as usize
}

impl IdArray {
    /// An empty id array.
    pub const EMPTY: Self = Self { count: 0, value: 0 };

    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The ids of this array in insertion order.
    pub fn ids<'a>(&'a self, heap: &'a IdArrayHeap) -> &'a [u32] {
        match self.count {
            0 => &[],
            1 => std::slice::from_ref(&self.value),
            n => heap.slot(pool_index(n as usize), self.value, n as usize),
        }
    }

    /// Position of `id` within this array.
    pub fn index_of(&self, id: u32, heap: &IdArrayHeap) -> Option<usize> {
        self.ids(heap).iter().position(|i| *i == id)
    }

    /// Append `id`.
    pub fn add(&mut self, id: u32, heap: &mut IdArrayHeap) {
        match self.count {
            0 => self.value = id,
            1 => {
                let slot = heap.alloc(pool_index(2));
                let ids = heap.slot_mut(pool_index(2), slot, 2);
                ids[0] = self.value;
                ids[1] = id;
                self.value = slot;
            }
            n => {
                let n = n as usize;
                let pool = pool_index(n);
                if pool_index(n + 1) != pool {
                    self.value = heap.relocate(pool, self.value, pool_index(n + 1), n);
                }
                heap.slot_mut(pool_index(n + 1), self.value, n + 1)[n] = id;
            }
        }
        self.count += 1;
    }

    /// Remove the id at `index`, keeping the order of the remaining ids.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize, heap: &mut IdArrayHeap) {
        let count = self.count as usize;
        assert!(index < count, "id array index {index} out of bounds ({count})");
        match count {
            1 => self.value = 0,
            2 => {
                let pool = pool_index(2);
                let remaining = heap.slot(pool, self.value, 2)[1 - index];
                heap.free(pool, self.value);
                self.value = remaining;
            }
            n => {
                let pool = pool_index(n);
                heap.slot_mut(pool, self.value, n).copy_within(index + 1.., index);
                if pool_index(n - 1) != pool {
                    self.value = heap.relocate(pool, self.value, pool_index(n - 1), n - 1);
                }
            }
        }
        self.count -= 1;
    }

    /// Remove `id` if present. Returns whether it was found.
    pub fn remove(&mut self, id: u32, heap: &mut IdArrayHeap) -> bool {
        match self.index_of(id, heap) {
            Some(index) => {
                self.remove_at(index, heap);
                true
            }
            None => false,
        }
    }

    /// Overwrite the id at `index`.
    pub fn set(&mut self, index: usize, id: u32, heap: &mut IdArrayHeap) {
        let count = self.count as usize;
        assert!(index < count, "id array index {index} out of bounds ({count})");
        match count {
            1 => self.value = id,
            n => heap.slot_mut(pool_index(n), self.value, n)[index] = id,
        }
    }

    /// Return the pooled storage of this array, leaving it empty.
    pub fn clear(&mut self, heap: &mut IdArrayHeap) {
        if self.count > 1 {
            heap.free(pool_index(self.count as usize), self.value);
        }
        *self = Self::EMPTY;
    }
}

/// A pool of fixed-capacity slots.
#[derive(Debug, Default)]
struct IdPool {
    ids: Vec<u32>,
    free: Vec<u32>,
}

/// Pooled storage for [`IdArray`]s with more than one id.
#[derive(Debug, Default)]
pub struct IdArrayHeap {
    pools: Vec<IdPool>,
}

impl IdArrayHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots currently in use across all pools.
    pub fn slot_count(&self) -> usize {
        self.pools
            .iter()
            .enumerate()
            .map(|(k, pool)| pool.ids.len() / (1 << k) - pool.free.len())
            .sum()
    }

    fn alloc(&mut self, pool: usize) -> u32 {
        if self.pools.len() <= pool {
            self.pools.resize_with(pool + 1, IdPool::default);
        }
        let capacity = 1usize << pool;
        let pool = &mut self.pools[pool];
        match pool.free.pop() {
            Some(slot) => slot,
            None => {
                let slot = (pool.ids.len() / capacity) as u32;
                pool.ids.resize(pool.ids.len() + capacity, 0);
                slot
            }
        }
    }

    fn free(&mut self, pool: usize, slot: u32) {
        self.pools[pool].free.push(slot);
    }

    fn slot(&self, pool: usize, slot: u32, len: usize) -> &[u32] {
        let start = slot as usize * (1 << pool);
        &self.pools[pool].ids[start..start + len]
    }

    fn slot_mut(&mut self, pool: usize, slot: u32, len: usize) -> &mut [u32] {
        let start = slot as usize * (1 << pool);
        &mut self.pools[pool].ids[start..start + len]
    }

    /// Copy the first `len` ids of a slot into a fresh slot of another pool and free the old one.
    fn relocate(&mut self, from_pool: usize, from_slot: u32, to_pool: usize, len: usize) -> u32 {
        let to_slot = self.alloc(to_pool);
        let copied: Vec<u32> = self.slot(from_pool, from_slot, len).to_vec();
        self.slot_mut(to_pool, to_slot, len).copy_from_slice(&copied);
        self.free(from_pool, from_slot);
        to_slot
    }
}
