//! Chunked component columns.
//!
//! A [`StructHeap<T>`] stores the values of one component type for every entity of an archetype.
//! Values are kept in fixed-size chunks of [`CHUNK_SIZE`] entries. Only the last chunk may be
//! partially filled and no chunk is ever empty, so chunk `i` always covers rows
//! `i * CHUNK_SIZE .. min((i + 1) * CHUNK_SIZE, len)`.
//!
//! The [`Heap`] trait erases the component type so an archetype can own heterogeneous columns and
//! move rows between them without knowing the concrete types.

use std::any::Any;

use crate::ecs::{component::Component, world};

/// Number of entities stored per chunk.
pub const CHUNK_SIZE: usize = 512;

/// Constructor of an empty type-erased column, registered per component type.
pub type HeapFactory = fn(world::TypeId) -> Box<dyn Heap>;

/// Create an empty column for component `C`.
pub fn new_heap<C: Component>(id: world::TypeId) -> Box<dyn Heap> {
    Box::new(StructHeap::<C>::new(id))
}

/// Type-erased operations on a component column.
pub trait Heap: Any + Send + Sync {
    /// The registered type id of the stored component.
    fn component_id(&self) -> world::TypeId;

    /// Number of stored values.
    fn len(&self) -> usize;

    /// Whether the column is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append the component's default value.
    fn push_default(&mut self);

    /// Append a clone of the value at `index`.
    fn push_clone(&mut self, index: usize);

    /// Drop the value at `index`, moving the last value into its place.
    fn swap_remove(&mut self, index: usize);

    /// Swap-remove the value at `index` and append it to `target`.
    ///
    /// # Panics
    ///
    /// Panics if `target` stores a different component type.
    fn move_to(&mut self, index: usize, target: &mut dyn Heap);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A chunked column of `T` values.
#[derive(Debug)]
pub struct StructHeap<T> {
    id: world::TypeId,
    chunks: Vec<Vec<T>>,
    len: usize,
    /// Previous value of the last `stash_and_set`, read by index updates.
    stash: Option<T>,
}

impl<T: Send + Sync + 'static> StructHeap<T> {
    /// Create an empty column for the component registered as `id`.
    pub fn new(id: world::TypeId) -> Self {
        Self {
            id,
            chunks: Vec::new(),
            len: 0,
            stash: None,
        }
    }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the column is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of completely filled chunks.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.len / CHUNK_SIZE
    }

    /// Number of values in the trailing partial chunk.
    #[inline]
    pub fn chunk_rest(&self) -> usize {
        self.len % CHUNK_SIZE
    }

    /// Append a value, returning its row.
    pub fn push(&mut self, value: T) -> usize {
        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < CHUNK_SIZE => chunk.push(value),
            _ => {
                let mut chunk = Vec::with_capacity(CHUNK_SIZE);
                chunk.push(value);
                self.chunks.push(chunk);
            }
        }
        self.len += 1;
        self.len - 1
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.chunks
            .get(index / CHUNK_SIZE)
            .and_then(|chunk| chunk.get(index % CHUNK_SIZE))
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.chunks
            .get_mut(index / CHUNK_SIZE)
            .and_then(|chunk| chunk.get_mut(index % CHUNK_SIZE))
    }

    /// Overwrite the value at `index`, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn replace(&mut self, index: usize, value: T) -> T {
        let slot = self.get_mut(index).expect("heap index out of bounds");
        std::mem::replace(slot, value)
    }

    /// Overwrite the value at `index`, keeping the previous value in the stash until the next
    /// call to [`take_stash`](Self::take_stash).
    pub fn stash_and_set(&mut self, index: usize, value: T) {
        let previous = self.replace(index, value);
        self.stash = Some(previous);
    }

    /// The value replaced by the last `stash_and_set`.
    #[inline]
    pub fn stash(&self) -> Option<&T> {
        self.stash.as_ref()
    }

    pub fn take_stash(&mut self) -> Option<T> {
        self.stash.take()
    }

    /// Remove the value at `index`, moving the last value into its place.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn swap_remove_value(&mut self, index: usize) -> T {
        assert!(index < self.len, "heap index out of bounds");
        let last_chunk = self.chunks.last_mut().expect("non-empty heap has a chunk");
        let last = last_chunk.pop().expect("chunks are never empty");
        if last_chunk.is_empty() {
            self.chunks.pop();
        }
        self.len -= 1;
        if index == self.len {
            last
        } else {
            self.replace(index, last)
        }
    }

    /// The chunks of this column. Every chunk but the last holds exactly `CHUNK_SIZE` values.
    #[inline]
    pub fn chunks(&self) -> &[Vec<T>] {
        &self.chunks
    }

    #[inline]
    pub fn chunks_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.chunks
    }

    /// Iterate all values in row order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }
}

impl<T: Component> Heap for StructHeap<T> {
    #[inline]
    fn component_id(&self) -> world::TypeId {
        self.id
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn push_default(&mut self) {
        self.push(T::default());
    }

    fn push_clone(&mut self, index: usize) {
        let value = self.get(index).expect("heap index out of bounds").clone();
        self.push(value);
    }

    fn swap_remove(&mut self, index: usize) {
        self.swap_remove_value(index);
    }

    fn move_to(&mut self, index: usize, target: &mut dyn Heap) {
        let target = target
            .as_any_mut()
            .downcast_mut::<StructHeap<T>>()
            .expect("heap type mismatch");
        let value = self.swap_remove_value(index);
        target.push(value);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcast a type-erased column to its concrete type.
///
/// # Panics
///
/// Panics if the column does not store `T`.
#[inline]
pub(crate) fn downcast<T: Component>(heap: &dyn Heap) -> &StructHeap<T> {
    heap.as_any()
        .downcast_ref::<StructHeap<T>>()
        .expect("heap type mismatch")
}

#[inline]
pub(crate) fn downcast_mut<T: Component>(heap: &mut dyn Heap) -> &mut StructHeap<T> {
    heap.as_any_mut()
        .downcast_mut::<StructHeap<T>>()
        .expect("heap type mismatch")
}
