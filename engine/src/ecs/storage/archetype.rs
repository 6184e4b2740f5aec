use std::fmt;

use fixedbitset::FixedBitSet;

use crate::ecs::{
    component::{Component, Spec},
    entity::Entity,
    storage::heap::{self, CHUNK_SIZE, Heap, StructHeap},
    world,
};

/// The identifier of an archetype within one store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new Id with the given unique identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the index for this Id.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// The structural signature of an archetype: its component types plus its tags.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ArchetypeKey {
    pub components: Spec,
    pub tags: Spec,
}

impl ArchetypeKey {
    /// The key of the default archetype: no components, no tags.
    pub const EMPTY: Self = Self {
        components: Spec::EMPTY,
        tags: Spec::EMPTY,
    };

    #[inline]
    pub fn new(components: Spec, tags: Spec) -> Self {
        Self { components, tags }
    }

    #[inline]
    pub fn with_component(&self, id: world::TypeId) -> Self {
        Self::new(self.components.with(id), self.tags.clone())
    }

    #[inline]
    pub fn without_component(&self, id: world::TypeId) -> Self {
        Self::new(self.components.without(id), self.tags.clone())
    }

    #[inline]
    pub fn with_tags(&self, tags: &Spec) -> Self {
        Self::new(self.components.clone(), self.tags.union(tags))
    }

    #[inline]
    pub fn without_tags(&self, tags: &Spec) -> Self {
        Self::new(self.components.clone(), self.tags.difference(tags))
    }
}

impl fmt::Display for ArchetypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, id) in self.components.ids().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id.index())?;
        }
        if !self.tags.is_empty() {
            write!(f, " | #")?;
            for (i, id) in self.tags.ids().iter().enumerate() {
                if i > 0 {
                    write!(f, ", #")?;
                }
                write!(f, "{}", id.index())?;
            }
        }
        write!(f, "]")
    }
}

/// A set of same-shaped entities stored as parallel component columns.
///
/// Invariant: `entities[i]` and row `i` of every heap describe the same entity. Heaps are ordered
/// like `key.components`, so the column of a type is found by binary search in the key.
pub struct Archetype {
    id: Id,
    key: ArchetypeKey,
    component_bits: FixedBitSet,
    tag_bits: FixedBitSet,
    entities: Vec<Entity>,
    heaps: Vec<Box<dyn Heap>>,
    /// Least common multiple of the lane counts of all columns.
    lanes: usize,
}

impl Archetype {
    /// Create an empty archetype with one column per component of `key`.
    ///
    /// `infos` must describe `key.components` in spec order.
    pub fn new(id: Id, key: ArchetypeKey, infos: &[world::TypeInfo]) -> Self {
        debug_assert_eq!(infos.len(), key.components.len());
        let heaps = infos
            .iter()
            .map(|info| {
                let factory = info
                    .heap_factory()
                    .unwrap_or_else(|| panic!("'{}' is not a component type", info.name()));
                factory(info.id())
            })
            .collect();
        let lanes = infos
            .iter()
            .fold(1, |lanes, info| crate::ecs::util::lcm(lanes, info.lanes()));

        Self {
            id,
            component_bits: key.components.to_bitset(),
            tag_bits: key.tags.to_bitset(),
            key,
            entities: Vec::new(),
            heaps,
            lanes,
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    #[inline]
    pub fn key(&self) -> &ArchetypeKey {
        &self.key
    }

    #[inline]
    pub fn component_bits(&self) -> &FixedBitSet {
        &self.component_bits
    }

    #[inline]
    pub fn tag_bits(&self) -> &FixedBitSet {
        &self.tag_bits
    }

    /// Number of entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of completely filled chunks.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.len() / CHUNK_SIZE
    }

    /// Number of entities in the trailing partial chunk.
    #[inline]
    pub fn chunk_rest(&self) -> usize {
        self.len() % CHUNK_SIZE
    }

    /// Alignment, in rows, that parallel sections of this archetype's chunks respect.
    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The entity at `index`.
    #[inline]
    pub fn entity(&self, index: usize) -> Option<Entity> {
        self.entities.get(index).copied()
    }

    /// Column position of a component type.
    #[inline]
    pub fn heap_index(&self, id: world::TypeId) -> Option<usize> {
        self.key.components.position(id)
    }

    #[inline]
    pub fn heap(&self, id: world::TypeId) -> Option<&dyn Heap> {
        self.heap_index(id).map(|i| self.heaps[i].as_ref())
    }

    #[inline]
    pub fn heap_mut(&mut self, id: world::TypeId) -> Option<&mut dyn Heap> {
        let index = self.heap_index(id)?;
        let heap: &mut dyn Heap = self.heaps[index].as_mut();
        Some(heap)
    }

    /// Typed column access.
    pub fn struct_heap<C: Component>(&self, id: world::TypeId) -> Option<&StructHeap<C>> {
        self.heap(id).map(heap::downcast::<C>)
    }

    pub fn struct_heap_mut<C: Component>(
        &mut self,
        id: world::TypeId,
    ) -> Option<&mut StructHeap<C>> {
        self.heap_mut(id).map(heap::downcast_mut::<C>)
    }

    /// Split borrow used by chunk iteration: the key and entity ids stay readable while the
    /// columns are handed out mutably.
    #[inline]
    pub(crate) fn split_mut(&mut self) -> (&ArchetypeKey, &[Entity], &mut [Box<dyn Heap>]) {
        (&self.key, &self.entities, &mut self.heaps)
    }

    /// Append an entity with default values in every column. Returns its row.
    ///
    /// Callers overwrite the defaults with the real component values.
    pub fn add_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        for heap in self.heaps.iter_mut() {
            heap.push_default();
        }
        self.entities.len() - 1
    }

    /// Append a copy of the row at `index` for `entity`. Returns the new row.
    pub fn clone_entity(&mut self, index: usize, entity: Entity) -> usize {
        self.entities.push(entity);
        for heap in self.heaps.iter_mut() {
            heap.push_clone(index);
        }
        self.entities.len() - 1
    }

    /// Swap-remove the entity at `index`: the last entity's components are moved into `index`.
    ///
    /// Returns the entity that now occupies `index`, or `None` when `index` was the last row.
    /// The caller updates the node of the returned entity.
    pub fn move_last_components_to(&mut self, index: usize) -> Option<Entity> {
        debug_assert!(index < self.entities.len(), "row index out of bounds");
        self.entities.swap_remove(index);
        for heap in self.heaps.iter_mut() {
            heap.swap_remove(index);
        }

        #[cfg(debug_assertions)]
        self.verify_invariants();

        self.entities.get(index).copied()
    }

    /// Remove the entity at `index`. Alias of [`move_last_components_to`](Self::move_last_components_to).
    #[inline]
    pub fn remove_entity(&mut self, index: usize) -> Option<Entity> {
        self.move_last_components_to(index)
    }

    /// Move the entity at `index` into `target`.
    ///
    /// Components present in both signatures are moved, components only present in `target`
    /// get their default value and the rest are dropped. The entity is swap-removed from `self`.
    /// Returns the entity's row in `target` and the entity moved into `index`, if any.
    pub fn move_entity_to(&mut self, index: usize, target: &mut Archetype) -> (usize, Option<Entity>) {
        debug_assert!(index < self.entities.len(), "row index out of bounds");
        let entity = self.entities[index];
        target.entities.push(entity);

        for target_heap in target.heaps.iter_mut() {
            match self.key.components.position(target_heap.component_id()) {
                Some(pos) => self.heaps[pos].move_to(index, target_heap.as_mut()),
                None => target_heap.push_default(),
            }
        }
        for heap in self.heaps.iter_mut() {
            if !target.key.components.contains(heap.component_id()) {
                heap.swap_remove(index);
            }
        }
        self.entities.swap_remove(index);

        #[cfg(debug_assertions)]
        {
            self.verify_invariants();
            target.verify_invariants();
        }

        (target.entities.len() - 1, self.entities.get(index).copied())
    }

    /// Verify that all columns have the same length as entities.
    ///
    /// # Panics
    /// Panics if any column length doesn't match the entity count.
    pub fn verify_invariants(&self) {
        let expected_len = self.entities.len();
        for (i, heap) in self.heaps.iter().enumerate() {
            assert_eq!(
                heap.len(),
                expected_len,
                "Column {} length {} doesn't match entity count {}",
                i,
                heap.len(),
                expected_len
            );
        }
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("key", &self.key.to_string())
            .field("len", &self.len())
            .finish()
    }
}
