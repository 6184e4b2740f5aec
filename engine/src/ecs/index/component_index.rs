use std::{any::Any, marker::PhantomData};

use crate::ecs::{
    component::Component,
    entity::Entity,
    index::value_index::ValueIndex,
    storage::heap::{self, Heap},
};

/// A component whose values are tracked in a secondary index.
///
/// ```rust,ignore
/// #[derive(Component, Clone, Default)]
/// #[component(indexed)]
/// struct Name(String);
///
/// impl IndexedComponent for Name {
///     type Value = String;
///     type Index = ValueStructIndex<String>;
///
///     fn indexed_value(&self) -> String {
///         self.0.clone()
///     }
/// }
/// ```
pub trait IndexedComponent: Component {
    /// The value the index is keyed by.
    type Value: PartialEq + Clone + Send + Sync + 'static;

    /// The index implementation.
    type Index: ValueIndex<Self::Value>;

    /// Extract the indexed value from the component.
    fn indexed_value(&self) -> Self::Value;
}

/// Constructor of a type-erased index, registered per indexed component type.
pub type IndexFactory = fn() -> Box<dyn ErasedIndex>;

/// Create the index of component `T`.
pub fn new_index<T: IndexedComponent>() -> Box<dyn ErasedIndex> {
    log::debug!("creating index for {}", std::any::type_name::<T>());
    Box::new(ComponentIndex::<T>::default())
}

/// Type-erased index operations.
///
/// Values are always read from the archetype column holding the component; indexes never keep
/// their own copy of a component.
pub trait ErasedIndex: Any + Send + Sync {
    /// Index the value of the component stored at `row` of `heap` for `entity`.
    fn add_from_heap(&mut self, entity: Entity, heap: &dyn Heap, row: usize);

    /// Remove `entity` from the entry of the value stored at `row` of `heap`.
    fn remove_from_heap(&mut self, entity: Entity, heap: &dyn Heap, row: usize);

    /// Re-index `entity` after the value at `row` was overwritten. The previous value is read
    /// from the heap's stash.
    fn update_from_heap(&mut self, entity: Entity, heap: &dyn Heap, row: usize);

    /// Entities whose component links to `target`.
    fn linked(&self, target: Entity) -> Vec<Entity>;

    /// Number of distinct values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_any(&self) -> &dyn Any;
}

/// The index of one indexed component type.
pub struct ComponentIndex<T: IndexedComponent> {
    index: T::Index,
    _marker: PhantomData<fn() -> T>,
}

impl<T: IndexedComponent> Default for ComponentIndex<T> {
    fn default() -> Self {
        Self {
            index: T::Index::default(),
            _marker: PhantomData,
        }
    }
}

impl<T: IndexedComponent> ComponentIndex<T> {
    /// The underlying value index.
    #[inline]
    pub fn index(&self) -> &T::Index {
        &self.index
    }

    fn value_at(heap: &dyn Heap, row: usize) -> T::Value {
        heap::downcast::<T>(heap)
            .get(row)
            .expect("indexed row out of bounds")
            .indexed_value()
    }
}

impl<T: IndexedComponent> ErasedIndex for ComponentIndex<T> {
    fn add_from_heap(&mut self, entity: Entity, heap: &dyn Heap, row: usize) {
        let value = Self::value_at(heap, row);
        self.index.add(entity.id(), &value);
    }

    fn remove_from_heap(&mut self, entity: Entity, heap: &dyn Heap, row: usize) {
        let value = Self::value_at(heap, row);
        self.index.remove(entity.id(), &value);
    }

    fn update_from_heap(&mut self, entity: Entity, heap: &dyn Heap, row: usize) {
        let old = heap::downcast::<T>(heap)
            .stash()
            .expect("update without stashed value")
            .indexed_value();
        let new = Self::value_at(heap, row);
        self.index.update(entity.id(), &old, &new);
    }

    fn linked(&self, target: Entity) -> Vec<Entity> {
        self.index
            .linked(target.id())
            .iter()
            .map(|id| Entity::new(*id))
            .collect()
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Downcast a type-erased index to the index of `T`.
pub(crate) fn downcast<T: IndexedComponent>(index: &dyn ErasedIndex) -> &ComponentIndex<T> {
    index
        .as_any()
        .downcast_ref::<ComponentIndex<T>>()
        .expect("index type mismatch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{
        Component,
        index::ValueStructIndex,
        storage::heap::new_heap,
        world,
    };

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    #[component(indexed)]
    struct Level(u8);

    impl IndexedComponent for Level {
        type Value = u8;
        type Index = ValueStructIndex<u8>;

        fn indexed_value(&self) -> u8 {
            self.0
        }
    }

    fn heap_of(values: &[u8]) -> Box<dyn Heap> {
        let mut heap = new_heap::<Level>(world::TypeId::new(0));
        let typed = heap::downcast_mut::<Level>(heap.as_mut());
        for v in values {
            typed.push(Level(*v));
        }
        heap
    }

    #[test]
    fn derive_registers_the_index_factory() {
        // Given
        let registry = world::TypeRegistry::new();

        // When
        let id = registry.register_component::<Level>();

        // Then
        let info = registry.get_info(id).unwrap();
        assert!(info.is_indexed());
        let index = (info.index_factory().unwrap())();
        assert!(index.is_empty());
    }

    #[test]
    fn heap_operations_keep_index_in_sync() {
        // Given
        let mut index = ComponentIndex::<Level>::default();
        let mut heap = heap_of(&[1, 1, 2]);
        for row in 0..3 {
            index.add_from_heap(Entity::new(row as u32 + 1), heap.as_ref(), row);
        }

        // When
        heap::downcast_mut::<Level>(heap.as_mut()).stash_and_set(0, Level(2));
        index.update_from_heap(Entity::new(1), heap.as_ref(), 0);
        index.remove_from_heap(Entity::new(2), heap.as_ref(), 1);

        // Then
        assert!(index.index().find(&1).is_empty());
        assert_eq!(index.index().find(&2), &[3, 1]);
        assert_eq!(index.len(), 1);
        let typed: &ComponentIndex<Level> = downcast(&index as &dyn ErasedIndex);
        assert_eq!(typed.index().values(), vec![2]);
    }
}
