//! Chunked queries over archetype columns.
//!
//! An [`ArchetypeQuery`] selects the archetypes that have every component of its [`QueryData`]
//! tuple and pass its tag and component filters. Iterating it yields [`Chunk`]s: runs of at
//! most [`CHUNK_SIZE`](crate::ecs::storage::CHUNK_SIZE) entities of one archetype together
//! with one column slice per queried component type.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut query = store
//!     .query::<(Position, Velocity)>()
//!     .without_any_tags::<Frozen>()
//!     .read_only::<Velocity>();
//!
//! for mut chunk in query.chunks(&mut store) {
//!     let (positions, velocities) = chunk.columns_mut();
//!     for (p, v) in positions.as_mut_slice().iter_mut().zip(velocities.as_slice()) {
//!         p.x += v.x;
//!     }
//! }
//! ```
//!
//! # Matching
//!
//! Matching is a bit set test against each archetype's component and tag signature. The
//! matched archetypes are cached on the query; only archetypes created since the last call are
//! tested again.
//!
//! # Read-only columns
//!
//! A column marked with [`ArchetypeQuery::read_only`] is copied when its chunk is produced.
//! Reads see that copy even if the live values are written during the same pass. Columns of
//! indexed components are never writable through a query.

mod chunk;
mod column;
mod data;
mod filter;

use std::{marker::PhantomData, sync::Arc};

use fixedbitset::FixedBitSet;

pub use chunk::{Chunk, Chunks};
pub use column::{Column, ColumnCursor, ColumnSettings};
pub use data::QueryData;
pub use filter::QueryFilter;

use crate::ecs::{
    component::{Component, IntoSpec, IntoTagSpec, Spec},
    entity::Entity,
    query::filter::FilterSet,
    storage::{Archetype, archetype},
    store::EntityStore,
    world::{TypeId, TypeRegistry},
};

/// A query over the archetypes holding every component type of `D`.
pub struct ArchetypeQuery<D: QueryData> {
    registry: Arc<TypeRegistry>,
    type_ids: Vec<TypeId>,
    settings: Vec<ColumnSettings>,
    required: FixedBitSet,
    filter: QueryFilter,
    /// Matched archetypes, ascending.
    matched: Vec<archetype::Id>,
    /// Number of archetypes already tested.
    scanned: usize,
    store_id: Option<u64>,
    _data: PhantomData<fn() -> D>,
}

impl<D: QueryData> ArchetypeQuery<D> {
    /// Create a query using the type registry of `store`.
    pub fn new(store: &EntityStore) -> Self {
        Self::with_registry(Arc::clone(store.registry()))
    }

    /// # Panics
    /// Panics if `D` names a component type more than once.
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        let type_ids = D::type_ids(&registry);
        let mut required = FixedBitSet::new();
        let mut settings = Vec::with_capacity(type_ids.len());
        for id in &type_ids {
            let info = registry.get_info(*id).expect("query types are registered");
            required.grow(id.index() + 1);
            assert!(
                !required.put(id.index()),
                "query requests {} more than once",
                info.name()
            );
            settings.push(ColumnSettings {
                snapshot: false,
                writable: !info.is_indexed(),
                name: info.name(),
            });
        }

        Self {
            registry,
            type_ids,
            settings,
            required,
            filter: QueryFilter::default(),
            matched: Vec::new(),
            scanned: 0,
            store_id: None,
            _data: PhantomData,
        }
    }

    fn filtered(mut self, set: FilterSet, spec: Spec) -> Self {
        for id in spec.ids() {
            self.filter.insert(set, *id);
        }
        self.invalidate();
        self
    }

    /// Only archetypes with all of the tags `T`.
    pub fn all_tags<T: IntoTagSpec>(self) -> Self {
        let spec = T::into_tag_spec(&self.registry);
        self.filtered(FilterSet::AllTags, spec)
    }

    /// Only archetypes with at least one of the tags `T`.
    pub fn any_tags<T: IntoTagSpec>(self) -> Self {
        let spec = T::into_tag_spec(&self.registry);
        self.filtered(FilterSet::AnyTags, spec)
    }

    /// Exclude archetypes having all of the tags `T`.
    pub fn without_all_tags<T: IntoTagSpec>(self) -> Self {
        let spec = T::into_tag_spec(&self.registry);
        self.filtered(FilterSet::WithoutAllTags, spec)
    }

    /// Exclude archetypes having any of the tags `T`.
    pub fn without_any_tags<T: IntoTagSpec>(self) -> Self {
        let spec = T::into_tag_spec(&self.registry);
        self.filtered(FilterSet::WithoutAnyTags, spec)
    }

    pub fn all_components<C: IntoSpec>(self) -> Self {
        let spec = C::into_spec(&self.registry);
        self.filtered(FilterSet::AllComponents, spec)
    }

    pub fn any_components<C: IntoSpec>(self) -> Self {
        let spec = C::into_spec(&self.registry);
        self.filtered(FilterSet::AnyComponents, spec)
    }

    pub fn without_all_components<C: IntoSpec>(self) -> Self {
        let spec = C::into_spec(&self.registry);
        self.filtered(FilterSet::WithoutAllComponents, spec)
    }

    pub fn without_any_components<C: IntoSpec>(self) -> Self {
        let spec = C::into_spec(&self.registry);
        self.filtered(FilterSet::WithoutAnyComponents, spec)
    }

    /// Read the column of `C` from a per-chunk copy.
    ///
    /// # Panics
    /// Panics if `C` is not part of `D`.
    pub fn read_only<C: Component>(mut self) -> Self {
        let id = self.registry.register_component::<C>();
        let position = self
            .type_ids
            .iter()
            .position(|t| *t == id)
            .unwrap_or_else(|| panic!("{} is not queried", std::any::type_name::<C>()));
        self.settings[position].snapshot = true;
        self
    }

    /// The tag and component filters of this query.
    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    /// Registered ids of the queried component types.
    pub fn type_ids(&self) -> &[TypeId] {
        &self.type_ids
    }

    fn invalidate(&mut self) {
        self.matched.clear();
        self.scanned = 0;
    }

    fn matches(&self, archetype: &Archetype) -> bool {
        self.required.is_subset(archetype.component_bits()) && self.filter.matches(archetype)
    }

    /// Test the archetypes created since the last refresh.
    fn refresh(&mut self, store: &EntityStore) {
        assert!(
            Arc::ptr_eq(&self.registry, store.registry()),
            "query used with a store of another type registry"
        );
        if self.store_id != Some(store.store_id()) {
            self.invalidate();
            self.store_id = Some(store.store_id());
        }
        let archetypes = store.archetypes();
        for archetype in archetypes.iter().skip(self.scanned) {
            if self.matches(archetype) {
                self.matched.push(archetype.id());
            }
        }
        self.scanned = archetypes.len();
    }

    /// Ids of the archetypes matched in `store`.
    pub fn archetypes(&mut self, store: &EntityStore) -> &[archetype::Id] {
        self.refresh(store);
        &self.matched
    }

    /// Iterate the chunks of all matched archetypes.
    pub fn chunks<'a>(&'a mut self, store: &'a mut EntityStore) -> Chunks<'a, D> {
        self.refresh(store);
        Chunks::new(
            store.archetypes_mut().iter_mut(),
            &self.matched,
            &self.type_ids,
            &self.settings,
        )
    }

    /// Number of entities in matched archetypes.
    pub fn count(&mut self, store: &EntityStore) -> usize {
        self.refresh(store);
        self.matched
            .iter()
            .filter_map(|id| store.archetypes().get(*id))
            .map(Archetype::len)
            .sum()
    }

    /// All entities in matched archetypes, in archetype and row order.
    pub fn entities(&mut self, store: &EntityStore) -> Vec<Entity> {
        self.refresh(store);
        self.matched
            .iter()
            .filter_map(|id| store.archetypes().get(*id))
            .flat_map(|archetype| archetype.entities().iter().copied())
            .collect()
    }
}

impl<D: QueryData> std::fmt::Debug for ArchetypeQuery<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchetypeQuery")
            .field("type_ids", &self.type_ids)
            .field("filter", &self.filter)
            .field("matched", &self.matched.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, IndexedComponent, Tag, index::ValueStructIndex};

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Velocity {
        x: f32,
    }

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

    #[derive(Tag)]
    struct Frozen;

    fn position(x: f32) -> Position {
        Position { x, y: 0.0, z: 0.0 }
    }

    #[test]
    fn chunks_cover_every_matching_entity() {
        // Given
        let mut store = EntityStore::new();
        for i in 0..1200 {
            store.create_entity_with((position(i as f32), Velocity { x: 1.0 }));
        }
        store.create_entity_with(position(-1.0));

        // When
        let mut query = store.query::<(Position, Velocity)>();
        let lens: Vec<usize> = query.chunks(&mut store).map(|c| c.len()).collect();

        // Then
        assert_eq!(lens, vec![512, 512, 176]);
        assert_eq!(query.count(&store), 1200);
    }

    #[test]
    fn chunk_columns_are_writable() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity_with((position(1.0), Velocity { x: 2.0 }));
        let mut query = store.query::<(Position, Velocity)>();

        // When
        for mut chunk in query.chunks(&mut store) {
            let (positions, velocities) = chunk.columns_mut();
            for (p, v) in positions.as_mut_slice().iter_mut().zip(velocities.as_slice()) {
                p.x += v.x;
            }
        }

        // Then
        assert_eq!(store.get_component::<Position>(entity).unwrap().unwrap().x, 3.0);
    }

    #[test]
    fn filters_select_archetypes() {
        // Given
        let mut store = EntityStore::new();
        let plain = store.create_entity_with(position(0.0));
        let frozen = store.create_entity_with(position(0.0));
        store.add_tag::<Frozen>(frozen).unwrap();
        let moving = store.create_entity_with((position(0.0), Velocity { x: 1.0 }));

        // Then
        let mut all = store.query::<(Position,)>();
        assert_eq!(all.count(&store), 3);
        let mut tagged = store.query::<(Position,)>().all_tags::<Frozen>();
        assert_eq!(tagged.entities(&store), vec![frozen]);
        let mut thawed = store.query::<(Position,)>().without_any_tags::<Frozen>();
        assert_eq!(thawed.count(&store), 2);
        let mut still = store
            .query::<(Position,)>()
            .without_any_components::<Velocity>()
            .without_any_tags::<Frozen>();
        assert_eq!(still.entities(&store), vec![plain]);
        let mut with_velocity = store.query::<(Position,)>().any_components::<Velocity>();
        assert_eq!(with_velocity.entities(&store), vec![moving]);
    }

    #[test]
    fn matching_picks_up_new_archetypes() {
        // Given
        let mut store = EntityStore::new();
        store.create_entity_with(position(0.0));
        let mut query = store.query::<(Position,)>();
        assert_eq!(query.count(&store), 1);

        // When
        let entity = store.create_entity_with(position(0.0));
        store.add_component(entity, Velocity::default()).unwrap();

        // Then
        assert_eq!(query.count(&store), 2);
        assert_eq!(query.archetypes(&store).len(), 2);
    }

    #[test]
    fn read_only_columns_read_a_snapshot() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity_with(position(1.0));
        let mut query = store.query::<(Position,)>().read_only::<Position>();

        // When
        let mut seen = Vec::new();
        for mut chunk in query.chunks(&mut store) {
            let (positions,) = chunk.columns_mut();
            positions.as_mut_slice()[0].x = 5.0;
            seen.push(positions.as_slice()[0].x);
        }

        // Then
        assert_eq!(seen, vec![1.0]);
        assert_eq!(store.get_component::<Position>(entity).unwrap().unwrap().x, 5.0);
    }

    #[test]
    #[should_panic(expected = "cannot be mutated")]
    fn indexed_columns_are_read_only() {
        let mut store = EntityStore::new();
        store.create_entity_with(Level(1));
        let mut query = store.query::<(Level,)>();
        for mut chunk in query.chunks(&mut store) {
            chunk.columns_mut().0.as_mut_slice();
        }
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn duplicate_types_panic() {
        let store = EntityStore::new();
        let _ = store.query::<(Position, Position)>();
    }
}
