//! The entity store: node table, archetypes and the structural mutations between them.
//!
//! [`EntityStore`] owns every piece of per-store state:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ EntityStore                                                      │
//! │  nodes:       [-, N1, N2, N3, ...]   entity id → archetype + row │
//! │  archetypes:  key → Archetype (columns of components)            │
//! │  indexes:     type id → ComponentIndex (value → entity ids)      │
//! │  relations:   type id → EntityRelations (one-to-many components) │
//! │  scripts:     rows of boxed scripts, addressed by node           │
//! │  events:      observer lists per event type                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All mutation goes through `&mut self`, so a store is mutated by a single owner at a time and
//! needs no internal locking. Structural changes (adding or removing component types or tags)
//! move the entity to the archetype of its new key and patch the node of the entity that was
//! swapped into the vacated row.
//!
//! Entity ids are allocated in increasing order and never reused.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut store = EntityStore::new();
//! let entity = store.create_entity();
//! store.add_component(entity, Position { x: 1.0, y: 2.0, z: 3.0 })?;
//! store.add_tag::<Selected>(entity)?;
//! assert!(store.has_component::<Position>(entity)?);
//! store.delete_entity(entity)?;
//! ```

mod components;
mod config;
mod error;
mod lookup;
mod relations;
mod scripts;
mod tree;

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

pub use config::StoreConfig;
pub use error::{Result, StoreError};

use crate::ecs::{
    component::{Component, Set, Spec, Target},
    entity::{Entity, Node, Pids},
    event::{
        Broker, ChangeAction, ChildAction, ChildNodesChanged, ComponentChanged, Event, Handle,
        ScriptChanged, TagsChanged,
    },
    index::ErasedIndex,
    query::{ArchetypeQuery, QueryData},
    relation::ErasedRelations,
    script::ScriptTable,
    storage::{Archetype, ArchetypeKey, Archetypes, archetype},
    world::{TypeId, TypeRegistry},
};

/// Source of unique store ids, used by queries to detect a change of store.
static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// A store of entities, their components, tags, relations, scripts and tree structure.
pub struct EntityStore {
    id: u64,
    registry: Arc<TypeRegistry>,
    config: StoreConfig,
    nodes: Vec<Node>,
    archetypes: Archetypes,
    default_archetype: archetype::Id,
    pids: Pids,
    next_id: u32,
    entity_count: usize,
    indexes: Vec<Option<Box<dyn ErasedIndex>>>,
    relations: Vec<Option<Box<dyn ErasedRelations>>>,
    scripts: ScriptTable,
    events: Broker,
    root: Option<Entity>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the slot of a type id in a per-type table, growing the table as needed.
fn type_slot<T: ?Sized>(slots: &mut Vec<Option<Box<T>>>, id: TypeId) -> &mut Option<Box<T>> {
    if slots.len() <= id.index() {
        slots.resize_with(id.index() + 1, || None);
    }
    &mut slots[id.index()]
}

impl EntityStore {
    /// Create a store with the default configuration and its own type registry.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store with its own type registry.
    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_registry(Arc::new(TypeRegistry::new()), config)
    }

    /// Create a store sharing a type registry with other stores.
    pub fn with_registry(registry: Arc<TypeRegistry>, config: StoreConfig) -> Self {
        let mut archetypes = Archetypes::new();
        let default_archetype = archetypes.get_or_create(&ArchetypeKey::EMPTY, &registry);
        let mut nodes = Vec::with_capacity(config.initial_node_capacity.max(1));
        // Id 0 is never an entity.
        nodes.push(Node::default());

        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            pids: Pids::new(config.pid_type, config.seed),
            registry,
            config,
            nodes,
            archetypes,
            default_archetype,
            next_id: Entity::FIRST_ID,
            entity_count: 0,
            indexes: Vec::new(),
            relations: Vec::new(),
            scripts: ScriptTable::new(),
            events: Broker::new(),
            root: None,
        }
    }

    /// Unique id of this store instance.
    #[inline]
    pub(crate) fn store_id(&self) -> u64 {
        self.id
    }

    /// The type registry of this store.
    #[inline]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[inline]
    pub fn archetypes(&self) -> &Archetypes {
        &self.archetypes
    }

    #[inline]
    pub(crate) fn archetypes_mut(&mut self) -> &mut Archetypes {
        &mut self.archetypes
    }

    /// Number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// Whether the entity is alive in this store.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.nodes
            .get(entity.index())
            .is_some_and(|node| node.is_alive())
    }

    /// The live entity with the given id.
    pub fn entity_by_id(&self, id: u32) -> Option<Entity> {
        let entity = Entity::new(id);
        self.is_alive(entity).then_some(entity)
    }

    /// The live entity with the given persistent id. Id 0, negative and unknown pids are misses.
    pub fn try_get_entity_by_pid(&self, pid: i64) -> Option<Entity> {
        self.pids.lookup(pid).and_then(|id| self.entity_by_id(id))
    }

    /// The persistent id of an entity.
    pub fn pid(&self, entity: Entity) -> Result<i64> {
        Ok(self.node(entity)?.pid)
    }

    /// The node of a live entity.
    pub(crate) fn node(&self, entity: Entity) -> Result<&Node> {
        self.nodes
            .get(entity.index())
            .filter(|node| node.is_alive())
            .ok_or(StoreError::Detached(entity))
    }

    pub(crate) fn node_mut(&mut self, entity: Entity) -> Result<&mut Node> {
        self.nodes
            .get_mut(entity.index())
            .filter(|node| node.is_alive())
            .ok_or(StoreError::Detached(entity))
    }

    /// Archetype and row of a live entity.
    pub(crate) fn location(&self, entity: Entity) -> Result<(archetype::Id, usize)> {
        let node = self.node(entity)?;
        let archetype = node.archetype.expect("live node has an archetype");
        Ok((archetype, node.comp_index))
    }

    /// The archetype of a live entity.
    pub fn archetype_of(&self, entity: Entity) -> Result<&Archetype> {
        let (archetype, _) = self.location(entity)?;
        Ok(self.archetype(archetype))
    }

    #[inline]
    fn archetype(&self, id: archetype::Id) -> &Archetype {
        self.archetypes.get(id).expect("archetype ids are never removed")
    }

    /// The component types of an entity.
    pub fn component_types(&self, entity: Entity) -> Result<Spec> {
        Ok(self.archetype_of(entity)?.key().components.clone())
    }

    /// The tags of an entity.
    pub fn tags(&self, entity: Entity) -> Result<Spec> {
        Ok(self.archetype_of(entity)?.key().tags.clone())
    }

    /// Create a query over this store's registry.
    pub fn query<D: QueryData>(&self) -> ArchetypeQuery<D> {
        ArchetypeQuery::new(self)
    }

    // ---------------------------------------------------------------------------------------------
    // Entity lifecycle
    // ---------------------------------------------------------------------------------------------

    /// Create an entity without components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocate_id();
        self.place(entity, self.default_archetype);
        entity
    }

    /// Create an entity with an explicit id, e.g. when loading a serialized tree.
    ///
    /// Ids 0 and `u32::MAX` are rejected: the allocator must stay able to hand out an id above
    /// every explicit one.
    pub fn create_entity_with_id(&mut self, id: u32) -> Result<Entity> {
        let next = id
            .checked_add(1)
            .filter(|_| id != 0)
            .ok_or(StoreError::InvalidId(id))?;
        let entity = Entity::new(id);
        if self.is_alive(entity) {
            return Err(StoreError::IdInUse(id));
        }
        self.next_id = self.next_id.max(next);
        self.place(entity, self.default_archetype);
        Ok(entity)
    }

    /// Create an entity directly in the archetype of `key`. Components get default values.
    pub fn create_entity_in(&mut self, key: &ArchetypeKey) -> Entity {
        let archetype = self.archetypes.get_or_create(key, &self.registry);
        let entity = self.allocate_id();
        self.place(entity, archetype);
        for id in key.components.ids() {
            self.index_add(entity, *id);
        }
        self.emit_added(entity, &key.components);
        entity
    }

    /// Create an entity with the given component values in a single archetype placement.
    pub fn create_entity_with<S: Set>(&mut self, values: S) -> Entity {
        let registry = Arc::clone(&self.registry);
        let key = ArchetypeKey::new(S::into_spec(&registry), Spec::EMPTY);
        let archetype = self.archetypes.get_or_create(&key, &registry);
        let entity = self.allocate_id();
        let row = self.place(entity, archetype);

        let mut target = RowTarget {
            archetype: self
                .archetypes
                .get_mut(archetype)
                .expect("archetype was just created"),
            row,
        };
        values.apply(&registry, &mut target);

        for id in key.components.ids() {
            self.index_add(entity, *id);
        }
        self.emit_added(entity, &key.components);
        entity
    }

    /// Notify `ComponentChanged::Add` for every component of a freshly placed entity.
    fn emit_added(&mut self, entity: Entity, components: &Spec) {
        for id in components.ids() {
            self.emit(ComponentChanged {
                entity,
                action: ChangeAction::Add,
                type_id: *id,
            });
        }
    }

    fn allocate_id(&mut self) -> Entity {
        let entity = Entity::new(self.next_id);
        self.next_id += 1;
        entity
    }

    /// Attach `entity` to an archetype as a new row and initialize its node.
    fn place(&mut self, entity: Entity, archetype: archetype::Id) -> usize {
        if self.nodes.len() <= entity.index() {
            self.nodes.resize_with(entity.index() + 1, Node::default);
        }
        let row = self
            .archetypes
            .get_mut(archetype)
            .expect("archetype ids are never removed")
            .add_entity(entity);
        let pid = self.pids.assign(entity.id());
        let node = &mut self.nodes[entity.index()];
        node.archetype = Some(archetype);
        node.comp_index = row;
        node.pid = pid;
        self.entity_count += 1;
        row
    }

    /// Copy an entity: components, tags, relations and scripts. The copy is not part of the tree.
    pub fn clone_entity(&mut self, entity: Entity) -> Result<Entity> {
        let (archetype, row) = self.location(entity)?;
        let source_bits = self.node(entity)?.has_component.clone();
        let copy = self.allocate_id();
        if self.nodes.len() <= copy.index() {
            self.nodes.resize_with(copy.index() + 1, Node::default);
        }

        let copy_row = self
            .archetypes
            .get_mut(archetype)
            .expect("archetype ids are never removed")
            .clone_entity(row, copy);
        let pid = self.pids.assign(copy.id());
        let node = &mut self.nodes[copy.index()];
        node.archetype = Some(archetype);
        node.comp_index = copy_row;
        node.pid = pid;
        self.entity_count += 1;

        let components = self.archetype(archetype).key().components.clone();
        for id in components.ids() {
            self.index_add(copy, *id);
        }
        for bit in source_bits.ones() {
            let id = TypeId::from(bit);
            if let Some(Some(relations)) = self.relations.get_mut(bit)
                && relations.clone_relations(entity, copy) > 0
            {
                self.nodes[copy.index()].set_bit(id);
            }
        }
        self.clone_scripts(entity, copy);
        self.emit_added(copy, &components);
        Ok(copy)
    }

    /// Delete an entity.
    ///
    /// The entity is removed from its parent, its children become floating roots, its index and
    /// relation registrations are removed and links pointing at it from other entities (entity
    /// index components and link relations) are removed.
    pub fn delete_entity(&mut self, entity: Entity) -> Result<()> {
        self.node(entity)?;
        self.remove_incoming_links(entity);

        // Index and relation registrations.
        let (archetype, row) = self.location(entity)?;
        let bits = self.nodes[entity.index()].has_component.clone();
        for bit in bits.ones() {
            if let Some(Some(index)) = self.indexes.get_mut(bit) {
                let heap = self
                    .archetypes
                    .get(archetype)
                    .and_then(|a| a.heap(TypeId::from(bit)))
                    .expect("indexed component has a column");
                index.remove_from_heap(entity, heap, row);
            } else if let Some(Some(relations)) = self.relations.get_mut(bit) {
                relations.remove_entity_relations(entity);
            }
        }

        self.remove_all_scripts(entity);

        // Tree links.
        let parent = self.nodes[entity.index()].parent;
        let removed_at = parent.and_then(|parent| self.unlink_child(parent, entity));
        let children = std::mem::take(&mut self.nodes[entity.index()].child_ids);
        for child in &children {
            self.nodes[child.index()].parent = None;
        }
        if self.root == Some(entity) {
            self.root = None;
        }

        // Structural storage.
        let moved = self
            .archetypes
            .get_mut(archetype)
            .expect("archetype ids are never removed")
            .remove_entity(row);
        if let Some(moved) = moved {
            self.nodes[moved.index()].comp_index = row;
        }
        let pid = self.nodes[entity.index()].pid;
        self.pids.release(pid);
        self.nodes[entity.index()].detach();
        self.entity_count -= 1;
        log::debug!("deleted {entity} ({} children detached)", children.len());

        if let (Some(parent), Some(index)) = (parent, removed_at) {
            self.emit(ChildNodesChanged {
                action: ChildAction::Remove,
                parent,
                child: entity,
                index,
            });
        }
        Ok(())
    }

    /// Delete an entity and all its descendants. Returns the number of deleted entities.
    pub fn delete_entity_tree(&mut self, entity: Entity) -> Result<usize> {
        self.node(entity)?;
        // Children before parents, so every deletion sees a consistent tree.
        let mut order = Vec::new();
        let mut stack = vec![(entity, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            stack.push((current, true));
            for child in self.nodes[current.index()].child_ids.iter().rev() {
                stack.push((*child, false));
            }
        }
        for current in &order {
            self.delete_entity(*current)?;
        }
        Ok(order.len())
    }

    /// Remove component and relation links pointing at `target` from other entities.
    fn remove_incoming_links(&mut self, target: Entity) {
        let mut linked: Vec<(TypeId, Entity)> = Vec::new();
        for (i, index) in self.indexes.iter().enumerate() {
            if let Some(index) = index {
                linked.extend(
                    index
                        .linked(target)
                        .into_iter()
                        .filter(|e| *e != target)
                        .map(|e| (TypeId::from(i), e)),
                );
            }
        }
        for (id, referrer) in linked {
            // Referrers are alive: deletion removes an entity from every index first.
            let _ = self.remove_component_by_id(referrer, id);
        }

        for i in 0..self.relations.len() {
            let Some(relations) = self.relations[i].as_mut() else {
                continue;
            };
            let owners = relations.remove_links_to(target);
            let emptied: Vec<Entity> = owners
                .into_iter()
                .filter(|owner| relations.count(*owner) == 0)
                .collect();
            for owner in emptied {
                self.nodes[owner.index()].clear_bit(TypeId::from(i));
            }
        }
    }

    /// Move a live entity to the archetype of `key`, returning its new row.
    fn migrate(&mut self, entity: Entity, key: &ArchetypeKey) -> usize {
        let node = &self.nodes[entity.index()];
        let (source, row) = (
            node.archetype.expect("live node has an archetype"),
            node.comp_index,
        );
        let target = self.archetypes.get_or_create(key, &self.registry);
        if source == target {
            return row;
        }

        let (from, to) = self.archetypes.pair_mut(source, target);
        let (new_row, moved) = from.move_entity_to(row, to);
        log::trace!(
            "moved {entity} from archetype {} to {}",
            source.index(),
            target.index()
        );
        if let Some(moved) = moved {
            self.nodes[moved.index()].comp_index = row;
        }
        let node = &mut self.nodes[entity.index()];
        node.archetype = Some(target);
        node.comp_index = new_row;
        new_row
    }

    // ---------------------------------------------------------------------------------------------
    // Index maintenance
    // ---------------------------------------------------------------------------------------------

    /// Index the component `id` of `entity` at its current row. No-op for non-indexed types.
    fn index_add(&mut self, entity: Entity, id: TypeId) {
        let Some(factory) = self.registry.get_info(id).and_then(|i| i.index_factory()) else {
            return;
        };
        let node = &mut self.nodes[entity.index()];
        let (archetype, row) = (
            node.archetype.expect("live node has an archetype"),
            node.comp_index,
        );
        node.set_bit(id);
        let index = type_slot(&mut self.indexes, id).get_or_insert_with(factory);
        let heap = self
            .archetypes
            .get(archetype)
            .and_then(|a| a.heap(id))
            .expect("indexed component has a column");
        index.add_from_heap(entity, heap, row);
    }

    /// Remove `entity` from the index of `id`, reading the value from its current row.
    fn index_remove(&mut self, entity: Entity, id: TypeId) {
        let node = &mut self.nodes[entity.index()];
        if !node.has_bit(id) {
            return;
        }
        node.clear_bit(id);
        let (archetype, row) = (
            node.archetype.expect("live node has an archetype"),
            node.comp_index,
        );
        if let Some(Some(index)) = self.indexes.get_mut(id.index()) {
            let heap = self
                .archetypes
                .get(archetype)
                .and_then(|a| a.heap(id))
                .expect("indexed component has a column");
            index.remove_from_heap(entity, heap, row);
        }
    }

    /// Re-index `entity` after its value of `id` was overwritten with a stash.
    fn index_update(&mut self, entity: Entity, id: TypeId) {
        let node = &self.nodes[entity.index()];
        if !node.has_bit(id) {
            return;
        }
        let (archetype, row) = (
            node.archetype.expect("live node has an archetype"),
            node.comp_index,
        );
        if let Some(Some(index)) = self.indexes.get_mut(id.index()) {
            let heap = self
                .archetypes
                .get(archetype)
                .and_then(|a| a.heap(id))
                .expect("indexed component has a column");
            index.update_from_heap(entity, heap, row);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------------------------------

    /// Subscribe to an event type. Handlers run synchronously after each mutation, in
    /// subscription order.
    pub fn subscribe<E: Event>(
        &mut self,
        handler: impl FnMut(&EntityStore, &E) + Send + 'static,
    ) -> Handle {
        self.events.subscribe(handler)
    }

    pub fn on_component_changed(
        &mut self,
        handler: impl FnMut(&EntityStore, &ComponentChanged) + Send + 'static,
    ) -> Handle {
        self.subscribe(handler)
    }

    pub fn on_tags_changed(
        &mut self,
        handler: impl FnMut(&EntityStore, &TagsChanged) + Send + 'static,
    ) -> Handle {
        self.subscribe(handler)
    }

    pub fn on_script_changed(
        &mut self,
        handler: impl FnMut(&EntityStore, &ScriptChanged) + Send + 'static,
    ) -> Handle {
        self.subscribe(handler)
    }

    pub fn on_child_nodes_changed(
        &mut self,
        handler: impl FnMut(&EntityStore, &ChildNodesChanged) + Send + 'static,
    ) -> Handle {
        self.subscribe(handler)
    }

    /// Remove a subscription. Returns `false` if the handle is unknown.
    pub fn unsubscribe(&mut self, handle: Handle) -> bool {
        self.events.unsubscribe(handle)
    }

    /// Notify the observers of `E`.
    fn emit<E: Event>(&mut self, event: E) {
        let Some(mut observers) = self.events.take::<E>() else {
            return;
        };
        // A panicking handler must not take the other subscriptions down with it.
        let store: &EntityStore = self;
        let result = panic::catch_unwind(AssertUnwindSafe(|| observers.notify(store, &event)));
        self.events.restore(observers);
        if let Err(payload) = result {
            panic::resume_unwind(payload);
        }
    }

    /// Verify the node table against the archetypes.
    ///
    /// # Panics
    /// Panics if any live node does not point at the row holding its entity.
    pub fn verify_invariants(&self) {
        let mut live = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            let Some(archetype) = node.archetype else {
                continue;
            };
            live += 1;
            let archetype = self.archetype(archetype);
            assert_eq!(
                archetype.entity(node.comp_index),
                Some(Entity::new(id as u32)),
                "node {id} points at the wrong row"
            );
            archetype.verify_invariants();
        }
        assert_eq!(live, self.entity_count, "entity count out of sync");
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entities", &self.entity_count)
            .field("archetypes", &self.archetypes.len())
            .field("pid_type", &self.config.pid_type)
            .finish()
    }
}

/// Writes a [`Set`] of component values into a freshly added archetype row.
struct RowTarget<'a> {
    archetype: &'a mut Archetype,
    row: usize,
}

impl Target for RowTarget<'_> {
    fn apply<C: Component>(&mut self, id: TypeId, value: C) {
        self.archetype
            .struct_heap_mut::<C>(id)
            .expect("set component has a column")
            .replace(self.row, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, Tag, entity::PidType};

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Velocity(f32);

    #[derive(Tag)]
    struct Selected;

    #[test]
    fn ids_start_at_one_and_are_not_reused() {
        // Given
        let mut store = EntityStore::new();

        // When
        let first = store.create_entity();
        let second = store.create_entity();
        store.delete_entity(first).unwrap();
        let third = store.create_entity();

        // Then
        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert_eq!(third.id(), 3);
        assert_eq!(store.entity_count(), 2);
        assert!(!store.is_alive(first));
        store.verify_invariants();
    }

    #[test]
    fn create_with_explicit_id() {
        // Given
        let mut store = EntityStore::new();

        // When
        let entity = store.create_entity_with_id(10).unwrap();
        let next = store.create_entity();

        // Then
        assert_eq!(entity.id(), 10);
        assert_eq!(next.id(), 11);
        assert_eq!(
            store.create_entity_with_id(10),
            Err(StoreError::IdInUse(10))
        );
        assert_eq!(store.create_entity_with_id(0), Err(StoreError::InvalidId(0)));
        assert_eq!(store.entity_by_id(10), Some(entity));
        assert_eq!(store.entity_by_id(5), None);
    }

    #[test]
    fn max_explicit_id_is_rejected() {
        // Given
        let mut store = EntityStore::new();

        // When
        let result = store.create_entity_with_id(u32::MAX);
        let next = store.create_entity();

        // Then
        assert_eq!(result, Err(StoreError::InvalidId(u32::MAX)));
        assert!(!store.is_alive(Entity::new(u32::MAX)));
        assert_eq!(next.id(), 1);
        assert_eq!(store.entity_count(), 1);
        store.verify_invariants();
    }

    #[test]
    fn create_with_values_places_entity_once() {
        // Given
        let mut store = EntityStore::new();

        // When
        let entity = store.create_entity_with((
            Position {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
            Velocity(4.0),
        ));

        // Then
        assert_eq!(
            store.get_component::<Position>(entity).unwrap(),
            Some(&Position {
                x: 1.0,
                y: 2.0,
                z: 3.0
            })
        );
        assert_eq!(
            store.get_component::<Velocity>(entity).unwrap(),
            Some(&Velocity(4.0))
        );
        // Default archetype plus the created one.
        assert_eq!(store.archetypes().len(), 2);
    }

    #[test]
    fn create_in_key_uses_defaults() {
        // Given
        let mut store = EntityStore::new();
        let registry = Arc::clone(store.registry());
        let key = ArchetypeKey::new(
            Spec::new(vec![registry.register_component::<Velocity>()]),
            Spec::new(vec![registry.register_tag::<Selected>()]),
        );

        // When
        let entity = store.create_entity_in(&key);

        // Then
        assert_eq!(
            store.get_component::<Velocity>(entity).unwrap(),
            Some(&Velocity(0.0))
        );
        assert!(store.has_tag::<Selected>(entity).unwrap());
    }

    #[test]
    fn pid_lookup_follows_policy() {
        // Given
        let mut by_id = EntityStore::new();
        let mut random =
            EntityStore::with_config(StoreConfig::default().with_pid_type(PidType::RandomPids));
        let a = by_id.create_entity();
        let b = random.create_entity();

        // When
        let pid_a = by_id.pid(a).unwrap();
        let pid_b = random.pid(b).unwrap();

        // Then
        assert_eq!(pid_a, a.id() as i64);
        assert_eq!(by_id.try_get_entity_by_pid(pid_a), Some(a));
        assert_eq!(random.try_get_entity_by_pid(pid_b), Some(b));
        assert_eq!(by_id.try_get_entity_by_pid(0), None);
        assert_eq!(by_id.try_get_entity_by_pid(-1), None);
        assert_eq!(by_id.try_get_entity_by_pid(999), None);

        random.delete_entity(b).unwrap();
        assert_eq!(random.try_get_entity_by_pid(pid_b), None);
    }

    #[test]
    fn detached_entities_fail_fast() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity();
        store.delete_entity(entity).unwrap();

        // Then
        assert_eq!(
            store.add_component(entity, Velocity(1.0)),
            Err(StoreError::Detached(entity))
        );
        assert_eq!(store.delete_entity(entity), Err(StoreError::Detached(entity)));
        assert_eq!(store.pid(entity), Err(StoreError::Detached(entity)));
        assert_eq!(
            store.get_component::<Velocity>(Entity::new(77)),
            Err(StoreError::Detached(Entity::new(77)))
        );
    }

    #[test]
    fn delete_patches_swapped_entity() {
        // Given
        let mut store = EntityStore::new();
        let entities: Vec<Entity> = (0..4)
            .map(|i| store.create_entity_with(Velocity(i as f32)))
            .collect();

        // When
        store.delete_entity(entities[1]).unwrap();

        // Then
        let (_, row) = store.location(entities[3]).unwrap();
        assert_eq!(row, 1);
        assert_eq!(
            store.get_component::<Velocity>(entities[3]).unwrap(),
            Some(&Velocity(3.0))
        );
        store.verify_invariants();
    }

    #[test]
    fn clone_copies_components_and_tags() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity_with(Velocity(2.5));
        store.add_tag::<Selected>(entity).unwrap();

        // When
        let copy = store.clone_entity(entity).unwrap();

        // Then
        assert_ne!(copy, entity);
        assert_eq!(
            store.get_component::<Velocity>(copy).unwrap(),
            Some(&Velocity(2.5))
        );
        assert!(store.has_tag::<Selected>(copy).unwrap());
        assert_eq!(store.parent(copy).unwrap(), None);
        store.verify_invariants();
    }

    #[test]
    fn events_observe_post_mutation_state() {
        // Given
        use std::sync::Mutex;
        let mut store = EntityStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = store.on_component_changed(move |store, event| {
            let present = store.has_component::<Velocity>(event.entity).unwrap_or(false);
            sink.lock().unwrap().push((event.action, present));
        });
        let entity = store.create_entity();

        // When
        store.add_component(entity, Velocity(1.0)).unwrap();
        store.add_component(entity, Velocity(2.0)).unwrap();
        store.remove_component::<Velocity>(entity).unwrap();
        assert!(store.unsubscribe(handle));
        store.add_component(entity, Velocity(3.0)).unwrap();

        // Then
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (ChangeAction::Add, true),
                (ChangeAction::Update, true),
                (ChangeAction::Remove, false),
            ]
        );
    }

    #[test]
    fn every_creation_path_reports_added_components() {
        // Given
        use std::sync::Mutex;
        let mut store = EntityStore::new();
        let registry = Arc::clone(store.registry());
        let velocity = registry.register_component::<Velocity>();
        let position = registry.register_component::<Position>();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.on_component_changed(move |_, event| {
            sink.lock().unwrap().push((event.entity, event.action, event.type_id));
        });

        // When
        let with = store.create_entity_with(Velocity(1.0));
        let key = ArchetypeKey::new(Spec::new(vec![velocity, position]), Spec::EMPTY);
        let within = store.create_entity_in(&key);
        let copy = store.clone_entity(with).unwrap();

        // Then
        let mut expected = vec![(with, ChangeAction::Add, velocity)];
        let mut in_key = vec![
            (within, ChangeAction::Add, velocity),
            (within, ChangeAction::Add, position),
        ];
        in_key.sort_by_key(|(_, _, id)| *id);
        expected.extend(in_key);
        expected.push((copy, ChangeAction::Add, velocity));
        assert_eq!(*seen.lock().unwrap(), expected);
    }

    #[test]
    fn panicking_handler_keeps_subscriptions() {
        // Given
        use std::panic::{AssertUnwindSafe, catch_unwind};
        use std::sync::atomic::{AtomicBool, AtomicUsize};
        let mut store = EntityStore::new();
        let entity = store.create_entity();
        let calls = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicBool::new(false));
        let (counter, flag) = (Arc::clone(&calls), Arc::clone(&failed));
        store.on_component_changed(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            if !flag.swap(true, Ordering::SeqCst) {
                panic!("handler failed");
            }
        });

        // When
        let result = catch_unwind(AssertUnwindSafe(|| {
            store.add_component(entity, Velocity(1.0))
        }));
        store.add_component(entity, Velocity(2.0)).unwrap();

        // Then
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.events.observer_count::<ComponentChanged>(), 1);
        assert_eq!(
            store.get_component::<Velocity>(entity).unwrap(),
            Some(&Velocity(2.0))
        );
    }
}
