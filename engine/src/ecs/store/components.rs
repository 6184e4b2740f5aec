//! Component and tag operations of the [`EntityStore`].

use crate::ecs::{
    component::{Component, IntoTagSpec, Spec, Tag},
    entity::Entity,
    event::{ChangeAction, ComponentChanged, TagsChanged},
    storage::{StructHeap, archetype},
    world::{TypeId, TypeKind},
};

use super::{EntityStore, Result, StoreError};

impl EntityStore {
    /// Add a component to an entity, moving it to the archetype including `T`.
    ///
    /// If the entity already has a `T` the value is replaced as by
    /// [`set_component`](Self::set_component). Returns `true` if the component was added.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<bool> {
        let id = self.registry.register_component::<T>();
        let (archetype, row) = self.location(entity)?;
        if self.archetype(archetype).key().components.contains(id) {
            self.update_value(entity, id, archetype, row, value);
            return Ok(false);
        }

        let key = self.archetype(archetype).key().with_component(id);
        let row = self.migrate(entity, &key);
        let archetype = self.nodes[entity.index()]
            .archetype
            .expect("live node has an archetype");
        self.column_mut::<T>(archetype, id).replace(row, value);
        self.index_add(entity, id);
        self.emit(ComponentChanged {
            entity,
            action: ChangeAction::Add,
            type_id: id,
        });
        Ok(true)
    }

    /// Add the default value of a registered component type, for tooling working with runtime
    /// type ids. Returns `false` if the entity already has the component.
    ///
    /// # Panics
    /// Panics if `id` is not a registered component type.
    pub fn add_component_by_id(&mut self, entity: Entity, id: TypeId) -> Result<bool> {
        self.expect_kind(id, TypeKind::Component);
        let (archetype, _) = self.location(entity)?;
        if self.archetype(archetype).key().components.contains(id) {
            return Ok(false);
        }

        let key = self.archetype(archetype).key().with_component(id);
        self.migrate(entity, &key);
        self.index_add(entity, id);
        self.emit(ComponentChanged {
            entity,
            action: ChangeAction::Add,
            type_id: id,
        });
        Ok(true)
    }

    /// Remove a component. Returns `false` if the entity does not have it.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<bool> {
        match self.registry.get::<T>() {
            Some(id) => self.remove_component_by_id(entity, id),
            None => self.node(entity).map(|_| false),
        }
    }

    /// Remove a component by type id. Returns `false` if the entity does not have it.
    pub fn remove_component_by_id(&mut self, entity: Entity, id: TypeId) -> Result<bool> {
        let (archetype, _) = self.location(entity)?;
        if !self.archetype(archetype).key().components.contains(id) {
            return Ok(false);
        }

        // The index reads the old value, so it is updated before the column is dropped.
        self.index_remove(entity, id);
        let key = self.archetype(archetype).key().without_component(id);
        self.migrate(entity, &key);
        self.emit(ComponentChanged {
            entity,
            action: ChangeAction::Remove,
            type_id: id,
        });
        Ok(true)
    }

    /// Replace the value of a component the entity already has, keeping its index in sync.
    ///
    /// Returns `false` and leaves the entity unchanged if it does not have a `T`.
    pub fn set_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<bool> {
        let (archetype, row) = self.location(entity)?;
        let Some(id) = self.registry.get::<T>() else {
            return Ok(false);
        };
        if !self.archetype(archetype).key().components.contains(id) {
            return Ok(false);
        }
        self.update_value(entity, id, archetype, row, value);
        Ok(true)
    }

    /// Overwrite a present component value, then re-index it from the stashed previous value.
    fn update_value<T: Component>(
        &mut self,
        entity: Entity,
        id: TypeId,
        archetype: archetype::Id,
        row: usize,
        value: T,
    ) {
        self.column_mut::<T>(archetype, id).stash_and_set(row, value);
        self.index_update(entity, id);
        self.column_mut::<T>(archetype, id).take_stash();
        self.emit(ComponentChanged {
            entity,
            action: ChangeAction::Update,
            type_id: id,
        });
    }

    fn column_mut<T: Component>(&mut self, archetype: archetype::Id, id: TypeId) -> &mut StructHeap<T> {
        self.archetypes
            .get_mut(archetype)
            .and_then(|a| a.struct_heap_mut::<T>(id))
            .expect("archetype has a column for its component")
    }

    /// The component of an entity, `None` if it does not have one.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<Option<&T>> {
        let (archetype, row) = self.location(entity)?;
        let Some(id) = self.registry.get::<T>() else {
            return Ok(None);
        };
        Ok(self
            .archetype(archetype)
            .struct_heap::<T>(id)
            .and_then(|heap| heap.get(row)))
    }

    /// Mutable access to a component.
    ///
    /// Indexed components must be changed through [`set_component`](Self::set_component) so
    /// their index stays consistent; requesting them here fails with
    /// [`StoreError::IndexedMutation`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<Option<&mut T>> {
        let (archetype, row) = self.location(entity)?;
        let Some(info) = self.registry.get_info_of::<T>() else {
            return Ok(None);
        };
        if info.is_indexed() {
            return Err(StoreError::IndexedMutation(info.name()));
        }
        Ok(self
            .archetypes
            .get_mut(archetype)
            .and_then(|a| a.struct_heap_mut::<T>(info.id()))
            .and_then(|heap| heap.get_mut(row)))
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> Result<bool> {
        let (archetype, _) = self.location(entity)?;
        Ok(self
            .registry
            .get::<T>()
            .is_some_and(|id| self.archetype(archetype).key().components.contains(id)))
    }

    // ---------------------------------------------------------------------------------------------
    // Tags
    // ---------------------------------------------------------------------------------------------

    /// Add a tag. Returns `false` if the entity already has it.
    pub fn add_tag<T: Tag>(&mut self, entity: Entity) -> Result<bool> {
        let id = self.registry.register_tag::<T>();
        self.change_tags(entity, &Spec::new([id]), &Spec::EMPTY)
    }

    /// Add several tags with a single migration. Returns `false` if nothing changed.
    pub fn add_tags<T: IntoTagSpec>(&mut self, entity: Entity) -> Result<bool> {
        let tags = T::into_tag_spec(&self.registry);
        self.change_tags(entity, &tags, &Spec::EMPTY)
    }

    /// Remove a tag. Returns `false` if the entity does not have it.
    pub fn remove_tag<T: Tag>(&mut self, entity: Entity) -> Result<bool> {
        match self.registry.get::<T>() {
            Some(id) => self.change_tags(entity, &Spec::EMPTY, &Spec::new([id])),
            None => self.node(entity).map(|_| false),
        }
    }

    pub fn remove_tags<T: IntoTagSpec>(&mut self, entity: Entity) -> Result<bool> {
        let tags = T::into_tag_spec(&self.registry);
        self.change_tags(entity, &Spec::EMPTY, &tags)
    }

    /// # Panics
    /// Panics if `id` is not a registered tag type.
    pub fn add_tag_by_id(&mut self, entity: Entity, id: TypeId) -> Result<bool> {
        self.expect_kind(id, TypeKind::Tag);
        self.change_tags(entity, &Spec::new([id]), &Spec::EMPTY)
    }

    pub fn remove_tag_by_id(&mut self, entity: Entity, id: TypeId) -> Result<bool> {
        self.change_tags(entity, &Spec::EMPTY, &Spec::new([id]))
    }

    pub fn has_tag<T: Tag>(&self, entity: Entity) -> Result<bool> {
        let (archetype, _) = self.location(entity)?;
        Ok(self
            .registry
            .get::<T>()
            .is_some_and(|id| self.archetype(archetype).key().tags.contains(id)))
    }

    /// Move the entity to the archetype with `add` and without `remove` tags.
    fn change_tags(&mut self, entity: Entity, add: &Spec, remove: &Spec) -> Result<bool> {
        let (archetype, _) = self.location(entity)?;
        let current = self.archetype(archetype).key();
        let added = add.difference(&current.tags);
        let removed = remove.intersection(&current.tags);
        if added.is_empty() && removed.is_empty() {
            return Ok(false);
        }

        let key = current.with_tags(&added).without_tags(&removed);
        self.migrate(entity, &key);
        self.emit(TagsChanged {
            entity,
            added: added.ids().to_vec(),
            removed: removed.ids().to_vec(),
        });
        Ok(true)
    }

    fn expect_kind(&self, id: TypeId, kind: TypeKind) {
        let info = self
            .registry
            .get_info(id)
            .unwrap_or_else(|| panic!("type id {} is not registered", id.index()));
        assert_eq!(
            info.kind(),
            kind,
            "{} is registered as {:?}",
            info.name(),
            info.kind()
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ecs::{Component, Tag, index::IndexedComponent, index::ValueStructIndex};

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Health(u32);

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Name(String);

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    #[component(indexed)]
    struct Team(u8);

    impl IndexedComponent for Team {
        type Value = u8;
        type Index = ValueStructIndex<u8>;

        fn indexed_value(&self) -> u8 {
            self.0
        }
    }

    #[derive(Tag)]
    struct Enemy;

    #[derive(Tag)]
    struct Boss;

    #[test]
    fn add_and_remove_migrate_between_archetypes() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity();

        // When
        assert!(store.add_component(entity, Health(10)).unwrap());
        assert!(
            store
                .add_component(entity, Name("orc".to_string()))
                .unwrap()
        );
        assert!(store.remove_component::<Health>(entity).unwrap());

        // Then
        assert!(!store.has_component::<Health>(entity).unwrap());
        assert_eq!(
            store.get_component::<Name>(entity).unwrap(),
            Some(&Name("orc".to_string()))
        );
        assert!(!store.remove_component::<Health>(entity).unwrap());
        store.verify_invariants();
    }

    #[test]
    fn adding_present_component_updates_value() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity_with(Health(1));
        let archetypes = store.archetypes().len();

        // When
        let added = store.add_component(entity, Health(2)).unwrap();

        // Then
        assert!(!added);
        assert_eq!(store.get_component::<Health>(entity).unwrap(), Some(&Health(2)));
        assert_eq!(store.archetypes().len(), archetypes);
    }

    #[test]
    fn set_component_requires_presence() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity();

        // Then
        assert!(!store.set_component(entity, Health(3)).unwrap());
        store.add_component(entity, Health(1)).unwrap();
        assert!(store.set_component(entity, Health(3)).unwrap());
        assert_eq!(store.get_component::<Health>(entity).unwrap(), Some(&Health(3)));
    }

    #[test]
    fn mutable_access_rejects_indexed_components() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity_with((Health(5), Team(1)));

        // When
        if let Some(health) = store.get_component_mut::<Health>(entity).unwrap() {
            health.0 += 1;
        }

        // Then
        assert_eq!(store.get_component::<Health>(entity).unwrap(), Some(&Health(6)));
        assert!(matches!(
            store.get_component_mut::<Team>(entity),
            Err(StoreError::IndexedMutation(_))
        ));
    }

    #[test]
    fn components_by_id_use_defaults() {
        // Given
        let mut store = EntityStore::new();
        let id = store.registry().register_component::<Health>();
        let entity = store.create_entity();

        // When
        let added = store.add_component_by_id(entity, id).unwrap();

        // Then
        assert!(added);
        assert!(!store.add_component_by_id(entity, id).unwrap());
        assert_eq!(store.get_component::<Health>(entity).unwrap(), Some(&Health(0)));
        assert!(store.remove_component_by_id(entity, id).unwrap());
        assert!(store.component_types(entity).unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "is registered as Tag")]
    fn component_by_id_rejects_tags() {
        let mut store = EntityStore::new();
        let id = store.registry().register_tag::<Enemy>();
        let entity = store.create_entity();
        let _ = store.add_component_by_id(entity, id);
    }

    #[test]
    fn tags_migrate_and_keep_components() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity_with(Health(7));

        // When
        assert!(store.add_tags::<(Enemy, Boss)>(entity).unwrap());
        assert!(!store.add_tag::<Enemy>(entity).unwrap());
        assert!(store.remove_tag::<Boss>(entity).unwrap());

        // Then
        assert!(store.has_tag::<Enemy>(entity).unwrap());
        assert!(!store.has_tag::<Boss>(entity).unwrap());
        assert_eq!(store.tags(entity).unwrap().len(), 1);
        assert_eq!(store.get_component::<Health>(entity).unwrap(), Some(&Health(7)));
        store.verify_invariants();
    }

    #[test]
    fn tag_changes_report_added_and_removed() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity();
        let enemy = store.registry().register_tag::<Enemy>();
        let boss = store.registry().register_tag::<Boss>();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.on_tags_changed(move |_, event| sink.lock().unwrap().push(event.clone()));

        // When
        store.add_tag_by_id(entity, enemy).unwrap();
        store.add_tag_by_id(entity, enemy).unwrap();
        store.remove_tag_by_id(entity, enemy).unwrap();
        store.add_tag::<Boss>(entity).unwrap();

        // Then
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].added, vec![enemy]);
        assert_eq!(seen[1].removed, vec![enemy]);
        assert_eq!(seen[2].added, vec![boss]);
    }
}
