//! Script operations of the [`EntityStore`].

use crate::ecs::{
    entity::Entity,
    event::{ChangeAction, ScriptChanged},
    script::Script,
};

use super::{EntityStore, Result};

impl EntityStore {
    /// Attach a script. A script of the same type is replaced and returned.
    pub fn add_script<S: Script>(&mut self, entity: Entity, script: S) -> Result<Option<S>> {
        self.node(entity)?;
        let id = self.registry.register_script::<S>();
        let index = match self.nodes[entity.index()].script_index {
            Some(index) => index,
            None => {
                let index = self.scripts.add_row(entity);
                self.nodes[entity.index()].script_index = Some(index);
                index
            }
        };

        let replaced = self.scripts.row_mut(index).insert(id, Box::new(script));
        let action = match replaced {
            Some(_) => ChangeAction::Update,
            None => ChangeAction::Add,
        };
        self.emit(ScriptChanged {
            entity,
            action,
            type_id: id,
        });
        Ok(replaced.and_then(|script| script.into_any().downcast::<S>().ok().map(|s| *s)))
    }

    /// Detach the script of type `S`, returning it. `None` if the entity has none.
    pub fn remove_script<S: Script>(&mut self, entity: Entity) -> Result<Option<S>> {
        let node = self.node(entity)?;
        let (Some(id), Some(index)) = (self.registry.get::<S>(), node.script_index) else {
            return Ok(None);
        };
        let Some(removed) = self.scripts.row_mut(index).remove(id) else {
            return Ok(None);
        };
        if self.scripts.row(index).scripts.is_empty() {
            self.drop_script_row(entity, index);
        }

        self.emit(ScriptChanged {
            entity,
            action: ChangeAction::Remove,
            type_id: id,
        });
        Ok(removed.into_any().downcast::<S>().ok().map(|s| *s))
    }

    pub fn get_script<S: Script>(&self, entity: Entity) -> Result<Option<&S>> {
        let node = self.node(entity)?;
        let (Some(id), Some(index)) = (self.registry.get::<S>(), node.script_index) else {
            return Ok(None);
        };
        Ok(self
            .scripts
            .row(index)
            .get(id)
            .and_then(|script| script.as_any().downcast_ref::<S>()))
    }

    pub fn get_script_mut<S: Script>(&mut self, entity: Entity) -> Result<Option<&mut S>> {
        let node = self.node(entity)?;
        let (Some(id), Some(index)) = (self.registry.get::<S>(), node.script_index) else {
            return Ok(None);
        };
        Ok(self
            .scripts
            .row_mut(index)
            .get_mut(id)
            .and_then(|script| script.as_any_mut().downcast_mut::<S>()))
    }

    /// All scripts of an entity, in the order they were added.
    pub fn scripts(&self, entity: Entity) -> Result<Vec<&dyn Script>> {
        let node = self.node(entity)?;
        Ok(match node.script_index {
            Some(index) => self
                .scripts
                .row(index)
                .scripts
                .iter()
                .map(|(_, script)| script.as_ref())
                .collect(),
            None => Vec::new(),
        })
    }

    /// Drop every script of an entity being deleted. No events are emitted.
    pub(super) fn remove_all_scripts(&mut self, entity: Entity) {
        if let Some(index) = self.nodes[entity.index()].script_index {
            self.drop_script_row(entity, index);
        }
    }

    /// Give `to` a copy of every script of `from`.
    pub(super) fn clone_scripts(&mut self, from: Entity, to: Entity) {
        let Some(source) = self.nodes[from.index()].script_index else {
            return;
        };
        let copies = self.scripts.row(source).scripts.clone();
        let index = self.scripts.add_row(to);
        self.scripts.row_mut(index).scripts = copies;
        self.nodes[to.index()].script_index = Some(index);
    }

    /// Swap-remove the script row of `entity` and patch the node of the moved row.
    fn drop_script_row(&mut self, entity: Entity, index: usize) {
        let (_, moved) = self.scripts.remove_row(index);
        if let Some(moved) = moved {
            self.nodes[moved.index()].script_index = Some(index);
        }
        self.nodes[entity.index()].script_index = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Patrol {
        speed: u32,
    }

    impl Script for Patrol {}

    #[derive(Clone, Debug, PartialEq)]
    struct Guard;

    impl Script for Guard {}

    #[test]
    fn add_replaces_script_of_same_type() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity();

        // When
        let first = store.add_script(entity, Patrol { speed: 1 }).unwrap();
        let second = store.add_script(entity, Patrol { speed: 2 }).unwrap();

        // Then
        assert_eq!(first, None);
        assert_eq!(second, Some(Patrol { speed: 1 }));
        assert_eq!(
            store.get_script::<Patrol>(entity).unwrap(),
            Some(&Patrol { speed: 2 })
        );
        assert_eq!(store.scripts(entity).unwrap().len(), 1);
    }

    #[test]
    fn remove_last_script_patches_moved_row() {
        // Given
        let mut store = EntityStore::new();
        let a = store.create_entity();
        let b = store.create_entity();
        store.add_script(a, Patrol { speed: 1 }).unwrap();
        store.add_script(b, Guard).unwrap();

        // When
        let removed = store.remove_script::<Patrol>(a).unwrap();

        // Then
        assert_eq!(removed, Some(Patrol { speed: 1 }));
        assert_eq!(store.remove_script::<Patrol>(a).unwrap(), None);
        assert!(store.scripts(a).unwrap().is_empty());
        assert_eq!(store.get_script::<Guard>(b).unwrap(), Some(&Guard));
        assert_eq!(store.nodes[b.index()].script_index, Some(0));
    }

    #[test]
    fn scripts_are_mutable_in_place() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity();
        store.add_script(entity, Patrol { speed: 1 }).unwrap();

        // When
        if let Some(patrol) = store.get_script_mut::<Patrol>(entity).unwrap() {
            patrol.speed = 9;
        }

        // Then
        assert_eq!(
            store.get_script::<Patrol>(entity).unwrap(),
            Some(&Patrol { speed: 9 })
        );
    }

    #[test]
    fn clone_and_delete_handle_scripts() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity();
        store.add_script(entity, Patrol { speed: 3 }).unwrap();
        store.add_script(entity, Guard).unwrap();

        // When
        let copy = store.clone_entity(entity).unwrap();
        store.delete_entity(entity).unwrap();

        // Then
        assert_eq!(store.scripts(copy).unwrap().len(), 2);
        assert_eq!(
            store.get_script::<Patrol>(copy).unwrap(),
            Some(&Patrol { speed: 3 })
        );
        assert_eq!(store.nodes[copy.index()].script_index, Some(0));
    }

    #[test]
    fn script_events_report_actions() {
        // Given
        let mut store = EntityStore::new();
        let entity = store.create_entity();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.on_script_changed(move |_, event| sink.lock().unwrap().push(event.action));

        // When
        store.add_script(entity, Guard).unwrap();
        store.add_script(entity, Guard).unwrap();
        store.remove_script::<Guard>(entity).unwrap();

        // Then
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ChangeAction::Add, ChangeAction::Update, ChangeAction::Remove]
        );
    }
}
