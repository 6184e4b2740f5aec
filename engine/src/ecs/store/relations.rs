//! Relation operations of the [`EntityStore`].

use crate::ecs::{
    entity::Entity,
    relation::{EntityRelations, LinkRelation, Relation, RelationComponents},
};

use super::{EntityStore, Result, StoreError, type_slot};

impl EntityStore {
    fn relation_table<R: Relation>(&self) -> Option<&EntityRelations<R>> {
        let id = self.registry.get::<R>()?;
        self.relations
            .get(id.index())?
            .as_ref()?
            .as_any()
            .downcast_ref::<EntityRelations<R>>()
    }

    /// Add a relation. A relation with the same key is overwritten in place.
    ///
    /// Returns `true` if the relation was newly added.
    pub fn add_relation<R: Relation>(&mut self, entity: Entity, relation: R) -> Result<bool> {
        self.node(entity)?;
        let id = self.registry.register_relation::<R>();
        let factory = self
            .registry
            .get_info(id)
            .and_then(|info| info.relations_factory())
            .expect("relation types register a table factory");
        let table = type_slot(&mut self.relations, id)
            .get_or_insert_with(|| factory(id))
            .as_any_mut()
            .downcast_mut::<EntityRelations<R>>()
            .expect("relation table type mismatch");
        let added = table.add(entity, relation);
        self.nodes[entity.index()].set_bit(id);
        Ok(added)
    }

    /// Remove the relation with `key`. Returns `false` if the entity has no such relation.
    pub fn remove_relation<R: Relation>(&mut self, entity: Entity, key: &R::Key) -> Result<bool> {
        self.node(entity)?;
        let Some(id) = self.registry.get::<R>() else {
            return Ok(false);
        };
        let Some(Some(table)) = self.relations.get_mut(id.index()) else {
            return Ok(false);
        };
        let table = table
            .as_any_mut()
            .downcast_mut::<EntityRelations<R>>()
            .expect("relation table type mismatch");
        let removed = table.remove(entity, key);
        if removed && table.count(entity) == 0 {
            self.nodes[entity.index()].clear_bit(id);
        }
        Ok(removed)
    }

    /// The relation with `key`, failing with [`StoreError::RelationNotFound`] if absent.
    pub fn get_relation<R: Relation>(&self, entity: Entity, key: &R::Key) -> Result<&R> {
        self.try_get_relation(entity, key)?
            .ok_or(StoreError::RelationNotFound)
    }

    pub fn try_get_relation<R: Relation>(&self, entity: Entity, key: &R::Key) -> Result<Option<&R>> {
        self.node(entity)?;
        Ok(self
            .relation_table::<R>()
            .and_then(|table| table.get(entity, key)))
    }

    /// All relations of type `R` of an entity, in insertion order.
    pub fn relations<R: Relation>(&self, entity: Entity) -> Result<RelationComponents<'_, R>> {
        self.node(entity)?;
        Ok(self
            .relation_table::<R>()
            .map(|table| table.relations(entity))
            .unwrap_or_else(RelationComponents::empty))
    }

    pub fn relation_count<R: Relation>(&self, entity: Entity) -> Result<usize> {
        self.node(entity)?;
        Ok(self
            .relation_table::<R>()
            .map_or(0, |table| table.count(entity)))
    }

    /// Entities with at least one relation of type `R`, ordered by id.
    pub fn entities_with_relations<R: Relation>(&self) -> Vec<Entity> {
        self.relation_table::<R>()
            .map(|table| table.entities())
            .unwrap_or_default()
    }

    /// Visit every relation of type `R` with its owner.
    pub fn for_all_entity_relations<R: Relation>(&self, f: impl FnMut(&R, Entity)) {
        if let Some(table) = self.relation_table::<R>() {
            table.for_each(f);
        }
    }

    /// Entities with a link relation of type `R` pointing at `target`.
    pub fn incoming_links<R: LinkRelation>(&self, target: Entity) -> Vec<Entity> {
        self.relation_table::<R>()
            .map(|table| table.incoming(target))
            .unwrap_or_default()
    }
}
