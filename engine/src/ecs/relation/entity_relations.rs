use std::{any::Any, collections::HashMap};

use crate::ecs::{
    entity::Entity,
    index::{IdArray, IdArrayHeap},
    relation::{Relation, link_target},
    storage::StructHeap,
    world,
};

/// The relation table of one relation type.
///
/// Row `i` of `values` belongs to `owners[i]`. `positions` maps an entity to the rows of its
/// relations, in insertion order. Removing a row swap-removes it, so the row of the last
/// relation changes and the position list of its owner is patched.
pub struct EntityRelations<R: Relation> {
    id: world::TypeId,
    owners: Vec<Entity>,
    values: StructHeap<R>,
    positions: HashMap<u32, IdArray>,
    position_heap: IdArrayHeap,
    /// Link relations only: target id to the entities linking to it.
    links: HashMap<u32, IdArray>,
    link_heap: IdArrayHeap,
}

impl<R: Relation> EntityRelations<R> {
    pub fn new(id: world::TypeId) -> Self {
        Self {
            id,
            owners: Vec::new(),
            values: StructHeap::new(id),
            positions: HashMap::new(),
            position_heap: IdArrayHeap::new(),
            links: HashMap::new(),
            link_heap: IdArrayHeap::new(),
        }
    }

    /// The registered type id of `R`.
    #[inline]
    pub fn type_id(&self) -> world::TypeId {
        self.id
    }

    /// Total number of relations of all entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn rows(&self, entity: Entity) -> &[u32] {
        self.positions
            .get(&entity.id())
            .map(|array| array.ids(&self.position_heap))
            .unwrap_or(&[])
    }

    /// Find the index within the entity's position list of the relation with `key`.
    fn find(&self, entity: Entity, key: &R::Key) -> Option<(usize, usize)> {
        self.rows(entity).iter().enumerate().find_map(|(i, row)| {
            let row = *row as usize;
            let value = self.values.get(row).expect("relation row out of bounds");
            (value.relation_key() == *key).then_some((i, row))
        })
    }

    /// Add a relation. An existing relation with the same key is overwritten in place.
    ///
    /// Returns `true` if the relation was newly added.
    pub fn add(&mut self, entity: Entity, relation: R) -> bool {
        let key = relation.relation_key();
        if let Some((_, row)) = self.find(entity, &key) {
            self.values.replace(row, relation);
            return false;
        }

        let row = self.values.push(relation);
        self.owners.push(entity);
        self.positions
            .entry(entity.id())
            .or_default()
            .add(row as u32, &mut self.position_heap);
        if let Some(target) = link_target(&key) {
            self.links
                .entry(target.id())
                .or_default()
                .add(entity.id(), &mut self.link_heap);
        }
        true
    }

    /// Remove the relation with `key`. Returns `false` if the entity has no such relation.
    pub fn remove(&mut self, entity: Entity, key: &R::Key) -> bool {
        match self.find(entity, key) {
            Some((index, row)) => {
                self.remove_row(entity, index, row);
                true
            }
            None => false,
        }
    }

    fn remove_row(&mut self, entity: Entity, index: usize, row: usize) -> R {
        let array = self
            .positions
            .get_mut(&entity.id())
            .expect("entity has relation positions");
        array.remove_at(index, &mut self.position_heap);
        if array.is_empty() {
            self.positions.remove(&entity.id());
        }

        let value = self.values.swap_remove_value(row);
        self.owners.swap_remove(row);

        // The former last row now lives at `row`: patch its owner's position list.
        if let Some(moved_owner) = self.owners.get(row).copied() {
            let last = self.owners.len() as u32;
            let array = self
                .positions
                .get_mut(&moved_owner.id())
                .expect("moved relation has an owner");
            match array.index_of(last, &self.position_heap) {
                Some(i) => array.set(i, row as u32, &mut self.position_heap),
                None => {
                    log::error!("relation row {last} missing from positions of {moved_owner}");
                    debug_assert!(false, "relation row {last} missing from positions of {moved_owner}");
                }
            }
        }

        if let Some(target) = link_target(&value.relation_key())
            && let Some(array) = self.links.get_mut(&target.id())
        {
            array.remove(entity.id(), &mut self.link_heap);
            if array.is_empty() {
                self.links.remove(&target.id());
            }
        }
        value
    }

    /// The relation with `key`.
    pub fn get(&self, entity: Entity, key: &R::Key) -> Option<&R> {
        self.find(entity, key)
            .and_then(|(_, row)| self.values.get(row))
    }

    /// View of all relations of an entity.
    pub fn relations(&self, entity: Entity) -> RelationComponents<'_, R> {
        RelationComponents {
            rows: self.rows(entity),
            values: Some(&self.values),
        }
    }

    /// Number of relations of an entity.
    #[inline]
    pub fn count(&self, entity: Entity) -> usize {
        self.positions
            .get(&entity.id())
            .map(|array| array.len())
            .unwrap_or(0)
    }

    /// All entities having at least one relation, ordered by id.
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.positions.keys().map(|id| Entity::new(*id)).collect();
        entities.sort();
        entities
    }

    /// Visit every relation with its owner, in table order.
    pub fn for_each(&self, mut f: impl FnMut(&R, Entity)) {
        for (value, owner) in self.values.iter().zip(self.owners.iter()) {
            f(value, *owner);
        }
    }

    /// Entities with a link relation pointing at `target`.
    pub fn incoming(&self, target: Entity) -> Vec<Entity> {
        self.links
            .get(&target.id())
            .map(|array| {
                array
                    .ids(&self.link_heap)
                    .iter()
                    .map(|id| Entity::new(*id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Verify that every row is referenced by exactly its owner's position list.
    pub fn verify_invariants(&self) {
        assert_eq!(self.owners.len(), self.values.len());
        let mut referenced = 0;
        for (id, array) in &self.positions {
            for row in array.ids(&self.position_heap) {
                assert_eq!(self.owners[*row as usize].id(), *id, "row {row} has wrong owner");
                referenced += 1;
            }
        }
        assert_eq!(referenced, self.owners.len(), "unreferenced relation rows");
    }
}

/// Type-erased operations the store performs on every relation table.
pub trait ErasedRelations: Any + Send + Sync {
    /// Remove all relations of `entity`. Returns how many were removed.
    fn remove_entity_relations(&mut self, entity: Entity) -> usize;

    /// Copy all relations of `from` to `to`. Returns how many were copied.
    fn clone_relations(&mut self, from: Entity, to: Entity) -> usize;

    /// Entities with a link relation pointing at `target`.
    fn incoming_links(&self, target: Entity) -> Vec<Entity>;

    /// Remove every link relation pointing at `target`, returning the former owners.
    fn remove_links_to(&mut self, target: Entity) -> Vec<Entity>;

    /// Number of relations of `entity`.
    fn count(&self, entity: Entity) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<R: Relation> ErasedRelations for EntityRelations<R> {
    fn remove_entity_relations(&mut self, entity: Entity) -> usize {
        let mut removed = 0;
        while let Some(row) = self.rows(entity).last().copied() {
            let index = self.rows(entity).len() - 1;
            self.remove_row(entity, index, row as usize);
            removed += 1;
        }
        removed
    }

    fn clone_relations(&mut self, from: Entity, to: Entity) -> usize {
        let values: Vec<R> = self.relations(from).iter().cloned().collect();
        let count = values.len();
        for value in values {
            self.add(to, value);
        }
        count
    }

    fn incoming_links(&self, target: Entity) -> Vec<Entity> {
        self.incoming(target)
    }

    fn remove_links_to(&mut self, target: Entity) -> Vec<Entity> {
        let owners = self.incoming(target);
        for owner in &owners {
            let found = self.rows(*owner).iter().enumerate().find_map(|(i, row)| {
                let value = self.values.get(*row as usize)?;
                (link_target(&value.relation_key()) == Some(target)).then_some((i, *row as usize))
            });
            if let Some((index, row)) = found {
                self.remove_row(*owner, index, row);
            }
        }
        owners
    }

    fn count(&self, entity: Entity) -> usize {
        EntityRelations::count(self, entity)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A view over the relations of one entity.
///
/// A single relation is addressed directly; more go through the pooled position list.
pub struct RelationComponents<'a, R> {
    rows: &'a [u32],
    values: Option<&'a StructHeap<R>>,
}

impl<R> Clone for RelationComponents<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for RelationComponents<'_, R> {}

impl<'a, R: Relation> RelationComponents<'a, R> {
    /// A view without relations, for entities of a store that never used `R`.
    pub(crate) fn empty() -> Self {
        Self {
            rows: &[],
            values: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `i`-th relation in insertion order.
    pub fn get(&self, i: usize) -> Option<&'a R> {
        let row = self.rows.get(i)?;
        self.values?.get(*row as usize)
    }

    pub fn iter(&self) -> RelationIter<'a, R> {
        RelationIter {
            rows: self.rows.iter(),
            values: self.values,
        }
    }
}

impl<'a, R: Relation> IntoIterator for RelationComponents<'a, R> {
    type Item = &'a R;
    type IntoIter = RelationIter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the relations of one entity.
pub struct RelationIter<'a, R> {
    rows: std::slice::Iter<'a, u32>,
    values: Option<&'a StructHeap<R>>,
}

impl<'a, R: Relation> Iterator for RelationIter<'a, R> {
    type Item = &'a R;

    fn next(&mut self) -> Option<&'a R> {
        let row = self.rows.next()?;
        self.values?.get(*row as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
