//! One-to-many relation components.
//!
//! A relation component type may be attached to one entity multiple times, once per distinct
//! key returned by [`Relation::relation_key`]. Relations are not part of the entity's archetype.
//! Each relation type has a dedicated [`EntityRelations`] table holding all relations of that
//! type in a single column plus, per entity, the positions of its relations in that column.
//!
//! Relations keyed by an [`Entity`] are *link relations*. Their tables also track the reverse
//! direction, so the store can find and remove the links pointing at an entity when it is
//! deleted.

mod entity_relations;

use std::any::Any;

pub use entity_relations::{EntityRelations, ErasedRelations, RelationComponents, RelationIter};

use crate::ecs::{entity::Entity, world};

/// A component type of which an entity may hold several instances, one per key.
pub trait Relation: 'static + Send + Sync + Clone {
    /// The key distinguishing the relations of one entity.
    type Key: PartialEq + Clone + Send + Sync + 'static;

    /// The key of this relation.
    fn relation_key(&self) -> Self::Key;
}

/// A relation keyed by the entity it points at.
pub trait LinkRelation: Relation<Key = Entity> {}

impl<R: Relation<Key = Entity>> LinkRelation for R {}

/// Constructor of a type-erased relation table, registered per relation type.
pub type RelationsFactory = fn(world::TypeId) -> Box<dyn ErasedRelations>;

/// Create the relation table of `R`.
pub fn new_relations<R: Relation>(id: world::TypeId) -> Box<dyn ErasedRelations> {
    log::debug!("creating relation table for {}", std::any::type_name::<R>());
    Box::new(EntityRelations::<R>::new(id))
}

/// The entity a relation key points at, for link relations.
#[inline]
pub(crate) fn link_target<K: 'static>(key: &K) -> Option<Entity> {
    (key as &dyn Any).downcast_ref::<Entity>().copied()
}
