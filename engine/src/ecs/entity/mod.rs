//! Entity identifiers and the per-entity node record.
//!
//! An [`Entity`] is an opaque, copyable id unique within one
//! [`EntityStore`](crate::ecs::EntityStore). Ids are handed out in increasing order starting at
//! [`Entity::FIRST_ID`] and are never recycled, so a handle to a deleted entity stays invalid
//! instead of silently pointing at a newer one.
//!
//! # Architecture
//!
//! - **[`Entity`]**: the handle. It carries no ownership and no reference to its store.
//! - **[`Node`]**: one record per allocated id, holding the entity's archetype placement, its
//!   persistent id, its tree links and the presence bits of indexed and relation types.
//! - **[`Pids`]**: the mapping between persistent ids and entity ids.
//!
//! A node without an archetype is *detached*: the id was never created or has been deleted.
//! Every store operation on a detached entity fails with
//! [`StoreError::Detached`](crate::ecs::StoreError::Detached).

mod node;
mod pid;

use std::fmt;

pub(crate) use node::Node;
pub use pid::PidType;
pub(crate) use pid::Pids;

/// An entity in the store. A lightweight key used to look up the entity's node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// The id of the first entity created by a store. Id `0` is never a valid entity.
    pub const FIRST_ID: u32 = 1;

    /// Construct an entity handle from a raw id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the id of this entity.
    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }

    /// Get the index of this entity's node in the node table.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Entity {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Where an entity sits relative to the store's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMembership {
    /// The entity is the store root or one of its descendants.
    TreeNode,
    /// The entity is alive but not connected to the store root.
    Floating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_exposes_raw_id() {
        // Given
        let entity = Entity::new(42);

        // Then
        assert_eq!(entity.id(), 42);
        assert_eq!(entity.index(), 42);
        assert_eq!(Entity::from(42), entity);
        assert_eq!(entity.to_string(), "Entity(42)");
    }

    #[test]
    fn entities_order_by_id() {
        // Given
        let mut entities = vec![Entity::new(3), Entity::new(1), Entity::new(2)];

        // When
        entities.sort();

        // Then
        assert_eq!(entities, vec![Entity::new(1), Entity::new(2), Entity::new(3)]);
    }
}
