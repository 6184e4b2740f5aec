//! Errors of the entity store.

use thiserror::Error;

use crate::ecs::entity::Entity;

/// Errors that can occur in store operations.
///
/// Expected misses (an unknown pid, removing a component the entity does not have) are not
/// errors: those operations return `Option` or `bool`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The entity was never created or has been deleted.
    #[error("{0} is detached: it was never created or has been deleted")]
    Detached(Entity),

    /// An explicitly requested entity id belongs to a live entity.
    #[error("entity id {0} is already in use")]
    IdInUse(u32),

    /// Ids 0 and `u32::MAX` never denote an entity.
    #[error("invalid entity id {0}")]
    InvalidId(u32),

    /// A value lookup named a component type without an index.
    #[error("component {0} is not indexed")]
    NotIndexed(&'static str),

    /// A range lookup targeted an index that is not sorted.
    #[error("index of {0} does not support range queries")]
    RangeUnsupported(&'static str),

    /// The entity has no relation with the requested key.
    #[error("relation not found")]
    RelationNotFound,

    /// The tree mutation would make an entity its own ancestor.
    #[error("adding {child} to {parent} would create a cycle")]
    CycleDetected {
        /// The requested parent.
        parent: Entity,
        /// The requested child.
        child: Entity,
    },

    /// A child position outside the parent's child list.
    #[error("child index {index} out of range: parent has {count} children")]
    ChildIndexOutOfRange {
        /// The requested position.
        index: usize,
        /// Number of children the position was checked against.
        count: usize,
    },

    /// In-place mutable access was requested for an indexed component type.
    #[error("component {0} is indexed: update it through set_component")]
    IndexedMutation(&'static str),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_entity() {
        // Given
        let err = StoreError::Detached(Entity::new(5));

        // Then
        assert_eq!(
            err.to_string(),
            "Entity(5) is detached: it was never created or has been deleted"
        );
        assert_eq!(
            StoreError::ChildIndexOutOfRange { index: 4, count: 2 }.to_string(),
            "child index 4 out of range: parent has 2 children"
        );
    }
}
