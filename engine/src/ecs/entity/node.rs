use fixedbitset::FixedBitSet;

use crate::ecs::{entity::Entity, storage::archetype, world};

/// The per-entity record of the node table.
///
/// A node is indexed by entity id. `archetype == None` marks a detached node.
#[derive(Debug, Default, Clone)]
pub(crate) struct Node {
    /// Archetype holding the entity's components, `None` when detached.
    pub archetype: Option<archetype::Id>,

    /// Row of the entity within its archetype.
    pub comp_index: usize,

    /// Persistent id.
    pub pid: i64,

    /// Parent in the entity tree.
    pub parent: Option<Entity>,

    /// Ordered children in the entity tree.
    pub child_ids: Vec<Entity>,

    /// Row in the script table, if the entity has scripts.
    pub script_index: Option<usize>,

    /// Presence bits of indexed component and relation types, by type id.
    pub has_component: FixedBitSet,
}

impl Node {
    /// Whether the node is attached to an archetype.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.archetype.is_some()
    }

    /// Record presence of an indexed or relation type.
    #[inline]
    pub fn set_bit(&mut self, id: world::TypeId) {
        self.has_component.grow(id.index() + 1);
        self.has_component.insert(id.index());
    }

    /// Clear presence of an indexed or relation type.
    #[inline]
    pub fn clear_bit(&mut self, id: world::TypeId) {
        if id.index() < self.has_component.len() {
            self.has_component.set(id.index(), false);
        }
    }

    #[inline]
    pub fn has_bit(&self, id: world::TypeId) -> bool {
        self.has_component.contains(id.index())
    }

    /// Reset the node to the detached state, returning its former children.
    pub fn detach(&mut self) -> Vec<Entity> {
        self.archetype = None;
        self.comp_index = 0;
        self.pid = 0;
        self.parent = None;
        self.script_index = None;
        self.has_component.clear();
        std::mem::take(&mut self.child_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_bits_grow_on_demand() {
        // Given
        let mut node = Node::default();
        let id = world::TypeId::new(70);

        // When
        node.set_bit(id);

        // Then
        assert!(node.has_bit(id));
        assert!(!node.has_bit(world::TypeId::new(3)));

        node.clear_bit(id);
        assert!(!node.has_bit(id));
        node.clear_bit(world::TypeId::new(500));
    }

    #[test]
    fn detach_returns_children() {
        // Given
        let mut node = Node {
            archetype: Some(archetype::Id::new(1)),
            child_ids: vec![Entity::new(2), Entity::new(3)],
            ..Default::default()
        };

        // When
        let children = node.detach();

        // Then
        assert!(!node.is_alive());
        assert_eq!(children, vec![Entity::new(2), Entity::new(3)]);
        assert!(node.child_ids.is_empty());
    }
}
