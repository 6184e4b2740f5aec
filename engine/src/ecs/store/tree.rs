//! The entity tree: ordered child lists with parent back-references.
//!
//! Every node keeps its ordered `child_ids` and its `parent`. Both sides are always updated
//! together. An entity is part of the tree if the store root is the entity itself or one of
//! its ancestors, otherwise it is floating.

use crate::ecs::{
    entity::{Entity, TreeMembership},
    event::{ChildAction, ChildNodesChanged},
};

use super::{EntityStore, Result, StoreError};

impl EntityStore {
    /// Append `child` to the children of `parent`, removing it from its previous parent first.
    ///
    /// Returns the position of the child. Adding a child a second time keeps its position.
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<usize> {
        self.check_link(parent, child)?;
        if self.nodes[child.index()].parent == Some(parent) {
            let index = self.nodes[parent.index()]
                .child_ids
                .iter()
                .position(|c| *c == child)
                .expect("child is listed by its parent");
            return Ok(index);
        }

        self.detach_from_parent(child);
        let children = &mut self.nodes[parent.index()].child_ids;
        children.push(child);
        let index = children.len() - 1;
        self.nodes[child.index()].parent = Some(parent);
        self.emit(ChildNodesChanged {
            action: ChildAction::Add,
            parent,
            child,
            index,
        });
        Ok(index)
    }

    /// Insert `child` at `index` of the children of `parent`.
    ///
    /// `index` may equal the child count to append. If `child` already belongs to `parent` it
    /// is moved, with `index` counted without it.
    pub fn insert_child(&mut self, parent: Entity, index: usize, child: Entity) -> Result<()> {
        self.check_link(parent, child)?;
        let mut count = self.nodes[parent.index()].child_ids.len();
        if self.nodes[child.index()].parent == Some(parent) {
            count -= 1;
        }
        if index > count {
            return Err(StoreError::ChildIndexOutOfRange { index, count });
        }

        self.detach_from_parent(child);
        self.nodes[parent.index()].child_ids.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
        self.emit(ChildNodesChanged {
            action: ChildAction::Insert,
            parent,
            child,
            index,
        });
        Ok(())
    }

    /// Remove `child` from the children of `parent`. The child becomes floating.
    ///
    /// Returns `false` if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: Entity, child: Entity) -> Result<bool> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Ok(false);
        }
        let index = self
            .unlink_child(parent, child)
            .expect("child is listed by its parent");
        self.emit(ChildNodesChanged {
            action: ChildAction::Remove,
            parent,
            child,
            index,
        });
        Ok(true)
    }

    /// Position of `child` within the children of `parent`.
    pub fn child_index(&self, parent: Entity, child: Entity) -> Result<Option<usize>> {
        Ok(self
            .node(parent)?
            .child_ids
            .iter()
            .position(|c| *c == child))
    }

    pub fn child_ids(&self, entity: Entity) -> Result<&[Entity]> {
        Ok(&self.node(entity)?.child_ids)
    }

    pub fn child_count(&self, entity: Entity) -> Result<usize> {
        Ok(self.node(entity)?.child_ids.len())
    }

    pub fn parent(&self, entity: Entity) -> Result<Option<Entity>> {
        Ok(self.node(entity)?.parent)
    }

    /// Make `entity` the root of the store tree. It is removed from its parent first.
    pub fn set_store_root(&mut self, entity: Entity) -> Result<()> {
        self.node(entity)?;
        self.detach_from_parent(entity);
        self.root = Some(entity);
        Ok(())
    }

    #[inline]
    pub fn store_root(&self) -> Option<Entity> {
        self.root
    }

    /// Whether an entity belongs to the store tree. `None` for dead entities.
    pub fn tree_membership(&self, entity: Entity) -> Option<TreeMembership> {
        if !self.is_alive(entity) {
            return None;
        }
        let mut current = Some(entity);
        while let Some(node) = current {
            if Some(node) == self.root {
                return Some(TreeMembership::TreeNode);
            }
            current = self.nodes[node.index()].parent;
        }
        Some(TreeMembership::Floating)
    }

    /// Validate both ends of a new parent-child link.
    fn check_link(&self, parent: Entity, child: Entity) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(StoreError::CycleDetected { parent, child });
            }
            ancestor = self.nodes[current.index()].parent;
        }
        Ok(())
    }

    /// Remove `child` from its current parent, if any, and notify observers.
    fn detach_from_parent(&mut self, child: Entity) {
        let Some(parent) = self.nodes[child.index()].parent else {
            return;
        };
        if let Some(index) = self.unlink_child(parent, child) {
            self.emit(ChildNodesChanged {
                action: ChildAction::Remove,
                parent,
                child,
                index,
            });
        }
    }

    /// Remove `child` from the child list of `parent` and clear its back-reference.
    ///
    /// Returns the former position of the child. No event is emitted.
    pub(super) fn unlink_child(&mut self, parent: Entity, child: Entity) -> Option<usize> {
        let children = &mut self.nodes[parent.index()].child_ids;
        let index = children.iter().position(|c| *c == child)?;
        children.remove(index);
        self.nodes[child.index()].parent = None;
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn store_with(count: usize) -> (EntityStore, Vec<Entity>) {
        let mut store = EntityStore::new();
        let entities = (0..count).map(|_| store.create_entity()).collect();
        (store, entities)
    }

    #[test]
    fn add_child_keeps_both_sides_consistent() {
        // Given
        let (mut store, e) = store_with(3);

        // When
        let first = store.add_child(e[0], e[1]).unwrap();
        let second = store.add_child(e[0], e[2]).unwrap();

        // Then
        assert_eq!((first, second), (0, 1));
        assert_eq!(store.child_ids(e[0]).unwrap(), &[e[1], e[2]]);
        assert_eq!(store.parent(e[2]).unwrap(), Some(e[0]));
        assert_eq!(store.child_index(e[0], e[2]).unwrap(), Some(1));
        assert_eq!(store.add_child(e[0], e[1]).unwrap(), 0);
        assert_eq!(store.child_count(e[0]).unwrap(), 2);
    }

    #[test]
    fn reparenting_removes_from_old_parent() {
        // Given
        let (mut store, e) = store_with(3);
        store.add_child(e[0], e[2]).unwrap();

        // When
        store.add_child(e[1], e[2]).unwrap();

        // Then
        assert!(store.child_ids(e[0]).unwrap().is_empty());
        assert_eq!(store.child_ids(e[1]).unwrap(), &[e[2]]);
        assert_eq!(store.parent(e[2]).unwrap(), Some(e[1]));
    }

    #[test]
    fn insert_child_checks_range() {
        // Given
        let (mut store, e) = store_with(4);
        store.add_child(e[0], e[1]).unwrap();
        store.add_child(e[0], e[2]).unwrap();

        // When
        store.insert_child(e[0], 1, e[3]).unwrap();
        store.insert_child(e[0], 2, e[1]).unwrap();

        // Then
        assert_eq!(store.child_ids(e[0]).unwrap(), &[e[3], e[2], e[1]]);
        assert_eq!(
            store.insert_child(e[0], 5, e[1]),
            Err(StoreError::ChildIndexOutOfRange { index: 5, count: 2 })
        );
    }

    #[test]
    fn cycles_are_rejected() {
        // Given
        let (mut store, e) = store_with(3);
        store.add_child(e[0], e[1]).unwrap();
        store.add_child(e[1], e[2]).unwrap();

        // Then
        assert_eq!(
            store.add_child(e[2], e[0]),
            Err(StoreError::CycleDetected {
                parent: e[2],
                child: e[0]
            })
        );
        assert!(store.add_child(e[1], e[1]).is_err());
    }

    #[test]
    fn membership_follows_the_root() {
        // Given
        let (mut store, e) = store_with(3);
        store.add_child(e[0], e[1]).unwrap();

        // Then
        assert_eq!(store.tree_membership(e[1]), Some(TreeMembership::Floating));
        store.set_store_root(e[0]).unwrap();
        assert_eq!(store.store_root(), Some(e[0]));
        assert_eq!(store.tree_membership(e[1]), Some(TreeMembership::TreeNode));
        assert_eq!(store.tree_membership(e[2]), Some(TreeMembership::Floating));

        assert!(store.remove_child(e[0], e[1]).unwrap());
        assert!(!store.remove_child(e[0], e[1]).unwrap());
        assert_eq!(store.tree_membership(e[1]), Some(TreeMembership::Floating));

        store.delete_entity(e[1]).unwrap();
        assert_eq!(store.tree_membership(e[1]), None);
    }

    #[test]
    fn deleting_a_parent_leaves_children_floating() {
        // Given
        let (mut store, e) = store_with(4);
        store.add_child(e[0], e[1]).unwrap();
        store.add_child(e[1], e[2]).unwrap();
        store.add_child(e[1], e[3]).unwrap();

        // When
        store.delete_entity(e[1]).unwrap();

        // Then
        assert!(store.child_ids(e[0]).unwrap().is_empty());
        assert_eq!(store.parent(e[2]).unwrap(), None);
        assert_eq!(store.parent(e[3]).unwrap(), None);
        assert!(store.is_alive(e[2]));
    }

    #[test]
    fn deleting_a_tree_removes_descendants() {
        // Given
        let (mut store, e) = store_with(5);
        store.add_child(e[0], e[1]).unwrap();
        store.add_child(e[1], e[2]).unwrap();
        store.add_child(e[1], e[3]).unwrap();

        // When
        let deleted = store.delete_entity_tree(e[1]).unwrap();

        // Then
        assert_eq!(deleted, 3);
        assert_eq!(store.entity_count(), 2);
        assert!(store.child_ids(e[0]).unwrap().is_empty());
        assert!(store.is_alive(e[4]));
        store.verify_invariants();
    }

    #[test]
    fn child_events_carry_positions() {
        // Given
        let (mut store, e) = store_with(3);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.on_child_nodes_changed(move |store, event| {
            let count = store.child_count(event.parent).unwrap();
            sink.lock().unwrap().push((event.action, event.index, count));
        });

        // When
        store.add_child(e[0], e[1]).unwrap();
        store.insert_child(e[0], 0, e[2]).unwrap();
        store.remove_child(e[0], e[1]).unwrap();

        // Then
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (ChildAction::Add, 0, 1),
                (ChildAction::Insert, 0, 2),
                (ChildAction::Remove, 1, 1),
            ]
        );
    }
}
