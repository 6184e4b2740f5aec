use crate::ecs::{entity::Entity, script::Script, world};

/// The scripts of one entity.
pub(crate) struct ScriptRow {
    pub entity: Entity,
    pub scripts: Vec<(world::TypeId, Box<dyn Script>)>,
}

/// Rows of scripts, one per entity that has any.
///
/// Rows are swap-removed when their last script goes away; the caller patches the
/// `script_index` of the entity whose row moved.
#[derive(Default)]
pub(crate) struct ScriptTable {
    rows: Vec<ScriptRow>,
}

impl ScriptTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities with scripts.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Append an empty row for `entity`, returning its index.
    pub fn add_row(&mut self, entity: Entity) -> usize {
        self.rows.push(ScriptRow {
            entity,
            scripts: Vec::new(),
        });
        self.rows.len() - 1
    }

    /// Swap-remove a row. Returns the entity whose row moved into `index`, if any.
    pub fn remove_row(&mut self, index: usize) -> (ScriptRow, Option<Entity>) {
        let row = self.rows.swap_remove(index);
        (row, self.rows.get(index).map(|r| r.entity))
    }

    #[inline]
    pub fn row(&self, index: usize) -> &ScriptRow {
        &self.rows[index]
    }

    #[inline]
    pub fn row_mut(&mut self, index: usize) -> &mut ScriptRow {
        &mut self.rows[index]
    }
}

impl ScriptRow {
    /// Insert a script, returning the replaced script of the same type.
    pub fn insert(&mut self, id: world::TypeId, script: Box<dyn Script>) -> Option<Box<dyn Script>> {
        match self.scripts.iter_mut().find(|(sid, _)| *sid == id) {
            Some((_, slot)) => Some(std::mem::replace(slot, script)),
            None => {
                self.scripts.push((id, script));
                None
            }
        }
    }

    /// Remove the script of type `id`, keeping the order of the others.
    pub fn remove(&mut self, id: world::TypeId) -> Option<Box<dyn Script>> {
        let pos = self.scripts.iter().position(|(sid, _)| *sid == id)?;
        Some(self.scripts.remove(pos).1)
    }

    pub fn get(&self, id: world::TypeId) -> Option<&dyn Script> {
        self.scripts
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, s)| s.as_ref())
    }

    pub fn get_mut(&mut self, id: world::TypeId) -> Option<&mut dyn Script> {
        let (_, script) = self.scripts.iter_mut().find(|(sid, _)| *sid == id)?;
        let script: &mut dyn Script = script.as_mut();
        Some(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Patrol(u32);
    impl Script for Patrol {}

    #[derive(Clone)]
    struct Idle;
    impl Script for Idle {}

    #[test]
    fn insert_replaces_same_type() {
        // Given
        let mut table = ScriptTable::new();
        let row = table.add_row(Entity::new(1));
        let patrol = world::TypeId::new(0);

        // When
        assert!(table.row_mut(row).insert(patrol, Box::new(Patrol(1))).is_none());
        let old = table.row_mut(row).insert(patrol, Box::new(Patrol(2)));

        // Then
        let old = old.unwrap().into_any().downcast::<Patrol>().unwrap();
        assert_eq!(*old, Patrol(1));
        let current = table.row(row).get(patrol).unwrap();
        assert_eq!(current.as_any().downcast_ref::<Patrol>(), Some(&Patrol(2)));
    }

    #[test]
    fn remove_row_reports_moved_entity() {
        // Given
        let mut table = ScriptTable::new();
        table.add_row(Entity::new(1));
        table.add_row(Entity::new(2));
        table.add_row(Entity::new(3));
        table.row_mut(2).insert(world::TypeId::new(1), Box::new(Idle));

        // When
        let (removed, moved) = table.remove_row(0);

        // Then
        assert_eq!(removed.entity, Entity::new(1));
        assert_eq!(moved, Some(Entity::new(3)));
        assert_eq!(table.len(), 2);
        assert!(table.row(0).get(world::TypeId::new(1)).is_some());
        assert_eq!(table.remove_row(1).1, None);
    }
}
