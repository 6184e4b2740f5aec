//! Reverse lookups through component indexes.

use crate::ecs::{
    entity::Entity,
    index::{self, ComponentIndex, IndexedComponent, ValueIndex},
};

use super::{EntityStore, Result, StoreError};

fn entities(ids: &[u32]) -> Vec<Entity> {
    ids.iter().map(|id| Entity::new(*id)).collect()
}

impl EntityStore {
    /// The index of `T`, `Ok(None)` while no entity has ever had a `T`.
    fn component_index<T: IndexedComponent>(&self) -> Result<Option<&ComponentIndex<T>>> {
        let id = self.registry.register_component::<T>();
        let info = self.registry.get_info(id).expect("type was just registered");
        if !info.is_indexed() {
            return Err(StoreError::NotIndexed(info.name()));
        }
        Ok(self
            .indexes
            .get(id.index())
            .and_then(|slot| slot.as_deref())
            .map(|erased| index::downcast::<T>(erased)))
    }

    /// Entities whose `T` currently has the indexed value `value`.
    pub fn find_entities<T: IndexedComponent>(&self, value: &T::Value) -> Result<Vec<Entity>> {
        Ok(self
            .component_index::<T>()?
            .map(|index| entities(index.index().find(value)))
            .unwrap_or_default())
    }

    /// Entities whose indexed value of `T` lies in `lo..=hi`. Requires a sorted index.
    pub fn find_in_range<T: IndexedComponent>(
        &self,
        lo: &T::Value,
        hi: &T::Value,
    ) -> Result<Vec<Entity>> {
        let unsupported = || StoreError::RangeUnsupported(std::any::type_name::<T>());
        match self.component_index::<T>()? {
            Some(index) => {
                let ids = index.index().range(lo, hi).ok_or_else(unsupported)?;
                Ok(entities(&ids))
            }
            // An empty index still has to reject unsorted index types.
            None => <T::Index as Default>::default()
                .range(lo, hi)
                .map(|_| Vec::new())
                .ok_or_else(unsupported),
        }
    }

    /// The distinct indexed values of `T` currently present.
    pub fn indexed_values<T: IndexedComponent>(&self) -> Result<Vec<T::Value>> {
        Ok(self
            .component_index::<T>()?
            .map(|index| index.index().values())
            .unwrap_or_default())
    }

    /// Entities with an entity-valued indexed component pointing at `target`, ordered by id.
    pub fn linked_entities(&self, target: Entity) -> Vec<Entity> {
        let mut linked: Vec<Entity> = self
            .indexes
            .iter()
            .flatten()
            .flat_map(|index| index.linked(target))
            .collect();
        linked.sort();
        linked.dedup();
        linked
    }
}
