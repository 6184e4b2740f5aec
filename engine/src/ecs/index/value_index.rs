//! Value indexes: the maps behind indexed components.
//!
//! Every index maps an indexed value to the [`IdArray`] of entity ids currently holding it. The
//! variants differ in how values are keyed:
//!
//! | Index                 | Value        | Map          | Extra                          |
//! |-----------------------|--------------|--------------|--------------------------------|
//! | [`ValueStructIndex`]  | `V: Hash`    | `HashMap`    |                                |
//! | [`ValueClassIndex`]   | `Option<V>`  | `HashMap`    | dedicated bucket for `None`    |
//! | [`EntityIndex`]       | `Entity`     | `HashMap`    | reverse links to the target    |
//! | [`RangeIndex`]        | `V: Ord`     | `BTreeMap`   | inclusive range lookups        |

use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
};

use crate::ecs::{
    entity::Entity,
    index::id_array::{IdArray, IdArrayHeap},
};

/// A map from indexed values to the ids of the entities holding them.
pub trait ValueIndex<V: PartialEq>: Default + Send + Sync + 'static {
    /// Record that entity `id` holds `value`.
    fn add(&mut self, id: u32, value: &V);

    /// Forget that entity `id` holds `value`. Empty entries are removed from the map.
    fn remove(&mut self, id: u32, value: &V);

    /// Move entity `id` from `old` to `new`. Equal values leave the map untouched.
    fn update(&mut self, id: u32, old: &V, new: &V) {
        if old != new {
            self.remove(id, old);
            self.add(id, new);
        }
    }

    /// Ids of the entities holding `value`, in insertion order.
    fn find(&self, value: &V) -> &[u32];

    /// The distinct values currently indexed.
    fn values(&self) -> Vec<V>;

    /// Number of distinct values currently indexed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of entities holding a value in `lo..=hi`, or `None` if the index is not sorted.
    fn range(&self, _lo: &V, _hi: &V) -> Option<Vec<u32>> {
        None
    }

    /// Ids of entities whose value links to the entity `target`. Empty unless the values are
    /// entities.
    fn linked(&self, _target: u32) -> &[u32] {
        &[]
    }
}

/// Remove `id` from an id array, reporting an id that should have been present.
///
/// Returns whether the array became empty.
fn remove_id(array: &mut IdArray, id: u32, heap: &mut IdArrayHeap) -> bool {
    let found = array.remove(id, heap);
    if !found {
        log::error!("entity {id} missing from index entry");
        debug_assert!(found, "entity {id} missing from index entry");
    }
    array.is_empty()
}

/// Exact-match index over hashable values.
#[derive(Debug)]
pub struct ValueStructIndex<V> {
    map: HashMap<V, IdArray>,
    heap: IdArrayHeap,
}

impl<V> Default for ValueStructIndex<V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            heap: IdArrayHeap::new(),
        }
    }
}

impl<V> ValueIndex<V> for ValueStructIndex<V>
where
    V: Hash + Eq + Clone + Send + Sync + 'static,
{
    fn add(&mut self, id: u32, value: &V) {
        let array = self.map.entry(value.clone()).or_default();
        array.add(id, &mut self.heap);
    }

    fn remove(&mut self, id: u32, value: &V) {
        match self.map.get_mut(value) {
            Some(array) => {
                if remove_id(array, id, &mut self.heap) {
                    self.map.remove(value);
                }
            }
            None => {
                log::error!("entity {id} missing from index: value not present");
                debug_assert!(false, "entity {id} missing from index: value not present");
            }
        }
    }

    fn find(&self, value: &V) -> &[u32] {
        self.map
            .get(value)
            .map(|array| array.ids(&self.heap))
            .unwrap_or(&[])
    }

    fn values(&self) -> Vec<V> {
        self.map.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Exact-match index over optional values. `None` is a first-class key with its own bucket.
#[derive(Debug)]
pub struct ValueClassIndex<V> {
    map: HashMap<V, IdArray>,
    null: IdArray,
    heap: IdArrayHeap,
}

impl<V> Default for ValueClassIndex<V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            null: IdArray::EMPTY,
            heap: IdArrayHeap::new(),
        }
    }
}

impl<V> ValueIndex<Option<V>> for ValueClassIndex<V>
where
    V: Hash + Eq + Clone + Send + Sync + 'static,
{
    fn add(&mut self, id: u32, value: &Option<V>) {
        match value {
            Some(value) => {
                let array = self.map.entry(value.clone()).or_default();
                array.add(id, &mut self.heap);
            }
            None => self.null.add(id, &mut self.heap),
        }
    }

    fn remove(&mut self, id: u32, value: &Option<V>) {
        match value {
            Some(value) => {
                if let Some(array) = self.map.get_mut(value) {
                    if remove_id(array, id, &mut self.heap) {
                        self.map.remove(value);
                    }
                } else {
                    log::error!("entity {id} missing from index: value not present");
                    debug_assert!(false, "entity {id} missing from index: value not present");
                }
            }
            None => {
                remove_id(&mut self.null, id, &mut self.heap);
            }
        }
    }

    fn find(&self, value: &Option<V>) -> &[u32] {
        match value {
            Some(value) => self
                .map
                .get(value)
                .map(|array| array.ids(&self.heap))
                .unwrap_or(&[]),
            None => self.null.ids(&self.heap),
        }
    }

    fn values(&self) -> Vec<Option<V>> {
        let mut values: Vec<_> = self.map.keys().cloned().map(Some).collect();
        if !self.null.is_empty() {
            values.push(None);
        }
        values
    }

    fn len(&self) -> usize {
        self.map.len() + usize::from(!self.null.is_empty())
    }
}

/// Index over entity-valued components, keyed by the target's id.
///
/// The null entity (id 0) is not indexed: it marks an unset link.
#[derive(Debug, Default)]
pub struct EntityIndex {
    map: HashMap<u32, IdArray>,
    heap: IdArrayHeap,
}

impl ValueIndex<Entity> for EntityIndex {
    fn add(&mut self, id: u32, value: &Entity) {
        if value.id() == 0 {
            return;
        }
        let array = self.map.entry(value.id()).or_default();
        array.add(id, &mut self.heap);
    }

    fn remove(&mut self, id: u32, value: &Entity) {
        if value.id() == 0 {
            return;
        }
        match self.map.get_mut(&value.id()) {
            Some(array) => {
                if remove_id(array, id, &mut self.heap) {
                    self.map.remove(&value.id());
                }
            }
            None => {
                log::error!("entity {id} missing from link index of {value}");
                debug_assert!(false, "entity {id} missing from link index of {value}");
            }
        }
    }

    fn find(&self, value: &Entity) -> &[u32] {
        self.linked(value.id())
    }

    fn values(&self) -> Vec<Entity> {
        self.map.keys().map(|id| Entity::new(*id)).collect()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn linked(&self, target: u32) -> &[u32] {
        self.map
            .get(&target)
            .map(|array| array.ids(&self.heap))
            .unwrap_or(&[])
    }
}

/// Sorted index supporting range lookups. Inserts are `O(log n)` instead of `O(1)`.
#[derive(Debug)]
pub struct RangeIndex<V> {
    map: BTreeMap<V, IdArray>,
    heap: IdArrayHeap,
}

impl<V> Default for RangeIndex<V> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
            heap: IdArrayHeap::new(),
        }
    }
}

impl<V> ValueIndex<V> for RangeIndex<V>
where
    V: Ord + Clone + Send + Sync + 'static,
{
    fn add(&mut self, id: u32, value: &V) {
        let array = self.map.entry(value.clone()).or_default();
        array.add(id, &mut self.heap);
    }

    fn remove(&mut self, id: u32, value: &V) {
        match self.map.get_mut(value) {
            Some(array) => {
                if remove_id(array, id, &mut self.heap) {
                    self.map.remove(value);
                }
            }
            None => {
                log::error!("entity {id} missing from range index: value not present");
                debug_assert!(false, "entity {id} missing from range index: value not present");
            }
        }
    }

    fn find(&self, value: &V) -> &[u32] {
        self.map
            .get(value)
            .map(|array| array.ids(&self.heap))
            .unwrap_or(&[])
    }

    fn values(&self) -> Vec<V> {
        self.map.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn range(&self, lo: &V, hi: &V) -> Option<Vec<u32>> {
        if lo > hi {
            return Some(Vec::new());
        }
        let ids = self
            .map
            .range(lo.clone()..=hi.clone())
            .flat_map(|(_, array)| array.ids(&self.heap).iter().copied())
            .collect();
        Some(ids)
    }
}
