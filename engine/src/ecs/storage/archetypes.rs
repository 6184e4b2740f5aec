use std::collections::HashMap;

use crate::ecs::{
    storage::archetype::{Archetype, ArchetypeKey, Id},
    world,
};

/// Central registry of the archetypes of one store.
///
/// Archetypes are created lazily on first use of a key and are never destroyed, so an archetype
/// id stays valid for the lifetime of the store.
#[derive(Debug, Default)]
pub struct Archetypes {
    /// The archetypes stored by their unique identifier
    archetypes: Vec<Archetype>,

    /// The archetypes indexed by their key
    by_key: HashMap<ArchetypeKey, Id>,
}

impl Archetypes {
    /// Create an empty archetype registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            archetypes: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Get the id of the archetype for `key`, creating it if none exists.
    pub fn get_or_create(&mut self, key: &ArchetypeKey, registry: &world::TypeRegistry) -> Id {
        if let Some(id) = self.by_key.get(key) {
            return *id;
        }

        let id = Id::new(self.archetypes.len() as u32);
        let infos = registry.info_for_spec(&key.components);
        log::debug!("creating archetype {} with key {}", id.index(), key);
        self.archetypes.push(Archetype::new(id, key.clone(), &infos));
        self.by_key.insert(key.clone(), id);
        id
    }

    /// Get the id of an existing archetype by key.
    #[inline]
    pub fn find(&self, key: &ArchetypeKey) -> Option<Id> {
        self.by_key.get(key).copied()
    }

    /// Get an archetype by its archetype Id.
    #[inline]
    pub fn get(&self, archetype_id: Id) -> Option<&Archetype> {
        self.archetypes.get(archetype_id.index())
    }

    /// Get a mutable archetype by its archetype Id, if it exists.
    #[inline]
    pub fn get_mut(&mut self, archetype_id: Id) -> Option<&mut Archetype> {
        self.archetypes.get_mut(archetype_id.index())
    }

    /// Mutable access to two distinct archetypes at once.
    ///
    /// # Panics
    /// Panics if the ids are equal or out of range.
    pub fn pair_mut(&mut self, a: Id, b: Id) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b, "pair_mut requires distinct archetypes");
        if a.index() < b.index() {
            let (low, high) = self.archetypes.split_at_mut(b.index());
            (&mut low[a.index()], &mut high[0])
        } else {
            let (low, high) = self.archetypes.split_at_mut(a.index());
            (&mut high[0], &mut low[b.index()])
        }
    }

    /// Number of archetypes created so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Archetype> {
        self.archetypes.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Archetype> {
        self.archetypes.iter_mut()
    }
}
