use fixedbitset::FixedBitSet;

use crate::{
    all_tuples,
    ecs::{
        component::{Component, Tag},
        world,
    },
};

/// A sorted, duplicate free set of registered type ids.
///
/// Specs describe the component signature and the tag set of an archetype. Being sorted, equal
/// sets hash and compare equal regardless of the order the ids were supplied in, so a spec can
/// be used directly as a map key.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Spec {
    ids: Vec<world::TypeId>,
}

impl Spec {
    /// An empty component specification.
    pub const EMPTY: Self = Spec { ids: Vec::new() };

    /// Construct a new Spec from the given component IDs.
    #[inline]
    pub fn new(ids: impl Into<Vec<world::TypeId>>) -> Self {
        let mut ids = ids.into();
        // Ensure the IDs are sorted.
        ids.sort();
        // Remove any duplicates. Perhaps this should be an error instead?
        ids.dedup();
        // Trim any excess capacity.
        ids.shrink_to_fit();

        Self { ids }
    }

    /// Get the component IDs in this specification.
    #[inline]
    pub fn ids(&self) -> &[world::TypeId] {
        &self.ids
    }

    /// Determine if this specification contains the given component ID.
    #[inline]
    pub fn contains(&self, id: world::TypeId) -> bool {
        // Binary search since the IDs are sorted.
        self.ids.binary_search(&id).is_ok()
    }

    /// Create a new spec that is the union with the other spec.
    #[inline]
    pub fn union(&self, other: &Spec) -> Self {
        let mut ids = Vec::with_capacity(self.ids.len() + other.ids.len());
        ids.extend_from_slice(&self.ids);
        ids.extend_from_slice(&other.ids);
        Self::new(ids)
    }

    /// Get the components in self that are not in other (set difference).
    #[inline]
    pub fn difference(&self, other: &Spec) -> Self {
        let ids: Vec<_> = self
            .ids
            .iter()
            .copied()
            .filter(|id| !other.contains(*id))
            .collect();
        Self { ids } // Already sorted
    }

    /// Get the components in both self and other (set intersection).
    #[inline]
    pub fn intersection(&self, other: &Spec) -> Self {
        let ids: Vec<_> = self
            .ids
            .iter()
            .copied()
            .filter(|id| other.contains(*id))
            .collect();
        Self { ids } // Already sorted
    }

    /// Returns true if this spec is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the number of component IDs in this spec.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// A spec with `id` added.
    #[inline]
    pub fn with(&self, id: world::TypeId) -> Self {
        match self.ids.binary_search(&id) {
            Ok(_) => self.clone(),
            Err(pos) => {
                let mut ids = self.ids.clone();
                ids.insert(pos, id);
                Self { ids }
            }
        }
    }

    /// A spec with `id` removed.
    #[inline]
    pub fn without(&self, id: world::TypeId) -> Self {
        let ids = self.ids.iter().copied().filter(|i| *i != id).collect();
        Self { ids }
    }

    /// Position of `id` within this spec. Archetype columns are stored in spec order, so this
    /// is also the column index of a component type.
    #[inline]
    pub fn position(&self, id: world::TypeId) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    /// The spec as a bitset indexed by type id, used for structural query matching.
    pub fn to_bitset(&self) -> FixedBitSet {
        let len = self.ids.last().map(|id| id.index() + 1).unwrap_or(0);
        let mut bits = FixedBitSet::with_capacity(len);
        for id in &self.ids {
            bits.insert(id.index());
        }
        bits
    }
}

impl From<Vec<world::TypeId>> for Spec {
    #[inline]
    fn from(value: Vec<world::TypeId>) -> Self {
        Spec::new(value)
    }
}

/// Trait for converting a component type (or tuple of them) into a component `Spec`.
pub trait IntoSpec<Marker = ()> {
    /// Convert the type into a component specification using the given registry.
    fn into_spec(registry: &world::TypeRegistry) -> Spec;
}

/// [`IntoSpec`] implementation for the empty tuple.
impl IntoSpec for () {
    /// Convert the empty tuple into an empty Spec.
    fn into_spec(_registry: &world::TypeRegistry) -> Spec {
        Spec::EMPTY
    }
}

/// [`IntoSpec`] implementation for single component types.
impl<C: Component> IntoSpec for C {
    fn into_spec(registry: &world::TypeRegistry) -> Spec {
        Spec::new([registry.register_component::<C>()])
    }
}

/// [`IntoSpec`] implementation for tuples of other [`IntoSpec`] types.
macro_rules! tuple_spec {
    ($($name: ident),*) => {
        impl<$($name: IntoSpec),*> IntoSpec for ($($name,)*) {
            fn into_spec(registry: &world::TypeRegistry) -> Spec {
                let mut ids = Vec::new();
                $(
                    ids.extend(<$name>::into_spec(registry).ids());
                )*
                Spec::new(ids)
            }
        }
    }
}

// Implement the tuple -> Spec for all tuples up to 12 elements.
all_tuples!(tuple_spec);

/// Trait for converting a tag type (or tuple of them) into a tag `Spec`.
pub trait IntoTagSpec {
    /// Convert the type into a tag specification using the given registry.
    fn into_tag_spec(registry: &world::TypeRegistry) -> Spec;
}

impl IntoTagSpec for () {
    fn into_tag_spec(_registry: &world::TypeRegistry) -> Spec {
        Spec::EMPTY
    }
}

impl<T: Tag> IntoTagSpec for T {
    fn into_tag_spec(registry: &world::TypeRegistry) -> Spec {
        Spec::new([registry.register_tag::<T>()])
    }
}

macro_rules! tuple_tag_spec {
    ($($name: ident),*) => {
        impl<$($name: IntoTagSpec),*> IntoTagSpec for ($($name,)*) {
            fn into_tag_spec(registry: &world::TypeRegistry) -> Spec {
                let mut ids = Vec::new();
                $(
                    ids.extend(<$name>::into_tag_spec(registry).ids());
                )*
                Spec::new(ids)
            }
        }
    }
}

all_tuples!(tuple_tag_spec);
