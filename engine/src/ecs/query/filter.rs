use fixedbitset::FixedBitSet;

use crate::ecs::{storage::Archetype, world::TypeId};

/// Tag and component filters of a query, as bit sets over type ids.
///
/// An archetype passes if it has all `all_*` types, at least one `any_*` type (when any are
/// given), not every `without_all_*` type (when any are given) and none of the
/// `without_any_*` types.
#[derive(Debug, Default, Clone)]
pub struct QueryFilter {
    all_tags: FixedBitSet,
    any_tags: FixedBitSet,
    without_all_tags: FixedBitSet,
    without_any_tags: FixedBitSet,
    all_components: FixedBitSet,
    any_components: FixedBitSet,
    without_all_components: FixedBitSet,
    without_any_components: FixedBitSet,
}

/// Which set of a [`QueryFilter`] a type id is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterSet {
    AllTags,
    AnyTags,
    WithoutAllTags,
    WithoutAnyTags,
    AllComponents,
    AnyComponents,
    WithoutAllComponents,
    WithoutAnyComponents,
}

fn insert(set: &mut FixedBitSet, id: TypeId) {
    set.grow(id.index() + 1);
    set.insert(id.index());
}

fn passes(
    bits: &FixedBitSet,
    all: &FixedBitSet,
    any: &FixedBitSet,
    without_all: &FixedBitSet,
    without_any: &FixedBitSet,
) -> bool {
    all.is_subset(bits)
        && (any.is_clear() || !any.is_disjoint(bits))
        && (without_all.is_clear() || !without_all.is_subset(bits))
        && without_any.is_disjoint(bits)
}

impl QueryFilter {
    pub(crate) fn insert(&mut self, set: FilterSet, id: TypeId) {
        let target = match set {
            FilterSet::AllTags => &mut self.all_tags,
            FilterSet::AnyTags => &mut self.any_tags,
            FilterSet::WithoutAllTags => &mut self.without_all_tags,
            FilterSet::WithoutAnyTags => &mut self.without_any_tags,
            FilterSet::AllComponents => &mut self.all_components,
            FilterSet::AnyComponents => &mut self.any_components,
            FilterSet::WithoutAllComponents => &mut self.without_all_components,
            FilterSet::WithoutAnyComponents => &mut self.without_any_components,
        };
        insert(target, id);
    }

    /// Whether the archetype passes every filter.
    pub fn matches(&self, archetype: &Archetype) -> bool {
        passes(
            archetype.tag_bits(),
            &self.all_tags,
            &self.any_tags,
            &self.without_all_tags,
            &self.without_any_tags,
        ) && passes(
            archetype.component_bits(),
            &self.all_components,
            &self.any_components,
            &self.without_all_components,
            &self.without_any_components,
        )
    }
}
