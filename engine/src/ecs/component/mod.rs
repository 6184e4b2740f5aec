//! Component and tag types of the entity store.
//!
//! Components are plain data structs attached to entities. All entities sharing the same set of
//! component types and tags live together in one archetype, so a component type is part of an
//! entity's *shape*.
//!
//! ## Architecture
//!
//! - [`Component`]: the trait every struct component implements, usually via
//!   `#[derive(Component)]`.
//! - [`Tag`]: zero-sized markers that are part of an archetype key but carry no data.
//! - [`Spec`]: a sorted set of registered type ids, used as archetype signature.
//! - [`Set`]: a bundle of component values applied to a new entity in one step.
//!
//! ## Usage
//!
//! ```ignore
//! use rusty_store::ecs::{Component, Tag};
//!
//! #[derive(Component, Clone, Default)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Tag)]
//! struct Selected;
//! ```

mod set;
mod spec;

pub use set::{Set, Target};
pub use spec::{IntoSpec, IntoTagSpec, Spec};

use crate::ecs::index::IndexFactory;

/// A struct component stored in archetype columns.
///
/// `Default` provides the value written into a column when an entity gains the type without an
/// explicit value, e.g. through [`EntityStore::add_component_by_id`]. `Clone` is used to copy
/// entities and to snapshot read-only query columns.
///
/// [`EntityStore::add_component_by_id`]: crate::ecs::EntityStore::add_component_by_id
pub trait Component: 'static + Sized + Send + Sync + Clone + Default {
    /// Factory of the secondary value index maintained for this type, if any.
    ///
    /// `#[derive(Component)]` with `#[component(indexed)]` overrides this for types that also
    /// implement [`IndexedComponent`](crate::ecs::IndexedComponent).
    fn index_factory() -> Option<IndexFactory> {
        None
    }
}

/// A zero-sized marker type attached to entities.
///
/// Tags are part of the archetype key, so entities with different tags live in different
/// archetypes and queries can filter on them without touching any column.
pub trait Tag: 'static + Send + Sync {}
