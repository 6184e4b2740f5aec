//! The schema shared by entity stores.
//!
//! Every component, tag, relation and script type is registered once in a [`TypeRegistry`] and
//! receives a small dense [`TypeId`]. Those ids key the archetype signatures, the index and
//! relation tables and the per-entity presence bits, so no store operation reflects on a type
//! at call time.
mod type_registry;

pub use type_registry::{TypeId, TypeInfo, TypeKind, TypeRegistry};
