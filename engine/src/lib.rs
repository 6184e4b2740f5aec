//! Archetype based entity storage.
//!
//! `rusty_store` places entities into column oriented archetypes keyed by their component and
//! tag signature, and layers secondary component indexes, one-to-many relation components,
//! per-entity scripts and an entity tree on top of that storage. See [`ecs::store::EntityStore`]
//! for the entry point.

// Allow the derive macros to refer to `::rusty_store` from inside this crate.
extern crate self as rusty_store;

pub mod ecs;
