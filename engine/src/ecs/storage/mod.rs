//! Column-oriented structural storage.
//!
//! Entities sharing the same component types and tags are stored together in an
//! [`Archetype`]. Each archetype keeps one [`Heap`] (column) per component type plus a parallel
//! list of entity ids:
//!
//! ```text
//! Archetype [Position, Velocity]
//! ┌─────────────────────────────────────────────────────────────┐
//! │ entities:  [E1, E2, E3, ...]                                │
//! │ Position:  [chunk 0: P1 P2 ... P512][chunk 1: P513 ...]     │
//! │ Velocity:  [chunk 0: V1 V2 ... V512][chunk 1: V513 ...]     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row `i` of every column belongs to `entities[i]`. Columns are split into chunks of
//! [`CHUNK_SIZE`] values which bounds the size of a single buffer and gives queries and parallel
//! jobs natural units of work.
//!
//! # Structural changes
//!
//! Adding or removing a component type (or tag) moves an entity to the archetype of its new key.
//! [`Archetype::move_entity_to`] moves the shared component values, default-initializes the new
//! ones and swap-removes the entity from the source. Swap-removal keeps the columns dense: the
//! last row is moved into the hole and the caller patches the node of the moved entity.
//!
//! [`Archetypes`] owns every archetype of a store and creates them lazily by key.

pub mod archetype;
mod archetypes;
pub mod heap;

pub use archetype::{Archetype, ArchetypeKey};
pub use archetypes::Archetypes;
pub use heap::{CHUNK_SIZE, Heap, HeapFactory, StructHeap};
