pub mod component;
pub mod entity;
pub mod event;
pub mod index;
pub mod job;
pub mod query;
pub mod relation;
pub mod script;
pub mod storage;
pub mod store;
pub(crate) mod util;
pub mod world;

pub use component::{Component, Tag};
pub use entity::Entity;
pub use index::IndexedComponent;
pub use query::ArchetypeQuery;
pub use relation::{LinkRelation, Relation};
pub use script::Script;
pub use store::{EntityStore, StoreConfig, StoreError};

pub use rusty_store_macros::{Component, Tag};
