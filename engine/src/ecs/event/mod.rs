//! Structural change events.
//!
//! The store notifies observers synchronously after a mutation completed: handlers see the
//! post-mutation state and run in subscription order before the mutating call returns.
//! Subscriptions return a [`Handle`] used to unsubscribe.

mod broker;

pub(crate) use broker::Broker;
pub use broker::Handle;

use crate::ecs::{entity::Entity, world};

/// Marker trait for event types.
///
/// Events must be:
/// - `'static`: No borrowed data
/// - `Send + Sync`: Safe to share across threads
/// - `Clone`: Events may be read by multiple consumers
/// - `Debug`: For diagnostics and logging
pub trait Event: 'static + Send + Sync + Clone + std::fmt::Debug {}

/// How a component or script changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Add,
    Update,
    Remove,
}

/// A struct component was added, updated or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentChanged {
    pub entity: Entity,
    pub action: ChangeAction,
    pub type_id: world::TypeId,
}

impl Event for ComponentChanged {}

/// The tag set of an entity changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagsChanged {
    pub entity: Entity,
    pub added: Vec<world::TypeId>,
    pub removed: Vec<world::TypeId>,
}

impl Event for TagsChanged {}

/// A script was added, replaced or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptChanged {
    pub entity: Entity,
    pub action: ChangeAction,
    pub type_id: world::TypeId,
}

impl Event for ScriptChanged {}

/// How a child list changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildAction {
    Add,
    Insert,
    Remove,
}

/// A child was added to, inserted into or removed from a parent's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildNodesChanged {
    pub action: ChildAction,
    pub parent: Entity,
    pub child: Entity,
    /// Position of the child in the parent's list (before removal for `Remove`).
    pub index: usize,
}

impl Event for ChildNodesChanged {}
