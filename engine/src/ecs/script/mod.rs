//! Per-entity scripts.
//!
//! Scripts are boxed, mutable objects attached to an entity, at most one per script type. They
//! are not part of the archetype: they live in a [`ScriptTable`] whose rows are addressed by the
//! `script_index` of the entity's node.
//!
//! A script is moved into the store when added, so a script value can never be owned by two
//! entities at once.

mod table;

use std::any::Any;

pub(crate) use table::ScriptTable;

/// A boxed per-entity behavior.
///
/// Implement this for any `Clone` type; [`ScriptClone`] is provided by a blanket impl.
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Patrol { speed: f32 }
///
/// impl Script for Patrol {}
/// ```
pub trait Script: ScriptClone + Send + Sync + 'static {}

/// Object-safe cloning and downcasting for boxed scripts.
pub trait ScriptClone {
    /// Clone into a new box, used when an entity is cloned.
    fn clone_script(&self) -> Box<dyn Script>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Consume the box, for downcasting a removed script.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Script + Clone> ScriptClone for T {
    fn clone_script(&self) -> Box<dyn Script> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Clone for Box<dyn Script> {
    fn clone(&self) -> Self {
        self.clone_script()
    }
}
