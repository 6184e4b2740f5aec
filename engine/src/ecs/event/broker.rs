//! Registry of event observers.
//!
//! The [`Broker`] keeps one observer list per event type, stored as `Box<dyn ErasedObservers>`
//! keyed by `TypeId` and downcast back to the concrete `Observers<E>` by the generic accessors.
//!
//! While an event is dispatched its observer list is taken out of the broker. Handlers only
//! receive a shared store reference, so they cannot subscribe or unsubscribe mid-dispatch and
//! the list is restored unchanged afterwards.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::ecs::{event::Event, store::EntityStore};

/// Identifies a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

type Handler<E> = Box<dyn FnMut(&EntityStore, &E) + Send>;

/// The observers of one event type, in subscription order.
pub(crate) struct Observers<E: Event> {
    handlers: Vec<(Handle, Handler<E>)>,
}

impl<E: Event> Observers<E> {
    fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Invoke every handler in subscription order.
    pub fn notify(&mut self, store: &EntityStore, event: &E) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(store, event);
        }
    }
}

/// Type-erased interface over [`Observers`].
trait ErasedObservers: Any + Send {
    fn remove(&mut self, handle: Handle) -> bool;

    fn len(&self) -> usize;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> ErasedObservers for Observers<E> {
    fn remove(&mut self, handle: Handle) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != handle);
        self.handlers.len() != before
    }

    fn len(&self) -> usize {
        self.handlers.len()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Central registry of all observer lists of a store.
#[derive(Default)]
pub(crate) struct Broker {
    observers: HashMap<TypeId, Box<dyn ErasedObservers>>,
    next_handle: u64,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for events of type `E`.
    pub fn subscribe<E: Event>(
        &mut self,
        handler: impl FnMut(&EntityStore, &E) + Send + 'static,
    ) -> Handle {
        self.next_handle += 1;
        let handle = Handle(self.next_handle);
        let observers = self
            .observers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Observers::<E>::new()));
        observers
            .as_any_mut()
            .downcast_mut::<Observers<E>>()
            .expect("observer list type mismatch")
            .handlers
            .push((handle, Box::new(handler)));
        handle
    }

    /// Remove a subscription. Returns `false` for unknown or already removed handles.
    pub fn unsubscribe(&mut self, handle: Handle) -> bool {
        self.observers.values_mut().any(|o| o.remove(handle))
    }

    /// Number of handlers subscribed to `E`.
    pub fn observer_count<E: Event>(&self) -> usize {
        self.observers
            .get(&TypeId::of::<E>())
            .map(|o| o.len())
            .unwrap_or(0)
    }

    /// Take the observers of `E` out for dispatch. `None` if nobody listens.
    pub fn take<E: Event>(&mut self) -> Option<Observers<E>> {
        let observers = self.observers.remove(&TypeId::of::<E>())?;
        if observers.len() == 0 {
            self.observers.insert(TypeId::of::<E>(), observers);
            return None;
        }
        let observers = observers
            .into_any()
            .downcast::<Observers<E>>()
            .expect("observer list type mismatch");
        Some(*observers)
    }

    /// Put observers taken with [`take`](Self::take) back.
    pub fn restore<E: Event>(&mut self, observers: Observers<E>) {
        self.observers.insert(TypeId::of::<E>(), Box::new(observers));
    }
}
