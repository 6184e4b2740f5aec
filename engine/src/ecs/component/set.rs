use crate::{
    all_tuples,
    ecs::{
        component::{Component, IntoSpec},
        world,
    },
};

/// Trait describing a target that can have component values applied to it from a `Set`.
///
/// The entity store implements this for the freshly appended row of an archetype.
pub trait Target {
    /// Write `value` of the component registered as `id`.
    fn apply<C: Component>(&mut self, id: world::TypeId, value: C);
}

/// A set of component values used to create an entity in a single archetype placement.
///
/// Examples of sets include: a single component value or a (nested) tuple of component values.
pub trait Set: IntoSpec + Sized + 'static {
    /// Apply the component values in this set to the given target. This takes ownership of self.
    fn apply<T: Target>(self, registry: &world::TypeRegistry, target: &mut T);
}

/// Implement Set for single component types.
impl<C: Component> Set for C {
    fn apply<T: Target>(self, registry: &world::TypeRegistry, target: &mut T) {
        target.apply::<C>(registry.register_component::<C>(), self);
    }
}

impl Set for () {
    fn apply<T: Target>(self, _registry: &world::TypeRegistry, _target: &mut T) {
        // No components to apply.
    }
}

/// Implement Set for tuples of component types.
macro_rules! tuple_set {
    ($($name: ident),*) => {
        impl<$($name: Set),*> Set for ($($name,)*) {

            /// Apply each component in the tuple to the target.
            fn apply<CT: Target>(self, registry: &world::TypeRegistry, target: &mut CT) {
                 #[allow(non_snake_case)]
                let ( $($name,)* ) = self;
                 #[allow(non_snake_case)]
                $(<$name as Set>::apply($name, registry, target);)*
            }
        }
    }
}

// Implement the tuple Set for all tuples up to 12 elements.
all_tuples!(tuple_set);
