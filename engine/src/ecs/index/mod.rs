//! Secondary indexes over component values.
//!
//! A component type marked `#[component(indexed)]` and implementing [`IndexedComponent`] gets a
//! [`ComponentIndex`] in every store. The store keeps the index consistent with each add,
//! update and remove of the component: an entity appears under a value exactly while its
//! component holds that value.
//!
//! The per-value entity lists are [`IdArray`]s, which store the common zero and one element
//! cases inline and pool longer lists in an [`IdArrayHeap`].

mod component_index;
mod id_array;
mod value_index;

pub(crate) use component_index::downcast;
pub use component_index::{ComponentIndex, ErasedIndex, IndexFactory, IndexedComponent, new_index};
pub use id_array::{IdArray, IdArrayHeap};
pub use value_index::{EntityIndex, RangeIndex, ValueClassIndex, ValueIndex, ValueStructIndex};
