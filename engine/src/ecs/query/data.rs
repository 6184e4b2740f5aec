//! Query data: the component columns a query hands out per chunk.
//!
//! [`QueryData`] is implemented for tuples of one to five component types. For a tuple
//! `(A, B)` every chunk carries `(Column<A>, Column<B>)`, one column slice per type, in the
//! order of the tuple.

use crate::{
    ecs::{
        component::Component,
        query::column::{Column, ColumnCursor, ColumnSettings},
        storage::Heap,
        world::{TypeId, TypeRegistry},
    },
    query_tuples,
};

/// Types that describe the component columns of a query.
pub trait QueryData: 'static {
    /// The column slices of one chunk.
    type Columns<'a>: Send;

    /// Per-archetype column iterators.
    type Cursors<'a>;

    /// Registered ids of the component types, in tuple order.
    fn type_ids(registry: &TypeRegistry) -> Vec<TypeId>;

    /// Take the columns at `positions` out of `heaps` and start iterating their chunks.
    ///
    /// # Panics
    /// Panics if a position is taken twice.
    fn cursors<'a>(
        heaps: &mut [Option<&'a mut Box<dyn Heap>>],
        positions: &[usize],
        settings: &[ColumnSettings],
    ) -> Self::Cursors<'a>;

    /// The columns of the next chunk.
    fn next_columns<'a>(cursors: &mut Self::Cursors<'a>) -> Option<Self::Columns<'a>>;

    /// Split every column at `mid`.
    fn split_columns<'a>(
        columns: Self::Columns<'a>,
        mid: usize,
    ) -> (Self::Columns<'a>, Self::Columns<'a>);
}

fn take<'a>(heaps: &mut [Option<&'a mut Box<dyn Heap>>], position: usize) -> &'a mut Box<dyn Heap> {
    heaps[position]
        .take()
        .expect("query column requested more than once")
}

macro_rules! tuple_query_data {
    ($($name: ident),*) => {
        impl<$($name: Component),*> QueryData for ($($name,)*) {
            type Columns<'a> = ($(Column<'a, $name>,)*);
            type Cursors<'a> = ($(ColumnCursor<'a, $name>,)*);

            fn type_ids(registry: &TypeRegistry) -> Vec<TypeId> {
                vec![$(registry.register_component::<$name>()),*]
            }

            #[allow(non_snake_case)]
            fn cursors<'a>(
                heaps: &mut [Option<&'a mut Box<dyn Heap>>],
                positions: &[usize],
                settings: &[ColumnSettings],
            ) -> Self::Cursors<'a> {
                let mut columns = positions.iter().zip(settings.iter());
                $(
                    let (position, setting) = columns.next().expect("one position per type");
                    let $name = ColumnCursor::<$name>::new(take(heaps, *position), *setting);
                )*
                ($($name,)*)
            }

            #[allow(non_snake_case)]
            fn next_columns<'a>(cursors: &mut Self::Cursors<'a>) -> Option<Self::Columns<'a>> {
                let ($($name,)*) = cursors;
                Some(($($name.next_column()?,)*))
            }

            #[allow(non_snake_case)]
            fn split_columns<'a>(
                columns: Self::Columns<'a>,
                mid: usize,
            ) -> (Self::Columns<'a>, Self::Columns<'a>) {
                let ($($name,)*) = columns;
                $(let $name = $name.split_at(mid);)*
                (($($name.0,)*), ($($name.1,)*))
            }
        }
    };
}

query_tuples!(tuple_query_data);
