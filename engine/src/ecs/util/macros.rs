/// Implement another macro for tuples of types recursively.
#[macro_export]
macro_rules! for_every_tuple {
    ($m:ident !! $head_ty:ident) => {
        $m!($head_ty);
    };
    ($m:ident !! $head_ty:ident, $($tail_ty:ident),*) => (
        $m!($head_ty, $( $tail_ty ),*);
        $crate::for_every_tuple!($m !! $( $tail_ty ),*);
    );
}

/// Apply a macro to all tuple combinations from A to L. Used for component and tag sets.
#[macro_export]
macro_rules! all_tuples {
    ($m:ident) => {
        $crate::for_every_tuple!($m !! A, B, C, D, E, F, G, H, I, J, K, L);
    };
}

/// Apply a macro to tuples of one to five types. Used for query data, which reads at most five
/// columns per chunk.
#[macro_export]
macro_rules! query_tuples {
    ($m:ident) => {
        $crate::for_every_tuple!($m !! A, B, C, D, E);
    };
}
