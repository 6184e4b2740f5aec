use std::sync::Arc;

use crate::ecs::{
    component::Component,
    storage::{Heap, StructHeap},
};

/// How a query exposes one of its component columns.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSettings {
    /// Copy the chunk before handing it out; reads see the copy.
    pub(crate) snapshot: bool,
    /// Whether the live values may be mutated. Indexed components are read-only.
    pub(crate) writable: bool,
    pub(crate) name: &'static str,
}

/// One component column of a chunk.
///
/// Reads go through [`as_slice`](Self::as_slice). A column marked read-only on the query reads
/// from a private copy taken when the chunk was produced, so writes to the live values during
/// the same pass are not observed.
pub struct Column<'a, T> {
    live: &'a mut [T],
    snapshot: Option<Arc<[T]>>,
    offset: usize,
    writable: bool,
    name: &'static str,
}

impl<'a, T: Component> Column<'a, T> {
    pub(crate) fn new(live: &'a mut [T], settings: ColumnSettings) -> Self {
        let snapshot = settings.snapshot.then(|| Arc::from(&*live));
        Self {
            live,
            snapshot,
            offset: 0,
            writable: settings.writable,
            name: settings.name,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Whether reads come from a snapshot.
    #[inline]
    pub fn is_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// The values of this column.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match &self.snapshot {
            Some(snapshot) => &snapshot[self.offset..self.offset + self.live.len()],
            None => &*self.live,
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// The live values of this column.
    ///
    /// # Panics
    /// Panics for indexed component types, whose values must change through the store.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        assert!(
            self.writable,
            "{} is indexed and cannot be mutated in a query",
            self.name
        );
        &mut *self.live
    }

    /// Split the column into `[0, mid)` and `[mid, len)`.
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        let (left, right) = self.live.split_at_mut(mid);
        let head = Self {
            live: left,
            snapshot: self.snapshot.clone(),
            offset: self.offset,
            writable: self.writable,
            name: self.name,
        };
        let tail = Self {
            live: right,
            snapshot: self.snapshot,
            offset: self.offset + mid,
            writable: self.writable,
            name: self.name,
        };
        (head, tail)
    }
}

/// Walks the chunks of one column of one archetype.
pub struct ColumnCursor<'a, T> {
    chunks: std::slice::IterMut<'a, Vec<T>>,
    settings: ColumnSettings,
}

impl<'a, T: Component> ColumnCursor<'a, T> {
    pub(crate) fn new(heap: &'a mut Box<dyn Heap>, settings: ColumnSettings) -> Self {
        let heap = heap
            .as_any_mut()
            .downcast_mut::<StructHeap<T>>()
            .expect("query column type mismatch");
        Self {
            chunks: heap.chunks_mut().iter_mut(),
            settings,
        }
    }

    pub(crate) fn next_column(&mut self) -> Option<Column<'a, T>> {
        self.chunks
            .next()
            .map(|chunk| Column::new(chunk.as_mut_slice(), self.settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Component;

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Mass(u32);

    fn settings(snapshot: bool, writable: bool) -> ColumnSettings {
        ColumnSettings {
            snapshot,
            writable,
            name: "Mass",
        }
    }

    #[test]
    fn snapshot_hides_live_writes() {
        // Given
        let mut values = vec![Mass(1), Mass(2), Mass(3)];
        let mut column = Column::new(&mut values, settings(true, true));

        // When
        column.as_mut_slice()[0] = Mass(10);

        // Then
        assert_eq!(column.get(0), Some(&Mass(1)));
        drop(column);
        assert_eq!(values[0], Mass(10));
    }

    #[test]
    fn split_keeps_snapshot_offsets() {
        // Given
        let mut values = vec![Mass(1), Mass(2), Mass(3), Mass(4)];
        let column = Column::new(&mut values, settings(true, true));

        // When
        let (mut head, tail) = column.split_at(1);
        head.as_mut_slice()[0] = Mass(9);

        // Then
        assert_eq!(head.as_slice(), &[Mass(1)]);
        assert_eq!(tail.as_slice(), &[Mass(2), Mass(3), Mass(4)]);
        assert_eq!(tail.len(), 3);
    }

    #[test]
    #[should_panic(expected = "is indexed")]
    fn read_only_columns_reject_mutation() {
        let mut values = vec![Mass(1)];
        let mut column = Column::new(&mut values, settings(false, false));
        column.as_mut_slice();
    }
}
