use crate::ecs::{
    entity::Entity,
    query::{column::ColumnSettings, data::QueryData},
    storage::{Archetype, CHUNK_SIZE, Heap, archetype},
    world::TypeId,
};

/// A contiguous run of entities of one archetype and their component columns.
///
/// Chunks never span archetypes and hold at most [`CHUNK_SIZE`] entities.
pub struct Chunk<'a, D: QueryData> {
    entities: &'a [Entity],
    columns: D::Columns<'a>,
    lanes: usize,
}

impl<'a, D: QueryData> Chunk<'a, D> {
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids, parallel to every column.
    #[inline]
    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    #[inline]
    pub fn columns(&self) -> &D::Columns<'a> {
        &self.columns
    }

    #[inline]
    pub fn columns_mut(&mut self) -> &mut D::Columns<'a> {
        &mut self.columns
    }

    pub fn into_parts(self) -> (&'a [Entity], D::Columns<'a>) {
        (self.entities, self.columns)
    }

    /// SIMD lane count of the archetype; parallel sections start at multiples of it.
    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Split the chunk into the entities `[0, mid)` and `[mid, len)`.
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        let (left, right) = self.entities.split_at(mid);
        let (head, tail) = D::split_columns(self.columns, mid);
        (
            Chunk {
                entities: left,
                columns: head,
                lanes: self.lanes,
            },
            Chunk {
                entities: right,
                columns: tail,
                lanes: self.lanes,
            },
        )
    }
}

struct Current<'a, D: QueryData> {
    entities: std::slice::Chunks<'a, Entity>,
    cursors: D::Cursors<'a>,
    lanes: usize,
}

/// Iterator over the chunks of every archetype matched by a query.
///
/// Empty archetypes produce no chunks.
pub struct Chunks<'a, D: QueryData> {
    archetypes: std::slice::IterMut<'a, Archetype>,
    matched: std::slice::Iter<'a, archetype::Id>,
    type_ids: &'a [TypeId],
    settings: &'a [ColumnSettings],
    current: Option<Current<'a, D>>,
}

impl<'a, D: QueryData> Chunks<'a, D> {
    pub(crate) fn new(
        archetypes: std::slice::IterMut<'a, Archetype>,
        matched: &'a [archetype::Id],
        type_ids: &'a [TypeId],
        settings: &'a [ColumnSettings],
    ) -> Self {
        Self {
            archetypes,
            matched: matched.iter(),
            type_ids,
            settings,
            current: None,
        }
    }

    /// Position the iterator on the next non-empty matched archetype.
    fn advance(&mut self) -> Option<()> {
        loop {
            let id = *self.matched.next()?;
            // Matched ids are ascending, so skipped archetypes are never needed again.
            let archetype = self.archetypes.find(|a| a.id() == id)?;
            if archetype.is_empty() {
                continue;
            }

            let lanes = archetype.lanes();
            let (key, entities, heaps) = archetype.split_mut();
            let positions: Vec<usize> = self
                .type_ids
                .iter()
                .map(|id| {
                    key.components
                        .position(*id)
                        .expect("matched archetype has every queried column")
                })
                .collect();
            let mut slots: Vec<Option<&'a mut Box<dyn Heap>>> =
                heaps.iter_mut().map(Some).collect();
            let cursors = D::cursors(&mut slots, &positions, self.settings);

            self.current = Some(Current {
                entities: entities.chunks(CHUNK_SIZE),
                cursors,
                lanes,
            });
            return Some(());
        }
    }
}

impl<'a, D: QueryData> Iterator for Chunks<'a, D> {
    type Item = Chunk<'a, D>;

    fn next(&mut self) -> Option<Chunk<'a, D>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(entities) = current.entities.next() {
                    let columns = D::next_columns(&mut current.cursors)
                        .expect("columns have one chunk per entity chunk");
                    return Some(Chunk {
                        entities,
                        columns,
                        lanes: current.lanes,
                    });
                }
                self.current = None;
            }
            self.advance()?;
        }
    }
}
