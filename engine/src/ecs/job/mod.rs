//! Sequential and parallel execution of a query over its chunks.
//!
//! A [`QueryJob`] wraps an [`ArchetypeQuery`] and runs a callback on each chunk. With
//! [`QueryJob::run_parallel`] every chunk of at least
//! [`JobConfig::min_parallel_chunk_length`] entities is split into `thread_count + 1`
//! sections. The calling thread runs the first section, the [`JobRunner`] workers run the rest.
//! Sections start at multiples of the archetype's lane count, so no two sections share an
//! entity. Shorter chunks run on the calling thread.

mod runner;

use std::sync::Arc;

pub use runner::{JobRunner, Scope};

use crate::ecs::{
    query::{ArchetypeQuery, Chunk, QueryData},
    storage::CHUNK_SIZE,
    store::EntityStore,
};

/// Settings of a [`QueryJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Worker threads besides the calling thread. Zero runs everything sequentially.
    pub thread_count: usize,
    /// Chunks shorter than this run on the calling thread.
    pub min_parallel_chunk_length: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        let threads = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            thread_count: threads.saturating_sub(1),
            min_parallel_chunk_length: CHUNK_SIZE / 2,
        }
    }
}

impl JobConfig {
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_min_parallel_chunk_length(mut self, length: usize) -> Self {
        self.min_parallel_chunk_length = length;
        self
    }
}

/// A query bound to a callback execution strategy.
pub struct QueryJob<D: QueryData> {
    query: ArchetypeQuery<D>,
    config: JobConfig,
    runner: Option<Arc<JobRunner>>,
}

impl<D: QueryData> QueryJob<D> {
    /// Create a job with its own worker pool of `config.thread_count` threads.
    pub fn new(query: ArchetypeQuery<D>, config: JobConfig) -> Self {
        let runner = if config.thread_count == 0 {
            log::warn!("query job has no worker threads, chunks run sequentially");
            None
        } else {
            Some(Arc::new(JobRunner::new(config.thread_count)))
        };
        Self {
            query,
            config,
            runner,
        }
    }

    /// Create a job sharing an existing worker pool.
    pub fn with_runner(
        query: ArchetypeQuery<D>,
        runner: Arc<JobRunner>,
        min_parallel_chunk_length: usize,
    ) -> Self {
        let config = JobConfig {
            thread_count: runner.size(),
            min_parallel_chunk_length,
        };
        Self {
            query,
            config,
            runner: Some(runner),
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn query(&self) -> &ArchetypeQuery<D> {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut ArchetypeQuery<D> {
        &mut self.query
    }

    /// Run `f` on every chunk on the calling thread.
    pub fn run<F>(&mut self, store: &mut EntityStore, mut f: F)
    where
        F: FnMut(Chunk<'_, D>),
    {
        for chunk in self.query.chunks(store) {
            f(chunk);
        }
    }

    /// Run `f` on every chunk, splitting long chunks across the worker pool.
    ///
    /// Returns after every section has run. A panic in `f` is resumed on the calling thread.
    pub fn run_parallel<F>(&mut self, store: &mut EntityStore, f: F)
    where
        F: Fn(Chunk<'_, D>) + Sync,
    {
        let Some(runner) = self.runner.as_deref() else {
            for chunk in self.query.chunks(store) {
                f(chunk);
            }
            return;
        };

        let f = &f;
        let sections = self.config.thread_count + 1;
        let min_length = self.config.min_parallel_chunk_length;
        let query = &mut self.query;
        let mut chunk_count = 0;
        let mut dispatched = 0;

        runner.scope(|scope| {
            for chunk in query.chunks(store) {
                chunk_count += 1;
                if chunk.len() < min_length {
                    f(chunk);
                    continue;
                }
                let mut parts = split_sections(chunk, sections).into_iter();
                let local = parts.next();
                for part in parts {
                    dispatched += 1;
                    scope.spawn(move || f(part));
                }
                if let Some(part) = local {
                    f(part);
                }
            }
        });

        log::debug!(
            "query job ran {chunk_count} chunks, {dispatched} sections on {} workers",
            runner.size()
        );
    }
}

impl<D: QueryData> std::fmt::Debug for QueryJob<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryJob")
            .field("query", &self.query)
            .field("config", &self.config)
            .finish()
    }
}

/// Split `chunk` into at most `sections` runs, each starting at a multiple of its lane count.
fn split_sections<D: QueryData>(chunk: Chunk<'_, D>, sections: usize) -> Vec<Chunk<'_, D>> {
    let lanes = chunk.lanes().max(1);
    let step = chunk.len().div_ceil(sections.max(1)).next_multiple_of(lanes);
    let mut parts = Vec::with_capacity(sections);
    let mut rest = chunk;
    while rest.len() > step {
        let (head, tail) = rest.split_at(step);
        parts.push(head);
        rest = tail;
    }
    parts.push(rest);
    parts
}
