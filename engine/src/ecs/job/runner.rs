use std::{
    any::Any,
    marker::PhantomData,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use crossbeam::{
    channel::{Receiver, Sender, unbounded},
    sync::WaitGroup,
};

type Task = Box<dyn FnOnce() + Send + 'static>;

type Panic = Box<dyn Any + Send + 'static>;

/// A fixed pool of worker threads running the sections of parallel query jobs.
pub struct JobRunner {
    sender: Sender<Message>,
    workers: Vec<Worker>,
}

enum Message {
    Task(Task),
    Shutdown,
}

struct Worker {
    handle: Option<thread::JoinHandle<()>>,
}

impl JobRunner {
    /// Start `size` worker threads.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "job runner needs at least one worker");

        let (sender, receiver) = unbounded();
        let workers = (0..size).map(|_| Worker::new(receiver.clone())).collect();
        Self { sender, workers }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Run `f` with a scope that can spawn tasks borrowing from the caller.
    ///
    /// Returns once every spawned task has finished. A panic in a task is resumed on the
    /// calling thread after that.
    pub fn scope<'env, F, R>(&'env self, f: F) -> R
    where
        F: FnOnce(&Scope<'env>) -> R,
    {
        let mut scope = Scope {
            runner: self,
            wait: Some(WaitGroup::new()),
            panic: Arc::new(Mutex::new(None)),
            _env: PhantomData,
        };
        let result = f(&scope);
        if let Some(payload) = scope.finish() {
            panic::resume_unwind(payload);
        }
        result
    }

    fn send(&self, task: Task) {
        self.sender
            .send(Message::Task(task))
            .expect("job workers outlive the runner handle");
    }
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner").field("size", &self.size()).finish()
    }
}

/// Spawns tasks that may borrow data living at least as long as `'env`.
pub struct Scope<'env> {
    runner: &'env JobRunner,
    wait: Option<WaitGroup>,
    panic: Arc<Mutex<Option<Panic>>>,
    _env: PhantomData<std::cell::Cell<&'env ()>>,
}

impl<'env> Scope<'env> {
    /// Queue `f` on the worker pool.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'env,
    {
        let wait = self.wait.clone().expect("scope is still open");
        let panic = Arc::clone(&self.panic);
        let task: Box<dyn FnOnce() + Send + 'env> = Box::new(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
                panic
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(payload);
            }
            drop(wait);
        });
        // SAFETY: the scope waits for every task before it is dropped, and the scope cannot
        // outlive 'env, so nothing the task borrows is released while it runs.
        let task: Task = unsafe { std::mem::transmute(task) };
        self.runner.send(task);
    }

    /// Wait for all tasks and return the first panic payload, if any.
    fn finish(&mut self) -> Option<Panic> {
        if let Some(wait) = self.wait.take() {
            wait.wait();
        }
        self.panic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        // Reached without `finish` only while unwinding out of the scope closure.
        if let Some(wait) = self.wait.take() {
            wait.wait();
        }
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.sender.send(Message::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take()
                && handle.join().is_err()
            {
                log::error!("job worker exited with a panic");
            }
        }
    }
}

impl Worker {
    fn new(receiver: Receiver<Message>) -> Self {
        let handle = thread::spawn(move || {
            while let Ok(Message::Task(task)) = receiver.recv() {
                task();
            }
        });
        Self {
            handle: Some(handle),
        }
    }
}
