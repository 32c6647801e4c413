use super::task::Task;
use super::worker::{Worker, WorkerId};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::telemetry::Metrics;
use crossbeam_deque::Injector;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Work-stealing thread pool that runs ready kernel chunks.
pub struct CpuPool {
    workers: Vec<WorkerHandle>,
    injector: Arc<Injector<Task>>,
    shutdown: Arc<AtomicBool>,
    num_threads: usize,
    pending_tasks: Arc<AtomicUsize>,
    next_wake: AtomicUsize,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
    unparker: thread::Thread,
}

impl CpuPool {
    pub fn new(config: &Config, metrics: Arc<Metrics>) -> Result<Self> {
        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let pending_tasks = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(num_threads);
        let mut stealers = Vec::with_capacity(num_threads);

        for id in 0..num_threads {
            let worker = Worker::new(id, metrics.clone());
            stealers.push(worker.local_queue.stealer());
            workers.push(worker);
        }

        let mut handles: Vec<WorkerHandle> = Vec::with_capacity(num_threads);

        for worker in workers {
            let id = worker.id;
            let stealers_clone = stealers.clone();
            let injector_clone = injector.clone();
            let shutdown_clone = shutdown.clone();
            let pending_clone = pending_tasks.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let spawned = builder.spawn(move || {
                worker.run(stealers_clone, injector_clone, shutdown_clone, pending_clone);
            });

            let thread = match spawned {
                Ok(thread) => thread,
                Err(e) => {
                    // stop the workers that did start before bailing out
                    shutdown.store(true, Ordering::Release);
                    for handle in &mut handles {
                        handle.unparker.unpark();
                        if let Some(thread) = handle.thread.take() {
                            let _ = thread.join();
                        }
                    }
                    return Err(Error::executor(format!("spawn failed: {}", e)));
                }
            };

            let unparker = thread.thread().clone();

            handles.push(WorkerHandle {
                id,
                thread: Some(thread),
                unparker,
            });
        }

        log::debug!("started cpu pool with {} workers", num_threads);

        Ok(Self {
            workers: handles,
            injector,
            shutdown,
            num_threads,
            pending_tasks,
            next_wake: AtomicUsize::new(0),
        })
    }

    pub(crate) fn submit(&self, task: Task) {
        self.pending_tasks.fetch_add(1, Ordering::Relaxed);
        self.injector.push(task);

        // wake workers round-robin
        let idx = self.next_wake.fetch_add(1, Ordering::Relaxed) % self.num_threads;
        if let Some(worker) = self.workers.get(idx) {
            worker.unparker.unpark();
        }
    }

    pub fn execute<F>(&self, label: &'static str, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::new(label, f));
    }

    pub fn pending_tasks(&self) -> usize {
        self.pending_tasks.load(Ordering::Relaxed)
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        // wake everyone up to check shutdown flag
        for worker in &self.workers {
            worker.unparker.unpark();
        }

        let current = thread::current().id();
        for worker in &mut self.workers {
            // the pool can be dropped from one of its own workers
            if worker.unparker.id() == current {
                worker.thread.take();
                continue;
            }
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::warn!("worker {} terminated abnormally", worker.id);
                }
            }
        }
    }
}

impl std::fmt::Debug for CpuPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuPool")
            .field("num_threads", &self.num_threads)
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
