//! Unit of work handed to the CPU pool.

use std::time::Instant;

/// One chunk of a kernel launch (or any other closure) queued on the pool.
pub(crate) struct Task {
    pub(crate) label: &'static str,
    pub(crate) func: Box<dyn FnOnce() + Send + 'static>,
    pub(crate) spawn_time: Instant,
}

impl Task {
    pub fn new<F>(label: &'static str, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            label,
            func: Box::new(f),
            spawn_time: Instant::now(),
        }
    }

    pub fn execute(self) {
        (self.func)();
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("label", &self.label)
            .field("spawn_time", &self.spawn_time)
            .finish()
    }
}
