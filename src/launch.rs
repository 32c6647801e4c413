//! Kernel launch shapes and how they are split into pool tasks.
//!
//! * flat launches are cut into contiguous chunks of work items,
//! * grouped launches run each work-group on a single worker, in local-id
//!   order,
//! * single tasks run once.
//!
//! The chunk that finishes last completes the node, so workers never block
//! on each other.

use crate::error::{Error, Result};
use crate::executor::{CpuPool, PanicHandler};
use crate::graph::TaskNode;
use crate::range::{Item, NdItem, NdRange, Range};
use crate::telemetry::Metrics;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) type FlatKernel = Arc<dyn Fn(Item) + Send + Sync + 'static>;
pub(crate) type GroupedKernel = Arc<dyn Fn(NdItem) + Send + Sync + 'static>;
pub(crate) type SingleKernel = Box<dyn FnOnce() + Send + 'static>;

pub(crate) enum Launch {
    Flat { range: Range, kernel: FlatKernel },
    Grouped { nd_range: NdRange, kernel: GroupedKernel },
    Single { kernel: SingleKernel },
}

impl Launch {
    pub(crate) fn work_items(&self) -> usize {
        match self {
            Launch::Flat { range, .. } => range.len(),
            Launch::Grouped { nd_range, .. } => nd_range.global(),
            Launch::Single { .. } => 1,
        }
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            Launch::Flat { .. } => "parallel_for",
            Launch::Grouped { .. } => "parallel_for_nd",
            Launch::Single { .. } => "single_task",
        }
    }
}

impl std::fmt::Debug for Launch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launch")
            .field("shape", &self.shape())
            .field("work_items", &self.work_items())
            .finish()
    }
}

/// What chunks need from the runtime while they run.
pub(crate) struct LaunchContext<'r> {
    pub(crate) pool: &'r CpuPool,
    pub(crate) metrics: &'r Arc<Metrics>,
    pub(crate) panic_handler: PanicHandler,
    pub(crate) chunks_per_thread: usize,
}

/// Shared by the chunks of one launch.
struct LaunchState {
    node: Arc<TaskNode>,
    remaining: AtomicUsize,
    failure: Mutex<Option<Error>>,
    metrics: Arc<Metrics>,
    panic_handler: PanicHandler,
}

impl LaunchState {
    fn run_chunk<F>(&self, work_items: usize, body: F)
    where
        F: FnOnce(),
    {
        let task = self.node.id();
        let context = format!("{} ({})", task, self.node.label());

        if let Err(info) = self.panic_handler.execute(&context, body) {
            self.metrics.record_kernel_panic();
            let mut failure = self.failure.lock();
            // first panic wins
            if failure.is_none() {
                *failure = Some(Error::KernelPanic {
                    task,
                    message: info.message,
                });
            }
        }
        self.metrics.record_chunk(work_items);

        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let result = match self.failure.lock().take() {
                Some(err) => Err(err),
                None => Ok(()),
            };
            self.node.complete(result);
        }
    }
}

/// Splits `0..len` into at most `chunks` contiguous, non-empty ranges.
pub(crate) fn split_range(len: usize, chunks: usize) -> Vec<std::ops::Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let chunks = chunks.clamp(1, len);
    let base = len / chunks;
    let extra = len % chunks;

    let mut out = Vec::with_capacity(chunks);
    let mut start = 0;
    for i in 0..chunks {
        let size = base + usize::from(i < extra);
        out.push(start..start + size);
        start += size;
    }
    out
}

impl Launch {
    /// Queues the chunks of this launch on the pool. An empty index space
    /// queues nothing and yields the result at once; the caller completes
    /// the node.
    pub(crate) fn dispatch(self, node: Arc<TaskNode>, ctx: &LaunchContext<'_>) -> Option<Result<()>> {
        let chunk_count = match &self {
            Launch::Flat { range, .. } => {
                split_range(range.len(), ctx.pool.num_threads() * ctx.chunks_per_thread).len()
            }
            Launch::Grouped { nd_range, .. } => nd_range.groups(),
            Launch::Single { .. } => 1,
        };

        if chunk_count == 0 {
            log::trace!("{} has an empty index space", node.id());
            return Some(Ok(()));
        }

        log::trace!("{} split into {} chunks", node.id(), chunk_count);

        let state = Arc::new(LaunchState {
            node,
            remaining: AtomicUsize::new(chunk_count),
            failure: Mutex::new(None),
            metrics: Arc::clone(ctx.metrics),
            panic_handler: ctx.panic_handler,
        });

        match self {
            Launch::Flat { range, kernel } => {
                let total = range.len();
                for chunk in split_range(total, chunk_count) {
                    let state = Arc::clone(&state);
                    let kernel = Arc::clone(&kernel);
                    ctx.pool.execute("parallel_for", move || {
                        let items = chunk.len();
                        state.run_chunk(items, || {
                            for id in chunk {
                                kernel(Item::new(id, total));
                            }
                        });
                    });
                }
            }
            Launch::Grouped { nd_range, kernel } => {
                for group in 0..nd_range.groups() {
                    let state = Arc::clone(&state);
                    let kernel = Arc::clone(&kernel);
                    ctx.pool.execute("parallel_for_nd", move || {
                        state.run_chunk(nd_range.local(), || {
                            for local in 0..nd_range.local() {
                                kernel(NdItem::new(group, local, nd_range));
                            }
                        });
                    });
                }
            }
            Launch::Single { kernel } => {
                ctx.pool.execute("single_task", move || {
                    state.run_chunk(1, kernel);
                });
            }
        }
        None
    }
}
