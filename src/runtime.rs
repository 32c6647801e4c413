use crate::config::Config;
use crate::device::Device;
use crate::error::Result;
use crate::event::Event;
use crate::executor::{CpuPool, PanicHandler};
use crate::graph::{self, Backend, EdgeKind, TaskNode, Work};
use crate::handler::CommandGroup;
use crate::launch::{Launch, LaunchContext};
use crate::telemetry::Metrics;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Shared state behind a [`Queue`](crate::Queue): the worker pool, the
/// device description and the bookkeeping of submitted tasks.
pub(crate) struct Runtime {
    pool: CpuPool,
    config: Config,
    device: Device,
    metrics: Arc<Metrics>,
    panic_handler: PanicHandler,
    submissions: Mutex<Submissions>,
}

struct Submissions {
    /// Not yet waited on. Nodes that finished cleanly are pruned on submit,
    /// failed ones stay until a queue-wide wait reports them.
    outstanding: Vec<Arc<TaskNode>>,
    /// Length at which `outstanding` is pruned next; grows with the number
    /// of nodes that survive a prune so submitting stays amortized O(1).
    prune_at: usize,
    /// Most recent submission, for in-order queues.
    last: Option<Arc<TaskNode>>,
}

const MIN_PRUNE_AT: usize = 64;

impl Submissions {
    fn new() -> Self {
        Self {
            outstanding: Vec::new(),
            prune_at: MIN_PRUNE_AT,
            last: None,
        }
    }

    fn push(&mut self, node: Arc<TaskNode>) {
        if self.outstanding.len() >= self.prune_at {
            self.outstanding.retain(|n| !n.is_finished() || n.is_failed());
            self.prune_at = (self.outstanding.len() * 2).max(MIN_PRUNE_AT);
        }
        self.outstanding.push(Arc::clone(&node));
        self.last = Some(node);
    }
}

impl Runtime {
    pub(crate) fn new(config: Config) -> Result<Arc<Self>> {
        config.validate()?;

        let metrics = Arc::new(Metrics::new());
        let pool = CpuPool::new(&config, Arc::clone(&metrics))?;
        let device = Device::cpu(&config);
        let panic_handler = PanicHandler::new(config.panic_strategy);

        log::info!(
            "runtime ready on {} (in_order: {})",
            device.name(),
            config.in_order
        );

        Ok(Arc::new(Self {
            pool,
            config,
            device,
            metrics,
            panic_handler,
            submissions: Mutex::new(Submissions::new()),
        }))
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    pub(crate) fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Turns a command group into a task node wired into the graph.
    pub(crate) fn submit(self: &Arc<Self>, group: CommandGroup) -> Event {
        let CommandGroup {
            requirements,
            explicit,
            launch,
        } = group;

        let backend: Weak<dyn Backend> = Arc::downgrade(self) as Weak<dyn Backend>;
        let label = launch.shape();
        let work_items = launch.work_items();
        let node = TaskNode::new(label, Work::Kernel(launch), Some(backend));
        self.metrics.record_submission();

        {
            // held across registration so in-order chains follow submission order
            let mut submissions = self.submissions.lock();

            if self.config.in_order {
                if let Some(prev) = submissions.last.as_ref() {
                    self.add_edge(&node, prev, EdgeKind::InOrder);
                }
            }

            for pred in &explicit {
                self.add_edge(&node, pred, EdgeKind::Explicit);
            }

            for kind in graph::register(&node, &requirements) {
                self.metrics.record_edge(kind);
            }

            submissions.push(Arc::clone(&node));
        }

        log::debug!(
            "submitted {} ({}, {} work items, {} dependencies)",
            node.id(),
            label,
            work_items,
            node.dependencies().len()
        );

        node.arm();
        Event::new(node)
    }

    fn add_edge(&self, node: &Arc<TaskNode>, pred: &Arc<TaskNode>, kind: EdgeKind) {
        if node.add_dependency(pred, kind) {
            self.metrics.record_edge(kind);
        }
    }

    /// Waits for every outstanding submission; returns the first failure.
    pub(crate) fn wait_all(&self) -> Result<()> {
        let outstanding = {
            let mut submissions = self.submissions.lock();
            submissions.prune_at = MIN_PRUNE_AT;
            std::mem::take(&mut submissions.outstanding)
        };

        let mut first_error = None;
        for node in outstanding {
            if let Err(err) = node.wait() {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.submissions
            .lock()
            .outstanding
            .iter()
            .filter(|n| !n.is_finished())
            .count()
    }
}

impl Backend for Runtime {
    fn launch(&self, node: Arc<TaskNode>, launch: Launch) -> Option<Result<()>> {
        let ctx = LaunchContext {
            pool: &self.pool,
            metrics: &self.metrics,
            panic_handler: self.panic_handler,
            chunks_per_thread: self.config.chunks_per_thread,
        };
        launch.dispatch(node, &ctx)
    }

    fn finished(&self, node: &TaskNode, failed: bool) {
        self.metrics
            .record_completion(node.submitted_at().elapsed(), failed);
        if failed {
            log::debug!("{} ({}) failed", node.id(), node.label());
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("device", &self.device)
            .field("pool", &self.pool)
            .field("in_order", &self.config.in_order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;

    fn runtime(in_order: bool) -> Arc<Runtime> {
        let config = Config::builder()
            .num_threads(2)
            .in_order(in_order)
            .build()
            .unwrap();
        Runtime::new(config).unwrap()
    }

    fn single(f: impl FnOnce() + Send + 'static) -> CommandGroup {
        let mut handler = Handler::new(1024);
        handler.single_task(f);
        handler.finish().unwrap()
    }

    #[test]
    fn test_submit_and_wait_all() {
        let rt = runtime(false);
        let event = rt.submit(single(|| {}));
        rt.wait_all().unwrap();
        assert!(event.is_complete());
        assert_eq!(rt.outstanding(), 0);
        assert_eq!(rt.metrics().snapshot().tasks_completed, 1);
    }

    #[test]
    fn test_outstanding_list_is_pruned() {
        let rt = runtime(false);
        for _ in 0..1000 {
            rt.submit(single(|| {})).wait().unwrap();
        }
        let len = rt.submissions.lock().outstanding.len();
        assert!(len <= 2 * MIN_PRUNE_AT, "outstanding grew to {}", len);
        rt.wait_all().unwrap();
    }

    #[test]
    fn test_in_order_adds_edges() {
        let rt = runtime(true);
        let (tx, rx) = std::sync::mpsc::channel::<()>();

        // the first task blocks until released, so the second sees it unfinished
        let first = rt.submit(single(move || {
            let _ = rx.recv();
        }));
        let second = rt.submit(single(|| {}));

        assert_eq!(second.dependencies().len(), 1);
        assert_eq!(second.dependencies()[0].task, first.id());
        assert_eq!(second.dependencies()[0].kind, EdgeKind::InOrder);

        tx.send(()).unwrap();
        rt.wait_all().unwrap();
    }
}
