use crate::config::Config;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::handler::Handler;
use crate::range::{Item, NdItem, Range};
use crate::runtime::Runtime;
use crate::telemetry::MetricsSnapshot;
use crate::usm::SharedAllocation;
use crate::util::Element;
use std::sync::Arc;

/// Submits command groups to a device.
///
/// Submission never blocks on earlier work: ordering comes from the buffer
/// accesses each command group declares. Dropping a queue waits for
/// everything submitted through it.
///
/// ```
/// use kestrel_rs::{Buffer, Queue};
///
/// let queue = Queue::new()?;
/// let mut data: Vec<i32> = (0..16).collect();
/// {
///     let buf = Buffer::from_slice(&mut data);
///     queue.submit(|h| {
///         let acc = buf.read_write(h);
///         h.parallel_for(16, move |item| acc.update(item.id(), |x| x * 2));
///     })?;
/// }
/// assert_eq!(data[15], 30);
/// # Ok::<(), kestrel_rs::Error>(())
/// ```
pub struct Queue {
    runtime: Arc<Runtime>,
}

impl Queue {
    /// A queue on the default device.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            runtime: Runtime::new(config)?,
        })
    }

    pub fn device(&self) -> &Device {
        self.runtime.device()
    }

    pub fn config(&self) -> &Config {
        self.runtime.config()
    }

    /// Records a command group and returns at once.
    ///
    /// `f` declares the accesses and the single kernel launch of the group.
    /// Malformed groups are rejected here; kernel failures surface through
    /// the returned [`Event`] and [`Queue::wait`].
    pub fn submit<F>(&self, f: F) -> Result<Event>
    where
        F: FnOnce(&mut Handler),
    {
        let mut handler = Handler::new(self.device().max_work_group_size());
        f(&mut handler);

        let group = handler.finish().map_err(|err| {
            log::warn!("command group rejected: {}", err);
            err
        })?;
        Ok(self.runtime.submit(group))
    }

    /// Shortcut for a command group that only launches `kernel` over
    /// `range`. It has no buffer accesses.
    pub fn parallel_for<R, F>(&self, range: R, kernel: F) -> Result<Event>
    where
        R: Into<Range>,
        F: Fn(Item) + Send + Sync + 'static,
    {
        self.submit(|h| h.parallel_for(range, kernel))
    }

    pub fn parallel_for_nd<F>(&self, global: usize, local: usize, kernel: F) -> Result<Event>
    where
        F: Fn(NdItem) + Send + Sync + 'static,
    {
        self.submit(|h| h.parallel_for_nd(global, local, kernel))
    }

    pub fn single_task<F>(&self, kernel: F) -> Result<Event>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(|h| h.single_task(kernel))
    }

    /// Blocks until everything submitted so far has finished. Returns the
    /// first failure among them.
    pub fn wait(&self) -> Result<()> {
        self.runtime.wait_all()
    }

    /// Allocates `count` zeroed elements reachable from host and kernels.
    pub fn malloc_shared<T>(&self, count: usize) -> Result<SharedAllocation<T>>
    where
        T: Element + Default,
    {
        if count == 0 {
            return Err(Error::allocation("cannot allocate zero elements"));
        }
        let bytes = count
            .checked_mul(std::mem::size_of::<T>())
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or_else(|| Error::allocation(format!("{} elements overflow", count)))?;

        self.runtime.metrics().record_shared_allocation(bytes);
        log::debug!("allocated {} shared bytes", bytes);
        Ok(SharedAllocation::zeroed(count))
    }

    /// Gives an allocation back. Kernels still holding a handle keep the
    /// memory alive until they finish.
    pub fn free<T: Element>(&self, allocation: SharedAllocation<T>) {
        log::debug!(
            "freeing {} shared bytes ({} handles left)",
            allocation.size_bytes(),
            allocation.handle_count() - 1
        );
        drop(allocation);
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.runtime.metrics().snapshot()
    }

    /// Submissions that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.runtime.outstanding()
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("runtime", &self.runtime)
            .finish()
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        if let Err(err) = self.runtime.wait_all() {
            log::warn!("queue dropped with a failed submission: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn queue() -> Queue {
        let config = Config::builder().num_threads(2).build().unwrap();
        Queue::with_config(config).unwrap()
    }

    #[test]
    fn test_parallel_for_visits_every_item() {
        let q = queue();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        q.parallel_for(100, move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap()
        .wait()
        .unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_malloc_shared_zero_is_an_error() {
        let q = queue();
        assert!(matches!(
            q.malloc_shared::<i32>(0),
            Err(Error::Allocation(_))
        ));
    }

    #[test]
    fn test_malloc_shared_records_bytes() {
        let q = queue();
        let alloc = q.malloc_shared::<u64>(8).unwrap();
        assert_eq!(q.metrics().shared_bytes_allocated, 64);
        q.free(alloc);
    }

    #[test]
    fn test_rejected_group_does_not_submit() {
        let q = queue();
        assert!(q.submit(|_| {}).is_err());
        assert_eq!(q.metrics().tasks_submitted, 0);
    }

    #[test]
    fn test_empty_range_completes() {
        let q = queue();
        let event = q.parallel_for(0, |_| unreachable!()).unwrap();
        event.wait().unwrap();
        assert!(event.is_complete());
    }
}
