//! KESTREL - Kernel Execution with Scheduled Task REgions and Lazy buffers
//!
//! A deferred, dependency-inferred kernel dispatch library. Host data is
//! wrapped in [`Buffer`]s; work is submitted to a [`Queue`] as command groups
//! that declare how they access those buffers. The runtime derives the
//! ordering between command groups from the declared accesses and runs
//! independent ones concurrently on a work-stealing thread pool.
//!
//! # Quick Start
//!
//! ```
//! use kestrel_rs::prelude::*;
//!
//! let queue = Queue::new()?;
//!
//! let mut a = vec![10; 16];
//! let mut b = vec![10; 16];
//! {
//!     let buf_a = Buffer::from_slice(&mut a);
//!     let buf_b = Buffer::from_slice(&mut b);
//!
//!     queue.submit(|h| {
//!         let acc = buf_a.read_write(h);
//!         h.parallel_for(16, move |item| acc.update(item.id(), |x| x + 2));
//!     })?;
//!     queue.submit(|h| {
//!         let acc = buf_b.read_write(h);
//!         h.parallel_for(16, move |item| acc.update(item.id(), |x| x + 3));
//!     })?;
//!     // runs after both of the above, inferred from the accesses
//!     queue.submit(|h| {
//!         let acc_a = buf_a.read_write(h);
//!         let acc_b = buf_b.read(h);
//!         h.parallel_for(16, move |item| {
//!             acc_a.update(item.id(), |x| x + acc_b.get(item.id()))
//!         });
//!     })?;
//! } // buffers write back here
//!
//! assert!(a.iter().all(|&x| x == 25));
//! # Ok::<(), kestrel_rs::Error>(())
//! ```
//!
//! # Features
//!
//! - **Inferred ordering**: read-after-write, write-after-write and
//!   write-after-read edges from declared buffer accesses
//! - **Deferred write-back**: buffers copy results back to the host region
//!   when dropped or released
//! - **Host accessors**: block until pending writers finish, then expose the
//!   current contents to the host
//! - **Launch shapes**: flat ranges, work-group (nd) ranges and single tasks
//! - **Shared allocations**: host/device visible memory with explicit waits
//! - **Work Stealing**: kernel chunks spread over a randomized-stealing pool
//! - **Telemetry**: submission, latency and edge metrics per queue

#![warn(missing_debug_implementations)]

pub mod buffer;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod executor;
pub mod graph;
pub mod handler;
pub mod prelude;
pub mod queue;
pub mod range;
pub mod telemetry;
pub mod usm;
pub mod util;

mod launch;
mod runtime;

pub use buffer::{AccessMode, Accessor, Buffer, HostAccessor, Read, ReadWrite, Write};
pub use config::{Config, ConfigBuilder};
pub use device::Device;
pub use error::{Error, Result};
pub use event::Event;
pub use executor::PanicStrategy;
pub use graph::{Dependency, EdgeKind, TaskId, TaskStatus};
pub use handler::Handler;
pub use queue::Queue;
pub use range::{Item, NdItem, NdRange, Range};
pub use telemetry::MetricsSnapshot;
pub use usm::SharedAllocation;
pub use util::Element;

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> Queue {
        Queue::with_config(Config::builder().num_threads(2).build().unwrap()).unwrap()
    }

    #[test]
    fn test_double_in_place() {
        let q = queue();
        let mut data: Vec<i32> = (0..16).collect();
        {
            let buf = Buffer::from_slice(&mut data);
            q.submit(|h| {
                let acc = buf.read_write(h);
                h.parallel_for(16, move |item| acc.update(item.id(), |x| x * 2));
            })
            .unwrap();
        }
        assert_eq!(data, (0..16).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_task_on_shared_memory() {
        let q = queue();
        let shared = q.malloc_shared::<i32>(4).unwrap();
        shared.copy_from_slice(&[1, 2, 3, 4]);

        let s = shared.clone();
        q.single_task(move || {
            for i in 0..s.len() {
                s.update(i, |x| x * 2);
            }
        })
        .unwrap()
        .wait()
        .unwrap();

        assert_eq!(shared.to_vec(), vec![2, 4, 6, 8]);
        q.free(shared);
    }
}
