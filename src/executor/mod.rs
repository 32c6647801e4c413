//! Execution backend.
//!
//! A work-stealing CPU pool that runs the chunks of ready kernel launches,
//! plus the panic handling that turns a panicking kernel into a task error.

pub mod cpu_pool;
pub mod panic_handler;
pub mod task;
pub mod worker;

pub use cpu_pool::CpuPool;
pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
