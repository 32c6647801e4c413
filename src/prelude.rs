pub use crate::buffer::{Accessor, Buffer, HostAccessor, Read, ReadWrite, Write};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::device::Device;
pub use crate::error::{Error, Result};
pub use crate::event::Event;
pub use crate::handler::Handler;
pub use crate::queue::Queue;
pub use crate::range::{Item, NdItem, NdRange, Range};
pub use crate::usm::SharedAllocation;
