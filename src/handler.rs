//! Command-group handler.
//!
//! The closure passed to [`Queue::submit`](crate::Queue::submit) receives a
//! [`Handler`]. It declares the buffer accesses of the command group
//! (through [`Buffer::access`](crate::Buffer::access) and friends), optional
//! explicit dependencies, and exactly one kernel launch.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::graph::{Requirement, TaskNode};
use crate::launch::Launch;
use crate::range::{Item, NdItem, NdRange, Range};
use std::sync::Arc;

pub struct Handler {
    requirements: Vec<Requirement>,
    explicit: Vec<Arc<TaskNode>>,
    launch: Option<Launch>,
    error: Option<Error>,
    max_work_group_size: usize,
}

/// A validated command group, ready to become a task node.
pub(crate) struct CommandGroup {
    pub(crate) requirements: Vec<Requirement>,
    pub(crate) explicit: Vec<Arc<TaskNode>>,
    pub(crate) launch: Launch,
}

impl Handler {
    pub(crate) fn new(max_work_group_size: usize) -> Self {
        Self {
            requirements: Vec::new(),
            explicit: Vec::new(),
            launch: None,
            error: None,
            max_work_group_size,
        }
    }

    pub(crate) fn require(&mut self, requirement: Requirement) {
        self.requirements.push(requirement);
    }

    /// Orders this command group after `event`, on top of whatever its
    /// buffer accesses imply.
    pub fn depends_on(&mut self, event: &Event) {
        self.explicit.push(event.node());
    }

    /// Runs `kernel` once for every item of `range`.
    pub fn parallel_for<R, F>(&mut self, range: R, kernel: F)
    where
        R: Into<Range>,
        F: Fn(Item) + Send + Sync + 'static,
    {
        self.set_launch(Launch::Flat {
            range: range.into(),
            kernel: Arc::new(kernel),
        });
    }

    /// Runs `kernel` over `global` items split into work-groups of `local`
    /// items. The group size must divide `global` and fit the device; a bad
    /// shape fails the submission.
    pub fn parallel_for_nd<F>(&mut self, global: usize, local: usize, kernel: F)
    where
        F: Fn(NdItem) + Send + Sync + 'static,
    {
        let nd_range = NdRange::new(global, local)
            .and_then(|nd| nd.check_device_limit(self.max_work_group_size).map(|()| nd));

        match nd_range {
            Ok(nd_range) => self.set_launch(Launch::Grouped {
                nd_range,
                kernel: Arc::new(kernel),
            }),
            Err(err) => self.fail(err),
        }
    }

    /// Runs `kernel` exactly once.
    pub fn single_task<F>(&mut self, kernel: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.set_launch(Launch::Single {
            kernel: Box::new(kernel),
        });
    }

    fn set_launch(&mut self, launch: Launch) {
        if self.launch.is_some() {
            self.fail(Error::command_group(
                "a command group may launch only one kernel",
            ));
            return;
        }
        self.launch = Some(launch);
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub(crate) fn finish(self) -> Result<CommandGroup> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let launch = self
            .launch
            .ok_or_else(|| Error::command_group("command group launched no kernel"))?;

        Ok(CommandGroup {
            requirements: self.requirements,
            explicit: self.explicit,
            launch,
        })
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("requirements", &self.requirements.len())
            .field("explicit", &self.explicit.len())
            .field("launch", &self.launch)
            .finish()
    }
}
