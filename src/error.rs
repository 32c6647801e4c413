use crate::graph::TaskId;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by submissions, waits and allocations.
///
/// `Clone` so that a single task failure can be handed to every waiter of
/// the failed node and of its dependents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid nd-range: global size {global} with work-group size {local}: {reason}")]
    InvalidNdRange {
        global: usize,
        local: usize,
        reason: String,
    },

    #[error("invalid command group: {0}")]
    InvalidCommandGroup(String),

    #[error("kernel panicked in {task}: {message}")]
    KernelPanic { task: TaskId, message: String },

    #[error("{task} skipped: dependency {failed} failed")]
    DependencyFailed { task: TaskId, failed: TaskId },

    #[error("allocation error: {0}")]
    Allocation(String),

    #[error("executor error: {0}")]
    Executor(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn command_group<S: Into<String>>(msg: S) -> Self {
        Error::InvalidCommandGroup(msg.into())
    }

    pub fn allocation<S: Into<String>>(msg: S) -> Self {
        Error::Allocation(msg.into())
    }

    pub(crate) fn nd_range<S: Into<String>>(global: usize, local: usize, reason: S) -> Self {
        Error::InvalidNdRange {
            global,
            local,
            reason: reason.into(),
        }
    }

    /// The task whose failure this error originates from, if any.
    pub fn failed_task(&self) -> Option<TaskId> {
        match self {
            Error::KernelPanic { task, .. } => Some(*task),
            Error::DependencyFailed { failed, .. } => Some(*failed),
            _ => None,
        }
    }
}
