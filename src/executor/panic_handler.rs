//! Catching panics raised by kernel bodies.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// What happens when a kernel body panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Abort the process, treating the failure as fatal.
    Abort,
    /// Fail the task silently; waiters still see the error.
    Isolate,
    /// Fail the task and log the panic message.
    #[default]
    LogAndContinue,
}

/// Runs kernel chunks, turning panics into [`PanicInfo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicHandler {
    strategy: PanicStrategy,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self { strategy }
    }

    pub fn execute<F, R>(&self, context: &str, f: F) -> Result<R, PanicInfo>
    where
        F: FnOnce() -> R,
    {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => Ok(result),
            Err(payload) => {
                let info = PanicInfo::from_payload(payload);

                match self.strategy {
                    PanicStrategy::Abort => {
                        log::error!("{} panicked (abort strategy): {}", context, info.message);
                        std::process::abort();
                    }
                    PanicStrategy::Isolate => {}
                    PanicStrategy::LogAndContinue => {
                        log::warn!("{} panicked: {}", context, info.message);
                    }
                }

                Err(info)
            }
        }
    }

    pub fn strategy(&self) -> PanicStrategy {
        self.strategy
    }
}

#[derive(Debug, Clone)]
pub struct PanicInfo {
    pub message: String,
}

impl PanicInfo {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolate_returns_message() {
        let handler = PanicHandler::new(PanicStrategy::Isolate);

        let result = handler.execute("kernel", || {
            panic!("bad index {}", 7);
        });

        assert_eq!(result.unwrap_err().message, "bad index 7");
    }

    #[test]
    fn test_success_passes_value_through() {
        let handler = PanicHandler::default();
        assert_eq!(handler.strategy(), PanicStrategy::LogAndContinue);

        let result = handler.execute("kernel", || 42);
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_static_str_payload() {
        let handler = PanicHandler::new(PanicStrategy::Isolate);
        let result: Result<(), _> = handler.execute("kernel", || panic!("plain"));
        assert_eq!(result.unwrap_err().message, "plain");
    }
}
