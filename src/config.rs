use crate::error::{Error, Result};
use crate::executor::PanicStrategy;

/// Largest work-group the CPU device accepts unless configured otherwise.
pub const DEFAULT_MAX_WORK_GROUP_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: Option<usize>,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,

    pub max_work_group_size: usize,
    /// Chunks a flat launch is split into, per worker thread.
    pub chunks_per_thread: usize,
    /// Chain every submission after the previous one on the same queue.
    pub in_order: bool,
    pub panic_strategy: PanicStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name_prefix: "kestrel-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            max_work_group_size: DEFAULT_MAX_WORK_GROUP_SIZE,
            chunks_per_thread: 4,
            in_order: false,
            panic_strategy: PanicStrategy::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_threads too large (max 1024)"));
            }
        }

        if self.max_work_group_size == 0 {
            return Err(Error::config("max_work_group_size must be > 0"));
        }

        if self.chunks_per_thread == 0 {
            return Err(Error::config("chunks_per_thread must be > 0"));
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn max_work_group_size(mut self, size: usize) -> Self {
        self.config.max_work_group_size = size;
        self
    }

    pub fn chunks_per_thread(mut self, chunks: usize) -> Self {
        self.config.chunks_per_thread = chunks;
        self
    }

    pub fn in_order(mut self, in_order: bool) -> Self {
        self.config.in_order = in_order;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
