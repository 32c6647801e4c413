use crate::config::Config;

/// The device a queue dispatches to.
///
/// Only a CPU device exists: kernels run on the queue's worker threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    name: String,
    compute_units: usize,
    max_work_group_size: usize,
}

impl Device {
    /// The CPU device described by `config`.
    pub fn cpu(config: &Config) -> Self {
        let compute_units = config.worker_threads();
        Self {
            name: format!(
                "kestrel cpu ({}, {} threads)",
                std::env::consts::ARCH,
                compute_units
            ),
            compute_units,
            max_work_group_size: config.max_work_group_size,
        }
    }

    /// Every device available to queues; picking the first one is the
    /// default selection.
    pub fn all(config: &Config) -> Vec<Device> {
        vec![Device::cpu(config)]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compute_units(&self) -> usize {
        self.compute_units
    }

    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_device_follows_config() {
        let config = Config::builder()
            .num_threads(3)
            .max_work_group_size(256)
            .build()
            .unwrap();

        let device = Device::cpu(&config);
        assert_eq!(device.compute_units(), 3);
        assert_eq!(device.max_work_group_size(), 256);
        assert!(device.name().contains("3 threads"));
    }

    #[test]
    fn test_all_devices_non_empty() {
        assert_eq!(Device::all(&Config::default()).len(), 1);
    }
}
