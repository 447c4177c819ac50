//! Metrics of the exporter process itself.

use crate::collector::Collector;
use crate::encoding::DescriptorEncoder;

/// Emits the conventional `process_*` metrics of the running exporter.
///
/// Only Linux is supported; elsewhere the collector emits nothing.
#[derive(Debug, Default)]
pub struct ProcessCollector {}

impl ProcessCollector {
    /// Create new [`ProcessCollector`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(target_os = "linux"))]
impl Collector for ProcessCollector {
    fn encode(&self, _encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl Collector for ProcessCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        use procfs::process::Process;

        use crate::metrics::MetricType;

        let tps = procfs::ticks_per_second();
        let Ok(proc) = Process::myself() else {
            return Ok(());
        };
        let Ok(stat) = proc.stat() else {
            return Ok(());
        };

        let cpu_time = (stat.utime + stat.stime) as f64 / tps as f64;
        encoder
            .encode_descriptor(
                "process_cpu_seconds_total",
                "Total user and system CPU time spent in seconds.",
                MetricType::Counter,
            )?
            .encode_value(&cpu_time)?;

        if let Ok(open_fds) = proc.fd_count() {
            encoder
                .encode_descriptor(
                    "process_open_fds",
                    "Number of open file descriptors.",
                    MetricType::Gauge,
                )?
                .encode_value(&(open_fds as u64))?;
        }

        if let Ok(limits) = proc.limits() {
            let max_fds = limit_value(limits.max_open_files.soft_limit);
            encoder
                .encode_descriptor(
                    "process_max_fds",
                    "Maximum number of open file descriptors.",
                    MetricType::Gauge,
                )?
                .encode_value(&max_fds)?;

            let max_virtual_memory = limit_value(limits.max_address_space.soft_limit);
            encoder
                .encode_descriptor(
                    "process_virtual_memory_max_bytes",
                    "Maximum amount of virtual memory available in bytes.",
                    MetricType::Gauge,
                )?
                .encode_value(&max_virtual_memory)?;
        }

        encoder
            .encode_descriptor(
                "process_virtual_memory_bytes",
                "Virtual memory size in bytes.",
                MetricType::Gauge,
            )?
            .encode_value(&stat.vsize)?;

        encoder
            .encode_descriptor(
                "process_resident_memory_bytes",
                "Resident memory size in bytes.",
                MetricType::Gauge,
            )?
            .encode_value(&(stat.rss * procfs::page_size()))?;

        // starttime is in clock ticks since boot.
        if let Ok(boot_time) = procfs::boot_time_secs() {
            let start_time = boot_time as f64 + stat.starttime as f64 / tps as f64;
            encoder
                .encode_descriptor(
                    "process_start_time_seconds",
                    "Start time of the process since unix epoch in seconds.",
                    MetricType::Gauge,
                )?
                .encode_value(&start_time)?;
        }

        Ok(())
    }
}

/// Soft resource limit, with no limit reported as `u64::MAX`.
#[cfg(target_os = "linux")]
fn limit_value(soft: procfs::process::LimitValue) -> u64 {
    match soft {
        procfs::process::LimitValue::Value(value) => value,
        procfs::process::LimitValue::Unlimited => u64::MAX,
    }
}
