pub mod system;

use crate::thresholds::MetricName;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSample {
    pub collected_at_unix: i64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub disk_read: f64,
    pub disk_write: f64,
    pub network_sent: f64,
    pub network_recv: f64,
}

impl MetricSample {
    pub fn value(&self, metric: MetricName) -> f64 {
        match metric {
            MetricName::CpuUsage => self.cpu_usage,
            MetricName::MemoryUsage => self.memory_usage,
            MetricName::DiskUsage => self.disk_usage,
            MetricName::DiskRead => self.disk_read,
            MetricName::DiskWrite => self.disk_write,
            MetricName::NetworkSent => self.network_sent,
            MetricName::NetworkRecv => self.network_recv,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        MetricName::ALL.into_iter().map(|m| (m, self.value(m)))
    }
}
