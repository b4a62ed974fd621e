use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    CpuUsage,
    MemoryUsage,
    DiskUsage,
    DiskRead,
    DiskWrite,
    NetworkSent,
    NetworkRecv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Percent,
    Bytes,
}

impl MetricName {
    pub const ALL: [MetricName; 7] = [
        MetricName::CpuUsage,
        MetricName::MemoryUsage,
        MetricName::DiskUsage,
        MetricName::DiskRead,
        MetricName::DiskWrite,
        MetricName::NetworkSent,
        MetricName::NetworkRecv,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CpuUsage => "cpu_usage",
            Self::MemoryUsage => "memory_usage",
            Self::DiskUsage => "disk_usage",
            Self::DiskRead => "disk_read",
            Self::DiskWrite => "disk_write",
            Self::NetworkSent => "network_sent",
            Self::NetworkRecv => "network_recv",
        }
    }

    pub fn export_name(self) -> &'static str {
        match self {
            Self::CpuUsage => "cpu_usage_total",
            Self::MemoryUsage => "ram_usage_total",
            Self::DiskUsage => "disk_usage_total",
            Self::DiskRead => "disk_read_total",
            Self::DiskWrite => "disk_write_total",
            Self::NetworkSent => "network_sent_total",
            Self::NetworkRecv => "network_recv_total",
        }
    }

    pub fn export_help(self) -> &'static str {
        match self {
            Self::CpuUsage => "CPU usage percentage",
            Self::MemoryUsage => "RAM usage percentage",
            Self::DiskUsage => "Disk usage percentage",
            Self::DiskRead => "Disk read in bytes",
            Self::DiskWrite => "Disk write in bytes",
            Self::NetworkSent => "Network sent in bytes",
            Self::NetworkRecv => "Network received in bytes",
        }
    }

    pub fn unit(self) -> MetricUnit {
        match self {
            Self::CpuUsage | Self::MemoryUsage | Self::DiskUsage => MetricUnit::Percent,
            Self::DiskRead | Self::DiskWrite | Self::NetworkSent | Self::NetworkRecv => {
                MetricUnit::Bytes
            }
        }
    }

    /// "cpu_usage" -> "Cpu usage".
    pub fn label(self) -> String {
        let spaced = self.as_str().replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| format!("неизвестная метрика '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdProfile {
    platform: Platform,
    values: [f64; 7],
}

const MB_100: f64 = 100_000_000.0;
const MB_50: f64 = 50_000_000.0;
const MB_10: f64 = 10_000_000.0;

const DEFAULT_TABLE: [(MetricName, f64); 7] = [
    (MetricName::CpuUsage, 50.0),
    (MetricName::MemoryUsage, 60.0),
    (MetricName::DiskUsage, 80.0),
    (MetricName::DiskRead, MB_100),
    (MetricName::DiskWrite, MB_100),
    (MetricName::NetworkSent, MB_50),
    (MetricName::NetworkRecv, MB_50),
];

const LINUX_TABLE: &[(MetricName, f64)] = &[
    (MetricName::CpuUsage, 50.0),
    (MetricName::MemoryUsage, 70.0),
    (MetricName::DiskUsage, 85.0),
];

const ANDROID_TABLE: &[(MetricName, f64)] = &[
    (MetricName::CpuUsage, 70.0),
    (MetricName::MemoryUsage, 80.0),
    (MetricName::DiskRead, MB_50),
    (MetricName::DiskWrite, MB_50),
    (MetricName::NetworkSent, MB_10),
    (MetricName::NetworkRecv, MB_10),
];

const WINDOWS_TABLE: &[(MetricName, f64)] = &[
    (MetricName::CpuUsage, 60.0),
    (MetricName::MemoryUsage, 75.0),
    (MetricName::DiskUsage, 90.0),
];

const MACOS_TABLE: &[(MetricName, f64)] = &[
    (MetricName::CpuUsage, 60.0),
    (MetricName::MemoryUsage, 75.0),
];

fn platform_table(platform: Platform) -> &'static [(MetricName, f64)] {
    match platform {
        Platform::Android => ANDROID_TABLE,
        Platform::Linux => LINUX_TABLE,
        Platform::Windows => WINDOWS_TABLE,
        Platform::MacOS => MACOS_TABLE,
        Platform::Unknown => &[],
    }
}

pub fn resolve(platform: Platform) -> ThresholdProfile {
    let mut values = [0.0_f64; 7];
    for (metric, threshold) in DEFAULT_TABLE {
        values[metric.index()] = threshold;
    }
    for (metric, threshold) in platform_table(platform) {
        values[metric.index()] = *threshold;
    }
    ThresholdProfile { platform, values }
}

impl ThresholdProfile {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn threshold(&self, metric: MetricName) -> f64 {
        self.values[metric.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        MetricName::ALL
            .into_iter()
            .map(|m| (m, self.values[m.index()]))
    }
}
