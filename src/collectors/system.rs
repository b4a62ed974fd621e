use crate::collectors::MetricSample;
#[cfg(target_os = "linux")]
use std::fs;
use std::path::Path;
use sysinfo::{CpuExt, DiskExt, NetworkExt, NetworksExt, ProcessExt, System, SystemExt};
use tracing::debug;

const SECTOR_BYTES: u64 = 512;

// CPU usage is a delta between consecutive refreshes of the same `System`.
pub struct SystemSampler {
    system: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_cpu();
        Self { system }
    }

    pub fn sample(&mut self, now_unix: i64) -> MetricSample {
        let system = &mut self.system;
        system.refresh_cpu();
        system.refresh_memory();
        system.refresh_disks_list();
        system.refresh_disks();
        system.refresh_networks_list();
        system.refresh_networks();

        let cpu_usage = system.global_cpu_info().cpu_usage() as f64;

        let memory_usage = percent(system.used_memory(), system.total_memory());

        let disk_usage = root_disk_usage(system);

        let (disk_read, disk_write) = match collect_linux_disk_io() {
            Some(io) => io,
            None => {
                system.refresh_processes();
                process_disk_io(system)
            }
        };

        let (network_sent, network_recv) = system.networks().iter().fold(
            (0_u64, 0_u64),
            |(tx, rx), (_iface, data)| {
                (
                    tx.saturating_add(data.total_transmitted()),
                    rx.saturating_add(data.total_received()),
                )
            },
        );

        let sample = MetricSample {
            collected_at_unix: now_unix,
            cpu_usage,
            memory_usage,
            disk_usage,
            disk_read: disk_read as f64,
            disk_write: disk_write as f64,
            network_sent: network_sent as f64,
            network_recv: network_recv as f64,
        };
        debug!(?sample, "снят срез метрик");
        sample
    }
}

// Falls back to the first disk where nothing is mounted at `/`.
fn root_disk_usage(system: &System) -> f64 {
    let disks = system.disks();
    let disk = disks
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.first());
    match disk {
        Some(d) => {
            let total = d.total_space();
            percent(total.saturating_sub(d.available_space()), total)
        }
        None => 0.0,
    }
}

fn process_disk_io(system: &System) -> (u64, u64) {
    system
        .processes()
        .values()
        .map(|p| p.disk_usage())
        .fold((0_u64, 0_u64), |(r, w), u| {
            (
                r.saturating_add(u.total_read_bytes),
                w.saturating_add(u.total_written_bytes),
            )
        })
}

#[cfg(target_os = "linux")]
fn collect_linux_disk_io() -> Option<(u64, u64)> {
    let text = fs::read_to_string("/proc/diskstats").ok()?;
    let totals = parse_diskstats(&text, |name| {
        Path::new("/sys/block").join(name).exists()
            && !name.starts_with("loop")
            && !name.starts_with("ram")
    });
    Some(totals)
}

#[cfg(not(target_os = "linux"))]
fn collect_linux_disk_io() -> Option<(u64, u64)> {
    None
}

// Partition rows are skipped so nothing is counted twice.
fn parse_diskstats(text: &str, is_whole_disk: impl Fn(&str) -> bool) -> (u64, u64) {
    let mut read = 0_u64;
    let mut written = 0_u64;
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 || !is_whole_disk(fields[2]) {
            continue;
        }
        let (Ok(sectors_read), Ok(sectors_written)) =
            (fields[5].parse::<u64>(), fields[9].parse::<u64>())
        else {
            continue;
        };
        read = read.saturating_add(sectors_read.saturating_mul(SECTOR_BYTES));
        written = written.saturating_add(sectors_written.saturating_mul(SECTOR_BYTES));
    }
    (read, written)
}

fn percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
