use crate::alerts::evaluator::AlertEvent;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_JOURNAL_PATH: &str = "alerts.json";

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("не удалось прочитать журнал алертов {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("журнал алертов {path} повреждён: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },
    #[error("не удалось сериализовать журнал алертов: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("не удалось записать журнал алертов {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub total: usize,
    pub recovered_from_corruption: bool,
}

/// Pretty-printed JSON array of alert events on disk.
///
/// Every append rewrites the whole file: read, push, write to a sibling
/// temp file, rename over the journal. The rename keeps a crash from
/// leaving a half-written journal; the mutex serializes appends inside
/// this process. Separate processes sharing the file still race.
#[derive(Debug)]
pub struct AlertJournal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AlertJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &AlertEvent) -> Result<AppendOutcome, JournalError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (mut events, recovered) = match self.load() {
            Ok(events) => (events, false),
            Err(JournalError::Corrupt { path, source }) => {
                warn!(path = %path, error = %source, "журнал алертов повреждён, начинаем с пустого");
                (Vec::new(), true)
            }
            Err(err) => return Err(err),
        };

        events.push(event.clone());
        self.store(&events)?;
        debug!(
            path = %self.path.display(),
            total = events.len(),
            alert = %event.alert,
            "событие записано в журнал"
        );

        Ok(AppendOutcome {
            total: events.len(),
            recovered_from_corruption: recovered,
        })
    }

    pub fn read_all(&self) -> Result<Vec<AlertEvent>, JournalError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load()
    }

    fn load(&self) -> Result<Vec<AlertEvent>, JournalError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(JournalError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| JournalError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn store(&self, events: &[AlertEvent]) -> Result<(), JournalError> {
        let body = serde_json::to_string_pretty(events)?;
        let tmp = self.temp_path();
        let write_err = |source: std::io::Error| JournalError::Write {
            path: self.path.display().to_string(),
            source,
        };
        fs::write(&tmp, body).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            write_err(source)
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_JOURNAL_PATH.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::MetricName;
    use tempfile::tempdir;

    fn event(alert: MetricName, value: f64, timestamp: &str) -> AlertEvent {
        AlertEvent {
            alert,
            host: "web-1".to_string(),
            value,
            threshold: 50.0,
            message: "Cpu usage is above 50%".to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn appends_preserve_order() {
        let dir = tempdir().unwrap();
        let journal = AlertJournal::new(dir.path().join("alerts.json"));
        let e1 = event(MetricName::CpuUsage, 55.0, "10:00:00");
        let e2 = event(MetricName::MemoryUsage, 61.5, "10:00:05");

        let first = journal.append(&e1).unwrap();
        assert_eq!(first.total, 1);
        assert!(!first.recovered_from_corruption);
        journal.append(&e2).unwrap();

        assert_eq!(journal.read_all().unwrap(), vec![e1, e2]);
    }

    #[test]
    fn read_back_preserves_every_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        let journal = AlertJournal::new(&path);
        let written: Vec<AlertEvent> = (0..5)
            .map(|i| AlertEvent {
                alert: MetricName::ALL[i],
                host: format!("host-{i}"),
                value: 123_456_789.25 + i as f64,
                threshold: 100_000_000.0,
                message: format!("message #{i}"),
                timestamp: format!("23:59:0{i}"),
            })
            .collect();
        for e in &written {
            journal.append(e).unwrap();
        }

        let reopened = AlertJournal::new(&path);
        assert_eq!(reopened.read_all().unwrap(), written);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("[\n"), "journal must be pretty-printed");
        assert!(raw.contains("\"alert\": \"disk_usage\""));
        assert!(raw.contains("\"timestamp\": \"23:59:02\""));
    }

    #[test]
    fn corrupted_journal_is_replaced_on_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        fs::write(&path, "{ this is not json").unwrap();
        let journal = AlertJournal::new(&path);

        assert!(matches!(
            journal.read_all(),
            Err(JournalError::Corrupt { .. })
        ));

        let e = event(MetricName::CpuUsage, 77.0, "08:15:00");
        let outcome = journal.append(&e).unwrap();
        assert!(outcome.recovered_from_corruption);
        assert_eq!(outcome.total, 1);
        assert_eq!(journal.read_all().unwrap(), vec![e]);
    }

    #[test]
    fn non_utf8_journal_is_replaced_on_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        fs::write(&path, [0xff, 0xfe, b'[', 0x80]).unwrap();
        let journal = AlertJournal::new(&path);

        assert!(matches!(
            journal.read_all(),
            Err(JournalError::Corrupt { .. })
        ));

        let e = event(MetricName::MemoryUsage, 91.0, "08:16:00");
        let outcome = journal.append(&e).unwrap();
        assert!(outcome.recovered_from_corruption);
        assert_eq!(outcome.total, 1);
        assert_eq!(journal.read_all().unwrap(), vec![e]);
    }

    #[test]
    fn whitespace_only_journal_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        fs::write(&path, " \n\t").unwrap();
        assert!(AlertJournal::new(&path).read_all().unwrap().is_empty());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let journal = AlertJournal::new(dir.path().join("absent.json"));
        assert!(journal.read_all().unwrap().is_empty());
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let dir = tempdir().unwrap();
        let journal = AlertJournal::new(dir.path().join("no-such-dir").join("alerts.json"));
        let err = journal
            .append(&event(MetricName::CpuUsage, 90.0, "00:00:00"))
            .unwrap_err();
        assert!(matches!(err, JournalError::Write { .. }));
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let journal = AlertJournal::new(dir.path().join("alerts.json"));
        journal
            .append(&event(MetricName::DiskRead, 1.0, "01:02:03"))
            .unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["alerts.json".to_string()]);
    }
}
