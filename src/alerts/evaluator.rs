use crate::alerts::registry::AlertRegistry;
use crate::thresholds::MetricName;
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub alert: MetricName,
    pub host: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub timestamp: String,
}

pub struct AlertEvaluator<'a> {
    registry: &'a AlertRegistry,
}

impl<'a> AlertEvaluator<'a> {
    pub fn new(registry: &'a AlertRegistry) -> Self {
        Self { registry }
    }

    pub fn evaluate(&self, metric: MetricName, value: f64, host: &str) -> Option<AlertEvent> {
        self.evaluate_at(metric, value, host, Local::now())
    }

    pub fn evaluate_at<Tz>(
        &self,
        metric: MetricName,
        value: f64,
        host: &str,
        now: DateTime<Tz>,
    ) -> Option<AlertEvent>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let def = self.registry.get(metric)?;
        if value < def.threshold || value.is_nan() {
            return None;
        }
        Some(AlertEvent {
            alert: metric,
            host: host.to_string(),
            value,
            threshold: def.threshold,
            message: def.message.clone(),
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use crate::thresholds::resolve;
    use chrono::Utc;

    fn registry(platform: Platform) -> AlertRegistry {
        AlertRegistry::from_profile(&resolve(platform))
    }

    #[test]
    fn linux_cpu_over_threshold_fires() {
        let registry = registry(Platform::Linux);
        let evaluator = AlertEvaluator::new(&registry);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();

        let event = evaluator
            .evaluate_at(MetricName::CpuUsage, 55.0, "web-1", now)
            .expect("55 >= 50 must fire");
        assert_eq!(event.alert, MetricName::CpuUsage);
        assert_eq!(event.threshold, 50.0);
        assert_eq!(event.value, 55.0);
        assert_eq!(event.host, "web-1");
        assert!(event.message.contains("Cpu usage"));
        assert_eq!(event.timestamp, "13:04:05");
    }

    #[test]
    fn android_network_sent_under_threshold_is_silent() {
        let registry = registry(Platform::Android);
        let evaluator = AlertEvaluator::new(&registry);
        assert!(evaluator
            .evaluate(MetricName::NetworkSent, 5_000_000.0, "phone")
            .is_none());
    }

    #[test]
    fn threshold_comparison_is_inclusive() {
        let registry = registry(Platform::Unknown);
        let evaluator = AlertEvaluator::new(&registry);
        assert!(evaluator.evaluate(MetricName::MemoryUsage, 60.0, "h").is_some());
        assert!(evaluator.evaluate(MetricName::MemoryUsage, 59.9, "h").is_none());
        assert!(evaluator
            .evaluate(MetricName::MemoryUsage, f64::NAN, "h")
            .is_none());
    }

    #[test]
    fn removed_metric_is_not_evaluated() {
        let mut registry = registry(Platform::Linux);
        registry.remove([MetricName::DiskUsage]);
        let evaluator = AlertEvaluator::new(&registry);
        assert!(evaluator.evaluate(MetricName::DiskUsage, 99.0, "h").is_none());
    }

    #[test]
    fn timestamp_format_is_clock_time() {
        let registry = registry(Platform::Linux);
        let evaluator = AlertEvaluator::new(&registry);
        let event = evaluator
            .evaluate(MetricName::DiskWrite, 1e12, "h")
            .expect("fires");
        let parts: Vec<&str> = event.timestamp.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.len() == 2));
    }
}
