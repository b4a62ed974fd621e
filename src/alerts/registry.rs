use crate::thresholds::{MetricName, MetricUnit, ThresholdProfile};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("порог для {metric} должен быть конечным и >= 0, получено {threshold}")]
    InvalidThreshold { metric: MetricName, threshold: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDefinition {
    pub metric_name: MetricName,
    pub threshold: f64,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct AlertRegistry {
    definitions: BTreeMap<MetricName, AlertDefinition>,
}

impl AlertRegistry {
    pub fn from_profile(profile: &ThresholdProfile) -> Self {
        let definitions = profile
            .iter()
            .map(|(metric, threshold)| {
                let def = AlertDefinition {
                    metric_name: metric,
                    threshold,
                    message: default_message(metric, threshold),
                };
                (metric, def)
            })
            .collect();
        Self { definitions }
    }

    pub fn add(
        &mut self,
        metric: MetricName,
        threshold: f64,
        message: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(RegistryError::InvalidThreshold { metric, threshold });
        }
        let message = message.into();
        debug!(alert = %metric, threshold, message = %message, "алерт добавлен");
        self.definitions.insert(
            metric,
            AlertDefinition {
                metric_name: metric,
                threshold,
                message,
            },
        );
        Ok(())
    }

    /// Removes every listed alert. Names that were not registered are
    /// logged and returned; they are not an error.
    pub fn remove<I>(&mut self, metrics: I) -> Vec<MetricName>
    where
        I: IntoIterator<Item = MetricName>,
    {
        let mut missing = Vec::new();
        for metric in metrics {
            if self.definitions.remove(&metric).is_none() {
                warn!(alert = %metric, "алерт не найден");
                missing.push(metric);
            }
        }
        missing
    }

    pub fn get(&self, metric: MetricName) -> Option<&AlertDefinition> {
        self.definitions.get(&metric)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &AlertDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

pub fn default_message(metric: MetricName, threshold: f64) -> String {
    let suffix = match metric.unit() {
        MetricUnit::Percent => "%",
        MetricUnit::Bytes => " bytes",
    };
    format!("{} is above {}{}", metric.label(), threshold, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use crate::thresholds::resolve;

    fn linux_registry() -> AlertRegistry {
        AlertRegistry::from_profile(&resolve(Platform::Linux))
    }

    #[test]
    fn initialized_with_all_metrics() {
        let registry = linux_registry();
        assert_eq!(registry.len(), MetricName::ALL.len());
        let cpu = registry.get(MetricName::CpuUsage).expect("cpu_usage");
        assert_eq!(cpu.threshold, 50.0);
        assert_eq!(cpu.message, "Cpu usage is above 50%");
        let sent = registry.get(MetricName::NetworkSent).expect("network_sent");
        assert_eq!(sent.message, "Network sent is above 50000000 bytes");
    }

    #[test]
    fn add_overwrites_existing_definition() {
        let mut registry = linux_registry();
        registry
            .add(MetricName::CpuUsage, 90.0, "CPU is on fire")
            .expect("valid threshold");
        let cpu = registry.get(MetricName::CpuUsage).expect("cpu_usage");
        assert_eq!(cpu.threshold, 90.0);
        assert_eq!(cpu.message, "CPU is on fire");
        assert_eq!(registry.len(), MetricName::ALL.len());
    }

    #[test]
    fn add_rejects_negative_and_nan() {
        let mut registry = AlertRegistry::default();
        assert!(registry.add(MetricName::DiskRead, -1.0, "x").is_err());
        assert!(registry.add(MetricName::DiskRead, f64::NAN, "x").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_reports_missing_names() {
        let mut registry = linux_registry();
        let missing = registry.remove([MetricName::DiskUsage]);
        assert!(missing.is_empty());
        assert!(registry.get(MetricName::DiskUsage).is_none());

        let missing = registry.remove([MetricName::DiskUsage, MetricName::CpuUsage]);
        assert_eq!(missing, vec![MetricName::DiskUsage]);
        assert_eq!(registry.len(), MetricName::ALL.len() - 2);
    }
}
