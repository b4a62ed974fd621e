use crate::alerts::{AlertDefinition, AlertEvent, AlertRegistry};
use crate::collectors::MetricSample;
use crate::platform::Platform;

#[derive(Debug, Clone)]
pub struct State {
    pub started_at_unix: i64,
    pub last_collect_timestamp_seconds: i64,
    pub host: String,
    pub platform: Platform,
    pub last_sample: Option<MetricSample>,
    pub alert_definitions: Vec<AlertDefinition>,
    pub alerts_fired_total: u64,
    pub last_alert: Option<AlertEvent>,
}

impl State {
    pub fn new(now_unix: i64, host: String, platform: Platform) -> Self {
        Self {
            started_at_unix: now_unix,
            last_collect_timestamp_seconds: 0,
            host,
            platform,
            last_sample: None,
            alert_definitions: Vec::new(),
            alerts_fired_total: 0,
            last_alert: None,
        }
    }

    pub fn set_alert_definitions(&mut self, registry: &AlertRegistry) {
        self.alert_definitions = registry.definitions().cloned().collect();
    }

    pub fn update_collected(&mut self, sample: MetricSample, fired: &[AlertEvent]) {
        self.last_collect_timestamp_seconds = sample.collected_at_unix;
        self.last_sample = Some(sample);
        self.alerts_fired_total = self.alerts_fired_total.saturating_add(fired.len() as u64);
        if let Some(last) = fired.last() {
            self.last_alert = Some(last.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::{resolve, MetricName};

    #[test]
    fn update_tracks_sample_and_fired_alerts() {
        let mut state = State::new(100, "web-1".to_string(), Platform::Linux);
        state.set_alert_definitions(&AlertRegistry::from_profile(&resolve(Platform::Linux)));
        assert_eq!(state.alert_definitions.len(), MetricName::ALL.len());

        let sample = MetricSample {
            collected_at_unix: 105,
            cpu_usage: 55.0,
            ..MetricSample::default()
        };
        let event = AlertEvent {
            alert: MetricName::CpuUsage,
            host: "web-1".to_string(),
            value: 55.0,
            threshold: 50.0,
            message: "Cpu usage is above 50%".to_string(),
            timestamp: "12:00:00".to_string(),
        };
        state.update_collected(sample.clone(), &[event.clone()]);
        assert_eq!(state.last_collect_timestamp_seconds, 105);
        assert_eq!(state.last_sample, Some(sample.clone()));
        assert_eq!(state.alerts_fired_total, 1);
        assert_eq!(state.last_alert, Some(event.clone()));

        state.update_collected(sample, &[]);
        assert_eq!(state.alerts_fired_total, 1);
        assert_eq!(state.last_alert, Some(event));
    }
}
