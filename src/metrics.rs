use crate::collectors::MetricSample;
use crate::thresholds::MetricName;
use prometheus::core::Collector;
use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    started_at_unix: i64,
    host_gauges: Vec<(MetricName, Gauge)>,
    pub agent_uptime_seconds: Gauge,
    pub agent_scrape_count_total: Counter,
    pub agent_collect_errors_total: CounterVec,
    pub agent_alerts_fired_total: CounterVec,
    pub agent_journal_errors_total: Counter,
    pub agent_last_collect_timestamp_seconds: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let mut host_gauges = Vec::with_capacity(MetricName::ALL.len());
        for metric in MetricName::ALL {
            let gauge = Gauge::with_opts(opts!(metric.export_name(), metric.export_help()))?;
            register(&registry, &gauge)?;
            host_gauges.push((metric, gauge));
        }

        let agent_uptime_seconds =
            Gauge::with_opts(opts!("agent_uptime_seconds", "Agent uptime in seconds"))?;
        let agent_scrape_count_total = Counter::with_opts(opts!(
            "agent_scrape_count_total",
            "Number of /metrics scrapes"
        ))?;
        let agent_collect_errors_total = CounterVec::new(
            opts!(
                "agent_collect_errors_total",
                "Collector errors total by collector"
            ),
            &["collector"],
        )?;
        let agent_alerts_fired_total = CounterVec::new(
            opts!("agent_alerts_fired_total", "Fired alerts total by alert"),
            &["alert"],
        )?;
        let agent_journal_errors_total = Counter::with_opts(opts!(
            "agent_journal_errors_total",
            "Failed alert journal writes"
        ))?;
        let agent_last_collect_timestamp_seconds = Gauge::with_opts(opts!(
            "agent_last_collect_timestamp_seconds",
            "Unix timestamp of the last collection"
        ))?;

        register(&registry, &agent_uptime_seconds)?;
        register(&registry, &agent_scrape_count_total)?;
        register(&registry, &agent_collect_errors_total)?;
        register(&registry, &agent_alerts_fired_total)?;
        register(&registry, &agent_journal_errors_total)?;
        register(&registry, &agent_last_collect_timestamp_seconds)?;

        Ok(Arc::new(Self {
            registry,
            started_at_unix: now_unix(),
            host_gauges,
            agent_uptime_seconds,
            agent_scrape_count_total,
            agent_collect_errors_total,
            agent_alerts_fired_total,
            agent_journal_errors_total,
            agent_last_collect_timestamp_seconds,
        }))
    }

    pub fn update_from_sample(&self, sample: &MetricSample) {
        for (metric, gauge) in &self.host_gauges {
            gauge.set(sample.value(*metric));
        }
        self.agent_last_collect_timestamp_seconds
            .set(sample.collected_at_unix as f64);
        let uptime = now_unix().saturating_sub(self.started_at_unix) as f64;
        self.agent_uptime_seconds.set(uptime);
    }

    pub fn inc_scrape_count(&self) {
        self.agent_scrape_count_total.inc();
    }

    pub fn inc_collect_error(&self, collector: &str) {
        self.agent_collect_errors_total
            .with_label_values(&[collector])
            .inc();
    }

    pub fn inc_alert_fired(&self, metric: MetricName) {
        self.agent_alerts_fired_total
            .with_label_values(&[metric.as_str()])
            .inc();
    }

    pub fn inc_journal_error(&self) {
        self.agent_journal_errors_total.inc();
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
