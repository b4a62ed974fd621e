use crate::config::ExporterSettings;
use crate::metrics::Metrics;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("ошибка кодирования метрик: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("ошибка отправки метрик в коллектор: {0}")]
    Request(#[from] reqwest::Error),
}

pub struct MetricExporter {
    client: Client,
    url: String,
    timeout: Duration,
}

impl MetricExporter {
    pub fn new(client: Client, settings: &ExporterSettings, timeout: Duration) -> Self {
        Self {
            client,
            url: push_url(&settings.endpoint, &settings.host),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn push(&self, metrics: &Metrics) -> Result<(), ExportError> {
        let body = metrics.encode_metrics()?;
        let size = body.len();
        self.client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4")
            .timeout(self.timeout)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        debug!(url = %self.url, bytes = size, "метрики отправлены в коллектор");
        Ok(())
    }
}

/// `<endpoint>/metrics/job/<host>_system_monitor`; scheme defaults to http.
pub fn push_url(endpoint: &str, host: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let base = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    };
    let job: String = host
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{base}/metrics/job/{job}_system_monitor")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_url_adds_scheme_and_job() {
        assert_eq!(
            push_url("10.0.0.5:9091", "web-1"),
            "http://10.0.0.5:9091/metrics/job/web-1_system_monitor"
        );
        assert_eq!(
            push_url("https://collector.local/", "db.internal"),
            "https://collector.local/metrics/job/db_internal_system_monitor"
        );
    }

    #[tokio::test]
    async fn push_to_unreachable_collector_fails() {
        let metrics = Metrics::new().expect("инициализация метрик");
        let settings = ExporterSettings {
            host: "h".to_string(),
            endpoint: "127.0.0.1:1".to_string(),
        };
        let exporter = MetricExporter::new(Client::new(), &settings, Duration::from_millis(500));
        assert!(matches!(
            exporter.push(&metrics).await,
            Err(ExportError::Request(_))
        ));
    }
}
