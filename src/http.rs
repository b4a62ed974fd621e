use crate::alerts::{AlertDefinition, AlertEvent, AlertJournal};
use crate::collectors::MetricSample;
use crate::metrics::Metrics;
use crate::platform::Platform;
use crate::state::State as AgentState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct HttpAppState {
    pub metrics: Arc<Metrics>,
    pub state: Arc<RwLock<AgentState>>,
    pub journal: Arc<AlertJournal>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiState {
    pub started_at: String,
    pub last_collect_timestamp_seconds: i64,
    pub host: String,
    pub platform: Platform,
    pub last_sample: Option<MetricSample>,
    pub alert_definitions: Vec<AlertDefinition>,
    pub alerts_fired_total: u64,
    pub last_alert: Option<AlertEvent>,
}

impl From<&AgentState> for ApiState {
    fn from(value: &AgentState) -> Self {
        Self {
            started_at: format_unix(value.started_at_unix),
            last_collect_timestamp_seconds: value.last_collect_timestamp_seconds,
            host: value.host.clone(),
            platform: value.platform,
            last_sample: value.last_sample.clone(),
            alert_definitions: value.alert_definitions.clone(),
            alerts_fired_total: value.alerts_fired_total,
            last_alert: value.last_alert.clone(),
        }
    }
}

pub fn build_router(
    metrics: Arc<Metrics>,
    state: Arc<RwLock<AgentState>>,
    journal: Arc<AlertJournal>,
) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/api/state", get(state_handler))
        .route("/api/alerts", get(alerts_handler))
        .with_state(HttpAppState {
            metrics,
            state,
            journal,
        })
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_handler(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_scrape_count();
    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("ошибка кодирования метрик: {err}"),
        )
            .into_response(),
    }
}

async fn state_handler(State(state): State<HttpAppState>) -> impl IntoResponse {
    let guard = state.state.read().await;
    Json(ApiState::from(&*guard))
}

async fn alerts_handler(State(state): State<HttpAppState>) -> Response {
    let journal = state.journal.clone();
    let result = tokio::task::spawn_blocking(move || journal.read_all()).await;
    match result {
        Ok(Ok(events)) => Json(events).into_response(),
        Ok(Err(err)) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("чтение журнала прервано: {err}"),
        )
            .into_response(),
    }
}

fn format_unix(ts: i64) -> String {
    let st = UNIX_EPOCH + Duration::from_secs(ts.max(0) as u64);
    humantime::format_rfc3339_seconds(st).to_string()
}
