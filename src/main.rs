mod alerts;
mod collectors;
mod config;
mod exporter;
mod http;
mod metrics;
mod platform;
mod state;
mod thresholds;

use alerts::registry::{default_message, RegistryError};
use alerts::{AlertEvaluator, AlertEvent, AlertJournal, AlertRegistry};
use axum::serve;
use clap::Parser;
use collectors::system::SystemSampler;
use collectors::MetricSample;
use config::{AlertsConfig, Config};
use exporter::MetricExporter;
use metrics::Metrics;
use platform::Platform;
use reqwest::Client;
use state::State;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thresholds::ThresholdProfile;
use tokio::net::TcpListener;
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostwatch")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    /// Override platform detection (Android, Linux, Windows, MacOS, Unknown).
    #[arg(long)]
    platform: Option<String>,
    /// Override journal_path from the config file.
    #[arg(long)]
    journal: Option<String>,
    /// Env file with HOST/IP_ADDR; defaults to the nearest `.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let mut cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "не удалось загрузить конфигурацию");
            std::process::exit(1);
        }
    };
    if let Some(journal) = cli.journal {
        cfg.journal_path = journal;
    }

    match config::load_env_file(cli.env_file.as_deref()) {
        Ok(Some(path)) => info!(path = %path.display(), "загружены переменные окружения из файла"),
        Ok(None) => debug!("env-файл не найден, используется окружение процесса"),
        Err(err) => warn!(error = %err, "не удалось разобрать env-файл, он пропущен"),
    }

    let exporter_settings = match cfg.exporter.resolve() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "не удалось подготовить настройки экспорта");
            std::process::exit(1);
        }
    };

    let platform = select_platform(cli.platform.as_deref(), cfg.platform.as_deref());
    info!(platform = %platform, "определён тип устройства");

    let profile = thresholds::resolve(platform);
    let registry = match build_registry(&profile, &cfg.alerts) {
        Ok(registry) => registry,
        Err(err) => {
            error!(error = %err, "не удалось инициализировать алерты");
            std::process::exit(1);
        }
    };
    info!(
        profile = %profile.platform(),
        active_alerts = registry.len(),
        "алерты инициализированы"
    );
    if registry.is_empty() {
        warn!("все алерты отключены, журнал пополняться не будет");
    }

    info!(
        listen = %cfg.listen,
        interval_secs = cfg.interval_secs,
        host = %exporter_settings.host,
        journal = %cfg.journal_path,
        "запуск hostwatch"
    );

    let journal = Arc::new(AlertJournal::new(&cfg.journal_path));
    let shared_state = {
        let mut state = State::new(now_unix(), exporter_settings.host.clone(), platform);
        state.set_alert_definitions(&registry);
        Arc::new(RwLock::new(state))
    };
    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "не удалось инициализировать метрики");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = {
        let cfg = cfg.clone();
        let metrics = metrics.clone();
        let http_state = shared_state.clone();
        let journal = journal.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let app = http::build_router(metrics, http_state, journal);
            let addr: SocketAddr = match cfg.listen.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    error!(error = %err, listen = %cfg.listen, "некорректный адрес listen");
                    return;
                }
            };

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, "не удалось запустить HTTP-сервер");
                    return;
                }
            };

            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "ошибка HTTP-сервера");
            }
        })
    };

    let collector_task = {
        let cfg = cfg.clone();
        let metrics = metrics.clone();
        let shared_state = shared_state.clone();
        let journal = journal.clone();
        let host = exporter_settings.host.clone();
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let client = Client::builder()
                .user_agent("hostwatch/0.1.0")
                .build()
                .unwrap_or_else(|_| Client::new());
            let exporter = cfg.exporter.push_enabled.then(|| {
                MetricExporter::new(
                    client,
                    &exporter_settings,
                    Duration::from_millis(cfg.exporter.push_timeout_ms),
                )
            });
            if let Some(exporter) = &exporter {
                info!(url = %exporter.url(), "отправка метрик в коллектор включена");
            }

            let mut sampler = SystemSampler::new();
            let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        info!("получен сигнал остановки цикла сбора");
                        break;
                    }
                    _ = ticker.tick() => {
                        let sample = sampler.sample(now_unix());
                        let fired = run_alerts(&registry, &journal, &metrics, &sample, &host);

                        metrics.update_from_sample(&sample);
                        shared_state.write().await.update_collected(sample, &fired);

                        if let Some(exporter) = &exporter {
                            if let Err(err) = exporter.push(&metrics).await {
                                metrics.inc_collect_error("export");
                                warn!(error = %err, "не удалось отправить метрики");
                            }
                        }
                    }
                }
            }
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "не удалось дождаться Ctrl+C");
    }
    info!("получен Ctrl+C, выполняется остановка");

    let _ = shutdown_tx.send(true);

    let _ = collector_task.await;
    let _ = http_task.await;
    info!("мониторинг остановлен");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// An empty label counts as unset and falls through to detection.
fn select_platform(cli: Option<&str>, configured: Option<&str>) -> Platform {
    match cli
        .into_iter()
        .chain(configured)
        .map(str::trim)
        .find(|l| !l.is_empty())
    {
        Some(label) => Platform::from_label(label),
        None => Platform::detect(),
    }
}

// A metric listed in `disabled` stays off even if it also has an override.
fn build_registry(
    profile: &ThresholdProfile,
    alerts: &AlertsConfig,
) -> Result<AlertRegistry, RegistryError> {
    let mut registry = AlertRegistry::from_profile(profile);
    for o in &alerts.overrides {
        let message = o
            .message
            .clone()
            .unwrap_or_else(|| default_message(o.metric, o.threshold));
        registry.add(o.metric, o.threshold, message)?;
    }
    registry.remove(alerts.disabled.iter().copied());
    Ok(registry)
}

// A failed journal write is logged and counted; the remaining metrics still run.
fn run_alerts(
    registry: &AlertRegistry,
    journal: &AlertJournal,
    metrics: &Metrics,
    sample: &MetricSample,
    host: &str,
) -> Vec<AlertEvent> {
    let evaluator = AlertEvaluator::new(registry);
    let mut fired = Vec::new();
    for (metric, value) in sample.iter() {
        let Some(event) = evaluator.evaluate(metric, value, host) else {
            continue;
        };
        warn!(
            alert = %event.alert,
            value = event.value,
            threshold = event.threshold,
            "{}",
            event.message
        );
        metrics.inc_alert_fired(metric);
        match journal.append(&event) {
            Ok(outcome) if outcome.recovered_from_corruption => {
                warn!(
                    path = %journal.path().display(),
                    "повреждённый журнал алертов заменён новым"
                );
            }
            Ok(_) => {}
            Err(err) => {
                metrics.inc_journal_error();
                error!(error = %err, alert = %event.alert, "не удалось записать алерт в журнал");
            }
        }
        fired.push(event);
    }
    fired
}
