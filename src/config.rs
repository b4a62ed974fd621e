use crate::alerts::journal::DEFAULT_JOURNAL_PATH;
use crate::thresholds::MetricName;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub listen: String,
    pub interval_secs: u64,
    #[serde(default = "default_journal_path")]
    pub journal_path: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_host_env")]
    pub host_env: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_endpoint_env")]
    pub endpoint_env: String,
    #[serde(default = "default_push_enabled")]
    pub push_enabled: bool,
    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlertsConfig {
    #[serde(default)]
    pub disabled: Vec<MetricName>,
    #[serde(default)]
    pub overrides: Vec<AlertOverride>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertOverride {
    pub metric: MetricName,
    pub threshold: f64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterSettings {
    pub host: String,
    pub endpoint: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            host: None,
            host_env: default_host_env(),
            endpoint: None,
            endpoint_env: default_endpoint_env(),
            push_enabled: default_push_enabled(),
            push_timeout_ms: default_push_timeout_ms(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
    #[error("не задан {setting}: укажите '{env}' в окружении или exporter.{setting} в config")]
    MissingSetting { setting: &'static str, env: String },
    #[error("не удалось загрузить env-файл: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле listen обязательно".to_string(),
            ));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "поле listen должно быть корректным адресом host:port".to_string(),
            ));
        }
        if self.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "interval_secs должно быть >= 1".to_string(),
            ));
        }
        if self.journal_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "journal_path не должен быть пустым".to_string(),
            ));
        }
        if self.exporter.push_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "exporter.push_timeout_ms должен быть > 0".to_string(),
            ));
        }

        validate_alerts(&self.alerts)?;

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

impl ExporterConfig {
    pub fn resolve(&self) -> Result<ExporterSettings, ConfigError> {
        let host = setting_from_env(&self.host_env)
            .or_else(|| non_empty(self.host.as_deref()))
            .ok_or_else(|| ConfigError::MissingSetting {
                setting: "host",
                env: self.host_env.clone(),
            })?;
        let endpoint = setting_from_env(&self.endpoint_env)
            .or_else(|| non_empty(self.endpoint.as_deref()))
            .ok_or_else(|| ConfigError::MissingSetting {
                setting: "endpoint",
                env: self.endpoint_env.clone(),
            })?;
        Ok(ExporterSettings { host, endpoint })
    }
}

/// Values from the file replace variables already set in the process.
/// `path: None` searches `.env` in the working directory and its parents.
/// A missing file is not an error.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let loaded = match path {
        Some(path) => dotenvy::from_path_override(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv_override(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn setting_from_env(env_name: &str) -> Option<String> {
    std::env::var(env_name)
        .ok()
        .and_then(|v| non_empty(Some(v.as_str())))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_alerts(cfg: &AlertsConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for o in &cfg.overrides {
        if !seen.insert(o.metric) {
            return Err(ConfigError::Validation(format!(
                "alerts.overrides: метрика '{}' указана повторно",
                o.metric
            )));
        }
        if !o.threshold.is_finite() || o.threshold < 0.0 {
            return Err(ConfigError::Validation(format!(
                "alerts.overrides '{}' threshold должен быть >= 0",
                o.metric
            )));
        }
        if o.message.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "alerts.overrides '{}' message не должен быть пустым",
                o.metric
            )));
        }
    }
    Ok(())
}

fn default_journal_path() -> String {
    DEFAULT_JOURNAL_PATH.to_string()
}

fn default_host_env() -> String {
    "HOST".to_string()
}

fn default_endpoint_env() -> String {
    "IP_ADDR".to_string()
}

const fn default_push_enabled() -> bool {
    true
}

const fn default_push_timeout_ms() -> u64 {
    3000
}
