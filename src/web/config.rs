use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::DEFAULT_MOTION_CHANNELS;
use crate::producer::{Accuracy, WatchOptions};
use crate::storage::{DeviceId, NoShare, OutboxShare, ShareTarget, StorageError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceConfig {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub base_folder: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_period", deserialize_with = "deserialize_duration")]
    pub period: Duration,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            period: default_period(),
        }
    }
}

fn default_period() -> Duration {
    Duration::from_millis(1000)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub accuracy: Accuracy,
    #[serde(
        default = "default_location_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub time_interval: Duration,
    #[serde(default = "default_distance_interval")]
    pub distance_interval_m: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            enabled: true,
            accuracy: Accuracy::default(),
            time_interval: default_location_interval(),
            distance_interval_m: default_distance_interval(),
        }
    }
}

impl LocationConfig {
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            accuracy: self.accuracy,
            time_interval: self.time_interval,
            distance_interval_m: self.distance_interval_m,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_location_interval() -> Duration {
    Duration::from_millis(400)
}

fn default_distance_interval() -> f64 {
    0.1
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionConfig {
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    #[serde(
        default = "default_motion_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub update_interval: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig {
            channels: default_channels(),
            update_interval: default_motion_interval(),
        }
    }
}

fn default_channels() -> Vec<String> {
    DEFAULT_MOTION_CHANNELS.iter().map(|c| c.to_string()).collect()
}

fn default_motion_interval() -> Duration {
    Duration::from_millis(500)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Simulated,
    Push,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportConfig {
    pub outbox: Option<PathBuf>,
}

impl ExportConfig {
    pub fn share_target(&self) -> Arc<dyn ShareTarget> {
        match &self.outbox {
            Some(dir) => Arc::new(OutboxShare::new(dir.clone())),
            None => Arc::new(NoShare),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Start/stop recording, change activity, clear the dataset.
    Control,
    /// Post samples to the push source.
    Ingest,
    /// Read and share the dataset.
    Export,
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.period.is_zero() {
            return Err(ConfigError::Invalid("sampling.period must be positive".into()));
        }
        if self.motion.update_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "motion.update_interval must be positive".into(),
            ));
        }
        if self.location.distance_interval_m < 0.0 {
            return Err(ConfigError::Invalid(
                "location.distance_interval_m must not be negative".into(),
            ));
        }
        if let Some(id) = &self.device.id {
            DeviceId::new(id.clone())?;
        }
        Ok(())
    }

    /// The configured device id, or the one persisted next to the datasets.
    pub fn device_id(&self) -> Result<DeviceId, ConfigError> {
        match &self.device.id {
            Some(id) => Ok(DeviceId::new(id.clone())?),
            None => Ok(DeviceId::load_or_create(&self.storage.base_folder)?),
        }
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}
