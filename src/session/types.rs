use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Transport mode the user is recording. Persisted as its numeric string value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ActivityType {
    #[default]
    #[serde(rename = "1")]
    Walk,
    #[serde(rename = "2")]
    Run,
    #[serde(rename = "3")]
    Bike,
    #[serde(rename = "4")]
    Car,
    #[serde(rename = "5")]
    Bus,
    #[serde(rename = "6")]
    Metro,
}

impl ActivityType {
    pub const ALL: [ActivityType; 6] = [
        ActivityType::Walk,
        ActivityType::Run,
        ActivityType::Bike,
        ActivityType::Car,
        ActivityType::Bus,
        ActivityType::Metro,
    ];

    pub fn value(&self) -> &'static str {
        match self {
            ActivityType::Walk => "1",
            ActivityType::Run => "2",
            ActivityType::Bike => "3",
            ActivityType::Car => "4",
            ActivityType::Bus => "5",
            ActivityType::Metro => "6",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Walk => "Walk",
            ActivityType::Run => "Run",
            ActivityType::Bike => "Bike",
            ActivityType::Car => "Car",
            ActivityType::Bus => "Bus",
            ActivityType::Metro => "Metro",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    /// Accepts either the stored value ("3") or the label ("bike").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ActivityType::ALL
            .into_iter()
            .find(|a| a.value() == s || a.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown activity type: {}", s))
    }
}

/// Picker entry for a UI.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityOption {
    pub value: ActivityType,
    pub label: String,
}

pub fn activity_options() -> Vec<ActivityOption> {
    ActivityType::ALL
        .into_iter()
        .map(|value| ActivityOption {
            value,
            label: value.label().to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub enum SessionMode {
    Idle,
    Recording { started_at: DateTime<Utc> },
}

impl SessionMode {
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionMode::Recording { .. })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStatus {
    pub mode: SessionMode,
    pub device_id: String,
    pub activity_type: ActivityType,
    /// Ticks fired since the current (or last) recording started.
    pub ticks: u64,
    pub records_written: u64,
    pub failed_appends: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Producer streams still feeding the sample cache.
    pub active_producers: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StopSummary {
    pub ticks: u64,
    pub records_written: u64,
    /// Dataset length read back after the last append finished. `None` if the read failed.
    pub dataset_len: Option<usize>,
    pub dataset_path: String,
}
