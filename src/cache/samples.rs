use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const ACCELEROMETER: &str = "accelerometer";
pub const GYROSCOPE: &str = "gyroscope";
pub const MAGNETOMETER: &str = "magnetometer";

/// Motion channels recorded when the configuration does not name any.
pub const DEFAULT_MOTION_CHANNELS: [&str; 3] = [ACCELEROMETER, GYROSCOPE, MAGNETOMETER];

/// A position fix as delivered by the location watcher.
///
/// Optional fields are carried through exactly as the producer reported them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
        }
    }
}

/// Three-axis reading in the sensor's native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
