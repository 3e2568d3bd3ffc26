use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use super::{LocationProvider, MotionProvider, PermissionStatus, WatchOptions};
use crate::cache::{LocationSample, MotionSample, ACCELEROMETER, GYROSCOPE, MAGNETOMETER};

const CHANNEL_CAPACITY: usize = 16;
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Walks a slow circle around `origin`, for running without real hardware.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedLocation {
    permission: PermissionStatus,
    origin: (f64, f64),
    radius_m: f64,
}

impl SimulatedLocation {
    pub fn new(granted: bool) -> Self {
        SimulatedLocation {
            permission: if granted {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            },
            origin: (48.137, 11.575),
            radius_m: 40.0,
        }
    }

    fn position(&self, step: u64) -> LocationSample {
        let angle = step as f64 * 0.02;
        let (lat0, lon0) = self.origin;
        let dlat = self.radius_m * angle.sin() / METERS_PER_DEGREE;
        let dlon = self.radius_m * angle.cos() / (METERS_PER_DEGREE * lat0.to_radians().cos());
        LocationSample {
            altitude: Some(519.0),
            accuracy: Some(4.0),
            speed: Some(1.3),
            heading: Some((angle.to_degrees() + 90.0).rem_euclid(360.0)),
            ..LocationSample::new(lat0 + dlat, lon0 + dlon)
        }
    }
}

impl LocationProvider for SimulatedLocation {
    fn request_foreground_permission(&self) -> PermissionStatus {
        self.permission
    }

    fn watch_position(&self, options: &WatchOptions) -> mpsc::Receiver<LocationSample> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let walker = *self;
        let period = options.time_interval.max(Duration::from_millis(1));
        let min_distance = options.distance_interval_m;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<LocationSample> = None;
            for step in 0u64.. {
                ticker.tick().await;
                let fix = walker.position(step);
                if last.is_some_and(|prev| distance_m(&prev, &fix) < min_distance) {
                    continue;
                }
                if tx.send(fix).await.is_err() {
                    break;
                }
                last = Some(fix);
            }
        });

        rx
    }
}

/// Gravity plus small oscillations on the three standard channels.
pub struct SimulatedMotion {
    channels: Vec<String>,
}

impl SimulatedMotion {
    pub fn new<S: AsRef<str>>(channels: &[S]) -> Self {
        SimulatedMotion {
            channels: channels.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }
}

impl Default for SimulatedMotion {
    fn default() -> Self {
        SimulatedMotion::new(&[ACCELEROMETER, GYROSCOPE, MAGNETOMETER])
    }
}

impl MotionProvider for SimulatedMotion {
    fn listen(&self, channel: &str, update_interval: Duration) -> Option<mpsc::Receiver<MotionSample>> {
        if !self.channels.iter().any(|c| c == channel) {
            return None;
        }
        let signal: fn(f64) -> MotionSample = match channel {
            ACCELEROMETER => |t| MotionSample::new(0.3 * t.sin(), 0.2 * (t * 1.3).cos(), 9.81),
            GYROSCOPE => |t| MotionSample::new(0.05 * t.cos(), 0.02 * t.sin(), 0.01),
            MAGNETOMETER => |t| MotionSample::new(22.0 + t.sin(), -4.0, -41.0 + t.cos()),
            _ => |_| MotionSample::new(0.0, 0.0, 0.0),
        };

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let period = update_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut step = 0u64;
            loop {
                ticker.tick().await;
                if tx.send(signal(step as f64 * 0.1)).await.is_err() {
                    break;
                }
                step += 1;
            }
        });

        Some(rx)
    }
}

fn distance_m(a: &LocationSample, b: &LocationSample) -> f64 {
    let mean_lat = ((a.latitude + b.latitude) / 2.0).to_radians();
    let dy = (a.latitude - b.latitude) * METERS_PER_DEGREE;
    let dx = (a.longitude - b.longitude) * METERS_PER_DEGREE * mean_lat.cos();
    (dx * dx + dy * dy).sqrt()
}
