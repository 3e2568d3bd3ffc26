mod cache;
mod samples;

pub use cache::{CacheSnapshot, SampleCache};
pub use samples::{
    LocationSample, MotionSample, ACCELEROMETER, DEFAULT_MOTION_CHANNELS, GYROSCOPE, MAGNETOMETER,
};
