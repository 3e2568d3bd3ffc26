mod clock;
mod controller;
mod error;
mod record;
mod types;

pub use controller::{SessionController, DEFAULT_PERIOD};
pub use error::SessionError;
pub use record::CompositeRecord;
pub use types::{
    activity_options, ActivityOption, ActivityType, SessionMode, SessionStatus, StopSummary,
};
