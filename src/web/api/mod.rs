pub mod dataset;
pub mod error;
pub mod samples;
pub mod session;
