//! Sensor input validation

pub mod data;
pub mod error;

pub use data::{validate_fix, validate_heading, validate_point};
pub use error::InputError;
