//! Core types and constants for the coin positioning system

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
