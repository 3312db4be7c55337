//! Core types and constants for the bistatic geolocation solver

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
