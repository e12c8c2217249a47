//! Shared components - common types, errors, and utilities

pub mod types;
pub mod errors;
pub mod shutdown;
pub mod utils;
