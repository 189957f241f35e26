//! CLI command implementations.

pub mod altitude;
pub mod config;
pub mod prefetch;
