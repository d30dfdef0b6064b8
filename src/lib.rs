#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod http;
pub mod limiter;
pub mod telemetry;

pub type Result<T> = std::result::Result<T, error::Error>;
