//! Tracing/logging setup shared by every binary and test harness.

pub mod logging;

pub use logging::{LogConfig, LogFormat, UnknownLogFormat, init};
