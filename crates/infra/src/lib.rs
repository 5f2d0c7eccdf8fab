//! Infrastructure layer: storage adapters and configuration.

pub mod config;
pub mod store;

pub use config::{ConfigError, CookieConfig, GatehouseConfig};
pub use store::InMemoryStore;
