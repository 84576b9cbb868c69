//! Environment-sourced configuration.

pub mod settings;

pub use settings::{Config, ConfigError, DbBackend};
