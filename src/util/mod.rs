//! Shared utilities: clock access and telemetry bootstrap.

pub mod clock;
pub mod telemetry;

pub use clock::now_epoch_seconds;
pub use telemetry::init_tracing;
