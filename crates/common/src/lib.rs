//! Common types and configuration shared across polyquery crates.
//!
//! - **Models**: backend selector, backend configs and the tabular result (`models`).
//! - **Configuration**: layered file + environment application config (`config`).
//! - **Logging**: query/DSN sanitizing (`scrubber`) and subscriber setup (`telemetry`).
pub mod config;
pub mod models;
pub mod scrubber;
pub mod telemetry;

pub use models::{
    AthenaConfig, Backend, BackendSelector, DriverConfig, DsnConfig, TabularResult,
    UnknownBackendPolicy, NULL_MARKER,
};
