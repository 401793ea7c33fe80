//! NetLog Application Layer
//!
//! Ports the pipeline talks to and the per-stream processors that turn raw
//! telemetry into persistable records.
pub mod ports;
pub mod services;
