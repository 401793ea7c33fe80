//! NetLog Infrastructure Layer
//!
//! Batching pipeline, SQLite storage and the connectivity publisher.
pub mod connectivity;
pub mod database;
pub mod pipeline;
pub mod repositories;
