//! Credit scoring and monitoring pipeline
//!
//! Computes credit scores from accounting activity and an external ML model,
//! records per-interval monitoring snapshots and distributes score lifecycle
//! events to dependent services.

pub mod config;
pub mod core;
pub mod modules;

pub use modules::commands;
pub use modules::events;
pub use modules::monitoring;
pub use modules::scoring;
