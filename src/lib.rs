//! # punchd
//!
//! Attendance reconciliation agent for biometric time clocks:
//! - Polls a clock device once per scheduled time of day
//! - Classifies raw punches into per-user daily attendance records
//! - Merges them idempotently with the previously persisted document
//! - Delivers documents to a remote HR API through a durable retry queue

pub mod attendance;
pub mod config;
pub mod db;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod services;
pub mod timesync;

pub use error::{Error, Result};
