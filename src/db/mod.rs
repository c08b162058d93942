//! Durable storage for the delivery queue

pub mod init;
pub mod queue;

pub use init::init_database;
pub use queue::{PendingKind, PendingQueue, PendingTransmission};
