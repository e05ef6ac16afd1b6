//! GanttFeed - server-push ingestion pipeline for Gantt task/link graphs
//!
//! Consumes a long-lived push-event connection, incrementally reshapes
//! project/sprint records into a normalized task/link graph, and
//! republishes it through a shared state cell to any number of passive
//! observers (typically a chart widget).

pub mod config;
pub mod core;
pub mod simulator;

// Re-exports
pub use config::FeedConfig;
pub use core::{
    Connection, Coordinator, GraphFragment, LinkEntry, PublishMode, SharedStateCell, StreamError,
    StreamSource, StreamStatus, SubscriptionHandle, TaskEntry,
};
pub use simulator::Simulator;

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
