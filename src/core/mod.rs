//! Core pipeline - push connection, ingestion stream, shared cell, coordinator

mod cell;
mod connection;
mod coordinator;
mod model;
mod stream;
pub mod transform;

pub use cell::{PublishMode, SharedStateCell, SubscriptionHandle};
pub use connection::{Connection, ConnectionState, PushEvent, CLOSE_CHANNEL, RECORD_CHANNEL};
pub use coordinator::{Coordinator, StreamStatus};
pub use model::{
    GraphFragment, LinkEntry, LinkKind, RawLink, RawProjectRecord, RawSprintRecord, TaskEntry,
    TaskKind,
};
pub use stream::{teardown, FragmentStream, StreamError, StreamSource};
