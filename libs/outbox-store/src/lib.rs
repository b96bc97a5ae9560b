//! Durable event plane primitives: the Outbox, the Sequence Allocator, the
//! Checkpoint Store, and the Publisher that ties them together.
//!
//! Consumers (the dispatcher, poller, and replay coordinator) depend only on
//! the traits exposed here, so they can run against Postgres in production and
//! against the in-memory fakes in `testing` in unit tests.

pub mod checkpoint;
pub mod error;
pub mod outbox;
pub mod publisher;
pub mod sequence;

pub mod testing;

pub use checkpoint::{Checkpoint, CheckpointStore, PostgresCheckpointStore};
pub use error::{OutboxError, OutboxResult};
pub use outbox::{OutboxEntry, OutboxRepository, PostgresOutboxRepository};
pub use publisher::Publisher;
pub use sequence::{PostgresSequenceAllocator, SequenceAllocator};
