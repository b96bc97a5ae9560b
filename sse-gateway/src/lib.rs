//! Horizontally-scalable Server-Sent Events fan-out service.
//!
//! The distributed event plane lives in the `outbox-store` crate; this crate
//! wires it to HTTP: the process-local Dispatcher, the per-client Stream
//! Engine, the Replay Coordinator, the Poller, and the Heartbeat Ticker.

pub mod config;
pub mod error;
pub mod handlers;
pub mod heartbeat;
pub mod models;
pub mod poller;
pub mod reaper;
pub mod registry;
pub mod replay;
pub mod stream_engine;
pub mod transport;

use std::sync::Arc;

use outbox_store::{PostgresCheckpointStore, PostgresOutboxRepository, PostgresSequenceAllocator, Publisher};
use sqlx::PgPool;

use crate::config::GatewayConfig;
use crate::registry::Dispatcher;

pub type ConcretePublisher = Publisher<PostgresSequenceAllocator, PostgresOutboxRepository>;

/// Shared application state handed to every handler via `web::Data`.
pub struct AppState {
    pub db_pool: PgPool,
    pub dispatcher: Arc<Dispatcher>,
    pub outbox: Arc<PostgresOutboxRepository>,
    pub checkpoints: Arc<PostgresCheckpointStore>,
    pub publisher: Arc<ConcretePublisher>,
    pub config: GatewayConfig,
}
