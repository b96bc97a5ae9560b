use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use outbox_store::{PostgresCheckpointStore, PostgresOutboxRepository, PostgresSequenceAllocator, Publisher};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sse_gateway::config::Config;
use sse_gateway::registry::Dispatcher;
use sse_gateway::{handlers, heartbeat, poller, reaper, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(std::io::Error::other(format!("failed to load .env: {err}")));
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting sse-gateway");

    let config = Config::from_env().map_err(|e| std::io::Error::other(e.to_string()))?;

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to connect to database: {e}")))?;

    tracing::info!("connected to database");

    let outbox = Arc::new(PostgresOutboxRepository::new(db_pool.clone()));
    let sequence_allocator = Arc::new(PostgresSequenceAllocator::new(db_pool.clone()));
    let checkpoints = Arc::new(PostgresCheckpointStore::new(db_pool.clone()));
    let publisher = Arc::new(Publisher::new(sequence_allocator, outbox.clone()));
    let dispatcher = Arc::new(Dispatcher::new());

    let shutdown = CancellationToken::new();

    let poller_config = poller::PollerConfig {
        batch_size: config.gateway.poll_batch_size,
        idle_interval: Duration::from_millis(config.gateway.poll_idle_interval_ms),
        error_backoff: Duration::from_secs(config.gateway.poll_error_backoff_secs),
    };
    tokio::spawn(poller::run(outbox.clone(), dispatcher.clone(), poller_config, shutdown.clone()));

    tokio::spawn(heartbeat::run(
        publisher.clone(),
        dispatcher.clone(),
        Duration::from_secs(config.gateway.heartbeat_interval_secs),
        shutdown.clone(),
    ));

    tokio::spawn(reaper::run(outbox.clone(), Duration::from_secs(3600), shutdown.clone()));

    let state = web::Data::new(AppState {
        db_pool: db_pool.clone(),
        dispatcher,
        outbox,
        checkpoints,
        publisher,
        config: config.gateway.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!(%addr, "starting HTTP server");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(handlers::register_routes)
    })
    .bind(&addr)?
    .run();

    let result = server.await;
    shutdown.cancel();
    result
}
