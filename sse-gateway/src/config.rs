//! Environment-variable configuration, assembled with plain `std::env::var`
//! reads so the service runs with only `DATABASE_URL` required.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Tunables for the event plane. All have defaults matching §4-§5 of the
/// design: 100-event poll batches, 50ms idle poll, 1h outbox TTL, 30s
/// heartbeat cadence, 10,000-slot per-client channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub poll_batch_size: i64,
    pub poll_idle_interval_ms: u64,
    pub poll_error_backoff_secs: u64,
    pub outbox_ttl_hours: i64,
    pub heartbeat_interval_secs: u64,
    pub replay_batch_size: i64,
    pub replay_pace_ms: u64,
    pub client_channel_capacity: usize,
    pub client_enqueue_timeout_secs: u64,
    pub client_recent_ids_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            poll_batch_size: 100,
            poll_idle_interval_ms: 50,
            poll_error_backoff_secs: 5,
            outbox_ttl_hours: 1,
            heartbeat_interval_secs: 30,
            replay_batch_size: 1_000,
            replay_pace_ms: 10,
            client_channel_capacity: 10_000,
            client_enqueue_timeout_secs: 30,
            client_recent_ids_capacity: 1_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let gateway = GatewayConfig {
            poll_batch_size: env_parse("POLL_BATCH_SIZE", GatewayConfig::default().poll_batch_size),
            poll_idle_interval_ms: env_parse(
                "POLL_IDLE_INTERVAL_MS",
                GatewayConfig::default().poll_idle_interval_ms,
            ),
            poll_error_backoff_secs: env_parse(
                "POLL_ERROR_BACKOFF_SECS",
                GatewayConfig::default().poll_error_backoff_secs,
            ),
            outbox_ttl_hours: env_parse("OUTBOX_TTL_HOURS", GatewayConfig::default().outbox_ttl_hours),
            heartbeat_interval_secs: env_parse(
                "HEARTBEAT_INTERVAL_SECS",
                GatewayConfig::default().heartbeat_interval_secs,
            ),
            replay_batch_size: env_parse("REPLAY_BATCH_SIZE", GatewayConfig::default().replay_batch_size),
            replay_pace_ms: env_parse("REPLAY_PACE_MS", GatewayConfig::default().replay_pace_ms),
            client_channel_capacity: env_parse(
                "CLIENT_CHANNEL_CAPACITY",
                GatewayConfig::default().client_channel_capacity,
            ),
            client_enqueue_timeout_secs: env_parse(
                "CLIENT_ENQUEUE_TIMEOUT_SECS",
                GatewayConfig::default().client_enqueue_timeout_secs,
            ),
            client_recent_ids_capacity: env_parse(
                "CLIENT_RECENT_IDS_CAPACITY",
                GatewayConfig::default().client_recent_ids_capacity,
            ),
        };

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: env_parse("HTTP_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")?,
                max_connections: env_parse("DB_MAX_CONNECTIONS", 20u32),
                min_connections: env_parse("DB_MIN_CONNECTIONS", 2u32),
            },
            gateway,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
