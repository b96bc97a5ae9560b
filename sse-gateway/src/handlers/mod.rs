//! HTTP surface (spec §6), wired the way `notification-service`'s
//! `handlers/mod.rs` combines per-resource `register_routes` functions.

pub mod connect;
pub mod health;
pub mod publish;

use actix_web::web;

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    connect::register_routes(cfg);
    publish::register_routes(cfg);
    health::register_routes(cfg);
}
