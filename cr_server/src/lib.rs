//! Transport gateway for card rooms: axum routes, WebSocket sessions and
//! environment configuration.

pub mod api;
pub mod config;
