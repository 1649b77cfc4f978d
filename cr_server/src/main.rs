//! Card room server.
//!
//! Spawns one actor per room behind a `RoomManager` and serves the
//! WebSocket gateway plus a small HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use card_rooms::{RoomManager, SessionTracker, auth::JwtIdentityProvider};
use cr_server::{api, config::ServerConfig};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a four-seat card room server

USAGE:
  cr_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --rounds     N           Rounds per trick-bidding game  [default: env ROOM_TOTAL_ROUNDS or 5]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  JWT_SECRET               Token verification secret (required, 32+ characters)
  ROOM_TOTAL_ROUNDS        Rounds per trick-bidding game
  ROOM_TARGET_SCORE        Score that ends a points game
  ROOM_TRICK_POINTS        Points per trick won in a points game
  ROOM_ENFORCE_FOLLOW_SUIT Reject plays that ignore the leading suit [default: true]
  ROOM_TURN_TIMEOUT_SECS   Auto-play for stalled seats after N seconds [default: off]
  SESSION_CHANNEL_CAPACITY Outbound queue depth per connection
  (See .env file for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    rounds: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        rounds: pargs.opt_value_from_str("--rounds")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let config = ServerConfig::from_env(args.bind, args.rounds)?;
    info!("Starting card room server at {}", config.bind);
    info!(
        "Room defaults: {} round(s), target score {}, follow suit {}, turn timeout {:?}",
        config.room_defaults.total_rounds,
        config.room_defaults.target_score,
        config.room_defaults.enforce_follow_suit,
        config.room_defaults.turn_timeout
    );

    let sessions = Arc::new(SessionTracker::new(config.session_channel_capacity));
    let room_manager = Arc::new(RoomManager::new(
        sessions.clone(),
        config.room_defaults.clone(),
    ));
    let identity = Arc::new(JwtIdentityProvider::new(&config.security.jwt_secret));

    let api_state = api::AppState {
        room_manager,
        sessions,
        identity,
    };

    let app = api::create_router(api_state);

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
