//! Madrasati · Algerian curriculum study companion backend
//!
//! - Axum HTTP + WebSocket API driving per-user navigation sessions
//! - Lesson and review generation through Gemini (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   GEMINI_API_KEY       : enables generation if present (falls back to API_KEY)
//!   GEMINI_BASE_URL      : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL         : default "gemini-3-pro-preview"
//!   GEMINI_TIMEOUT_SECS  : optional request timeout, unset means none
//!   AGENT_CONFIG_PATH    : path to TOML config (prompt overrides)
//!   STATIC_DIR           : frontend directory (default "./static")
//!   SESSION_IDLE_SECS    : drop sessions idle this long (default 1800)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod config;
mod domain;
mod catalog;
mod video;
mod generation;
mod gemini;
mod navigation;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::{idle_limit_from_env, spawn_idle_sweeper, AppState};

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (session store, Gemini client, prompts).
  let state = Arc::new(AppState::new());
  info!(
    target: "madrasati_backend",
    model = state.generator.model_name().unwrap_or("none"),
    "Generation backend selected"
  );

  // Expire sessions whose clients went away without DELETE.
  spawn_idle_sweeper(state.clone(), idle_limit_from_env());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "madrasati_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
