//! Browser-based chat UI for the tutor.
//!
//! `tutor-web` provides an axum web server with one tutoring session per
//! browser tab: a REST API to create sessions, chat and pick preferences,
//! a per-session WebSocket for live updates, and a bundled single-page UI
//! with a preference sidebar and chat bubbles.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tutor_rs::prelude::*;
//! use tutor_web::{SessionStore, WebConfig, spawn_web};
//!
//! let config = Arc::new(TutorConfig::builtin()?);
//! let settings = TutorSettings::default();
//! let client = Arc::new(settings.build_client(api_key)?);
//!
//! let store = Arc::new(SessionStore::new(client, config, settings));
//! let addr = spawn_web(store, WebConfig::default()).await?;
//! println!("Web UI: http://{addr}");
//! ```
//!
//! # Architecture
//!
//! ```text
//! browser ──REST / WS──▶ SessionStore ──▶ Session { controller, panel }
//!    ▲                                          │
//!    └────── WsMessage (per-session broadcast) ◀┘
//! ```

mod api;
pub mod broadcast;
mod server;
pub mod session;
pub mod snapshot;
mod ws;

pub use broadcast::WsMessage;
pub use session::{Session, SessionStore, SharedSession};
pub use snapshot::{Bubble, ConfigSnapshot, SessionSnapshot, StageSummary};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default idle time after which a session without clients is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Directory to serve the page from instead of the bundled one.
    pub static_dir: Option<PathBuf>,
    /// Idle sessions with no WebSocket client are expired after this long.
    /// `None` keeps sessions until they are deleted. Default: 30 minutes.
    pub session_ttl: Option<Duration>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
            session_ttl: Some(DEFAULT_SESSION_TTL),
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server and the idle-session sweep run until the Tokio runtime shuts
/// down.
pub async fn spawn_web(store: Arc<SessionStore>, config: WebConfig) -> std::io::Result<SocketAddr> {
    if let Some(ttl) = config.session_ttl {
        tokio::spawn(session::expire_idle_sessions(Arc::downgrade(&store), ttl));
    }
    let router = server::build_router(store, config.static_dir);
    server::start_server(router, config.bind_addr).await
}
