//! Axum server setup and router construction.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::error;

use crate::api::{self, AppState};
use crate::session::SessionStore;
use crate::ws;

/// Build the full axum router.
///
/// The router serves:
/// - WebSocket at `/ws/{id}`
/// - REST API at `/api/*`
/// - The chat page at `/`, from the bundled HTML or from `static_dir`
pub fn build_router(store: Arc<SessionStore>, static_dir: Option<PathBuf>) -> Router {
    let app_state = AppState { store };

    // CORS layer for pages served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/ws/{id}", get(ws::ws_upgrade))
        .route("/api/config", get(api::get_config))
        .route("/api/sessions", post(api::create_session))
        .route(
            "/api/sessions/{id}",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/api/sessions/{id}/preferences", put(api::put_preference))
        .route("/api/sessions/{id}/chat", post(api::post_chat))
        .route("/api/sessions/{id}/reset", post(api::post_reset));

    // A custom page directory replaces the bundled page.
    router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.route("/", get(api::index)),
    };

    router.with_state(app_state).layer(cors)
}

/// Start the axum server and return the bound address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Web server stopped: {e}");
        }
    });

    Ok(addr)
}
