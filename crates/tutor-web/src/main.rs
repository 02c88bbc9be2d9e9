//! Web tutor server.
//!
//! Serves the chat page, the REST API and per-session WebSockets. Each
//! browser tab gets its own session with its own preferences.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... cargo run -p tutor-web
//! OPENROUTER_KEY=sk-... cargo run -p tutor-web -- --model google/gemini-2.5-flash
//! OPENROUTER_KEY=sk-... cargo run -p tutor-web -- --port 8080 --config my-tutor.json
//! ```
//!
//! Then open the printed URL in a browser, or drive a session with curl:
//!
//! ```bash
//! curl -X POST localhost:3001/api/sessions
//! curl -X POST localhost:3001/api/sessions/$ID/chat -d '{"message":"Teach me about entropy"}' \
//!   -H 'content-type: application/json'
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tutor_rs::prelude::*;
use tutor_web::{SessionStore, WebConfig, spawn_web};

/// Web tutor server.
#[derive(Parser)]
#[command(about = "Preference-driven tutor with a browser-based UI")]
struct Args {
    /// LLM model to use.
    #[arg(long, default_value = tutor_rs::DEFAULT_MODEL)]
    model: String,

    /// Address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the web UI server.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Path to a tutor configuration JSON file (defaults to the built-in one).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve the page from this directory instead of the bundled one.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Maximum tokens per LLM response.
    #[arg(long, default_value_t = tutor_rs::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Temperature for the stage classifier.
    #[arg(long, default_value_t = 0.0)]
    classify_temperature: f32,

    /// Temperature for the tutor's replies.
    #[arg(long, default_value_t = 0.9)]
    response_temperature: f32,

    /// Prompt size budget in estimated tokens.
    #[arg(long, default_value_t = 12_000)]
    max_prompt_tokens: usize,

    /// Seconds a session without clients may stay idle. 0 disables expiry.
    #[arg(long, default_value_t = 1800)]
    session_ttl_secs: u64,

    /// Per-session WebSocket message buffer.
    #[arg(long, default_value_t = 256)]
    broadcast_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = TutorConfig::load_or_builtin(args.config.as_deref()).map_err(|e| e.to_string())?;
    let settings = TutorSettings {
        model: args.model,
        max_tokens: args.max_tokens,
        classify_temperature: args.classify_temperature,
        response_temperature: args.response_temperature,
        max_prompt_tokens: args.max_prompt_tokens,
    };

    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| "Set OPENROUTER_KEY env var to your OpenRouter API key")?;
    let client = settings.build_client(api_key).map_err(|e| e.to_string())?;
    info!("Using model {}", client.model());

    let store = Arc::new(
        SessionStore::new(Arc::new(client), Arc::new(config), settings)
            .with_broadcast_capacity(args.broadcast_capacity),
    );

    let web_config = WebConfig {
        bind_addr: (args.host, args.port).into(),
        static_dir: args.static_dir,
        session_ttl: (args.session_ttl_secs > 0)
            .then(|| Duration::from_secs(args.session_ttl_secs)),
    };
    let addr = spawn_web(store, web_config)
        .await
        .map_err(|e| format!("failed to bind: {e}"))?;
    println!("Web UI: http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for ctrl-c: {e}"))?;
    info!("Shutting down");
    Ok(())
}
