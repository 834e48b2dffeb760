//! Documentation of the TidyUp household chore backend.
//!
//!
//!
//! # General Infrastructure
//! - A household is one JSON record: id, 6-digit join code, and a state blob
//! - The state blob belongs to the frontend, the server stores it verbatim
//! - The only state the server edits itself is `startEpoch`, on rotate-now
//! - The household id is also the write credential, handed out as the `tidyup_auth` cookie
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path | Cookie required |
//! |---|---|---|
//! | GET | `/` | no |
//! | POST | `/households` | no, sets it |
//! | POST | `/join?code=123456` | no, sets it |
//! | GET | `/households/{hid}` | no |
//! | GET | `/households/{hid}/state` | no |
//! | POST | `/households/{hid}/state` | yes |
//! | POST | `/households/{hid}/rotate-now` | yes |
//!
//!
//!
//! # Notes
//!
//! ## Concurrency
//! Every request reads the whole record, changes it and writes it back. Two writers on the
//! same household race and the last write wins.
//!
//! ## Join codes
//! Codes are not unique. On a collision the first household indexed keeps the code until
//! the process restarts.
//!
//!
//!
//! # Setup
//!
//! Run locally with the default `data/` directory on port 8000.
//! ```sh
//! RUST_LOG=info cargo run --bin tidyup
//! ```
//!
//! Smoke test a running server.
//! ```sh
//! cargo run --bin tester -- --base-url http://127.0.0.1:8000
//! ```
//!
//! ## Environment
//! - `RUST_PORT`: listen port, default 8000
//! - `DATA_DIR`: record directory, default `data`
//! - `STORE_BACKEND`: `file` or `memory`
//! - `COOKIE_SECURE`: set to `true` behind HTTPS
//! - `ALLOWED_ORIGINS`: comma separated CORS origins
//! - `ALLOWED_ORIGIN_REGEX`: extra CORS origin pattern
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};

use signal::ctrl_c;
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod error;
pub mod household;
pub mod join;
pub mod routes;
pub mod state;
pub mod store;

use config::Config;
use routes::{
    create_handler, get_state_handler, join_handler, meta_handler, root_handler,
    rotate_now_handler, set_state_handler,
};
pub use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/households", post(create_handler))
        .route("/join", post(join_handler))
        .route("/households/{hid}", get(meta_handler))
        .route(
            "/households/{hid}/state",
            get(get_state_handler).post(set_state_handler),
        )
        .route("/households/{hid}/rotate-now", post(rotate_now_handler))
        .layer(cors_layer(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin
            .to_str()
            .is_ok_and(|origin| state.config.origin_allowed(origin))
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .max_age(Duration::from_secs(60 * 60))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
