//! HTTP handlers and server startup for Lumen.
//!
//! The HTTP side only serves the control page and a health probe. Sessions
//! live on the WebSocket listener, see [`crate::bridge`].

use crate::bridge;
use crate::config::Config;
use crate::devices::{ConsoleDisplay, GpioActuator};
use crate::metrics::{self, MetricsObserver};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use lumen_core::{ChannelOutbound, Hub, HubConfig, HubHandle, StateStore};
use lumen_transport::{WebSocketConfig, WebSocketTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Control page template.
const INDEX_TEMPLATE: &str = include_str!("../assets/index.html");

/// Shared HTTP state.
pub struct AppState {
    /// Handle to the running hub.
    pub hub: HubHandle,
    /// Rendered control page.
    pub page: String,
}

/// Fill in the control page template.
#[must_use]
pub fn render_index(title: &str, ws_port: u16) -> String {
    INDEX_TEMPLATE
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{WS_PORT}}", &ws_port.to_string())
}

/// Escape text for use in HTML content and attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build the state store with the configured device collaborators.
pub fn build_store(config: &Config) -> StateStore {
    let mut store = StateStore::new().with_actuator(GpioActuator::new(
        config.actuator.gpio_value_path.clone(),
        config.actuator.active_low,
    ));

    if config.display.enabled {
        let address = format!("{}:{}", config.host, config.http_port);
        store = store.with_display(ConsoleDisplay::new(&config.display.title, address));
    }
    if config.metrics.enabled {
        store.observe(MetricsObserver);
    }

    // Outputs start in the logical state
    store.sync_observers();
    store
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Run the HTTP and WebSocket listeners.
///
/// # Errors
///
/// Returns an error if either listener fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let hub = Hub::new(build_store(&config), ChannelOutbound::new());
    let (hub, _hub_task) = lumen_core::actor::spawn(
        hub,
        HubConfig {
            max_sessions: config.limits.max_sessions,
        },
    );

    let transport = WebSocketTransport::new(WebSocketConfig {
        bind_addr: config.ws_addr()?,
        max_message_size: config.limits.max_message_size,
        handshake_timeout: Duration::from_secs(5),
    })
    .await?;
    tokio::spawn(bridge::serve_connections(transport, hub.clone()));

    let state = Arc::new(AppState {
        hub,
        page: render_index(&config.display.title, config.ws_port),
    });

    // Bind and serve
    let addr = config.http_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Lumen control page on http://{}/", addr);
    info!("WebSocket endpoint: ws://{}/", config.ws_addr()?);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Control page handler.
async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.page.clone())
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.hub.status().await {
        Ok(status) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "sessions": status.sessions.len(),
                "led": status.state.value,
                "revision": status.state.version,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unavailable",
                "error": e.to_string(),
            })),
        ),
    }
}

/// Catch-all handler.
async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
