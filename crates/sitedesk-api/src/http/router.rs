//! Axum router for the console server.
//!
//! Everything sits behind the session gate middleware. Pages are served from
//! the configured web directory when it exists; otherwise a placeholder page
//! is returned for any allowed path.

use std::sync::Arc;

use axum::middleware;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use sitedesk_types::config::ConsoleConfig;

use crate::http::gate::{session_gate, GateState};
use crate::state::ConcreteGate;

/// Build the console router with the gate applied to every route.
pub fn build_router(gate: Arc<ConcreteGate>, config: &ConsoleConfig) -> Router {
    let gate_state = GateState {
        gate,
        cookie_name: config.cookie_name.clone(),
    };

    let mut router = Router::new().route("/health", get(health_check));

    match config.web_dir.as_deref() {
        Some(dir) if std::path::Path::new(dir).is_dir() => {
            router = router.fallback_service(ServeDir::new(dir));
            tracing::info!(path = %dir, "serving console pages from disk");
        }
        Some(dir) => {
            tracing::warn!(path = %dir, "web_dir does not exist, serving placeholder page");
            router = router.fallback(placeholder_page);
        }
        None => {
            router = router.fallback(placeholder_page);
        }
    }

    router
        .layer(middleware::from_fn_with_state(gate_state, session_gate))
        .layer(TraceLayer::new_for_http())
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn placeholder_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>SiteDesk</title></head>\
         <body><h1>SiteDesk console</h1>\
         <p>Set <code>web_dir</code> in config.toml to serve the console pages.</p>\
         </body></html>",
    )
}
