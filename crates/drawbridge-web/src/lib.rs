//! Surface asset server: embedded static bundle plus the protocol
//! channel endpoint.
//!
//! Uses `rust-embed` to bake the `surface/` bundle into the binary. The
//! server binds an ephemeral port by default; the discovered port is
//! substituted into the embedding document so the host can frame the
//! surface without fixed-port coordination.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use rust_embed::Embed;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info};

use drawbridge_core::protocol::PROTOCOL_ORIGIN;
use drawbridge_sync::channel::ChannelEndpoint;

pub mod channel_ws;

pub use channel_ws::SurfaceBridge;

#[derive(Embed)]
#[folder = "surface/"]
struct SurfaceAssets;

/// Start the asset + channel server. `port` 0 binds an ephemeral port;
/// the discovered address is returned along with the serve task.
pub async fn start_surface_server(
    bind: &str,
    port: u16,
    endpoint: ChannelEndpoint,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    let addr = listener.local_addr()?;

    let bridge = Arc::new(SurfaceBridge::new(endpoint));
    let discovered_port = addr.port();

    // /health, /channel and /embed are registered first so they take
    // priority over the bundle catch-all.
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/channel", get(channel_ws::channel_ws_handler))
        .with_state(bridge)
        .route(
            "/embed",
            get(move || async move { Html(embed_page(discovered_port)) }),
        )
        .merge(surface_router());

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(%e, "surface server stopped");
        }
    });

    info!("Surface assets served on http://{addr}/");
    Ok((addr, task))
}

/// Router serving the embedded surface bundle with SPA index fallback.
pub fn surface_router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/{*path}", get(static_handler))
}

/// The embedding document: an iframe over the surface origin plus the
/// relay bootstrap shuttling messages between the frame and the channel.
/// Only envelopes carrying the protocol origin marker cross into the frame.
pub fn embed_page(port: u16) -> String {
    format!(
        r#"<!DOCTYPE html><html>
<head>
<meta charset="UTF-8">
<style>
  html, body {{ height: 100%; width: 100%; padding: 0; margin: 0; }}
  iframe {{ height: 100%; width: 100%; padding: 0; margin: 0; border: 0; display: block; }}
</style>
</head>
<body onload="window.frames[0].focus();">
  <iframe src="http://127.0.0.1:{port}/"></iframe>
  <script>
    const SURFACE = "http://127.0.0.1:{port}";
    const ws = new WebSocket("ws://127.0.0.1:{port}/channel");
    window.addEventListener("message", (event) => {{
      if (event.source === window.frames[0] && ws.readyState === WebSocket.OPEN) {{
        ws.send(JSON.stringify(event.data));
      }}
    }});
    ws.onmessage = (event) => {{
      const data = JSON.parse(event.data);
      if (data && data.origin === "{origin}") {{
        window.frames[0].postMessage(data, SURFACE);
      }}
    }};
  </script>
</body>
</html>"#,
        port = port,
        origin = PROTOCOL_ORIGIN,
    )
}

async fn health_handler() -> impl IntoResponse {
    axum::Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn index_handler() -> Response {
    not_found_or(serve_asset("index.html"))
}

async fn static_handler(Path(path): Path<String>) -> Response {
    // Exact path first, then index.html for SPA routing
    not_found_or(serve_asset(&path).or_else(|| serve_asset("index.html")))
}

fn serve_asset(path: &str) -> Option<Response> {
    let asset = SurfaceAssets::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Some(
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime.as_ref())],
            asset.data.into_owned(),
        )
            .into_response(),
    )
}

fn not_found_or(resp: Option<Response>) -> Response {
    resp.unwrap_or_else(|| (StatusCode::NOT_FOUND, Html("<h1>404</h1>")).into_response())
}
