//! Thin HTTP host for the dispatch engine: one POST route, header
//! extraction, status/body passthrough. No dispatch logic lives here.

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use axum::routing::post;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::client::Client;
use crate::error::Result;

pub(crate) async fn serve(client: Arc<Client>, addr: SocketAddr) -> Result<()> {
    let app = Router::new()
        .route(client.route_path(), post(interactions))
        .with_state(client.clone());

    eprintln!("[HTTP] serving {} on {}", client.route_path(), addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn interactions(
    State(client): State<Arc<Client>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("X-Signature-Ed25519")
        .and_then(|v| v.to_str().ok());
    let timestamp = headers
        .get("X-Signature-Timestamp")
        .and_then(|v| v.to_str().ok());

    let reply = client.handle_request(signature, timestamp, &body).await;

    let mut builder =
        Response::builder().status(StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK));
    if let Some(content_type) = reply.content_type() {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from(reply.body_bytes()))
        .unwrap_or_default()
}
