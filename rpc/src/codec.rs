//! A minimal line-delimited JSON-RPC 1.0 request/response codec over
//! [`tokio::net::TcpListener`], grounded on original_source `server/poly.go` and
//! `storyblok/main.go`'s `net/rpc/jsonrpc` usage: `{"method","params","id"}` requests,
//! `{"id","result","error"}` responses. No JSON-RPC crate appears anywhere in the
//! example pack, so this hand-rolls the ~150 lines the legacy single-method surface
//! needs rather than pulling in an unused dependency.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors starting or running an RPC server.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Could not bind the listening socket.
    #[error("failed to bind RPC listener on port {port}: {reason}")]
    BindFailed {
        /// The port that failed to bind.
        port: u16,
        /// Underlying I/O error text.
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Vec<Value>,
    id: Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    id: Value,
    result: Value,
    error: Option<String>,
}

/// A single-method-namespace RPC service (spec: `Ingest.NewStories`,
/// `Translate.Translate`).
///
/// # Dyn Compatibility
///
/// `Pin<Box<dyn Future>>` instead of `async fn`, matching every other capability trait
/// in this codebase, so a server can hold `Arc<dyn RpcService>`.
pub trait RpcService: Send + Sync {
    /// Handle one call. `params` is the request's positional argument list (Go's
    /// `net/rpc` convention passes exactly one argument; this codec is lenient about
    /// the count). Returns the JSON `result` value, or `Err` with a message to surface
    /// as the response's `error` field.
    fn call<'a>(
        &'a self,
        method: &'a str,
        params: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + 'a>>;
}

/// Accept connections on `port`, dispatching each request line to `service`, until
/// `shutdown` fires.
///
/// # Errors
///
/// Returns [`RpcError::BindFailed`] if the listening socket cannot be bound. Per-
/// connection I/O errors are logged and only close that connection.
pub async fn run_server(
    port: u16,
    service: Arc<dyn RpcService>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), RpcError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| RpcError::BindFailed { port, reason: e.to_string() })?;
    info!(port, "RPC server listening");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                info!(port, "RPC server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        debug!(%peer, "RPC connection accepted");
                        let service = Arc::clone(&service);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(socket, service.as_ref()).await {
                                warn!(%peer, error = %e, "RPC connection ended with an error");
                            }
                        });
                    }
                    Err(e) => warn!(port, error = %e, "failed to accept RPC connection"),
                }
            }
        }
    }
}

async fn handle_connection(
    socket: tokio::net::TcpStream,
    service: &dyn RpcService,
) -> Result<(), std::io::Error> {
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Ok(());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(trimmed) {
            Ok(request) => {
                let id = request.id.clone();
                match service.call(&request.method, request.params).await {
                    Ok(result) => RpcResponse { id, result, error: None },
                    Err(message) => {
                        error!(method = %request.method, error = %message, "RPC call failed");
                        RpcResponse { id, result: Value::Null, error: Some(message) }
                    }
                }
            }
            Err(e) => RpcResponse { id: Value::Null, result: Value::Null, error: Some(e.to_string()) },
        };

        let mut encoded = serde_json::to_string(&response).unwrap_or_else(|_| {
            r#"{"id":null,"result":null,"error":"failed to encode response"}"#.to_string()
        });
        encoded.push('\n');
        write_half.write_all(encoded.as_bytes()).await?;
    }
}
