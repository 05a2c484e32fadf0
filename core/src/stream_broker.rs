//! The `StreamBroker` abstraction: the durable-stream primitives `StreamConsumer`
//! needs from the underlying message broker.
//!
//! Shaped after `EventBus` in the teacher architecture this crate is adapted from —
//! `Send + Sync`, `Pin<Box<dyn Future>>` returns so the trait stays dyn-compatible for
//! `Arc<dyn StreamBroker>` — but with Redis-Streams-shaped operations instead of
//! generic pub/sub: consumer-group creation, history-then-live reads with explicit
//! cursors, and an atomic ack-and-forward primitive (spec: "create group if missing",
//! "ack-and-forward script").

use crate::stream::{StreamId, StreamMessage};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors a [`StreamBroker`] implementation can surface.
#[derive(Error, Debug, Clone)]
pub enum StreamBrokerError {
    /// Could not reach the broker at all (connection refused, DNS failure, ...).
    #[error("broker connection failed: {0}")]
    ConnectionFailed(String),

    /// Consumer-group creation failed for a reason other than "already exists".
    #[error("failed to create group '{group}' on stream '{stream}': {reason}")]
    GroupCreationFailed {
        /// Target stream.
        stream: String,
        /// Target group.
        group: String,
        /// Underlying broker error text.
        reason: String,
    },

    /// A read (history or live) failed.
    #[error("read failed on stream '{stream}': {reason}")]
    ReadFailed {
        /// Target stream.
        stream: String,
        /// Underlying broker error text.
        reason: String,
    },

    /// The ack-and-forward (or bare-ack) script failed to execute.
    #[error("ack script failed for message {id} on stream '{stream}': {reason}")]
    ScriptFailed {
        /// Target stream.
        stream: String,
        /// The message id the script was acking.
        id: StreamId,
        /// Underlying broker error text.
        reason: String,
    },
}

/// One batch of messages read from a stream, in broker id order.
pub type ReadBatch = Vec<StreamMessage>;

/// Durable-stream primitives consumed by `StreamConsumer`.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn` so the trait can
/// be used as `Arc<dyn StreamBroker>`, matching every stage sharing one broker client
/// (spec §5: "broker client ... process-wide, task-safe by construction").
pub trait StreamBroker: Send + Sync {
    /// Create `group` on `stream` seeded at the stream tail (`$`) if it does not
    /// already exist. A pre-existing group (`BUSYGROUP` or equivalent) is not an
    /// error and must be swallowed.
    fn ensure_group<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StreamBrokerError>> + Send + 'a>>;

    /// Read pending history for `consumer` in `group`, starting from `last_seen`
    /// (broker cursor semantics: pass `StreamId::ZERO` for "from the start of my
    /// pending entries list"). Returns an empty batch once history is exhausted.
    fn read_history<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
        consumer: &'a str,
        last_seen: StreamId,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<ReadBatch, StreamBrokerError>> + Send + 'a>>;

    /// Read new messages for `consumer` in `group` (broker cursor `>`), blocking for
    /// up to `block` before returning an empty batch.
    fn read_live<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
        consumer: &'a str,
        count: usize,
        block: std::time::Duration,
    ) -> Pin<Box<dyn Future<Output = Result<ReadBatch, StreamBrokerError>> + Send + 'a>>;

    /// Atomically acknowledge `id` on `stream`/`group` and, if ack succeeds, append
    /// `message` to `stream_to`. Returns the new message's id on success, or `None` if
    /// the ack itself failed (message was already acked or never pending) — in neither
    /// case is anything appended.
    fn ack_and_forward<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
        id: StreamId,
        stream_to: &'a str,
        message: &'a StreamMessage,
    ) -> Pin<Box<dyn Future<Output = Result<Option<StreamId>, StreamBrokerError>> + Send + 'a>>;

    /// Acknowledge `id` on `stream`/`group` with no forward (terminal stages).
    fn ack_only<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
        id: StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StreamBrokerError>> + Send + 'a>>;

    /// Append `message` to `stream` with no consumer-group involvement (IngestStage:
    /// "No consumer group; this is a pure producer").
    fn append<'a>(
        &'a self,
        stream: &'a str,
        message: &'a StreamMessage,
    ) -> Pin<Box<dyn Future<Output = Result<StreamId, StreamBrokerError>> + Send + 'a>>;
}
