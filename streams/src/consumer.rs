//! [`StreamConsumer`]: the generic consumer-group runtime every stage runs on top of.
//!
//! Grounded on `EventConsumer` (the teacher's `runtime/consumer.rs`): a builder that
//! assembles a loop over a shared bus handle and a handler, a `Start`/`Shutdown` pair of
//! operations, and a `tokio::select!` body that races the next read against a shutdown
//! signal. The state machine (`Init` → `CreateGroup` → `ReplayHistory` → `Live`) and the
//! "ack only after the handler's effect is durable" discipline come from spec §4.1.

use polygo_core::{StreamBinding, StreamBroker, StreamBrokerError, StreamId, StreamMessage};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// What a [`StageHandler`] wants done with the message it just processed.
pub enum HandlerOutcome {
    /// Ack `id` and forward `message` to the binding's `stream_to`.
    Forward(StreamMessage),
    /// Ack `id` with no forward — this message is a dead end for this stage.
    Drop,
}

/// A stage's per-message processing logic, decoupled from the consumer-group plumbing.
///
/// # Dyn Compatibility
///
/// `Pin<Box<dyn Future>>` instead of `async fn`, matching the rest of this codebase's
/// capability traits, so a [`StreamConsumer`] can own a handler as `Arc<dyn StageHandler>`.
pub trait StageHandler: Send + Sync {
    /// Process a single message. Returning `Err` leaves the message un-acked (it will be
    /// redelivered from the pending-entries list on the next `ReplayHistory` pass); spec
    /// §4.2/§7 treat any single-field translation failure as fatal to the whole message.
    fn handle<'a>(
        &'a self,
        message: &'a StreamMessage,
    ) -> Pin<Box<dyn Future<Output = Result<HandlerOutcome, String>> + Send + 'a>>;
}

/// Internal lifecycle state (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    CreateGroup,
    ReplayHistory,
    Live,
}

const BATCH_SIZE: usize = 16;
const LIVE_BLOCK: Duration = Duration::from_millis(2000);

/// A running consumer-group loop bound to one [`StreamBinding`].
///
/// Built with [`StreamConsumer::builder`], started with [`StreamConsumer::run`] (which
/// drives the loop to completion — callers `tokio::spawn` it), and stopped by sending on
/// the shutdown channel handed back from the builder.
pub struct StreamConsumer<B: StreamBroker> {
    broker: Arc<B>,
    binding: StreamBinding,
    handler: Arc<dyn StageHandler>,
    shutdown: broadcast::Receiver<()>,
}

/// Assembles a [`StreamConsumer`]. Mirrors the teacher's `EventConsumer::builder()`.
pub struct StreamConsumerBuilder<B: StreamBroker> {
    broker: Arc<B>,
    binding: Option<StreamBinding>,
    handler: Option<Arc<dyn StageHandler>>,
}

impl<B: StreamBroker> StreamConsumerBuilder<B> {
    /// Start building a consumer against `broker`.
    #[must_use]
    pub fn new(broker: Arc<B>) -> Self {
        StreamConsumerBuilder { broker, binding: None, handler: None }
    }

    /// Bind the consumer to a stream/group/consumer identity.
    #[must_use]
    pub fn binding(mut self, binding: StreamBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Attach the per-message handler.
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Finish building, returning the consumer and the sender half of its shutdown
    /// channel. Dropping or sending on the sender stops the loop after its current read.
    ///
    /// # Panics
    ///
    /// Panics if `binding` or `handler` were never set — a programmer error at call
    /// sites, not a runtime condition.
    #[must_use]
    pub fn build(self) -> (StreamConsumer<B>, broadcast::Sender<()>) {
        let (tx, rx) = broadcast::channel(1);
        let binding = self.binding.expect("StreamConsumerBuilder: binding() is required");
        let handler = self.handler.expect("StreamConsumerBuilder: handler() is required");
        (StreamConsumer { broker: self.broker, binding, handler, shutdown: rx }, tx)
    }
}

impl<B: StreamBroker> StreamConsumer<B> {
    /// Start building a new consumer against `broker`.
    #[must_use]
    pub fn builder(broker: Arc<B>) -> StreamConsumerBuilder<B> {
        StreamConsumerBuilder::new(broker)
    }

    /// Drive the consumer to completion: create its group, replay pending history, then
    /// loop on live reads until shutdown is signaled.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`StreamBrokerError`] if group creation fails outright
    /// (anything other than "group already exists"). Read failures during the live loop
    /// are logged and retried rather than propagated, so the consumer survives transient
    /// broker blips.
    pub async fn run(mut self) -> Result<(), StreamBrokerError> {
        let mut state = State::Init;
        let mut last_seen = StreamId::ZERO;

        loop {
            state = match state {
                State::Init => State::CreateGroup,
                State::CreateGroup => {
                    self.broker.ensure_group(&self.binding.stream_from, &self.binding.group).await?;
                    State::ReplayHistory
                }
                State::ReplayHistory => {
                    match self.replay_history(&mut last_seen).await {
                        Ok(true) => State::ReplayHistory,
                        Ok(false) => State::Live,
                        Err(e) => {
                            error!(stream = %self.binding.stream_from, error = %e, "history replay failed, retrying");
                            State::ReplayHistory
                        }
                    }
                }
                State::Live => {
                    if self.shutdown.try_recv().is_ok() {
                        info!(stream = %self.binding.stream_from, "shutdown received, stopping consumer");
                        return Ok(());
                    }
                    let StreamConsumer { broker, binding, handler, shutdown } = &mut self;
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => {
                            info!(stream = %binding.stream_from, "shutdown received, stopping consumer");
                            return Ok(());
                        }
                        result = Self::read_and_process_live(broker, binding, handler) => {
                            if let Err(e) = result {
                                warn!(stream = %binding.stream_from, error = %e, "live read failed, retrying");
                            }
                            State::Live
                        }
                    }
                }
            };
        }
    }

    /// One history-replay step. Returns `Ok(true)` if messages were found (caller should
    /// call again), `Ok(false)` once history is exhausted.
    async fn replay_history(&self, last_seen: &mut StreamId) -> Result<bool, StreamBrokerError> {
        let batch = self
            .broker
            .read_history(
                &self.binding.stream_from,
                &self.binding.group,
                &self.binding.consumer,
                *last_seen,
                BATCH_SIZE,
            )
            .await?;

        if batch.is_empty() {
            return Ok(false);
        }

        for message in &batch {
            if let Some(id) = message.id {
                *last_seen = id;
            }
        }
        Self::process_batch(&self.broker, &self.binding, &self.handler, batch).await;
        Ok(true)
    }

    async fn read_and_process_live(
        broker: &Arc<B>,
        binding: &StreamBinding,
        handler: &Arc<dyn StageHandler>,
    ) -> Result<(), StreamBrokerError> {
        let batch = broker
            .read_live(&binding.stream_from, &binding.group, &binding.consumer, BATCH_SIZE, LIVE_BLOCK)
            .await?;
        Self::process_batch(broker, binding, handler, batch).await;
        Ok(())
    }

    /// Process a batch sequentially, in the order the broker returned it (broker id
    /// order). Per spec §4.1, ordering within a consumer's assigned partition of work
    /// matters for determinism in tests; sequential processing keeps that simple.
    async fn process_batch(
        broker: &Arc<B>,
        binding: &StreamBinding,
        handler: &Arc<dyn StageHandler>,
        batch: Vec<StreamMessage>,
    ) {
        for message in batch {
            let Some(id) = message.id else {
                warn!("skipping message with no broker-assigned id");
                continue;
            };
            Self::process_one(broker, binding, handler, id, &message).await;
        }
    }

    async fn process_one(
        broker: &Arc<B>,
        binding: &StreamBinding,
        handler: &Arc<dyn StageHandler>,
        id: StreamId,
        message: &StreamMessage,
    ) {
        let future = AssertUnwindSafe(handler.handle(message));
        let outcome = match futures::FutureExt::catch_unwind(future).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(reason)) => {
                error!(%id, stream = %binding.stream_from, reason, "handler rejected message, leaving unacked");
                return;
            }
            Err(_) => {
                error!(%id, stream = %binding.stream_from, "handler panicked, leaving message unacked");
                return;
            }
        };

        let ack_result = match outcome {
            HandlerOutcome::Forward(out_message) => {
                let Some(stream_to) = binding.stream_to.as_deref() else {
                    error!(%id, "handler produced a forward but binding has no stream_to; dropping");
                    return;
                };
                broker
                    .ack_and_forward(&binding.stream_from, &binding.group, id, stream_to, &out_message)
                    .await
                    .map(|_| ())
            }
            HandlerOutcome::Drop => broker.ack_only(&binding.stream_from, &binding.group, id).await.map(|_| ()),
        };

        if let Err(e) = ack_result {
            error!(%id, stream = %binding.stream_from, error = %e, "ack failed, message will be redelivered");
        } else {
            debug!(%id, stream = %binding.stream_from, "message acked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygo_core::{ReadBatch, StreamValue};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeBroker {
        history: Mutex<Vec<ReadBatch>>,
        acked: Mutex<Vec<StreamId>>,
        forwarded: Mutex<Vec<StreamMessage>>,
    }

    impl StreamBroker for FakeBroker {
        fn ensure_group<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<(), StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }

        fn read_history<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            _consumer: &'a str,
            _last_seen: StreamId,
            _count: usize,
        ) -> Pin<Box<dyn Future<Output = Result<ReadBatch, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async move {
                let mut guard = self.history.lock().expect("lock poisoned");
                Ok(if guard.is_empty() { Vec::new() } else { guard.remove(0) })
            })
        }

        fn read_live<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            _consumer: &'a str,
            _count: usize,
            _block: Duration,
        ) -> Pin<Box<dyn Future<Output = Result<ReadBatch, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn ack_and_forward<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            id: StreamId,
            _stream_to: &'a str,
            message: &'a StreamMessage,
        ) -> Pin<Box<dyn Future<Output = Result<Option<StreamId>, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async move {
                self.acked.lock().expect("lock poisoned").push(id);
                self.forwarded.lock().expect("lock poisoned").push(message.clone());
                Ok(Some(StreamId { ms: id.ms + 1, seq: 0 }))
            })
        }

        fn ack_only<'a>(
            &'a self,
            _stream: &'a str,
            _group: &'a str,
            id: StreamId,
        ) -> Pin<Box<dyn Future<Output = Result<bool, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async move {
                self.acked.lock().expect("lock poisoned").push(id);
                Ok(true)
            })
        }

        fn append<'a>(
            &'a self,
            _stream: &'a str,
            message: &'a StreamMessage,
        ) -> Pin<Box<dyn Future<Output = Result<StreamId, StreamBrokerError>> + Send + 'a>> {
            Box::pin(async move {
                self.forwarded.lock().expect("lock poisoned").push(message.clone());
                Ok(StreamId { ms: 1, seq: 0 })
            })
        }
    }

    struct CountingHandler {
        calls: AtomicUsize,
    }

    impl StageHandler for CountingHandler {
        fn handle<'a>(
            &'a self,
            message: &'a StreamMessage,
        ) -> Pin<Box<dyn Future<Output = Result<HandlerOutcome, String>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut values = BTreeMap::new();
            values.insert("story".to_string(), StreamValue::Text("forwarded".to_string()));
            Box::pin(async move {
                let _ = message;
                Ok(HandlerOutcome::Forward(StreamMessage { id: None, values }))
            })
        }
    }

    fn message(ms: u64) -> StreamMessage {
        let mut values = BTreeMap::new();
        values.insert("story".to_string(), StreamValue::Text("payload".to_string()));
        StreamMessage { id: Some(StreamId { ms, seq: 0 }), values }
    }

    #[tokio::test]
    async fn replays_history_then_reports_exhausted() {
        let broker = Arc::new(FakeBroker {
            history: Mutex::new(vec![vec![message(1), message(2)], Vec::new()]),
            acked: Mutex::new(Vec::new()),
            forwarded: Mutex::new(Vec::new()),
        });
        let handler = Arc::new(CountingHandler { calls: AtomicUsize::new(0) });
        let (consumer, _tx) = StreamConsumer::builder(Arc::clone(&broker))
            .binding(StreamBinding::forwarding("in", "group", "c1", "out"))
            .handler(handler.clone())
            .build();

        let mut last_seen = StreamId::ZERO;
        let first = consumer.replay_history(&mut last_seen).await.expect("first replay");
        assert!(first);
        let second = consumer.replay_history(&mut last_seen).await.expect("second replay");
        assert!(!second);

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(broker.acked.lock().expect("lock poisoned").len(), 2);
        assert_eq!(broker.forwarded.lock().expect("lock poisoned").len(), 2);
    }

    struct RejectingHandler;

    impl StageHandler for RejectingHandler {
        fn handle<'a>(
            &'a self,
            _message: &'a StreamMessage,
        ) -> Pin<Box<dyn Future<Output = Result<HandlerOutcome, String>> + Send + 'a>> {
            Box::pin(async { Err("translation failed".to_string()) })
        }
    }

    #[tokio::test]
    async fn rejected_messages_are_left_unacked() {
        let broker = Arc::new(FakeBroker {
            history: Mutex::new(vec![vec![message(1)]]),
            acked: Mutex::new(Vec::new()),
            forwarded: Mutex::new(Vec::new()),
        });
        let (consumer, _tx) = StreamConsumer::builder(Arc::clone(&broker))
            .binding(StreamBinding::terminal("in", "group", "c1"))
            .handler(Arc::new(RejectingHandler))
            .build();

        let mut last_seen = StreamId::ZERO;
        consumer.replay_history(&mut last_seen).await.expect("replay");

        assert!(broker.acked.lock().expect("lock poisoned").is_empty());
    }
}
