//! Wire types shared between the broker adapter and the stage handlers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Broker-assigned message id: a `(milliseconds, sequence)` pair, ordered exactly as
/// the broker orders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId {
    /// Millisecond component.
    pub ms: u64,
    /// Sequence component (disambiguates ids within the same millisecond).
    pub seq: u64,
}

impl StreamId {
    /// The id used to request full history replay from the start of a stream.
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };

    /// Parse the broker's `"<ms>-<seq>"` textual id form.
    pub fn parse(raw: &str) -> Option<Self> {
        let (ms, seq) = raw.split_once('-')?;
        Some(StreamId { ms: ms.parse().ok()?, seq: seq.parse().ok()? })
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// A single field value carried in a [`StreamMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamValue {
    /// UTF-8 text value.
    Text(String),
    /// Raw byte value.
    Bytes(Vec<u8>),
}

impl StreamValue {
    /// Borrow the value as bytes regardless of which variant it is.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            StreamValue::Text(s) => s.as_bytes(),
            StreamValue::Bytes(b) => b,
        }
    }
}

/// The field key under which the pipeline carries a JSON-encoded [`crate::recipe::Story`].
pub const STORY_FIELD: &str = "story";

/// A message read from (or to be appended to) a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Broker-assigned id. `None` for messages not yet appended.
    pub id: Option<StreamId>,
    /// Field values, keyed by field name. The pipeline uses a single key, `"story"`.
    pub values: BTreeMap<String, StreamValue>,
}

impl StreamMessage {
    /// Build a message carrying a single `"story"` field with a JSON payload.
    #[must_use]
    pub fn with_story_json(json: String) -> Self {
        let mut values = BTreeMap::new();
        values.insert(STORY_FIELD.to_string(), StreamValue::Text(json));
        StreamMessage { id: None, values }
    }

    /// Fetch and decode the `"story"` field as UTF-8 text.
    #[must_use]
    pub fn story_text(&self) -> Option<&str> {
        match self.values.get(STORY_FIELD)? {
            StreamValue::Text(s) => Some(s.as_str()),
            StreamValue::Bytes(b) => std::str::from_utf8(b).ok(),
        }
    }
}

/// The binding of one consumer loop to its input/output streams and identity.
///
/// Created at stage startup, torn down on shutdown; owned by the `StreamConsumer`
/// runtime that drives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBinding {
    /// Stream this binding reads from.
    pub stream_from: String,
    /// Consumer group name on `stream_from`.
    pub group: String,
    /// This consumer's identity within `group`.
    pub consumer: String,
    /// Stream to forward derived messages to. `None` for terminal (persist) stages.
    pub stream_to: Option<String>,
    /// Source language code for this binding, if relevant to the stage.
    pub lang_from: Option<String>,
    /// Target language code for this binding, if relevant to the stage.
    pub lang_to: Option<String>,
}

impl StreamBinding {
    /// Build a non-terminal binding (reads from one stream, forwards to another).
    #[must_use]
    pub fn forwarding(
        stream_from: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
        stream_to: impl Into<String>,
    ) -> Self {
        StreamBinding {
            stream_from: stream_from.into(),
            group: group.into(),
            consumer: consumer.into(),
            stream_to: Some(stream_to.into()),
            lang_from: None,
            lang_to: None,
        }
    }

    /// Build a terminal binding (reads, acks, never forwards).
    #[must_use]
    pub fn terminal(
        stream_from: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        StreamBinding {
            stream_from: stream_from.into(),
            group: group.into(),
            consumer: consumer.into(),
            stream_to: None,
            lang_from: None,
            lang_to: None,
        }
    }

    /// Attach language-pair metadata to this binding.
    #[must_use]
    pub fn with_languages(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.lang_from = Some(from.into());
        self.lang_to = Some(to.into());
        self
    }
}
