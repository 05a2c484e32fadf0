//! [`RedisStreamBroker`]: a [`StreamBroker`] backed by Redis Streams.
//!
//! Grounded on `RedpandaEventBus` in the teacher architecture (same builder shape, same
//! `ConnectionManager`-style shared client, same "configure once, clone cheaply" story)
//! but implementing Redis Streams' consumer-group primitives instead of Kafka's:
//! `XGROUP CREATE ... MKSTREAM` (swallowing `BUSYGROUP`), `XREADGROUP` with an explicit
//! history cursor vs. `>` for live reads, and an atomic ack-then-append Lua script for
//! `ack_and_forward`.

use futures::future::BoxFuture;
use polygo_core::{ReadBatch, StreamBroker, StreamBrokerError, StreamId, StreamMessage, StreamValue};
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisError, Script, Value};
use std::time::Duration;

/// A [`StreamBroker`] backed by a shared Redis connection.
///
/// Cloning is cheap: the inner [`ConnectionManager`] is itself a handle to a
/// multiplexed, auto-reconnecting connection, so one instance can be shared (directly
/// or via `Arc`) across every consumer loop in the process (spec §5: "broker client ...
/// process-wide, task-safe by construction").
#[derive(Clone)]
pub struct RedisStreamBroker {
    conn: ConnectionManager,
}

/// Lua script implementing the ack-and-forward primitive (spec §6): ack the input
/// message, and only on successful ack append the derived message to `stream_to`.
/// `ARGV[3..]` are `key value key value ...` pairs forming the new entry's fields.
const ACK_AND_FORWARD_SCRIPT: &str = r"
local acked = redis.call('XACK', KEYS[1], ARGV[1], ARGV[2])
if acked == 1 then
    local fields = {}
    for i = 3, #ARGV do
        table.insert(fields, ARGV[i])
    end
    return redis.call('XADD', KEYS[2], '*', unpack(fields))
else
    return false
end
";

/// Lua script implementing the bare-ack primitive used by terminal stages.
const ACK_ONLY_SCRIPT: &str = r"
local acked = redis.call('XACK', KEYS[1], ARGV[1], ARGV[2])
return acked == 1
";

impl RedisStreamBroker {
    /// Connect to Redis at `url` (e.g. `redis://localhost:6379`).
    ///
    /// # Errors
    ///
    /// Returns [`StreamBrokerError::ConnectionFailed`] if the client cannot be built or
    /// the initial connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, StreamBrokerError> {
        let client = redis::Client::open(url)
            .map_err(|e| StreamBrokerError::ConnectionFailed(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StreamBrokerError::ConnectionFailed(e.to_string()))?;
        Ok(RedisStreamBroker { conn })
    }

    fn parse_batch(reply: StreamReadReply, stream: &str) -> ReadBatch {
        let mut batch = Vec::new();
        for key in reply.keys {
            if key.key != stream {
                continue;
            }
            for entry in key.ids {
                let id = StreamId::parse(&entry.id);
                let mut values = std::collections::BTreeMap::new();
                for (field, value) in entry.map {
                    let text = match value {
                        Value::BulkString(bytes) => {
                            String::from_utf8(bytes).map_or_else(
                                |e| StreamValue::Bytes(e.into_bytes()),
                                StreamValue::Text,
                            )
                        }
                        Value::SimpleString(s) => StreamValue::Text(s),
                        other => StreamValue::Text(format!("{other:?}")),
                    };
                    values.insert(field, text);
                }
                batch.push(StreamMessage { id, values });
            }
        }
        batch
    }

    fn is_busygroup(err: &RedisError) -> bool {
        err.to_string().contains("BUSYGROUP")
    }
}

impl StreamBroker for RedisStreamBroker {
    fn ensure_group<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
    ) -> BoxFuture<'a, Result<(), StreamBrokerError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let result: Result<(), RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(stream)
                .arg(group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;

            match result {
                Ok(()) => Ok(()),
                Err(e) if Self::is_busygroup(&e) => Ok(()),
                Err(e) => Err(StreamBrokerError::GroupCreationFailed {
                    stream: stream.to_string(),
                    group: group.to_string(),
                    reason: e.to_string(),
                }),
            }
        })
    }

    fn read_history<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
        consumer: &'a str,
        last_seen: StreamId,
        count: usize,
    ) -> BoxFuture<'a, Result<ReadBatch, StreamBrokerError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let opts = StreamReadOptions::default().group(group, consumer).count(count);
            let cursor = last_seen.to_string();
            let reply: StreamReadReply = conn
                .xread_options(&[stream], &[cursor.as_str()], &opts)
                .await
                .map_err(|e| StreamBrokerError::ReadFailed {
                    stream: stream.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Self::parse_batch(reply, stream))
        })
    }

    fn read_live<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
        consumer: &'a str,
        count: usize,
        block: Duration,
    ) -> BoxFuture<'a, Result<ReadBatch, StreamBrokerError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let opts = StreamReadOptions::default()
                .group(group, consumer)
                .count(count)
                .block(usize::try_from(block.as_millis()).unwrap_or(usize::MAX));
            let reply: StreamReadReply = conn
                .xread_options(&[stream], &[">"], &opts)
                .await
                .map_err(|e| StreamBrokerError::ReadFailed {
                    stream: stream.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Self::parse_batch(reply, stream))
        })
    }

    fn ack_and_forward<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
        id: StreamId,
        stream_to: &'a str,
        message: &'a StreamMessage,
    ) -> BoxFuture<'a, Result<Option<StreamId>, StreamBrokerError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let script = Script::new(ACK_AND_FORWARD_SCRIPT);
            let mut invocation = script.prepare_invoke();
            invocation.key(stream).key(stream_to).arg(group).arg(id.to_string());
            for (field, value) in &message.values {
                invocation.arg(field.as_str()).arg(value.as_bytes());
            }

            let result: Value = invocation.invoke_async(&mut conn).await.map_err(|e| {
                StreamBrokerError::ScriptFailed { stream: stream.to_string(), id, reason: e.to_string() }
            })?;

            match result {
                Value::BulkString(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    Ok(StreamId::parse(&text))
                }
                _ => Ok(None),
            }
        })
    }

    fn ack_only<'a>(
        &'a self,
        stream: &'a str,
        group: &'a str,
        id: StreamId,
    ) -> BoxFuture<'a, Result<bool, StreamBrokerError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let acked: bool = Script::new(ACK_ONLY_SCRIPT)
                .key(stream)
                .arg(group)
                .arg(id.to_string())
                .invoke_async(&mut conn)
                .await
                .map_err(|e| StreamBrokerError::ScriptFailed {
                    stream: stream.to_string(),
                    id,
                    reason: e.to_string(),
                })?;
            Ok(acked)
        })
    }

    fn append<'a>(
        &'a self,
        stream: &'a str,
        message: &'a StreamMessage,
    ) -> BoxFuture<'a, Result<StreamId, StreamBrokerError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let mut cmd = redis::cmd("XADD");
            cmd.arg(stream).arg("*");
            for (field, value) in &message.values {
                cmd.arg(field.as_str()).arg(value.as_bytes());
            }
            let id: String = cmd.query_async(&mut conn).await.map_err(|e| StreamBrokerError::ReadFailed {
                stream: stream.to_string(),
                reason: e.to_string(),
            })?;
            StreamId::parse(&id).ok_or_else(|| StreamBrokerError::ReadFailed {
                stream: stream.to_string(),
                reason: format!("broker returned an unparseable id: {id}"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_busygroup_message() {
        let err: RedisError = (redis::ErrorKind::ExtensionError, "BUSYGROUP Consumer Group name already exists").into();
        assert!(RedisStreamBroker::is_busygroup(&err));
        let other: RedisError = (redis::ErrorKind::IoError, "connection refused").into();
        assert!(!RedisStreamBroker::is_busygroup(&other));
    }
}
