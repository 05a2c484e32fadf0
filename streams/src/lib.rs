//! Redis Streams implementation of the polygo durable-stream fabric.
//!
//! This crate provides the concrete [`StreamBroker`](polygo_core::StreamBroker) backing
//! every stage ([`RedisStreamBroker`]) and the generic consumer-group runtime that each
//! stage drives it with ([`StreamConsumer`]). Stages only ever see
//! [`polygo_core::StreamBroker`] and [`StageHandler`]; this crate is where the durability
//! guarantees (consumer groups, pending-entries replay, atomic ack-and-forward) actually
//! live.

mod broker;
mod consumer;

pub use broker::RedisStreamBroker;
pub use consumer::{HandlerOutcome, StageHandler, StreamConsumer, StreamConsumerBuilder};
