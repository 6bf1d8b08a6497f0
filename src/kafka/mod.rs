//! The Kafka-facing subsystem: wire protocol, broker connections, the
//! low-level partition consumer (C3), and the group-coordinator
//! cross-check path (§6).

pub mod broker;
pub mod consumer;
pub mod group_client;
pub mod proto;
pub mod types;
pub mod wire;

pub use consumer::PartitionConsumer;
pub use types::{Broker, MessageData, TopicAndPartition};
