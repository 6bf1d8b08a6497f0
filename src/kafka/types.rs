//! Data model shared by the partition consumer and scan engine (§3).

use std::cmp::Ordering;

/// A Kafka broker endpoint. Equal by `(host,port)` for seed lists; equal by
/// `id` when received from metadata (see `PartialEq` impls below).
#[derive(Debug, Clone)]
pub struct Broker {
    pub host: String,
    pub port: u16,
    pub id: Option<i32>,
}

impl Broker {
    pub fn seed(host: impl Into<String>, port: u16) -> Self {
        Broker { host: host.into(), port, id: None }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PartialEq for Broker {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.host == other.host && self.port == other.port,
        }
    }
}

/// The canonical scan unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicAndPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicAndPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        TopicAndPartition { topic: topic.into(), partition }
    }
}

/// Transient partition metadata from a `TopicMetadataResponse`. Invariant:
/// `leader ∈ replicas` when present; `isr ⊆ replicas`.
#[derive(Debug, Clone, Default)]
pub struct PartitionMetadata {
    pub leader: Option<Broker>,
    pub replicas: Vec<Broker>,
    pub isr: Vec<Broker>,
    pub error_code: i16,
}

#[derive(Debug, Clone)]
pub struct TopicDetails {
    pub topic: String,
    pub partition_id: i32,
    pub leader: Option<Broker>,
    pub replicas: Vec<Broker>,
    pub isr: Vec<Broker>,
    pub size_in_bytes: i64,
}

/// A fetched message plus the offset bookkeeping needed to advance a scan.
/// Invariants: `offset < next_offset <= last_offset + 1`; `last_offset` is
/// the high-water mark seen at fetch time.
#[derive(Debug, Clone)]
pub struct MessageData {
    pub partition: i32,
    pub offset: i64,
    pub next_offset: i64,
    pub last_offset: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ConsumerOffset {
    pub group_id: String,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub last_modified_time: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ConsumerGroup {
    pub consumer_id: String,
    pub offsets: Vec<ConsumerOffset>,
    pub owners: Vec<(i32, String)>,
    pub threads: Vec<String>,
}

/// Pseudo-times accepted by `getOffsetsBefore` (§4.3).
pub const EARLIEST_TIME: i64 = -2;
pub const LATEST_TIME: i64 = -1;

/// Sentinel returned by `OffsetFetchRequest` for a group with no committed
/// offset on a partition.
pub const NO_OFFSET: i64 = -1;

impl Ord for TopicAndPartition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.topic.cmp(&other.topic).then(self.partition.cmp(&other.partition))
    }
}
impl PartialOrd for TopicAndPartition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
