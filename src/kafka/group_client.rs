//! Group-coordinator-based consumer reads used only to cross-check/augment
//! the ZK-sourced consumer-group listing on clusters where group metadata
//! lives in `__consumer_offsets` rather than ZooKeeper (§6).

use std::time::Duration;

use konsumer_offsets::KonsumerOffsetsData;
use log::warn;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::message::Message;
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::Offset;

use crate::error::{Error, Result};

const CONSUMER_OFFSETS_TOPIC: &str = "__consumer_offsets";

/// Build an `rdkafka` consumer against `bootstrap_servers`, used for
/// group-coordinator enumeration (poll(0) to realize assignment, then
/// `position(tp)`).
pub fn create_group_consumer(bootstrap_servers: &str, group_id: &str) -> Result<BaseConsumer> {
    let mut cc = ClientConfig::new();
    cc.set("bootstrap.servers", bootstrap_servers);
    cc.set("group.id", group_id);
    cc.set("enable.auto.commit", "false");
    cc.set("auto.offset.reset", "earliest");
    cc.create().map_err(Error::from)
}

/// Realize partition assignment for `topic` on `consumer`, then read back
/// each partition's current position via `poll(0)`.
pub fn assigned_positions(consumer: &BaseConsumer, topic: &str) -> Result<Vec<(i32, i64)>> {
    let metadata = consumer
        .client()
        .fetch_metadata(Some(topic), Duration::from_secs(5))
        .map_err(Error::from)?;
    let topic_meta = metadata
        .topics()
        .iter()
        .find(|t| t.name() == topic)
        .ok_or_else(|| Error::Protocol(format!("topic {topic} missing from metadata")))?;

    let mut tpl = TopicPartitionList::new();
    for p in topic_meta.partitions() {
        tpl.add_partition_offset(topic, p.id(), Offset::Invalid)
            .map_err(Error::from)?;
    }
    consumer.assign(&tpl).map_err(Error::from)?;
    consumer.poll(Duration::from_millis(0));

    let positions = consumer.position().map_err(Error::from)?;
    let mut out = Vec::new();
    for elem in positions.elements() {
        if let Offset::Offset(off) = elem.offset() {
            out.push((elem.partition(), off));
        }
    }
    Ok(out)
}

/// Scan `__consumer_offsets` for group listings, decoding records with the
/// pack's own `konsumer_offsets` crate rather than hand-rolling that
/// record format.
pub fn scan_consumer_offsets_topic(
    consumer: &BaseConsumer,
    max_messages: usize,
) -> Result<Vec<KonsumerOffsetsData>> {
    let metadata = consumer
        .client()
        .fetch_metadata(Some(CONSUMER_OFFSETS_TOPIC), Duration::from_secs(5))
        .map_err(Error::from)?;
    let Some(topic_meta) = metadata.topics().iter().find(|t| t.name() == CONSUMER_OFFSETS_TOPIC) else {
        return Ok(Vec::new());
    };

    let mut tpl = TopicPartitionList::new();
    for p in topic_meta.partitions() {
        tpl.add_partition_offset(CONSUMER_OFFSETS_TOPIC, p.id(), Offset::Beginning)
            .map_err(Error::from)?;
    }
    consumer.assign(&tpl).map_err(Error::from)?;

    let mut out = Vec::new();
    while out.len() < max_messages {
        match consumer.poll(Duration::from_millis(200)) {
            Some(Ok(m)) => {
                let key = m.key().map(|k| k.to_vec());
                let payload = m.payload().map(|p| p.to_vec());
                match KonsumerOffsetsData::try_from_bytes_vec(key, payload) {
                    Ok(data) => out.push(data),
                    Err(e) => warn!("skipping unparseable __consumer_offsets record: {e}"),
                }
            }
            Some(Err(e)) => {
                warn!("error polling __consumer_offsets: {e}");
                break;
            }
            None => break,
        }
    }
    Ok(out)
}
