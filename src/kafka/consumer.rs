//! Low-level per-`(topic,partition)` client: leader discovery with
//! failover, metadata, fetch, offset queries, commit/fetch offsets (§4.3).

use std::time::Duration;

use log::{debug, warn};

use crate::error::{Error, Result};

use super::broker::BrokerConnection;
use super::proto::{self, FetchSpec};
use super::types::{Broker, MessageData, TopicAndPartition, EARLIEST_TIME, LATEST_TIME};

const DEFAULT_FETCH_SIZE: i32 = 1024 * 1024; // 1 MiB (§4.3)

/// Bound to one `TopicAndPartition` plus a seed-broker list at
/// construction (§4.3). Scoped to a single scan call: created, used, and
/// closed before the call returns (§3).
pub struct PartitionConsumer {
    tap: TopicAndPartition,
    leader: Broker,
    replicas: Vec<Broker>,
    client: BrokerConnection,
}

impl PartitionConsumer {
    /// Iterate seed brokers in input order; the first that replies without
    /// a transport error wins. Fails with `LeaderUnavailable` when no seed
    /// broker responds or the response lacks a leader for the partition.
    pub fn connect(tap: TopicAndPartition, seed_brokers: &[Broker]) -> Result<Self> {
        let mut last_err: Option<String> = None;
        for seed in seed_brokers {
            let metadata = match Self::fetch_topic_metadata(seed, &tap.topic) {
                Ok(m) => m,
                Err(e) => {
                    debug!("seed broker {} unreachable for metadata: {e}", seed.addr());
                    last_err = Some(e.to_string());
                    continue;
                }
            };
            let Some(topic_meta) = metadata.iter().find(|t| t.topic == tap.topic) else {
                last_err = Some(format!("topic {} missing from metadata", tap.topic));
                continue;
            };
            let Some(partition_meta) = topic_meta
                .partitions
                .iter()
                .zip(topic_meta.partition_ids.iter())
                .find(|(_, id)| **id == tap.partition)
                .map(|(p, _)| p)
            else {
                last_err = Some(format!("partition {} missing from metadata", tap.partition));
                continue;
            };
            let Some(leader) = partition_meta.leader.clone() else {
                last_err = Some("no leader for partition".to_string());
                continue;
            };
            let client = BrokerConnection::connect_default(&leader.host, leader.port)?;
            return Ok(PartitionConsumer {
                tap,
                leader,
                replicas: partition_meta.replicas.clone(),
                client,
            });
        }
        Err(Error::LeaderUnavailable(
            last_err.unwrap_or_else(|| "no seed brokers responded".to_string()),
        ))
    }

    fn fetch_topic_metadata(seed: &Broker, topic: &str) -> Result<Vec<proto::TopicMetadata>> {
        let mut conn = BrokerConnection::connect_default(&seed.host, seed.port)?;
        let correlation_id = proto::next_correlation_id();
        let request = proto::encode_topic_metadata_request(correlation_id, &[topic.to_string()]);
        let response = conn.send_receive(&request)?;
        proto::decode_topic_metadata_response(&response, correlation_id)
    }

    pub fn leader(&self) -> &Broker {
        &self.leader
    }

    pub fn replicas(&self) -> &[Broker] {
        &self.replicas
    }

    pub fn topic_and_partition(&self) -> &TopicAndPartition {
        &self.tap
    }

    /// Build one fetch request enumerating the requested offset and fetch
    /// size; fails with `KafkaCode` on a per-partition error, otherwise
    /// preserves server order.
    pub fn fetch(&mut self, offset: i64, fetch_size: i32) -> Result<Vec<MessageData>> {
        let correlation_id = proto::next_correlation_id();
        let spec = FetchSpec { partition: self.tap.partition, offset, max_bytes: fetch_size };
        let request = proto::encode_fetch_request(correlation_id, &self.tap.topic, &[spec], 1000, 1);
        let response = self.client.send_receive(&request)?;
        let partitions = proto::decode_fetch_response(&response, correlation_id)?;
        let Some(partition) = partitions.into_iter().find(|p| p.partition == self.tap.partition) else {
            return Err(Error::Protocol("fetch response missing requested partition".to_string()));
        };
        if partition.error_code != 0 {
            return Err(Error::KafkaCode(partition.error_code));
        }
        Ok(partition
            .messages
            .into_iter()
            .map(|(msg_offset, key, value)| MessageData {
                partition: self.tap.partition,
                offset: msg_offset,
                next_offset: msg_offset + 1,
                last_offset: partition.high_watermark,
                key,
                value,
            })
            .collect())
    }

    pub fn fetch_default(&mut self, offset: i64) -> Result<Vec<MessageData>> {
        self.fetch(offset, DEFAULT_FETCH_SIZE)
    }

    /// Offsets before `time_millis`, newest first, from the leader.
    pub fn get_offsets_before(&mut self, time_millis: i64, max_offsets: i32) -> Result<Vec<i64>> {
        let correlation_id = proto::next_correlation_id();
        let request = proto::encode_offset_request(
            correlation_id,
            &self.tap.topic,
            self.tap.partition,
            time_millis,
            max_offsets,
        );
        let response = self.client.send_receive(&request)?;
        proto::decode_offset_response(&response, correlation_id)
    }

    pub fn get_first_offset(&mut self) -> Result<i64> {
        self.earliest_or_latest_offset(EARLIEST_TIME)
    }

    pub fn get_last_offset(&mut self) -> Result<i64> {
        self.earliest_or_latest_offset(LATEST_TIME)
    }

    pub fn get_latest_offsets(&mut self, max_offsets: i32) -> Result<Vec<i64>> {
        self.get_offsets_before(LATEST_TIME, max_offsets)
    }

    /// Wraps the leader-side offset call with a pseudo-time.
    pub fn earliest_or_latest_offset(&mut self, time_millis: i64) -> Result<i64> {
        let offsets = self.get_offsets_before(time_millis, 1)?;
        offsets
            .first()
            .copied()
            .ok_or_else(|| Error::Protocol("no offsets returned".to_string()))
    }

    /// The stored offset for the bound `(topic,partition)` under
    /// `group_id`, or `None` when absent (sentinel `-1`).
    pub fn fetch_offset(&mut self, group_id: &str) -> Result<Option<i64>> {
        let correlation_id = proto::next_correlation_id();
        let request =
            proto::encode_offset_fetch_request(correlation_id, group_id, &self.tap.topic, self.tap.partition);
        let response = self.client.send_receive(&request)?;
        let fetched = proto::decode_offset_fetch_response(&response, correlation_id)?;
        if fetched.error_code != 0 {
            return Err(Error::KafkaCode(fetched.error_code));
        }
        if fetched.offset == super::types::NO_OFFSET {
            Ok(None)
        } else {
            Ok(Some(fetched.offset))
        }
    }

    /// Fails with `KafkaCode` on a non-zero status in the response.
    pub fn commit_offsets(&mut self, group_id: &str, offset: i64, metadata: &str) -> Result<()> {
        let correlation_id = proto::next_correlation_id();
        let request = proto::encode_offset_commit_request(
            correlation_id,
            group_id,
            &self.tap.topic,
            self.tap.partition,
            offset,
            metadata,
        );
        let response = self.client.send_receive(&request)?;
        proto::decode_offset_commit_response(&response, correlation_id)
    }

    /// Idempotent; swallows transport errors.
    pub fn close(self) {
        // BrokerConnection's TcpStream closes on drop; nothing else to
        // flush. Errors here would only be transport errors, which this
        // call swallows by construction.
        drop(self.client);
    }
}

pub fn default_connect_timeout() -> Duration {
    Duration::from_millis(super::broker::DEFAULT_SOCKET_TIMEOUT_MS)
}

pub fn classify_warn(tap: &TopicAndPartition, err: &Error) {
    warn!("partition {}/{} fetch error: {err}", tap.topic, tap.partition);
}
