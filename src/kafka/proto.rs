//! Request encoders and response decoders for the pre–group-coordinator
//! Kafka wire protocol (§4.3.1, §6): `TopicMetadataRequest`, `FetchRequest`,
//! `OffsetRequest`, `OffsetFetchRequest`, `OffsetCommitRequest`.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::error::{Error, Result};

use super::types::Broker;
use super::wire::{ByteReader, ByteWriter};

const API_METADATA: i16 = 3;
const API_OFFSET: i16 = 2;
const API_FETCH: i16 = 1;
const API_OFFSET_FETCH: i16 = 9;
const API_OFFSET_COMMIT: i16 = 8;
const API_VERSION: i16 = 0;
const CLIENT_ID: &str = "kshell";

static CORRELATION_ID: AtomicI32 = AtomicI32::new(0);

/// Process-wide monotonically increasing counter (§4.3, §5). Uniqueness
/// within a client session is its only requirement.
pub fn next_correlation_id() -> i32 {
    CORRELATION_ID.fetch_add(1, Ordering::Relaxed)
}

fn frame(api_key: i16, correlation_id: i32, body: ByteWriter) -> Vec<u8> {
    let mut header = ByteWriter::new();
    header.write_i16(api_key);
    header.write_i16(API_VERSION);
    header.write_i32(correlation_id);
    header.write_string(CLIENT_ID);
    let mut payload = header.into_vec();
    payload.extend_from_slice(&body.into_vec());

    let mut framed = ByteWriter::new();
    framed.write_i32(payload.len() as i32);
    let mut out = framed.into_vec();
    out.extend_from_slice(&payload);
    out
}

fn read_response_header(reader: &mut ByteReader, correlation_id: i32) -> Result<()> {
    let echoed = reader.read_i32()?;
    if echoed != correlation_id {
        return Err(Error::Protocol(format!(
            "correlation id mismatch: sent {correlation_id}, got {echoed}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------- metadata

pub fn encode_topic_metadata_request(correlation_id: i32, topics: &[String]) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_array_len(topics.len());
    for t in topics {
        body.write_string(t);
    }
    frame(API_METADATA, correlation_id, body)
}

#[derive(Debug, Default)]
pub struct TopicMetadata {
    pub topic: String,
    pub error_code: i16,
    pub partitions: Vec<super::types::PartitionMetadata>,
    pub partition_ids: Vec<i32>,
}

pub fn decode_topic_metadata_response(bytes: &[u8], correlation_id: i32) -> Result<Vec<TopicMetadata>> {
    let mut r = ByteReader::new(bytes);
    read_response_header(&mut r, correlation_id)?;

    let broker_count = r.read_array_len()?;
    let mut brokers_by_id = std::collections::HashMap::new();
    for _ in 0..broker_count.max(0) {
        let id = r.read_i32()?;
        let host = r.read_string()?;
        let port = r.read_i32()?;
        brokers_by_id.insert(id, Broker { host, port: port as u16, id: Some(id) });
    }

    let topic_count = r.read_array_len()?;
    let mut topics = Vec::with_capacity(topic_count.max(0) as usize);
    for _ in 0..topic_count.max(0) {
        let topic_error = r.read_i16()?;
        let topic_name = r.read_string()?;
        let partition_count = r.read_array_len()?;
        let mut partitions = Vec::with_capacity(partition_count.max(0) as usize);
        let mut partition_ids = Vec::new();
        for _ in 0..partition_count.max(0) {
            let perr = r.read_i16()?;
            let partition_id = r.read_i32()?;
            let leader_id = r.read_i32()?;
            let replica_count = r.read_array_len()?;
            let mut replicas = Vec::with_capacity(replica_count.max(0) as usize);
            for _ in 0..replica_count.max(0) {
                let id = r.read_i32()?;
                if let Some(b) = brokers_by_id.get(&id) {
                    replicas.push(b.clone());
                }
            }
            let isr_count = r.read_array_len()?;
            let mut isr = Vec::with_capacity(isr_count.max(0) as usize);
            for _ in 0..isr_count.max(0) {
                let id = r.read_i32()?;
                if let Some(b) = brokers_by_id.get(&id) {
                    isr.push(b.clone());
                }
            }
            partition_ids.push(partition_id);
            partitions.push(super::types::PartitionMetadata {
                leader: brokers_by_id.get(&leader_id).cloned(),
                replicas,
                isr,
                error_code: perr,
            });
        }
        topics.push(TopicMetadata {
            topic: topic_name,
            error_code: topic_error,
            partitions,
            partition_ids,
        });
    }
    Ok(topics)
}

// ------------------------------------------------------------------ fetch

pub struct FetchSpec {
    pub partition: i32,
    pub offset: i64,
    pub max_bytes: i32,
}

pub fn encode_fetch_request(
    correlation_id: i32,
    topic: &str,
    specs: &[FetchSpec],
    max_wait_ms: i32,
    min_bytes: i32,
) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_i32(-1); // replica_id
    body.write_i32(max_wait_ms);
    body.write_i32(min_bytes);
    body.write_array_len(1);
    body.write_string(topic);
    body.write_array_len(specs.len());
    for s in specs {
        body.write_i32(s.partition);
        body.write_i64(s.offset);
        body.write_i32(s.max_bytes);
    }
    frame(API_FETCH, correlation_id, body)
}

pub struct FetchedPartition {
    pub partition: i32,
    pub error_code: i16,
    pub high_watermark: i64,
    pub messages: Vec<(i64, Vec<u8>, Vec<u8>)>, // (offset, key, value)
}

pub fn decode_fetch_response(bytes: &[u8], correlation_id: i32) -> Result<Vec<FetchedPartition>> {
    let mut r = ByteReader::new(bytes);
    read_response_header(&mut r, correlation_id)?;

    let topic_count = r.read_array_len()?;
    let mut out = Vec::new();
    for _ in 0..topic_count.max(0) {
        let _topic = r.read_string()?;
        let partition_count = r.read_array_len()?;
        for _ in 0..partition_count.max(0) {
            let partition = r.read_i32()?;
            let error_code = r.read_i16()?;
            let high_watermark = r.read_i64()?;
            let message_set_size = r.read_i32()?;
            let message_bytes = r.take_slice(message_set_size.max(0) as usize)?;
            let messages = if error_code == 0 {
                decode_message_set(message_bytes)?
            } else {
                Vec::new()
            };
            out.push(FetchedPartition { partition, error_code, high_watermark, messages });
        }
    }
    Ok(out)
}

const COMPRESSION_MASK: u8 = 0x03;

fn decode_message_set(bytes: &[u8]) -> Result<Vec<(i64, Vec<u8>, Vec<u8>)>> {
    let mut r = ByteReader::new(bytes);
    let mut out = Vec::new();
    // A truncated trailing message (partial fetch) is expected and simply
    // stops decoding at the last complete record.
    while r.remaining() >= 12 {
        let offset = r.read_i64()?;
        let message_size = r.read_i32()?;
        if r.remaining() < message_size as usize || message_size < 0 {
            break;
        }
        let msg_bytes = r.take_slice(message_size as usize)?;
        let mut mr = ByteReader::new(msg_bytes);
        let _crc = mr.read_u32()?;
        let _magic = mr.read_i8()?;
        let attributes = mr.read_i8()? as u8;
        if attributes & COMPRESSION_MASK != 0 {
            return Err(Error::Protocol(
                "compressed message sets are not supported".to_string(),
            ));
        }
        let key = mr.read_bytes()?.unwrap_or_default();
        let value = mr.read_bytes()?.unwrap_or_default();
        out.push((offset, key, value));
    }
    Ok(out)
}

// ----------------------------------------------------------------- offset

pub fn encode_offset_request(correlation_id: i32, topic: &str, partition: i32, time: i64, max_offsets: i32) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_i32(-1); // replica_id
    body.write_array_len(1);
    body.write_string(topic);
    body.write_array_len(1);
    body.write_i32(partition);
    body.write_i64(time);
    body.write_i32(max_offsets);
    frame(API_OFFSET, correlation_id, body)
}

pub fn decode_offset_response(bytes: &[u8], correlation_id: i32) -> Result<Vec<i64>> {
    let mut r = ByteReader::new(bytes);
    read_response_header(&mut r, correlation_id)?;
    let topic_count = r.read_array_len()?;
    let mut offsets = Vec::new();
    for _ in 0..topic_count.max(0) {
        let _topic = r.read_string()?;
        let partition_count = r.read_array_len()?;
        for _ in 0..partition_count.max(0) {
            let _partition = r.read_i32()?;
            let error_code = r.read_i16()?;
            if error_code != 0 {
                return Err(Error::KafkaCode(error_code));
            }
            let offset_count = r.read_array_len()?;
            for _ in 0..offset_count.max(0) {
                offsets.push(r.read_i64()?);
            }
        }
    }
    Ok(offsets)
}

// ----------------------------------------------------------- offset fetch

pub fn encode_offset_fetch_request(correlation_id: i32, group_id: &str, topic: &str, partition: i32) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_string(group_id);
    body.write_array_len(1);
    body.write_string(topic);
    body.write_array_len(1);
    body.write_i32(partition);
    frame(API_OFFSET_FETCH, correlation_id, body)
}

pub struct FetchedOffset {
    pub offset: i64,
    pub metadata: String,
    pub error_code: i16,
}

pub fn decode_offset_fetch_response(bytes: &[u8], correlation_id: i32) -> Result<FetchedOffset> {
    let mut r = ByteReader::new(bytes);
    read_response_header(&mut r, correlation_id)?;
    let topic_count = r.read_array_len()?;
    let mut result = FetchedOffset { offset: super::types::NO_OFFSET, metadata: String::new(), error_code: 0 };
    for _ in 0..topic_count.max(0) {
        let _topic = r.read_string()?;
        let partition_count = r.read_array_len()?;
        for _ in 0..partition_count.max(0) {
            let _partition = r.read_i32()?;
            let offset = r.read_i64()?;
            let metadata = r.read_string()?;
            let error_code = r.read_i16()?;
            result = FetchedOffset { offset, metadata, error_code };
        }
    }
    Ok(result)
}

// ---------------------------------------------------------- offset commit

pub fn encode_offset_commit_request(
    correlation_id: i32,
    group_id: &str,
    topic: &str,
    partition: i32,
    offset: i64,
    metadata: &str,
) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_string(group_id);
    body.write_array_len(1);
    body.write_string(topic);
    body.write_array_len(1);
    body.write_i32(partition);
    body.write_i64(offset);
    body.write_string(metadata);
    frame(API_OFFSET_COMMIT, correlation_id, body)
}

pub fn decode_offset_commit_response(bytes: &[u8], correlation_id: i32) -> Result<()> {
    let mut r = ByteReader::new(bytes);
    read_response_header(&mut r, correlation_id)?;
    let topic_count = r.read_array_len()?;
    for _ in 0..topic_count.max(0) {
        let _topic = r.read_string()?;
        let partition_count = r.read_array_len()?;
        for _ in 0..partition_count.max(0) {
            let _partition = r.read_i32()?;
            let error_code = r.read_i16()?;
            if error_code != 0 {
                return Err(Error::KafkaCode(error_code));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_ids_are_unique_within_a_session() {
        let a = next_correlation_id();
        let b = next_correlation_id();
        assert_ne!(a, b);
    }

    #[test]
    fn message_set_decode_stops_at_truncated_trailing_record() {
        let mut msg = ByteWriter::new();
        msg.write_i32(0); // crc placeholder (not validated)
        msg.write_i8(0); // magic
        msg.write_i8(0); // attributes: no compression
        msg.write_bytes(Some(b"k"));
        msg.write_bytes(Some(b"v"));
        let msg_bytes = msg.into_vec();

        let mut set = ByteWriter::new();
        set.write_i64(0);
        set.write_i32(msg_bytes.len() as i32);
        for b in &msg_bytes {
            set.write_i8(*b as i8);
        }
        // Truncated trailing message: offset + size header only.
        set.write_i64(1);
        set.write_i32(100);

        let decoded = decode_message_set(&set.into_vec()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0, 0);
        assert_eq!(decoded[0].1, b"k".to_vec());
        assert_eq!(decoded[0].2, b"v".to_vec());
    }
}
