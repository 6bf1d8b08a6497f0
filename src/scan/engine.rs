//! Partition-parallel scan engine: `count`, `findOne`, `findNext`,
//! `findMany`, `observe` (§4.4). Fan-out is one task per partition on the
//! shared tokio runtime; cancellation is cooperative (§5, §8 property 7).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{error, warn};

use crate::error::{Error, Result};
use crate::kafka::consumer::PartitionConsumer;
use crate::kafka::types::{Broker, MessageData, TopicAndPartition};
use crate::zk::ZkView;

use super::predicate::PredicateList;
use super::restrictions::KqlRestrictions;

const FETCH_SIZE: i32 = 1024 * 1024;

/// Cooperative cancellation flag, shared by every partition task spawned
/// for one scan call (§5, §8 job manager).
pub type CancelFlag = Arc<AtomicBool>;

pub fn new_cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

/// Determine the starting offset for a partition under `restrictions`
/// (§4.4). Returns `(offset, group_existed)`; `group_existed` distinguishes
/// a brand-new consumer group from one whose stored offset was found and
/// used as-is. No caller reads the flag today; see DESIGN.md.
fn get_starting_offset(
    consumer: &mut PartitionConsumer,
    restrictions: &KqlRestrictions,
) -> Result<(i64, bool)> {
    let min = consumer.get_first_offset()?.max(0);
    let (mut start, existed) = match &restrictions.group_id {
        Some(group_id) => match consumer.fetch_offset(group_id)? {
            Some(offset) => (offset, true),
            None => (min, false),
        },
        None => (min, false),
    };
    if let Some(delta) = restrictions.delta {
        start = (start - delta).max(min);
    }
    Ok((start, existed))
}

async fn resolve_partitions(zk: &ZkView, topic: &str) -> Result<Vec<i32>> {
    zk.get_broker_topic_partitions(topic)
}

fn advance(start: i64, fetched: &[MessageData]) -> i64 {
    match fetched.iter().map(|m| m.offset).max() {
        Some(max_offset) => max_offset + 1,
        None => start + 1,
    }
}

/// `count(topic, brokers, predicates…)`: total matches across partitions,
/// scanning each partition to its `end` sampled at start.
pub async fn count(
    zk: &ZkView,
    topic: &str,
    seed_brokers: Vec<Broker>,
    predicates: Arc<PredicateList>,
    cancel: CancelFlag,
) -> Result<usize> {
    let partitions = resolve_partitions(zk, topic).await?;
    let mut handles = Vec::new();
    for partition in partitions {
        let tap = TopicAndPartition::new(topic, partition);
        let brokers = seed_brokers.clone();
        let predicates = Arc::clone(&predicates);
        let cancel = Arc::clone(&cancel);
        handles.push(tokio::task::spawn_blocking(move || {
            count_partition(tap, &brokers, &predicates, &cancel)
        }));
    }
    let mut total = 0usize;
    for handle in handles {
        match handle.await {
            Ok(Ok(n)) => total += n,
            Ok(Err(e)) => warn!("partition count failed: {e}"),
            Err(e) => error!("partition count task panicked: {e}"),
        }
    }
    Ok(total)
}

fn count_partition(
    tap: TopicAndPartition,
    seed_brokers: &[Broker],
    predicates: &PredicateList,
    cancel: &CancelFlag,
) -> Result<usize> {
    let mut consumer = PartitionConsumer::connect(tap.clone(), seed_brokers)?;
    let (mut start, _) = get_starting_offset(&mut consumer, &KqlRestrictions::none())?;
    let end = consumer.get_last_offset()?;
    let mut matched = 0usize;
    while start <= end {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let fetched = match consumer.fetch(start, FETCH_SIZE) {
            Ok(f) => f,
            Err(e) => {
                crate::kafka::consumer::classify_warn(&tap, &e);
                break;
            }
        };
        if fetched.is_empty() {
            start += 1;
            continue;
        }
        for msg in &fetched {
            if predicates.matches(&msg.value, &msg.key) {
                matched += 1;
            }
        }
        start = advance(start, &fetched);
    }
    Ok(matched)
}

/// `findOne`/`findNext`: first match anywhere (or, for `findNext`, within a
/// single bound partition). First-observed-wins; both the partition loops
/// and the per-batch loop short-circuit once the shared slot is filled.
pub async fn find_one(
    zk: &ZkView,
    topic: &str,
    seed_brokers: Vec<Broker>,
    predicates: Arc<PredicateList>,
    cancel: CancelFlag,
) -> Result<Option<MessageData>> {
    let partitions = resolve_partitions(zk, topic).await?;
    find_one_over(
        partitions.into_iter().map(|p| TopicAndPartition::new(topic, p)).collect(),
        seed_brokers,
        predicates,
        cancel,
    )
    .await
}

pub async fn find_next(
    tap: TopicAndPartition,
    seed_brokers: Vec<Broker>,
    predicates: Arc<PredicateList>,
    cancel: CancelFlag,
) -> Result<Option<MessageData>> {
    find_one_over(vec![tap], seed_brokers, predicates, cancel).await
}

async fn find_one_over(
    taps: Vec<TopicAndPartition>,
    seed_brokers: Vec<Broker>,
    predicates: Arc<PredicateList>,
    cancel: CancelFlag,
) -> Result<Option<MessageData>> {
    let found: Arc<std::sync::Mutex<Option<MessageData>>> = Arc::new(std::sync::Mutex::new(None));
    let mut handles = Vec::new();
    for tap in taps {
        let brokers = seed_brokers.clone();
        let predicates = Arc::clone(&predicates);
        let cancel = Arc::clone(&cancel);
        let found = Arc::clone(&found);
        handles.push(tokio::task::spawn_blocking(move || {
            find_one_partition(tap, &brokers, &predicates, &cancel, &found)
        }));
    }
    for handle in handles {
        if let Err(e) = handle.await {
            error!("findOne partition task panicked: {e}");
        }
    }
    let guard = found.lock().expect("findOne result lock poisoned");
    Ok(guard.clone())
}

fn find_one_partition(
    tap: TopicAndPartition,
    seed_brokers: &[Broker],
    predicates: &PredicateList,
    cancel: &CancelFlag,
    found: &std::sync::Mutex<Option<MessageData>>,
) -> Result<()> {
    if found.lock().expect("findOne result lock poisoned").is_some() {
        return Ok(());
    }
    let mut consumer = PartitionConsumer::connect(tap.clone(), seed_brokers)?;
    let (mut start, _) = get_starting_offset(&mut consumer, &KqlRestrictions::none())?;
    let end = consumer.get_last_offset()?;
    while start <= end {
        if cancel.load(Ordering::Relaxed) {
            return Ok(());
        }
        if found.lock().expect("findOne result lock poisoned").is_some() {
            return Ok(());
        }
        let fetched = match consumer.fetch(start, FETCH_SIZE) {
            Ok(f) => f,
            Err(e) => {
                crate::kafka::consumer::classify_warn(&tap, &e);
                return Ok(());
            }
        };
        if fetched.is_empty() {
            start += 1;
            continue;
        }
        for msg in &fetched {
            if predicates.matches(&msg.value, &msg.key) {
                let mut guard = found.lock().expect("findOne result lock poisoned");
                if guard.is_none() {
                    *guard = Some(msg.clone());
                }
                return Ok(());
            }
        }
        start = advance(start, &fetched);
    }
    Ok(())
}

/// `findMany`: up to `limit` matches, concatenated across partitions, then
/// sorted stably by partition id and truncated.
pub async fn find_many(
    zk: &ZkView,
    topic: &str,
    seed_brokers: Vec<Broker>,
    predicates: Arc<PredicateList>,
    restrictions: KqlRestrictions,
    limit: Option<usize>,
    counter: Arc<AtomicUsize>,
    cancel: CancelFlag,
) -> Result<Vec<MessageData>> {
    let partitions = resolve_partitions(zk, topic).await?;
    let mut handles = Vec::new();
    for partition in partitions {
        let tap = TopicAndPartition::new(topic, partition);
        let brokers = seed_brokers.clone();
        let predicates = Arc::clone(&predicates);
        let restrictions = restrictions.clone();
        let counter = Arc::clone(&counter);
        let cancel = Arc::clone(&cancel);
        handles.push(tokio::task::spawn_blocking(move || {
            find_many_partition(tap, &brokers, &predicates, &restrictions, &counter, &cancel)
        }));
    }
    let mut all: Vec<MessageData> = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(mut matches)) => all.append(&mut matches),
            Ok(Err(e)) => warn!("findMany partition failed: {e}"),
            Err(e) => error!("findMany partition task panicked: {e}"),
        }
    }
    all.sort_by_key(|m| m.partition);
    if let Some(limit) = limit {
        all.truncate(limit);
    }
    Ok(all)
}

fn find_many_partition(
    tap: TopicAndPartition,
    seed_brokers: &[Broker],
    predicates: &PredicateList,
    restrictions: &KqlRestrictions,
    counter: &AtomicUsize,
    cancel: &CancelFlag,
) -> Result<Vec<MessageData>> {
    let mut consumer = PartitionConsumer::connect(tap.clone(), seed_brokers)?;
    let (mut start, _) = get_starting_offset(&mut consumer, restrictions)?;
    let end = consumer.get_last_offset()?;
    let mut matches = Vec::new();
    while start <= end {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let fetched = match consumer.fetch(start, FETCH_SIZE) {
            Ok(f) => f,
            Err(e) => {
                crate::kafka::consumer::classify_warn(&tap, &e);
                break;
            }
        };
        if fetched.is_empty() {
            start += 1;
            continue;
        }
        counter.fetch_add(fetched.len(), Ordering::Relaxed);
        for msg in &fetched {
            if predicates.matches(&msg.value, &msg.key) {
                matches.push(msg.clone());
            }
        }
        start = advance(start, &fetched);
    }
    Ok(matches)
}

/// `observe`: fire-and-forget per-message callback across partitions,
/// bounded by the `end` sampled at start but re-sampled on fetch
/// exhaustion (the one exception to "sampled once", §4.4).
pub async fn observe(
    zk: &ZkView,
    topic: &str,
    seed_brokers: Vec<Broker>,
    sink: Arc<dyn Fn(MessageData) + Send + Sync>,
    cancel: CancelFlag,
) -> Result<()> {
    let partitions = resolve_partitions(zk, topic).await?;
    let mut handles = Vec::new();
    for partition in partitions {
        let tap = TopicAndPartition::new(topic, partition);
        let brokers = seed_brokers.clone();
        let sink = Arc::clone(&sink);
        let cancel = Arc::clone(&cancel);
        handles.push(tokio::task::spawn_blocking(move || {
            observe_partition(tap, &brokers, sink.as_ref(), &cancel)
        }));
    }
    for handle in handles {
        if let Err(e) = handle.await {
            error!("observe partition task panicked: {e}");
        }
    }
    Ok(())
}

fn observe_partition(
    tap: TopicAndPartition,
    seed_brokers: &[Broker],
    sink: &(dyn Fn(MessageData) + Send + Sync),
    cancel: &CancelFlag,
) -> Result<()> {
    let mut consumer = PartitionConsumer::connect(tap.clone(), seed_brokers)?;
    let (mut start, _) = get_starting_offset(&mut consumer, &KqlRestrictions::none())?;
    let mut end = consumer.get_last_offset()?;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(());
        }
        if start > end {
            // Re-sample the high-water mark; observe keeps following new
            // messages rather than stopping once it catches up.
            let fresh_end = consumer.get_last_offset()?;
            if fresh_end <= end {
                return Ok(());
            }
            end = fresh_end;
        }
        let fetched = match consumer.fetch(start, FETCH_SIZE) {
            Ok(f) => f,
            Err(e) => {
                crate::kafka::consumer::classify_warn(&tap, &e);
                return Ok(());
            }
        };
        if fetched.is_empty() {
            start += 1;
            continue;
        }
        for msg in fetched.iter().cloned() {
            sink(msg);
        }
        start = advance(start, &fetched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_uses_max_offset_plus_one_when_messages_returned() {
        let msgs = vec![
            MessageData { partition: 0, offset: 3, next_offset: 4, last_offset: 10, key: vec![], value: vec![] },
            MessageData { partition: 0, offset: 5, next_offset: 6, last_offset: 10, key: vec![], value: vec![] },
        ];
        assert_eq!(advance(3, &msgs), 6);
    }

    #[test]
    fn advance_increments_by_one_on_empty_batch() {
        assert_eq!(advance(7, &[]), 8);
    }

    #[test]
    fn find_many_sorts_by_partition_and_truncates() {
        let mut all = vec![
            MessageData { partition: 2, offset: 0, next_offset: 1, last_offset: 1, key: vec![], value: vec![] },
            MessageData { partition: 0, offset: 1, next_offset: 2, last_offset: 2, key: vec![], value: vec![] },
            MessageData { partition: 1, offset: 0, next_offset: 1, last_offset: 1, key: vec![], value: vec![] },
            MessageData { partition: 0, offset: 0, next_offset: 1, last_offset: 2, key: vec![], value: vec![] },
        ];
        all.sort_by_key(|m| m.partition);
        all.truncate(3);
        let partitions: Vec<i32> = all.iter().map(|m| m.partition).collect();
        assert_eq!(partitions, vec![0, 0, 1]);
        assert_eq!(all[0].offset, 0);
        assert_eq!(all[1].offset, 1);
    }
}
