//! Typed read/write of ZooKeeper keys, topology enumeration, and recursive
//! listing/delete (§4.2).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, warn};
use serde::Deserialize;
use zookeeper::{Acl, CreateMode, ZkError, ZooKeeper};

use crate::error::{Error, Result};
use crate::kafka::types::Broker;

use super::path::resolve;

/// Stat fields surfaced by `zexists`/`zls` (adapted by the display layer,
/// §4.9.1).
#[derive(Debug, Clone)]
pub struct StatFields {
    pub czxid: i64,
    pub mzxid: i64,
    pub version: i32,
    pub data_length: i32,
    pub num_children: i32,
}

#[derive(Debug, Deserialize)]
struct BrokerRegistration {
    host: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct ConsumerIdRegistration {
    #[allow(dead_code)]
    version: i32,
    #[allow(dead_code)]
    subscription: std::collections::HashMap<String, i32>,
    #[allow(dead_code)]
    timestamp: Option<String>,
}

pub struct ZkView {
    connect_string: String,
    session_timeout: Duration,
    client: Mutex<Arc<ZooKeeper>>,
}

impl ZkView {
    pub fn connect(connect_string: &str, session_timeout: Duration) -> Result<Self> {
        let client = Self::open(connect_string, session_timeout)?;
        Ok(ZkView {
            connect_string: connect_string.to_string(),
            session_timeout,
            client: Mutex::new(client),
        })
    }

    fn open(connect_string: &str, session_timeout: Duration) -> Result<Arc<ZooKeeper>> {
        let keeper = ZooKeeper::connect(connect_string, session_timeout, |_event| {})
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Arc::new(keeper))
    }

    fn keeper(&self) -> Arc<ZooKeeper> {
        Arc::clone(&self.client.lock().expect("zk client lock poisoned"))
    }

    /// Serialized reconnect (§5): drop and re-establish the session.
    pub fn reconnect(&self) -> Result<()> {
        let mut guard = self.client.lock().expect("zk client lock poisoned");
        debug!("reconnecting to zookeeper ensemble at {}", self.connect_string);
        let fresh = Self::open(&self.connect_string, self.session_timeout)?;
        *guard = fresh;
        Ok(())
    }

    pub fn session_id(&self) -> i64 {
        self.keeper().client_id().client_id
    }

    pub fn zk_key_to_path(cwd: &str, key: &str) -> String {
        resolve(cwd, key)
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self
            .keeper()
            .exists(path, false)
            .map_err(Error::from)?
            .is_some())
    }

    pub fn stat(&self, path: &str) -> Result<StatFields> {
        let stat = self
            .keeper()
            .exists(path, false)
            .map_err(Error::from)?
            .ok_or_else(|| Error::ZkNotFound(path.to_string()))?;
        Ok(StatFields {
            czxid: stat.czxid,
            mzxid: stat.mzxid,
            version: stat.version,
            data_length: stat.data_length,
            num_children: stat.num_children,
        })
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let (data, _stat) = self
            .keeper()
            .get_data(path, false)
            .map_err(|e| self.classify_missing(path, e))?;
        Ok(data)
    }

    pub fn create(&self, path: &str, data: Vec<u8>) -> Result<()> {
        self.keeper()
            .create(path, data, Acl::open_unsafe().clone(), CreateMode::Persistent)
            .map_err(Error::from)?;
        Ok(())
    }

    /// Create every ancestor of `path` that does not yet exist, as empty
    /// persistent nodes.
    pub fn ensure_parents(&self, path: &str) -> Result<()> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current = String::new();
        for seg in segments.iter().take(segments.len().saturating_sub(1)) {
            current.push('/');
            current.push_str(seg);
            if !self.exists(&current)? {
                self.create(&current, Vec::new())?;
            }
        }
        Ok(())
    }

    /// `ensure_parents` plus the final node itself, if missing.
    pub fn ensure_path(&self, path: &str) -> Result<()> {
        self.ensure_parents(path)?;
        if !self.exists(path)? {
            self.create(path, Vec::new())?;
        }
        Ok(())
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.keeper()
            .delete(path, None)
            .map_err(|e| self.classify_missing(path, e))?;
        Ok(())
    }

    /// Post-order recursive delete. Missing children are skipped; any other
    /// error aborts with `ZKDeleteFailed` naming the offending path.
    pub fn delete_recursively(&self, path: &str) -> Result<()> {
        let children = match self.get_children(path) {
            Ok(children) => children,
            Err(Error::ZkNotFound(_)) => return Ok(()),
            Err(e) => {
                return Err(Error::ZkDeleteFailed {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        for child in children {
            let child_path = format!("{}/{child}", path.trim_end_matches('/'));
            self.delete_recursively(&child_path)?;
        }
        match self.delete(path) {
            Ok(()) => Ok(()),
            Err(Error::ZkNotFound(_)) => Ok(()),
            Err(e) => {
                error!("failed to delete {path}: {e}");
                Err(Error::ZkDeleteFailed {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn get_children(&self, path: &str) -> Result<Vec<String>> {
        self.keeper()
            .get_children(path, false)
            .map_err(|e| self.classify_missing(path, e))
    }

    /// Pre-order dump of `path` and every descendant (`ztree`).
    pub fn tree(&self, path: &str) -> Result<Vec<String>> {
        let mut out = vec![path.to_string()];
        let mut children = self.get_children(path).unwrap_or_default();
        children.sort();
        for child in children {
            let child_path = format!("{}/{child}", path.trim_end_matches('/'));
            out.extend(self.tree(&child_path)?);
        }
        Ok(out)
    }

    fn classify_missing(&self, path: &str, e: ZkError) -> Error {
        match e {
            ZkError::NoNode => Error::ZkNotFound(path.to_string()),
            other => Error::from(other),
        }
    }

    // ---- topology helpers (read-only) ----

    pub fn get_broker_list(&self) -> Result<Vec<Broker>> {
        let ids = self.get_children("/brokers/ids").unwrap_or_default();
        let mut brokers = Vec::with_capacity(ids.len());
        for id in ids {
            let path = format!("/brokers/ids/{id}");
            let data = match self.read(&path) {
                Ok(data) => data,
                Err(e) => {
                    warn!("skipping broker registration at {path}: {e}");
                    continue;
                }
            };
            let reg: BrokerRegistration = match serde_json::from_slice(&data) {
                Ok(reg) => reg,
                Err(e) => {
                    warn!("malformed broker registration at {path}: {e}");
                    continue;
                }
            };
            let parsed_id: i32 = id.parse().unwrap_or(-1);
            brokers.push(Broker {
                host: reg.host,
                port: reg.port,
                id: Some(parsed_id),
            });
        }
        Ok(brokers)
    }

    pub fn get_broker_topic_names(&self) -> Result<Vec<String>> {
        let mut names = self.get_children("/brokers/topics").unwrap_or_default();
        names.retain(|n| n != "__consumer_offsets");
        names.sort();
        Ok(names)
    }

    pub fn get_broker_topic_partitions(&self, topic: &str) -> Result<Vec<i32>> {
        let path = format!("/brokers/topics/{topic}/partitions");
        let mut ids: Vec<i32> = self
            .get_children(&path)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn get_consumer_owners(&self, group: &str, topic: &str) -> Result<Vec<(i32, String)>> {
        let path = format!("/consumers/{group}/owners/{topic}");
        let mut owners = Vec::new();
        for partition in self.get_children(&path).unwrap_or_default() {
            let Ok(partition_id) = partition.parse::<i32>() else {
                continue;
            };
            let owner_path = format!("{path}/{partition}");
            if let Ok(data) = self.read(&owner_path) {
                owners.push((partition_id, String::from_utf8_lossy(&data).to_string()));
            }
        }
        Ok(owners)
    }

    pub fn get_consumer_threads(&self, group: &str) -> Result<Vec<String>> {
        let path = format!("/consumers/{group}/ids");
        let ids = self.get_children(&path).unwrap_or_default();
        let mut threads = Vec::new();
        for id in ids {
            let id_path = format!("{path}/{id}");
            if let Ok(data) = self.read(&id_path) {
                if serde_json::from_slice::<ConsumerIdRegistration>(&data).is_ok() {
                    threads.push(id);
                }
            }
        }
        Ok(threads)
    }

    pub fn get_consumer_groups(&self) -> Result<Vec<String>> {
        let mut groups = self.get_children("/consumers").unwrap_or_default();
        groups.sort();
        Ok(groups)
    }

    /// Storm Partition-Manager layout: `<root>/<topic>/partition_<n>`.
    pub fn get_consumers_for_storm(&self, storm_root: &str) -> Result<Vec<String>> {
        self.get_children(storm_root)
    }
}
