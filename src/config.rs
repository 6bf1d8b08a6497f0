//! Minimal `key=value` properties loader (§3.1, §6).
//!
//! Reads `$HOME/.trifecta/config.properties`. A missing file is not an
//! error: defaults apply. `#` and `;` start a comment; blank lines are
//! skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};

const DEFAULT_ZK_CONNECT: &str = "localhost:2181";
const DEFAULT_KAFKA_BROKERS: &str = "localhost:9092";

#[derive(Debug, Clone, Default)]
pub struct Config {
    properties: HashMap<String, String>,
    path: PathBuf,
}

impl Config {
    /// Resolve `$HOME/.trifecta/config.properties` and load it if present.
    pub fn load_default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::load(home.join(".trifecta").join("config.properties"))
    }

    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let properties = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                debug!("loaded config from {}", path.display());
                parse_properties(&contents)
            }
            Err(e) => {
                warn!("no config at {} ({e}), using defaults", path.display());
                HashMap::new()
            }
        };
        Config { properties, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn zk_connect(&self) -> String {
        self.get_or("zookeeper.connect", DEFAULT_ZK_CONNECT).to_string()
    }

    pub fn seed_brokers(&self) -> Vec<String> {
        self.get_or("kafka.brokers", DEFAULT_KAFKA_BROKERS)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn zk_session_timeout_ms(&self) -> u64 {
        self.get("zookeeper.session.timeout.ms")
            .and_then(|s| s.parse().ok())
            .unwrap_or(6000)
    }

    pub fn scan_threads(&self) -> Option<usize> {
        self.get("scan.threads").and_then(|s| s.parse().ok())
    }
}

fn parse_properties(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = Config::load("/nonexistent/path/config.properties");
        assert_eq!(cfg.zk_connect(), DEFAULT_ZK_CONNECT);
        assert_eq!(cfg.seed_brokers(), vec![DEFAULT_KAFKA_BROKERS.to_string()]);
    }

    #[test]
    fn file_overrides_independently() {
        let dir = std::env::temp_dir().join(format!("kshell-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.properties");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "# comment").unwrap();
        writeln!(f, "zookeeper.connect=zk1:2181,zk2:2181").unwrap();
        writeln!(f, "; another comment").unwrap();
        writeln!(f).unwrap();
        let cfg = Config::load(&path);
        assert_eq!(cfg.zk_connect(), "zk1:2181,zk2:2181");
        assert_eq!(cfg.seed_brokers(), vec![DEFAULT_KAFKA_BROKERS.to_string()]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn expands_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/foo"), home.join("foo"));
        }
    }
}
