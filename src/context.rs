//! Runtime context (C10, §3, §4.7, §9): configuration, ZK handle, seed
//! broker list, session variables, active module, and the job manager.
//! The lifetime-holder for everything the REPL touches.
//!
//! The registry is installed after construction (`install_registry`)
//! rather than passed to `new`, a two-phase init meant to break a
//! context/registry cycle. This crate's stateless-handler design (see
//! `command::registry`) has no real cycle to break; the phase split is
//! kept for symmetry with a future module that *does* need to look itself
//! up through the registry.

use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::command::registry::Registry;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::job::JobManager;
use crate::kafka::types::Broker;
use crate::zk::ZkView;

const ROOT: &str = "/";

struct SessionState {
    zk_cwd: String,
    session_vars: std::collections::HashMap<String, String>,
    debug_on: bool,
}

pub struct Context {
    pub config: Config,
    zk: Option<Arc<ZkView>>,
    pub seed_brokers: Vec<Broker>,
    pub jobs: Arc<JobManager>,
    registry: OnceCell<Registry>,
    state: Mutex<SessionState>,
}

impl Context {
    pub fn new(config: Config, zk: Arc<ZkView>, seed_brokers: Vec<Broker>) -> Arc<Context> {
        Arc::new(Context {
            config,
            zk: Some(zk),
            seed_brokers,
            jobs: Arc::new(JobManager::new()),
            registry: OnceCell::new(),
            state: Mutex::new(SessionState {
                zk_cwd: ROOT.to_string(),
                session_vars: std::collections::HashMap::new(),
                debug_on: false,
            }),
        })
    }

    /// Install the registry once, after modules have been constructed.
    /// Calling this twice is a programming error.
    pub fn install_registry(&self, registry: Registry) {
        self.registry
            .set(registry)
            .unwrap_or_else(|_| panic!("registry already installed"));
    }

    pub fn registry(&self) -> &Registry {
        self.registry.get().expect("registry not installed before use")
    }

    pub fn zk(&self) -> Result<&Arc<ZkView>> {
        self.zk.as_ref().ok_or(Error::ZkConnectionLost)
    }

    pub fn zk_cwd(&self) -> String {
        self.state.lock().expect("session state lock poisoned").zk_cwd.clone()
    }

    pub fn set_zk_cwd(&self, cwd: String) {
        self.state.lock().expect("session state lock poisoned").zk_cwd = cwd;
    }

    /// Resolve a possibly-relative ZK key against the session cwd (§4.2).
    pub fn resolve_zk_key(&self, key: &str) -> String {
        crate::zk::resolve_path(&self.zk_cwd(), key)
    }

    pub fn set_session_var(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state
            .lock()
            .expect("session state lock poisoned")
            .session_vars
            .insert(name.into(), value.into());
    }

    pub fn session_var(&self, name: &str) -> Option<String> {
        self.state.lock().expect("session state lock poisoned").session_vars.get(name).cloned()
    }

    pub fn debug_on(&self) -> bool {
        self.state.lock().expect("session state lock poisoned").debug_on
    }

    pub fn set_debug_on(&self, on: bool) {
        self.state.lock().expect("session state lock poisoned").debug_on = on;
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// A `Context` with no live ZK connection, for exercising registry and
    /// job-manager logic that never touches `context.zk()`.
    pub fn fresh_context() -> Arc<Context> {
        Arc::new(Context {
            config: Config::default(),
            zk: None,
            seed_brokers: Vec::new(),
            jobs: Arc::new(JobManager::new()),
            registry: OnceCell::new(),
            state: Mutex::new(SessionState {
                zk_cwd: ROOT.to_string(),
                session_vars: std::collections::HashMap::new(),
                debug_on: false,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_zk_surfaces_connection_lost() {
        let ctx = test_support::fresh_context();
        assert!(matches!(ctx.zk(), Err(Error::ZkConnectionLost)));
    }

    #[test]
    fn zk_cwd_defaults_to_root_and_is_mutable() {
        let ctx = test_support::fresh_context();
        assert_eq!(ctx.zk_cwd(), "/");
        ctx.set_zk_cwd("/a/b".to_string());
        assert_eq!(ctx.zk_cwd(), "/a/b");
        assert_eq!(ctx.resolve_zk_key(".."), "/a");
    }

    #[test]
    fn session_vars_round_trip() {
        let ctx = test_support::fresh_context();
        assert_eq!(ctx.session_var("foo"), None);
        ctx.set_session_var("foo", "bar");
        assert_eq!(ctx.session_var("foo"), Some("bar".to_string()));
    }
}
