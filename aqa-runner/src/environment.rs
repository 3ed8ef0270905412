//! Host and execution environments
//!
//! `HostEnv` is a read-only snapshot of the variables the runner was started
//! with. `ExecutionEnvironment` holds the variables the run produces for the
//! harness; it is owned by the run context and handed to every child
//! process instead of mutating the runner's own environment.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::debug;

pub const BUILD_LIST: &str = "BUILD_LIST";
pub const SPEC: &str = "SPEC";
pub const TEST_JDK_HOME: &str = "TEST_JDK_HOME";
pub const SYSTEMTEST_REPO: &str = "ADOPTOPENJDK_SYSTEMTEST_REPO";
pub const SYSTEMTEST_BRANCH: &str = "ADOPTOPENJDK_SYSTEMTEST_BRANCH";

/// Snapshot of the runner's process environment
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    vars: HashMap<String, String>,
}

impl HostEnv {
    /// Captures the current process environment
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }
}

/// Variables produced for the harness
///
/// Each key has a single writing stage; later stages only read.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEnvironment {
    vars: BTreeMap<String, String>,
    path_prefixes: Vec<PathBuf>,
}

impl ExecutionEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        debug!("Setting {}={}", key, value);
        self.vars.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// All produced variables, sorted by name
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Puts `dir` in front of the child `PATH`
    pub fn prepend_path(&mut self, dir: PathBuf) {
        debug!("Prepending {} to PATH", dir.display());
        self.path_prefixes.insert(0, dir);
    }

    /// `PATH` for child processes, or `None` when nothing was prepended
    pub fn child_path(&self, host: &HostEnv) -> Option<String> {
        if self.path_prefixes.is_empty() {
            return None;
        }

        let inherited = host
            .get("PATH")
            .map(|path| std::env::split_paths(path).collect::<Vec<_>>())
            .unwrap_or_default();

        std::env::join_paths(self.path_prefixes.iter().cloned().chain(inherited))
            .ok()
            .and_then(|joined| joined.into_string().ok())
    }

    /// Variable overrides to apply on top of the host environment for a child
    pub fn child_vars(&self, host: &HostEnv) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(path) = self.child_path(host) {
            vars.push(("PATH".to_string(), path));
        }

        vars
    }
}
