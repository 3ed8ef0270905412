//! Execution context for a test run
//!
//! Contains all state shared by the stages of one run:
//! - Runner settings and the host environment snapshot
//! - The platform profile, resolved once
//! - The execution environment handed to child processes
//! - Log buffer reported back to the host task

use aqa_core::domain::log::{LogEntry, LogLevel};
use aqa_core::domain::platform::{ArchiveTool, HostOs, PackageManager, PlatformProfile};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::environment::{ExecutionEnvironment, HostEnv, TEST_JDK_HOME};
use crate::error::{RunError, Severity};
use crate::process::CommandSpec;

/// Directory the harness repository is cloned into
pub const HARNESS_DIR: &str = "aqa-tests";

/// Execution context shared across the stages of a run
pub struct Context {
    pub run_id: Uuid,

    pub settings: Settings,

    /// Variables the runner was started with
    pub host: HostEnv,

    pub profile: PlatformProfile,

    /// Variables produced for the harness; the orchestrator is the only writer
    pub env: ExecutionEnvironment,

    log_buffer: Vec<LogEntry>,
}

impl Context {
    /// Creates a new execution context
    ///
    /// A `TEST_JDK_HOME` already present in the host environment is carried
    /// into the execution environment so it wins over JDK resolution.
    ///
    /// # Arguments
    /// * `settings` - Runner settings
    /// * `host` - Host environment snapshot
    /// * `profile` - Resolved platform profile
    pub fn new(settings: Settings, host: HostEnv, profile: PlatformProfile) -> Self {
        let mut env = ExecutionEnvironment::new();
        if let Some(preset) = host.get(TEST_JDK_HOME) {
            env.set(TEST_JDK_HOME, preset);
        }

        Self {
            run_id: Uuid::new_v4(),
            settings,
            host,
            profile,
            env,
            log_buffer: Vec::new(),
        }
    }

    /// Creates a context for the machine the runner is executing on
    pub fn for_current_host(settings: Settings, host: HostEnv) -> Self {
        let os = HostOs::current();
        let package_manager = match os {
            HostOs::Linux => PackageManager::detect(Path::exists),
            _ => PackageManager::Unknown,
        };
        let profile = PlatformProfile::resolve(
            os,
            host.get("RUNNER_TEMP"),
            host.get("USERPROFILE"),
            package_manager,
        )
        .with_archive_tool(ArchiveTool::detect(Path::exists));

        Self::new(settings, host, profile)
    }

    /// Path of the cloned harness repository
    pub fn harness_dir(&self) -> PathBuf {
        self.settings.workspace.join(HARNESS_DIR)
    }

    /// Starts a command carrying the current execution environment
    pub fn command(&self, program: impl Into<String>) -> CommandSpec {
        CommandSpec::new(program).envs(self.env.child_vars(&self.host))
    }

    /// Logs a Warning-severity error and swallows it; Fatal errors pass through
    pub fn tolerate(&mut self, result: Result<(), RunError>) -> Result<(), RunError> {
        match result {
            Err(e) if e.severity() == Severity::Warning => {
                match e {
                    RunError::Build(_) => self.log_error(e.to_string()),
                    _ => self.log_warning(e.to_string()),
                }
                Ok(())
            }
            other => other,
        }
    }

    /// Adds a log entry to the buffer
    pub fn add_log(&mut self, entry: LogEntry) {
        self.log_buffer.push(entry);
    }

    /// Logs a debug message
    pub fn log_debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        self.add_log(LogEntry::now(LogLevel::Debug, message));
    }

    /// Logs an info message
    pub fn log_info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.add_log(LogEntry::now(LogLevel::Info, message));
    }

    /// Logs a warning message
    pub fn log_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.add_log(LogEntry::now(LogLevel::Warning, message));
    }

    /// Logs an error message
    pub fn log_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.add_log(LogEntry::now(LogLevel::Error, message));
    }

    /// Buffered entries at or above `level`
    pub fn logs_at_least(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.log_buffer.iter().filter(move |entry| entry.level >= level)
    }

    /// Drains all log entries from the buffer
    pub fn drain_logs(&mut self) -> Vec<LogEntry> {
        self.log_buffer.drain(..).collect()
    }
}
