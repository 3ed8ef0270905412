//! External process execution
//!
//! Commands are built as a typed list of argument tokens and run through the
//! `CommandRunner` trait so stages can be exercised without real tools.

use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

/// A command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, `None` inherits the runner's
    pub cwd: Option<PathBuf>,
    /// Environment overrides on top of the runner's own environment
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds `flag value` only when `value` is non-empty
    pub fn flag_if_present(self, flag: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.arg(flag).arg(value)
        }
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs(mut self, envs: Vec<(String, String)>) -> Self {
        self.envs.extend(envs);
        self
    }

    /// First argument, if any
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// stdout and stderr lines in arrival order
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turns a non-zero exit into an error
    pub fn ensure_success(self, spec: &CommandSpec) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            let code = self
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            anyhow::bail!("'{}' failed with exit code {}", spec, code)
        }
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` to completion
    ///
    /// # Returns
    /// The captured output, or an error when the process could not be started
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands on the host with `tokio::process`
///
/// Output lines are echoed to the runner's own stdout/stderr as they arrive
/// and captured at the same time.
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    /// Copies `reader` line by line into `sink` until EOF
    ///
    /// Lines are decoded lossily; harness output is not always UTF-8.
    async fn pump<R>(reader: R, sink: &Mutex<String>, to_stderr: bool) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }
            let decoded = String::from_utf8_lossy(&buf);
            let line = decoded.trim_end_matches(['\n', '\r']);
            if to_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
            if let Ok(mut captured) = sink.lock() {
                captured.push_str(line);
                captured.push('\n');
            }
        }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Executing: {}", spec);

        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to execute '{}'", spec.program))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("stdout of '{}' was not captured", spec.program))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("stderr of '{}' was not captured", spec.program))?;

        let captured = Mutex::new(String::new());
        let (out, err) = tokio::join!(
            Self::pump(stdout, &captured, false),
            Self::pump(stderr, &captured, true)
        );
        // reap the child before reporting a broken pipe
        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for '{}'", spec.program))?;
        out.context("Failed to read stdout")?;
        err.context("Failed to read stderr")?;

        let output = captured
            .into_inner()
            .map_err(|_| anyhow::anyhow!("output buffer poisoned"))?;

        debug!(
            "'{}' finished: exit_code={:?}, output_len={}",
            spec.program,
            status.code(),
            output.len()
        );

        Ok(CommandOutput {
            exit_code: status.code(),
            output,
        })
    }
}
