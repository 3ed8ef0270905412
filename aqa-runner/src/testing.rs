//! Test doubles for the process and download seams

use anyhow::Result;
use async_trait::async_trait;
use aqa_core::domain::platform::{HostOs, PackageManager, PlatformProfile};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Settings;
use crate::context::Context;
use crate::download::Downloader;
use crate::environment::HostEnv;
use crate::process::{CommandOutput, CommandRunner, CommandSpec};

type Handler = Box<dyn Fn(&CommandSpec) -> CommandOutput + Send + Sync>;

/// Records every command and answers with a scripted output
///
/// `git clone` creates its destination directory so later stages find the
/// harness tree.
pub struct FakeRunner {
    calls: Mutex<Vec<CommandSpec>>,
    handler: Handler,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::with_handler(|_| ok(""))
    }

    pub fn with_handler(handler: impl Fn(&CommandSpec) -> CommandOutput + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands rendered as `program arg arg ...`
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.to_string()).collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        if spec.program == "git" && spec.subcommand() == Some("clone") {
            if let Some(dest) = spec.args.last() {
                std::fs::create_dir_all(dest)?;
            }
        }

        Ok((self.handler)(spec))
    }
}

pub fn ok(output: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        output: output.to_string(),
    }
}

pub fn exit(code: i32, output: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(code),
        output: output.to_string(),
    }
}

/// Serves canned bodies by URL
pub struct FakeDownloader {
    bodies: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self {
            bodies: HashMap::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf> {
        self.fetched.lock().unwrap().push(url.to_string());
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {}", url))?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, body)?;
        Ok(dest.to_path_buf())
    }
}

/// Builds an in-memory zip with the given `(path, contents)` entries
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Linux context rooted in `root`, with no package manager
pub fn linux_context(root: &Path, host: HostEnv) -> Context {
    context_for(root, host, HostOs::Linux, PackageManager::Unknown)
}

pub fn context_for(root: &Path, host: HostEnv, os: HostOs, package_manager: PackageManager) -> Context {
    let temp = root.join("temp");
    let profile = PlatformProfile::resolve(os, temp.to_str(), None, package_manager);
    let settings = Settings::new(root.join("workspace"));
    std::fs::create_dir_all(&settings.workspace).unwrap();
    Context::new(settings, host, profile)
}
