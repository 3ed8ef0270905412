//! Source acquisition
//!
//! Fetches everything the harness needs before it can build:
//! - The harness repository itself
//! - Its sub-repositories and the SDK, through the harness's `get.sh`
//! - Prebuilt dependency bundles from the CI server

use aqa_core::domain::config::RunConfiguration;
use aqa_core::domain::platform::HostOs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::context::Context;
use crate::download::{Downloader, extract_zip, remove_archive};
use crate::environment::{SYSTEMTEST_BRANCH, SYSTEMTEST_REPO};
use crate::error::{Result, RunError};
use crate::process::{CommandRunner, CommandSpec};

/// Directory the systemtest bundle nests its prerequisites under
const SYSTEMTEST_ARCHIVE_ROOT: &str = "archive";
const SYSTEMTEST_PREREQS: &str = "systemtest_prereqs";

/// Builds the `get.sh` invocation
///
/// Each flag is only added when its value is non-empty. On Windows the
/// script runs through `bash`.
pub fn get_sh_command(ctx: &Context, config: &RunConfiguration, harness_dir: &Path) -> CommandSpec {
    let mut spec = match ctx.profile.os {
        HostOs::Windows => ctx.command("bash").arg("./get.sh"),
        _ => ctx.command("./get.sh"),
    };

    if let Some(tkg) = &config.tkg {
        spec = spec
            .flag_if_present("--tkg_branch", &tkg.branch)
            .flag_if_present("--tkg_repo", &tkg.github_url());
    }
    if let Some(openj9) = &config.openj9 {
        spec = spec
            .flag_if_present("--openj9_branch", &openj9.branch)
            .flag_if_present("--openj9_repo", &openj9.github_url());
    }

    spec.flag_if_present("--sdk_resource", config.jdk_source.as_str())
        .flag_if_present(
            "--customizedURL",
            config.customized_sdk_url.as_deref().unwrap_or_default(),
        )
        .flag_if_present("--sdkdir", &config.sdk_dir)
        .args(config.vendor.to_args())
        .current_dir(harness_dir)
}

/// Fetches the harness and its dependencies
pub struct SourceAcquisition {
    runner: Arc<dyn CommandRunner>,
    downloader: Arc<dyn Downloader>,
}

impl SourceAcquisition {
    pub fn new(runner: Arc<dyn CommandRunner>, downloader: Arc<dyn Downloader>) -> Self {
        Self { runner, downloader }
    }

    /// Clones the harness, records the systemtest repository and runs `get.sh`
    ///
    /// # Returns
    /// Path of the cloned harness
    pub async fn fetch(&self, ctx: &mut Context, config: &RunConfiguration) -> Result<PathBuf> {
        let harness_dir = self.clone_harness(ctx, config).await?;
        record_systemtest_repo(ctx, config);

        let get_sh = get_sh_command(ctx, config, &harness_dir);
        ctx.log_info(format!("Running {}", get_sh));
        self.run_checked(&get_sh)
            .await
            .map_err(|e| RunError::fetch("harness sources (get.sh)", e))?;

        Ok(harness_dir)
    }

    async fn clone_harness(&self, ctx: &mut Context, config: &RunConfiguration) -> Result<PathBuf> {
        let harness_dir = ctx.harness_dir();
        let repo = &config.aqa_tests;

        ctx.log_info(format!("Cloning {} into {}", repo, harness_dir.display()));
        let clone = ctx
            .command("git")
            .args(["clone", "--depth", "1", "-b"])
            .arg(repo.branch.as_str())
            .arg(repo.github_url())
            .arg(harness_dir.to_string_lossy())
            .current_dir(&ctx.settings.workspace);

        self.run_checked(&clone)
            .await
            .map_err(|e| RunError::fetch(format!("test repository {}", repo), e))?;

        Ok(harness_dir)
    }

    /// Downloads the dependency bundles into the harness tree
    ///
    /// The test bundle is flattened into `TKG/lib`. When system tests are
    /// selected, the systemtest bundle is unpacked and only its
    /// `systemtest_prereqs` directory is kept.
    pub async fn fetch_dependencies(
        &self,
        ctx: &mut Context,
        config: &RunConfiguration,
        harness_dir: &Path,
    ) -> Result<()> {
        let url = ctx.settings.test_dependency_url.clone();
        let bundle = self.download(ctx, &url).await?;

        // `e` drops the bundle's single top directory
        let lib_dir = harness_dir.join("TKG").join("lib");
        let extract = ctx
            .command(ctx.profile.archive_tool.program())
            .arg("e")
            .arg(bundle.to_string_lossy())
            .arg(format!("-o{}", lib_dir.display()));
        self.run_checked(&extract)
            .await
            .map_err(|e| RunError::fetch("test dependencies", e))?;
        remove_archive(&bundle).await;

        if config.build_list.includes_system() {
            self.fetch_systemtest_dependencies(ctx, harness_dir).await?;
        }

        Ok(())
    }

    async fn fetch_systemtest_dependencies(&self, ctx: &mut Context, harness_dir: &Path) -> Result<()> {
        let url = ctx.settings.systemtest_dependency_url.clone();
        let bundle = self.download(ctx, &url).await?;

        let workspace = ctx.settings.workspace.clone();
        extract_zip(&bundle, &workspace)
            .await
            .map_err(|e| RunError::fetch("systemtest dependencies", e))?;
        remove_archive(&bundle).await;

        let archive_root = workspace.join(SYSTEMTEST_ARCHIVE_ROOT);
        let source = archive_root.join(SYSTEMTEST_PREREQS);
        let target = harness_dir.join(SYSTEMTEST_PREREQS);

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&target)
                .await
                .map_err(|e| RunError::io(format!("Failed to remove {}", target.display()), e))?;
        }
        tokio::fs::rename(&source, &target).await.map_err(|e| {
            RunError::io(
                format!("Failed to move {} to {}", source.display(), target.display()),
                e,
            )
        })?;
        tokio::fs::remove_dir_all(&archive_root)
            .await
            .map_err(|e| RunError::io(format!("Failed to remove {}", archive_root.display()), e))?;

        ctx.log_info(format!("Installed systemtest prerequisites into {}", target.display()));
        Ok(())
    }

    async fn download(&self, ctx: &mut Context, url: &str) -> Result<PathBuf> {
        let dest = ctx.profile.temp_dir.join(format!("{}.zip", Uuid::new_v4()));
        ctx.log_info(format!("Downloading {}", url));
        self.downloader
            .download(url, &dest)
            .await
            .map_err(|e| RunError::fetch(url, e))
    }

    async fn run_checked(&self, spec: &CommandSpec) -> anyhow::Result<()> {
        self.runner.run(spec).await?.ensure_success(spec)?;
        Ok(())
    }
}

/// Exports the systemtest repository for the harness when system tests run
///
/// The harness clones it itself.
pub fn record_systemtest_repo(ctx: &mut Context, config: &RunConfiguration) {
    if !config.build_list.includes_system() {
        return;
    }

    if let Some(systemtests) = &config.aqa_systemtests {
        ctx.env.set(SYSTEMTEST_REPO, systemtests.repo.as_str());
        ctx.env.set(SYSTEMTEST_BRANCH, systemtests.branch.as_str());
    }
}
