//! Dependency provisioning
//!
//! Makes sure the tools the harness build needs are installed on the host:
//! - Windows: Cygwin toolchain (best effort) and ant-contrib
//! - macOS: ant-contrib via Homebrew and larger SysV shared memory limits
//! - Linux: ant-contrib and 7-Zip through the detected package manager

use anyhow::Context as AnyhowContext;
use aqa_core::domain::platform::{HostOs, PackageManager};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::context::Context;
use crate::download::{Downloader, extract_zip, remove_archive};
use crate::error::{Result, RunError};
use crate::process::{CommandRunner, CommandSpec};

/// Packages installed into a fresh Cygwin root
pub const CYGWIN_PACKAGES: &str = "wget,bsdtar,rsync,gnupg,git,autoconf,make,gcc-core,mingw64-x86_64-gcc-core,unzip,zip,cpio,curl,grep,perl";

const CYGWIN_MIRROR: &str = "https://mirrors.kernel.org/sourceware/cygwin/";

const SHMALL: &str = "kern.sysv.shmall=655360";
const SHMMAX: &str = "kern.sysv.shmmax=125839605760";

/// Installs build prerequisites for the host platform
pub struct DependencyProvisioner {
    runner: Arc<dyn CommandRunner>,
    downloader: Arc<dyn Downloader>,
}

impl DependencyProvisioner {
    pub fn new(runner: Arc<dyn CommandRunner>, downloader: Arc<dyn Downloader>) -> Self {
        Self { runner, downloader }
    }

    /// Provisions the host
    ///
    /// Only a failed Cygwin bootstrap is downgraded to a warning; every
    /// other failure aborts the run.
    pub async fn ensure(&self, ctx: &mut Context) -> Result<()> {
        match ctx.profile.os {
            HostOs::Windows => {
                let bootstrap = self.bootstrap_cygwin(ctx).await;
                ctx.tolerate(bootstrap)?;
                self.install_ant_contrib(ctx).await
            }
            HostOs::MacOs => {
                self.exec(ctx, "ant-contrib", "brew", &["install", "ant-contrib"])
                    .await?;
                self.exec(ctx, "shared memory limits", "sudo", &["sysctl", "-w", SHMALL])
                    .await?;
                self.exec(ctx, "shared memory limits", "sudo", &["sysctl", "-w", SHMMAX])
                    .await
            }
            HostOs::Linux => self.provision_linux(ctx).await,
        }
    }

    async fn provision_linux(&self, ctx: &mut Context) -> Result<()> {
        match ctx.profile.package_manager {
            PackageManager::Apt => {
                self.exec(ctx, "package index", "sudo", &["apt-get", "update"])
                    .await?;
                self.exec(
                    ctx,
                    "ant-contrib",
                    "sudo",
                    &["apt-get", "install", "ant-contrib", "-y"],
                )
                .await?;
                // apport prompts interactively when tests crash
                self.exec(ctx, "apport shutdown", "sudo", &["service", "apport", "stop"])
                    .await
            }
            PackageManager::Yum => {
                self.exec(ctx, "package index", "sudo", &["yum", "update", "-y"])
                    .await?;
                self.exec(ctx, "p7zip", "sudo", &["yum", "install", "p7zip", "-y"])
                    .await?;
                self.install_ant_contrib(ctx).await
            }
            PackageManager::Apk => {
                self.exec(ctx, "package index", "apk", &["update"]).await?;
                self.exec(ctx, "p7zip", "apk", &["add", "p7zip"]).await?;
                self.install_ant_contrib(ctx).await
            }
            PackageManager::Unknown => {
                ctx.log_warning("No supported package manager found, skipping dependency installation");
                Ok(())
            }
        }
    }

    /// Installs Cygwin when its root directory is missing
    async fn bootstrap_cygwin(&self, ctx: &mut Context) -> Result<()> {
        let root = ctx.settings.cygwin_root.clone();
        if root.exists() {
            ctx.log_debug(format!("Cygwin found at {}", root.display()));
            return Ok(());
        }

        ctx.log_info(format!("Installing Cygwin into {}", root.display()));
        let packages_dir = root.with_file_name("cygwin_packages");
        for dir in [&root, &packages_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))
                .map_err(RunError::Toolchain)?;
        }

        let installer = ctx.profile.temp_dir.join("cygwin.exe");
        self.downloader
            .download(&ctx.settings.cygwin_installer_url, &installer)
            .await
            .map_err(RunError::Toolchain)?;

        let install = ctx
            .command(installer.to_string_lossy())
            .args(["--packages", CYGWIN_PACKAGES])
            .args(["--quiet-mode", "--download", "--local-install", "--delete-orphans"])
            .args(["--site", CYGWIN_MIRROR])
            .arg("--local-package-dir")
            .arg(packages_dir.to_string_lossy())
            .arg("--root")
            .arg(root.to_string_lossy());
        self.run_checked(&install).await.map_err(RunError::Toolchain)?;

        let git = root.join("bin").join("git");
        let autocrlf = ctx
            .command(git.to_string_lossy())
            .args(["config", "--system", "core.autocrlf", "false"]);
        self.run_checked(&autocrlf).await.map_err(RunError::Toolchain)?;

        ctx.env.prepend_path(root.join("bin"));
        Ok(())
    }

    /// Downloads ant-contrib and copies its jar into `$ANT_HOME/lib`
    async fn install_ant_contrib(&self, ctx: &mut Context) -> Result<()> {
        let ant_home = ctx.settings.ant_home.clone().ok_or_else(|| {
            RunError::provision("ant-contrib", anyhow::anyhow!("ANT_HOME is not set"))
        })?;

        let temp = ctx.profile.temp_dir.clone();
        let archive = temp.join(format!("{}.zip", Uuid::new_v4()));
        self.downloader
            .download(&ctx.settings.ant_contrib_url, &archive)
            .await
            .map_err(|e| RunError::provision("ant-contrib", e))?;
        extract_zip(&archive, &temp)
            .await
            .map_err(|e| RunError::provision("ant-contrib", e))?;
        remove_archive(&archive).await;

        let jar = temp.join("ant-contrib").join("lib").join("ant-contrib.jar");
        let lib = ant_home.join("lib");
        tokio::fs::create_dir_all(&lib)
            .await
            .map_err(|e| RunError::io(format!("Failed to create {}", lib.display()), e))?;
        tokio::fs::copy(&jar, lib.join("ant-contrib.jar"))
            .await
            .map_err(|e| RunError::io(format!("Failed to copy {}", jar.display()), e))?;

        ctx.log_info(format!("Installed ant-contrib into {}", lib.display()));
        Ok(())
    }

    async fn exec(&self, ctx: &Context, what: &str, program: &str, args: &[&str]) -> Result<()> {
        let spec = ctx.command(program).args(args.iter().copied());
        info!("Provisioning {}: {}", what, spec);
        self.run_checked(&spec)
            .await
            .map_err(|e| RunError::provision(what, e))
    }

    async fn run_checked(&self, spec: &CommandSpec) -> anyhow::Result<()> {
        self.runner.run(spec).await?.ensure_success(spec)?;
        Ok(())
    }
}
