//! runaqa
//!
//! Runs the AQA test harness against a JDK as a single CI task step.
//!
//! Task inputs come from flags or from the `INPUT_*` variables the host
//! pipeline exports. The process exits non-zero when the run fails.

mod report;

use anyhow::{Context as AnyhowContext, Result};
use aqa_core::domain::config::RawInputs;
use aqa_runner::config::Settings;
use aqa_runner::download::HttpDownloader;
use aqa_runner::environment::HostEnv;
use aqa_runner::process::SystemCommandRunner;
use aqa_runner::{Context, Orchestrator};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "runaqa")]
#[command(about = "Run AQA tests against a JDK", long_about = None)]
struct Cli {
    /// Where the JDK under test comes from
    #[arg(long, env = "INPUT_JDKSOURCE", default_value = "upstream")]
    jdksource: String,

    /// Download URL of the JDK when jdksource is customized
    #[arg(long, env = "INPUT_CUSTOMIZEDSDKURL", default_value = "")]
    customized_sdk_url: String,

    /// Directory the SDK is installed into
    #[arg(long, env = "INPUT_SDKDIR", default_value = "")]
    sdkdir: String,

    /// JDK version, required for github-hosted and install-jdk
    #[arg(long, env = "INPUT_VERSION", default_value = "")]
    version: String,

    /// Test group to build (openjdk, external, functional, perf, system)
    #[arg(long, env = "INPUT_BUILD_LIST", default_value = "openjdk")]
    build_list: String,

    /// make target to run
    #[arg(long, env = "INPUT_TARGET", default_value = "_jdk_custom")]
    target: String,

    /// Value for the custom target option
    #[arg(long, env = "INPUT_CUSTOM_TARGET", default_value = "")]
    custom_target: String,

    /// Test harness repository as owner/repo:branch
    #[arg(long, env = "INPUT_AQA-TESTSREPO", default_value = "")]
    aqa_tests_repo: String,

    /// Systemtest repository as owner/repo:branch
    #[arg(long, env = "INPUT_AQA-SYSTEMTESTSREPO", default_value = "")]
    aqa_systemtests_repo: String,

    /// OpenJ9 repository as owner/repo:branch
    #[arg(long, env = "INPUT_OPENJ9_REPO", default_value = "")]
    openj9_repo: String,

    /// TKG repository as owner/repo:branch
    #[arg(long, env = "INPUT_TKG_REPO", default_value = "")]
    tkg_repo: String,

    #[arg(long, env = "INPUT_VENDOR_TESTREPOS", default_value = "")]
    vendor_test_repos: String,

    #[arg(long, env = "INPUT_VENDOR_TESTBRANCHES", default_value = "")]
    vendor_test_branches: String,

    #[arg(long, env = "INPUT_VENDOR_TESTDIRS", default_value = "")]
    vendor_test_dirs: String,

    #[arg(long, env = "INPUT_VENDOR_TESTSHAS", default_value = "")]
    vendor_test_shas: String,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn inputs(&self) -> RawInputs {
        RawInputs {
            jdksource: self.jdksource.clone(),
            customized_sdk_url: self.customized_sdk_url.clone(),
            sdkdir: self.sdkdir.clone(),
            version: self.version.clone(),
            build_list: self.build_list.clone(),
            target: self.target.clone(),
            custom_target: self.custom_target.clone(),
            aqa_tests_repo: self.aqa_tests_repo.clone(),
            aqa_systemtests_repo: self.aqa_systemtests_repo.clone(),
            openj9_repo: self.openj9_repo.clone(),
            tkg_repo: self.tkg_repo.clone(),
            vendor_test_repos: self.vendor_test_repos.clone(),
            vendor_test_branches: self.vendor_test_branches.clone(),
            vendor_test_dirs: self.vendor_test_dirs.clone(),
            vendor_test_shas: self.vendor_test_shas.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aqa_runner=info,aqa_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = load_settings()?;
    info!("Using workspace {}", settings.workspace.display());

    let mut ctx = Context::for_current_host(settings, HostEnv::capture());
    info!(
        "Platform: {:?} ({}), temp dir {}",
        ctx.profile.os,
        ctx.profile.build_spec,
        ctx.profile.temp_dir.display()
    );

    let orchestrator = Orchestrator::new(Arc::new(SystemCommandRunner), Arc::new(HttpDownloader::new()));
    let run = orchestrator.run(&mut ctx, cli.inputs()).await;

    report::print_summary(&run);
    if let Some(path) = &cli.report {
        report::write_json(&run, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if run.outcome.is_failure() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Loads runner settings from the environment
fn load_settings() -> Result<Settings> {
    let settings = Settings::from_env().context("Failed to load settings from environment")?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_to_inputs() {
        let cli = Cli::try_parse_from([
            "runaqa",
            "--jdksource",
            "github-hosted",
            "--version",
            "11",
            "--build-list",
            "system",
            "--aqa-systemtests-repo",
            "org/systest:dev",
            "--vendor-test-shas",
            "abc123",
        ])
        .unwrap();

        let inputs = cli.inputs();
        assert_eq!(inputs.jdksource, "github-hosted");
        assert_eq!(inputs.version, "11");
        assert_eq!(inputs.build_list, "system");
        assert_eq!(inputs.aqa_systemtests_repo, "org/systest:dev");
        assert_eq!(inputs.vendor_test_shas, "abc123");
        assert!(cli.report.is_none());
    }
}
