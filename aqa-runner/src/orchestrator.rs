//! Run orchestration
//!
//! Sequences the stages of a test run against one `Context`:
//! provision → platform spec → build list → JDK (pre-fetch) → sources →
//! JDK (job.properties) → dependency bundles → make → verdict.
//!
//! The orchestrator is the only writer of the execution environment; each
//! stage reads what the earlier ones set.

use aqa_core::domain::config::{RawInputs, RunConfiguration};
use aqa_core::domain::log::LogEntry;
use aqa_core::domain::pipeline::{PipelineResult, RunOutcome, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::context::Context;
use crate::download::Downloader;
use crate::environment::{BUILD_LIST, SPEC};
use crate::error::Result;
use crate::process::CommandRunner;
use crate::service::{DependencyProvisioner, PipelineExecutor, SourceAcquisition, jdk};

/// Summary of one run, handed back to the host task
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    /// `None` when the run stopped before the target ran
    pub verdict: Option<Verdict>,
    /// Variables produced for the harness
    pub environment: BTreeMap<String, String>,
    pub logs: Vec<LogEntry>,
}

/// Drives a test run from raw inputs to a single outcome
pub struct Orchestrator {
    provisioner: DependencyProvisioner,
    source: SourceAcquisition,
    executor: PipelineExecutor,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn CommandRunner>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            provisioner: DependencyProvisioner::new(runner.clone(), downloader.clone()),
            source: SourceAcquisition::new(runner.clone(), downloader),
            executor: PipelineExecutor::new(runner),
        }
    }

    /// Runs the whole pipeline
    ///
    /// Invalid inputs fail the run before any external command runs.
    /// Fatal stage errors end the run with their message attached.
    pub async fn run(&self, ctx: &mut Context, inputs: RawInputs) -> RunReport {
        let started_at = Utc::now();
        info!("Starting run {}", ctx.run_id);

        let (outcome, verdict) = match RunConfiguration::from_inputs(inputs, &ctx.settings.working_dir) {
            Ok(config) => match self.execute(ctx, &config).await {
                Ok(result) => (result.outcome(), Some(result.verdict)),
                Err(e) => {
                    ctx.log_error(format!("Run aborted: {}", e));
                    (RunOutcome::failed(e.to_string()), None)
                }
            },
            Err(e) => {
                ctx.log_error(e.to_string());
                (RunOutcome::failed(e.to_string()), None)
            }
        };

        info!("Run {} finished: {:?}", ctx.run_id, outcome.result);

        RunReport {
            run_id: ctx.run_id,
            started_at,
            finished_at: Utc::now(),
            outcome,
            verdict,
            environment: ctx.env.vars().clone(),
            logs: ctx.drain_logs(),
        }
    }

    async fn execute(&self, ctx: &mut Context, config: &RunConfiguration) -> Result<PipelineResult> {
        self.provisioner.ensure(ctx).await?;

        let build_spec = ctx.profile.build_spec.clone();
        ctx.env.set(SPEC, build_spec);
        ctx.env.set(BUILD_LIST, config.build_list.as_str());

        jdk::locate(ctx, config);

        let harness_dir = self.source.fetch(ctx, config).await?;
        jdk::apply_job_properties(ctx, &harness_dir).await?;
        self.source.fetch_dependencies(ctx, config, &harness_dir).await?;

        Ok(self.executor.run(ctx, config, &harness_dir).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SYSTEMTEST_DEPENDENCY_URL, TEST_DEPENDENCY_URL};
    use crate::environment::{HostEnv, SYSTEMTEST_BRANCH, SYSTEMTEST_REPO, TEST_JDK_HOME};
    use crate::testing::{FakeDownloader, FakeRunner, exit, linux_context, ok, zip_bytes};
    use aqa_core::domain::pipeline::TaskResult;
    use std::path::PathBuf;

    fn inputs(jdksource: &str, build_list: &str) -> RawInputs {
        RawInputs {
            jdksource: jdksource.to_string(),
            build_list: build_list.to_string(),
            target: "_sanity.openjdk".to_string(),
            ..Default::default()
        }
    }

    fn downloader() -> FakeDownloader {
        FakeDownloader::new()
            .serve(TEST_DEPENDENCY_URL, b"PK".to_vec())
            .serve(
                SYSTEMTEST_DEPENDENCY_URL,
                zip_bytes(&[("archive/systemtest_prereqs/mauve/mauve.jar", "mauve")]),
            )
    }

    fn env_of<'a>(report: &'a RunReport, key: &str) -> Option<&'a str> {
        report.environment.get(key).map(String::as_str)
    }

    #[tokio::test]
    async fn test_hosted_jdk_run() {
        let dir = tempfile::tempdir().unwrap();
        let host = HostEnv::from_pairs([("JAVA_HOME_11_X64", "/opt/jdk11")]);
        let mut ctx = linux_context(dir.path(), host);
        let runner = Arc::new(FakeRunner::new());
        let orchestrator = Orchestrator::new(runner.clone(), Arc::new(downloader()));

        let mut raw = inputs("github-hosted", "openjdk");
        raw.version = "11".to_string();
        let report = orchestrator.run(&mut ctx, raw).await;

        assert_eq!(report.outcome.result, TaskResult::Succeeded);
        assert_eq!(report.verdict, Some(Verdict::Success));
        assert_eq!(env_of(&report, TEST_JDK_HOME), Some("/opt/jdk11"));
        assert_eq!(env_of(&report, SPEC), Some("linux_x86-64_cmprssptrs"));
        assert_eq!(env_of(&report, BUILD_LIST), Some("openjdk"));

        let programs: Vec<_> = runner.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, vec!["git", "./get.sh", "7z", "make", "make"]);

        // the final make sees the finished environment
        let target = runner.calls().pop().unwrap();
        assert!(target.envs.contains(&(TEST_JDK_HOME.to_string(), "/opt/jdk11".to_string())));
        assert!(target.envs.contains(&(BUILD_LIST.to_string(), "openjdk".to_string())));
    }

    #[tokio::test]
    async fn test_system_run_records_repo_and_fetches_prereqs() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let downloader = Arc::new(downloader());
        let orchestrator = Orchestrator::new(Arc::new(FakeRunner::new()), downloader.clone());

        let mut raw = inputs("nightly", "system");
        raw.aqa_systemtests_repo = "org/systest:dev".to_string();
        let report = orchestrator.run(&mut ctx, raw).await;

        assert_eq!(report.outcome.result, TaskResult::Succeeded);
        assert_eq!(env_of(&report, SYSTEMTEST_REPO), Some("org/systest"));
        assert_eq!(env_of(&report, SYSTEMTEST_BRANCH), Some("dev"));
        assert_eq!(
            downloader.fetched(),
            vec![TEST_DEPENDENCY_URL, SYSTEMTEST_DEPENDENCY_URL]
        );
        assert!(ctx.harness_dir().join("systemtest_prereqs/mauve/mauve.jar").exists());
    }

    #[tokio::test]
    async fn test_custom_target_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::new());
        let orchestrator = Orchestrator::new(runner.clone(), Arc::new(downloader()));

        let mut raw = inputs("customized", "functional");
        raw.target = "customtarget".to_string();
        raw.custom_target = "MyOption".to_string();
        orchestrator.run(&mut ctx, raw).await;

        let lines = runner.command_lines();
        assert_eq!(lines.last().unwrap(), "make customtarget CUSTOMTARGET_TARGET=MyOption");
    }

    #[tokio::test]
    async fn test_job_properties_override_last_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let harness = ctx.harness_dir();
        std::fs::create_dir_all(&harness).unwrap();
        std::fs::write(
            harness.join(jdk::JOB_PROPERTIES),
            "TEST_JDK_HOME=/a\nTEST_JDK_HOME=/b\n",
        )
        .unwrap();

        let orchestrator = Orchestrator::new(Arc::new(FakeRunner::new()), Arc::new(downloader()));
        let report = orchestrator.run(&mut ctx, inputs("nightly", "openjdk")).await;

        assert_eq!(env_of(&report, TEST_JDK_HOME), Some("/b"));
    }

    #[tokio::test]
    async fn test_empty_sdkdir_uses_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        ctx.settings.working_dir = PathBuf::from("/home/runner/start");

        let orchestrator = Orchestrator::new(Arc::new(FakeRunner::new()), Arc::new(downloader()));
        let report = orchestrator.run(&mut ctx, inputs("nightly", "openjdk")).await;

        assert_eq!(
            env_of(&report, TEST_JDK_HOME),
            Some("/home/runner/start/openjdkbinary/j2sdk-image")
        );
    }

    #[tokio::test]
    async fn test_build_list_validation() {
        let dir = tempfile::tempdir().unwrap();

        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::new());
        let orchestrator = Orchestrator::new(runner.clone(), Arc::new(downloader()));
        let report = orchestrator.run(&mut ctx, inputs("nightly", "externalFoo")).await;
        assert_eq!(report.outcome.result, TaskResult::Succeeded);
        assert!(!runner.calls().is_empty());

        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::new());
        let downloader = Arc::new(downloader());
        let orchestrator = Orchestrator::new(runner.clone(), downloader.clone());
        let report = orchestrator.run(&mut ctx, inputs("nightly", "bogus")).await;

        assert_eq!(report.outcome.result, TaskResult::Failed);
        assert!(report.outcome.message.as_deref().unwrap().contains("bogus"));
        assert_eq!(report.verdict, None);
        assert!(runner.calls().is_empty());
        assert!(downloader.fetched().is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["result"], "Failed");
        assert!(json["verdict"].is_null());
        assert_eq!(json["logs"][0]["level"], "Error");
    }

    #[tokio::test]
    async fn test_failed_tests_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::with_handler(|spec| {
            if spec.program == "make" && spec.subcommand() != Some("compile") {
                exit(2, "FAILED test targets:\n\tjdk_math_0")
            } else {
                ok("")
            }
        }));
        let orchestrator = Orchestrator::new(runner, Arc::new(downloader()));

        let report = orchestrator.run(&mut ctx, inputs("nightly", "openjdk")).await;

        assert_eq!(report.outcome.result, TaskResult::Failed);
        assert_eq!(report.outcome.message.as_deref(), Some("There are failed tests"));
        assert_eq!(report.verdict, Some(Verdict::TestFailuresDetected));
    }

    #[tokio::test]
    async fn test_clone_failure_aborts_before_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::with_handler(|spec| {
            if spec.program == "git" {
                exit(128, "fatal: repository not found")
            } else {
                ok("")
            }
        }));
        let orchestrator = Orchestrator::new(runner.clone(), Arc::new(downloader()));

        let report = orchestrator.run(&mut ctx, inputs("nightly", "openjdk")).await;

        assert_eq!(report.outcome.result, TaskResult::Failed);
        assert!(report.outcome.message.as_deref().unwrap().contains("adoptium/aqa-tests:master"));
        assert_eq!(runner.command_lines().len(), 1);
    }
}
