//! JDK location
//!
//! Decides which JDK the harness tests and records it as `TEST_JDK_HOME`.
//! Runs twice: once before the harness is fetched, and once after, when the
//! harness may have installed a JDK itself and written its path to
//! `job.properties`.

use aqa_core::domain::config::{JdkSource, RunConfiguration};
use aqa_core::domain::platform::HostOs;
use aqa_core::domain::properties;
use std::path::Path;

use crate::context::Context;
use crate::environment::{HostEnv, TEST_JDK_HOME};
use crate::error::{Result, RunError};

/// Properties file the harness writes at its repository root
pub const JOB_PROPERTIES: &str = "job.properties";

/// Looks up the JDK for `source` in the host environment
///
/// `JAVA_HOME_<version>_X64` is preferred over `JAVA_HOME`; for
/// `install-jdk`, `JDK_<version>` is preferred instead. On Windows, hosted
/// JDK paths get the short `Progra~1` form since make cannot handle the
/// space in `Program Files`.
pub fn resolve_from_host(
    host: &HostEnv,
    os: HostOs,
    version: &str,
    source: JdkSource,
) -> Option<String> {
    let java_home = host.get("JAVA_HOME");

    let resolved = match source {
        JdkSource::InstallJdk => host.get(&format!("JDK_{}", version)).or(java_home),
        _ => host
            .get(&format!("JAVA_HOME_{}_X64", version))
            .or(java_home),
    }?;

    if os.is_windows() && source == JdkSource::GithubHosted {
        Some(resolved.replace("Program Files", "Progra~1"))
    } else {
        Some(resolved.to_string())
    }
}

/// Default JDK location inside the SDK directory
pub fn default_jdk_home(sdk_dir: &str) -> String {
    format!("{}/openjdkbinary/j2sdk-image", sdk_dir)
}

/// Sets `TEST_JDK_HOME` before the harness is fetched
///
/// A value already present always wins. When the source needs a JDK from
/// the environment and none is found, the error is logged and an empty
/// `TEST_JDK_HOME` is carried forward.
///
/// # Returns
/// The value of `TEST_JDK_HOME` after this pass
pub fn locate(ctx: &mut Context, config: &RunConfiguration) -> String {
    if let Some(preset) = ctx.env.get(TEST_JDK_HOME) {
        let preset = preset.to_string();
        ctx.log_debug(format!("Using preset TEST_JDK_HOME={}", preset));
        return preset;
    }

    let located = if config.jdk_source.resolves_from_env() {
        match resolve_from_host(&ctx.host, ctx.profile.os, &config.version, config.jdk_source) {
            Some(home) => home,
            None => {
                // TODO: decide whether a missing JDK should abort the run instead
                ctx.log_error("JDK could not be found");
                String::new()
            }
        }
    } else {
        default_jdk_home(&config.sdk_dir)
    };

    ctx.log_info(format!("TEST_JDK_HOME={}", located));
    ctx.env.set(TEST_JDK_HOME, located.clone());
    located
}

/// Overrides `TEST_JDK_HOME` from the harness's `job.properties`, if any
pub async fn apply_job_properties(ctx: &mut Context, harness_dir: &Path) -> Result<()> {
    let file = harness_dir.join(JOB_PROPERTIES);

    let content = match tokio::fs::read_to_string(&file).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(RunError::io(format!("Failed to read {}", file.display()), e)),
    };

    if let Some(home) = properties::test_jdk_home(&content) {
        ctx.log_debug(format!("Reset TEST_JDK_HOME to {}", home));
        ctx.env.set(TEST_JDK_HOME, home);
    }

    Ok(())
}
