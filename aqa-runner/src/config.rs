//! Runner settings
//!
//! Defines the host-side parameters of a run: where the workspace lives,
//! where Ant is installed and which artifact URLs to download from.

use std::path::PathBuf;

/// Dependency bundle required on the harness library path
pub const TEST_DEPENDENCY_URL: &str = "https://ci.adoptopenjdk.net/view/all/job/test.getDependency/lastSuccessfulBuild/artifact//*zip*/dependents.zip";

/// Dependency bundle required by system tests
pub const SYSTEMTEST_DEPENDENCY_URL: &str = "https://ci.adoptopenjdk.net/view/all/job/systemtest.getDependency/lastSuccessfulBuild/artifact/*zip*/dependents.zip";

/// ant-contrib binary distribution
pub const ANT_CONTRIB_URL: &str = "https://sourceforge.net/projects/ant-contrib/files/ant-contrib/ant-contrib-1.0b2/ant-contrib-1.0b2-bin.zip/download";

/// Cygwin installer for Windows hosts
pub const CYGWIN_INSTALLER_URL: &str = "https://cygwin.com/setup-x86_64.exe";

/// Runner settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory the harness is cloned into
    pub workspace: PathBuf,

    /// Directory the runner was started in; the SDK directory when none is given
    pub working_dir: PathBuf,

    /// Ant installation receiving ant-contrib, from `ANT_HOME`
    pub ant_home: Option<PathBuf>,

    pub test_dependency_url: String,

    pub systemtest_dependency_url: String,

    pub ant_contrib_url: String,

    pub cygwin_installer_url: String,

    /// Cygwin root on Windows hosts; its absence triggers the bootstrap
    pub cygwin_root: PathBuf,
}

impl Settings {
    /// Creates settings with default URLs for the given workspace
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            working_dir: workspace.clone(),
            workspace,
            ant_home: None,
            test_dependency_url: TEST_DEPENDENCY_URL.to_string(),
            systemtest_dependency_url: SYSTEMTEST_DEPENDENCY_URL.to_string(),
            ant_contrib_url: ANT_CONTRIB_URL.to_string(),
            cygwin_installer_url: CYGWIN_INSTALLER_URL.to_string(),
            cygwin_root: PathBuf::from("C:\\cygwin64"),
        }
    }

    /// Creates settings from environment variables
    ///
    /// Environment variables:
    /// - GITHUB_WORKSPACE (optional, default: current directory)
    /// - ANT_HOME (optional)
    /// - AQA_TEST_DEPENDENCY_URL (optional)
    /// - AQA_SYSTEMTEST_DEPENDENCY_URL (optional)
    /// - AQA_ANT_CONTRIB_URL (optional)
    /// - AQA_CYGWIN_INSTALLER_URL (optional)
    /// - AQA_CYGWIN_ROOT (optional, default: C:\cygwin64)
    pub fn from_env() -> anyhow::Result<Self> {
        let working_dir = std::env::current_dir()
            .map_err(|e| anyhow::anyhow!("Failed to read current directory: {}", e))?;
        let workspace = non_empty_var("GITHUB_WORKSPACE")
            .map(PathBuf::from)
            .unwrap_or_else(|| working_dir.clone());

        let mut settings = Self::new(workspace).with_working_dir(working_dir);
        if let Some(ant_home) = non_empty_var("ANT_HOME") {
            settings = settings.with_ant_home(PathBuf::from(ant_home));
        }

        if let Some(url) = non_empty_var("AQA_TEST_DEPENDENCY_URL") {
            settings.test_dependency_url = url;
        }
        if let Some(url) = non_empty_var("AQA_SYSTEMTEST_DEPENDENCY_URL") {
            settings.systemtest_dependency_url = url;
        }
        if let Some(url) = non_empty_var("AQA_ANT_CONTRIB_URL") {
            settings.ant_contrib_url = url;
        }
        if let Some(url) = non_empty_var("AQA_CYGWIN_INSTALLER_URL") {
            settings.cygwin_installer_url = url;
        }
        if let Some(root) = non_empty_var("AQA_CYGWIN_ROOT") {
            settings.cygwin_root = PathBuf::from(root);
        }

        Ok(settings)
    }

    /// Sets the directory an empty SDK directory input falls back to
    pub fn with_working_dir(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = working_dir;
        self
    }

    /// Sets the Ant installation directory
    pub fn with_ant_home(mut self, ant_home: PathBuf) -> Self {
        self.ant_home = Some(ant_home);
        self
    }

    /// Validates the settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workspace.as_os_str().is_empty() {
            anyhow::bail!("workspace cannot be empty");
        }

        for (name, url) in [
            ("test_dependency_url", &self.test_dependency_url),
            ("systemtest_dependency_url", &self.systemtest_dependency_url),
            ("ant_contrib_url", &self.ant_contrib_url),
            ("cygwin_installer_url", &self.cygwin_installer_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
