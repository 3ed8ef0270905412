//! Platform profile
//!
//! Maps the host operating system to the build specification tag the test
//! harness expects, the temp directory convention, and the package manager
//! available on the host. Resolved once per run and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostOs {
    Windows,
    MacOs,
    Linux,
}

impl HostOs {
    /// Maps an OS identifier to a family
    ///
    /// Accepts both Rust (`windows`, `macos`) and Node style (`win32`,
    /// `darwin`) names. Anything else is treated as Linux.
    pub fn from_identifier(id: &str) -> Self {
        match id {
            "windows" | "win32" => HostOs::Windows,
            "macos" | "darwin" => HostOs::MacOs,
            _ => HostOs::Linux,
        }
    }

    /// The OS this binary was built for
    pub fn current() -> Self {
        Self::from_identifier(std::env::consts::OS)
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, HostOs::Windows)
    }

    /// Build specification tag consumed by the harness as `SPEC`
    pub fn build_spec(&self) -> &'static str {
        match self {
            HostOs::Windows => "win_x86-64_cmprssptrs",
            HostOs::MacOs => "osx_x86-64_cmprssptrs",
            HostOs::Linux => "linux_x86-64_cmprssptrs",
        }
    }
}

impl std::fmt::Display for HostOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostOs::Windows => write!(f, "windows"),
            HostOs::MacOs => write!(f, "darwin"),
            HostOs::Linux => write!(f, "linux"),
        }
    }
}

/// Package manager found on a Linux host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageManager {
    Apt,
    Yum,
    Apk,
    Unknown,
}

impl PackageManager {
    pub const APT_GET: &'static str = "/usr/bin/apt-get";
    pub const YUM: &'static str = "/usr/bin/yum";
    pub const APK: &'static str = "/sbin/apk";

    /// Detects the package manager by probing for its binary
    ///
    /// Probes are checked in the order apt, yum, apk.
    pub fn detect(exists: impl Fn(&Path) -> bool) -> Self {
        if exists(Path::new(Self::APT_GET)) {
            PackageManager::Apt
        } else if exists(Path::new(Self::YUM)) {
            PackageManager::Yum
        } else if exists(Path::new(Self::APK)) {
            PackageManager::Apk
        } else {
            PackageManager::Unknown
        }
    }
}

/// 7-Zip executable available on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveTool {
    SevenZ,
    /// RPM hosts ship the standalone `7za`
    SevenZa,
}

impl ArchiveTool {
    /// `7za` whenever yum is installed, even next to apt
    pub fn detect(exists: impl Fn(&Path) -> bool) -> Self {
        if exists(Path::new(PackageManager::YUM)) {
            ArchiveTool::SevenZa
        } else {
            ArchiveTool::SevenZ
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            ArchiveTool::SevenZ => "7z",
            ArchiveTool::SevenZa => "7za",
        }
    }
}

impl From<PackageManager> for ArchiveTool {
    fn from(package_manager: PackageManager) -> Self {
        match package_manager {
            PackageManager::Yum => ArchiveTool::SevenZa,
            _ => ArchiveTool::SevenZ,
        }
    }
}

/// Per-process platform profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub os: HostOs,
    /// Value for the `SPEC` variable
    pub build_spec: String,
    /// Scratch directory for downloads and extraction
    pub temp_dir: PathBuf,
    pub package_manager: PackageManager,
    pub archive_tool: ArchiveTool,
}

impl PlatformProfile {
    /// Resolves the profile for `os`
    ///
    /// # Arguments
    /// * `os` - Host OS family
    /// * `runner_temp` - Value of `RUNNER_TEMP`, used as-is when non-empty
    /// * `user_profile` - Value of `USERPROFILE`, the Windows base directory
    /// * `package_manager` - Detected package manager
    pub fn resolve(
        os: HostOs,
        runner_temp: Option<&str>,
        user_profile: Option<&str>,
        package_manager: PackageManager,
    ) -> Self {
        let temp_dir = match runner_temp.filter(|t| !t.is_empty()) {
            Some(temp) => PathBuf::from(temp),
            None => Self::base_dir(os, user_profile).join("actions").join("temp"),
        };

        Self {
            os,
            build_spec: os.build_spec().to_string(),
            temp_dir,
            package_manager,
            archive_tool: package_manager.into(),
        }
    }

    /// Overrides the archive tool derived from the package manager
    pub fn with_archive_tool(mut self, archive_tool: ArchiveTool) -> Self {
        self.archive_tool = archive_tool;
        self
    }

    fn base_dir(os: HostOs, user_profile: Option<&str>) -> PathBuf {
        match os {
            HostOs::Windows => {
                PathBuf::from(user_profile.filter(|p| !p.is_empty()).unwrap_or("C:\\"))
            }
            HostOs::MacOs => PathBuf::from("/Users"),
            HostOs::Linux => PathBuf::from("/home"),
        }
    }
}
