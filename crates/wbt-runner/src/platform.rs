//! Platform detection for picking the right WhiteboxTools build.

use crate::{Result, WbtError};
use std::fmt;

const BASE_URL: &str = "https://www.whiteboxgeo.com";

/// Operating systems with a WhiteboxTools release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum System {
    Windows,
    Darwin,
    Linux,
}

impl System {
    pub fn as_str(self) -> &'static str {
        match self {
            System::Windows => "Windows",
            System::Darwin => "Darwin",
            System::Linux => "Linux",
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suffix of the release archive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSuffix {
    WinAmd64,
    DarwinMSeries,
    DarwinAmd64,
    LinuxAmd64,
    LinuxMusl,
}

impl PlatformSuffix {
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformSuffix::WinAmd64 => "win_amd64",
            PlatformSuffix::DarwinMSeries => "darwin_m_series",
            PlatformSuffix::DarwinAmd64 => "darwin_amd64",
            PlatformSuffix::LinuxAmd64 => "linux_amd64",
            PlatformSuffix::LinuxMusl => "linux_musl",
        }
    }
}

impl fmt::Display for PlatformSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub system: System,
    pub suffix: PlatformSuffix,
}

impl Platform {
    /// Platform of the running process.
    pub fn detect() -> Result<Self> {
        Self::from_parts(
            std::env::consts::OS,
            std::env::consts::ARCH,
            cfg!(target_env = "musl"),
        )
    }

    /// Map an OS/arch pair (as in `std::env::consts`) to a release.
    pub fn from_parts(os: &str, arch: &str, musl: bool) -> Result<Self> {
        let (system, suffix) = match os {
            "windows" => (System::Windows, PlatformSuffix::WinAmd64),
            "macos" if arch == "aarch64" => (System::Darwin, PlatformSuffix::DarwinMSeries),
            "macos" => (System::Darwin, PlatformSuffix::DarwinAmd64),
            "linux" if musl => (System::Linux, PlatformSuffix::LinuxMusl),
            "linux" => (System::Linux, PlatformSuffix::LinuxAmd64),
            other => return Err(WbtError::UnsupportedPlatform(other.to_string())),
        };
        Ok(Self { system, suffix })
    }

    /// Name of the executable inside the `WBT` directory.
    pub fn exe_name(&self) -> &'static str {
        match self.system {
            System::Windows => "whitebox_tools.exe",
            _ => "whitebox_tools",
        }
    }

    /// File name of the release archive.
    pub fn archive_name(&self) -> String {
        format!("WhiteboxTools_{}.zip", self.suffix)
    }

    pub fn download_url(&self) -> String {
        format!("{}/WBT_{}/{}", BASE_URL, self.system, self.archive_name())
    }
}
