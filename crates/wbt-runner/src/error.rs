//! Error types for the WhiteboxTools runner.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing or running WhiteboxTools.
#[derive(Debug, Error)]
pub enum WbtError {
    /// I/O error on the working directory, archive or executable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error while downloading the archive.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The download server answered with an error status.
    #[error("Failed to download {url}: {reason}")]
    Download {
        /// Requested URL.
        url: String,
        /// Status or transport failure.
        reason: String,
    },

    /// The archive is not a valid zip file or lacks the `WBT` directory.
    #[error("Invalid WhiteboxTools archive {path}: {reason}")]
    InvalidArchive {
        /// Archive on disk.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The archive could not be read or unpacked.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// No prebuilt release exists for this OS or architecture.
    #[error("Unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    /// Another process held the install lock for too long.
    #[error("Timed out waiting for lock {0}")]
    LockTimeout(PathBuf),

    /// Download or extraction kept failing.
    #[error("Failed to prepare WhiteboxTools after {attempts} attempts.")]
    PrepareFailed {
        /// Number of attempts made.
        attempts: u32,
    },

    /// `whitebox_tools --version` could not be run or failed.
    #[error("Error running WhiteboxTools: {0}")]
    VersionQuery(String),

    /// A tool exited with a non-zero status; carries its stderr.
    #[error("WhiteboxTools {tool} failed: {stderr}")]
    ToolFailed {
        /// Tool name as given in the chain.
        tool: String,
        /// Captured standard error of the tool.
        stderr: String,
    },

    /// A file listed in `files_to_save` was not produced.
    #[error("Output file to save {} not found", .0.display())]
    OutputNotFound(PathBuf),

    /// The tool chain or a configuration value is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file does not exist.
    #[error("File not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file is not valid TOML.
    #[error("Invalid TOML file: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// `src_dir` or the `arg_dict` table is missing.
    #[error("The TOML file must define 'src_dir' and 'arg_dict'.")]
    MissingConfigKeys,

    /// `--toolparameters` output could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
