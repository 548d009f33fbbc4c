//! # wbt-runner
//!
//! Download, cache and drive the [WhiteboxTools](https://www.whiteboxgeo.com)
//! command-line executable.
//!
//! The terrain analysis itself happens inside the pre-compiled
//! `whitebox_tools` binary. This crate takes care of everything around it:
//!
//! - picking the release for the current platform, downloading and
//!   extracting it once per `wbt_root` (guarded by a lock file so parallel
//!   processes do not race)
//! - running a chain of tools in a working directory with shared flags
//! - keeping the outputs the caller asked for and removing intermediates,
//!   or removing every declared output when a tool fails
//!
//! ## Example
//!
//! ```no_run
//! use wbt_runner::{whitebox_tools, ToolChain, WhiteboxConfig};
//!
//! let chain = ToolChain::new()
//!     .with("BreachDepressions", ["-i=dem.tif", "--fill_pits", "-o=dem_corr.tif"])
//!     .with("D8Pointer", ["-i=dem_corr.tif", "-o=fdir.tif"])
//!     .with("D8FlowAccumulation", ["-i=fdir.tif", "--pntr", "-o=d8accum.tif"]);
//!
//! let config = WhiteboxConfig::new("data", chain)
//!     .files_to_save(["d8accum.tif"])
//!     .save_dir("results");
//! whitebox_tools(&config)?;
//! # Ok::<(), wbt_runner::WbtError>(())
//! ```
//!
//! The `wbt` binary runs the same thing from a TOML file (see [`config`]).

mod api;
pub mod config;
mod error;
mod install;
mod invoke;
mod lock;
mod platform;
mod session;

pub use api::{list_tools, tool_parameters, whitebox_tools, ToolParameter, WhiteboxConfig};
pub use config::{load_config, parse_config};
pub use error::WbtError;
pub use install::{exe_path, prepare_wbt, PrepareOptions, LOCK_FILE};
pub use invoke::{query_version, run_command, run_tool, tool_args, RunSettings};
pub use lock::SoftFileLock;
pub use platform::{Platform, PlatformSuffix, System};
pub use session::{Session, ToolCall, ToolChain};

/// Result type for WhiteboxTools operations.
pub type Result<T> = std::result::Result<T, WbtError>;
