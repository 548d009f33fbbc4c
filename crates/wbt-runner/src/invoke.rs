//! Running the WhiteboxTools executable.

use crate::session::ToolCall;
use crate::{Result, WbtError};
use regex::Regex;
use std::path::Path;
use std::process::{Command, Output};
use tracing::{debug, error, info, warn};

/// Tools that crash or hang when run with more than one process.
const SINGLE_PROCESS_TOOLS: [&str; 2] =
    ["BreachDepressionsLeastCost", "breach_depressions_least_cost"];

const VERSION_PATTERN: &str = r"WhiteboxTools v(\d+\.\d+\.\d+)";

/// Global flags passed to every tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub compress_rasters: bool,
    /// `-1` lets WhiteboxTools use all cores.
    pub max_procs: i32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            compress_rasters: false,
            max_procs: -1,
        }
    }
}

/// Command-line arguments (without the executable) for one tool call.
pub fn tool_args(call: &ToolCall, settings: &RunSettings, work_dir: &Path) -> Vec<String> {
    let mut max_procs = settings.max_procs;
    if SINGLE_PROCESS_TOOLS.contains(&call.name.as_str()) {
        warn!("Forcing BreachDepressionsLeastCost to use a single process.");
        warn!(
            "In WBT v2.4.0, BreachDepressionsLeastCost is unstable, for now, it is \
             recommended to use BreachDepressions instead. For more information, see:\n\
             https://github.com/jblindsay/whitebox-tools/issues/418\n\
             https://github.com/jblindsay/whitebox-tools/issues/416\n\
             https://github.com/jblindsay/whitebox-tools/issues/407"
        );
        max_procs = 1;
    }

    let mut args = vec![
        format!("--run={}", call.name),
        format!("--wd={}", work_dir.display()),
        format!("--compress_rasters={}", settings.compress_rasters),
        format!("--max_procs={}", max_procs),
    ];
    args.extend(call.args.iter().cloned());
    args
}

/// Run one tool in `work_dir` and return its stdout.
///
/// A non-zero exit status becomes [`WbtError::ToolFailed`] carrying stderr.
pub fn run_tool(
    exe: &Path,
    call: &ToolCall,
    settings: &RunSettings,
    work_dir: &Path,
    version: &str,
) -> Result<String> {
    let args = tool_args(call, settings, work_dir);
    info!("Running WhiteboxTools version: {}", version);
    info!("Command: {} {}", exe.display(), args.join(" "));

    let output = Command::new(exe).args(&args).output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        error!("WhiteboxTools error output:\n{}", stderr);
        error!("Error running WhiteboxTools {}", call.name);
        return Err(WbtError::ToolFailed {
            tool: call.name.clone(),
            stderr,
        });
    }
    info!("WhiteboxTools output:\n{}", stdout);
    Ok(stdout)
}

/// Run the executable with plain arguments (`--listtools`, ...) and return stdout.
pub fn run_command(exe: &Path, args: &[&str]) -> Result<String> {
    debug!("Command: {} {}", exe.display(), args.join(" "));
    let output = Command::new(exe).args(args).output()?;
    if !output.status.success() {
        return Err(WbtError::ToolFailed {
            tool: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Version reported by `exe --version`, or `"unknown"` if it does not say.
pub fn query_version(exe: &Path) -> Result<String> {
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .map_err(|e| WbtError::VersionQuery(format!("{}: {}", exe.display(), e)))?;
    if !output.status.success() {
        return Err(WbtError::VersionQuery(format_failure(&output)));
    }
    parse_version(&String::from_utf8_lossy(&output.stdout))
}

fn parse_version(stdout: &str) -> Result<String> {
    let re = Regex::new(VERSION_PATTERN).map_err(|e| WbtError::VersionQuery(e.to_string()))?;
    Ok(re
        .captures(stdout.trim())
        .and_then(|c| c.get(1))
        .map_or_else(|| "unknown".to_string(), |m| m.as_str().to_string()))
}

fn format_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{} {}", output.status, stderr.trim())
}
