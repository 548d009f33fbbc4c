//! High-level entry points: run a tool chain, list tools, describe a tool.

use crate::install::{exe_path, prepare_wbt, PrepareOptions};
use crate::invoke::{run_command, RunSettings};
use crate::session::{Session, ToolChain};
use crate::{Result, WbtError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Everything [`whitebox_tools`] needs to run a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteboxConfig {
    /// Working directory holding the inputs; tool arguments refer to files
    /// by name relative to it.
    pub src_dir: PathBuf,
    pub arg_dict: ToolChain,
    /// Outputs to keep. `None` keeps every output.
    pub files_to_save: Option<Vec<String>>,
    pub save_dir: PathBuf,
    pub wbt_root: PathBuf,
    pub compress_rasters: bool,
    pub zip_path: Option<PathBuf>,
    pub refresh_download: bool,
    pub max_procs: i32,
    pub verbose: bool,
}

impl WhiteboxConfig {
    pub fn new(src_dir: impl Into<PathBuf>, arg_dict: ToolChain) -> Self {
        Self {
            src_dir: src_dir.into(),
            arg_dict,
            files_to_save: None,
            save_dir: PathBuf::from("."),
            wbt_root: PathBuf::from("WBT"),
            compress_rasters: false,
            zip_path: None,
            refresh_download: false,
            max_procs: -1,
            verbose: false,
        }
    }

    pub fn files_to_save<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files_to_save = Some(files.into_iter().map(Into::into).collect());
        self
    }

    pub fn save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn wbt_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wbt_root = dir.into();
        self
    }

    pub fn compress_rasters(mut self, compress: bool) -> Self {
        self.compress_rasters = compress;
        self
    }

    pub fn zip_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.zip_path = Some(path.into());
        self
    }

    pub fn refresh_download(mut self, refresh: bool) -> Self {
        self.refresh_download = refresh;
        self
    }

    pub fn max_procs(mut self, max_procs: i32) -> Self {
        self.max_procs = max_procs;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Reject chains WhiteboxTools could not run.
    pub fn validate(&self) -> Result<()> {
        if self.arg_dict.is_empty() {
            return Err(WbtError::InvalidConfig("arg_dict must name at least one tool".into()));
        }
        if self.arg_dict.iter().any(|call| call.name.trim().is_empty()) {
            return Err(WbtError::InvalidConfig("tool names in arg_dict must not be empty".into()));
        }
        Ok(())
    }

    fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            wbt_root: self.wbt_root.clone(),
            zip_path: self.zip_path.clone(),
            refresh_download: self.refresh_download,
            ..PrepareOptions::default()
        }
    }

    fn run_settings(&self) -> RunSettings {
        RunSettings {
            compress_rasters: self.compress_rasters,
            max_procs: self.max_procs,
        }
    }
}

/// Run a chain of WhiteboxTools tools in `src_dir`.
///
/// Prepares (downloads if needed) the executable, runs every tool in order
/// and then moves or deletes outputs according to `files_to_save` and
/// `save_dir`. On failure all declared outputs are removed and the tool's
/// stderr is returned in [`WbtError::ToolFailed`].
///
/// Log verbosity is up to the installed `tracing` subscriber; `verbose` is
/// read by the `wbt` binary when it sets one up.
pub fn whitebox_tools(config: &WhiteboxConfig) -> Result<()> {
    config.validate()?;
    fs::create_dir_all(&config.save_dir)?;

    let version = prepare_wbt(&config.prepare_options())?;
    let exe = exe_path(&config.wbt_root)?;

    let session = Session::new(
        &config.src_dir,
        &config.save_dir,
        config.files_to_save.clone(),
        version,
    );
    session.run(&config.arg_dict, &exe, &config.run_settings())
}

/// Description of one tool parameter as reported by `--toolparameters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub flags: Vec<String>,
    pub description: String,
    /// Raw parameter type, e.g. `{"ExistingFile": "Raster"}` or `"Boolean"`.
    pub parameter_type: serde_json::Value,
    pub default_value: Option<String>,
    pub optional: bool,
}

#[derive(Debug, Deserialize)]
struct ToolParameters {
    parameters: Vec<ToolParameter>,
}

/// Names and one-line descriptions of every available tool.
pub fn list_tools(
    wbt_root: impl Into<PathBuf>,
    zip_path: Option<PathBuf>,
) -> Result<BTreeMap<String, String>> {
    let stdout = run_query(wbt_root.into(), zip_path, "--listtools")?;
    Ok(parse_tool_list(&stdout))
}

/// Parameters accepted by `tool_name`.
pub fn tool_parameters(
    tool_name: &str,
    wbt_root: impl Into<PathBuf>,
    zip_path: Option<PathBuf>,
) -> Result<Vec<ToolParameter>> {
    let stdout = run_query(wbt_root.into(), zip_path, &format!("--toolparameters={tool_name}"))?;
    parse_tool_parameters(&stdout)
}

fn run_query(wbt_root: PathBuf, zip_path: Option<PathBuf>, arg: &str) -> Result<String> {
    let options = PrepareOptions {
        wbt_root,
        zip_path,
        ..PrepareOptions::default()
    };
    let version = prepare_wbt(&options)?;
    info!("Querying WhiteboxTools {} with {}", version, arg);
    run_command(&exe_path(&options.wbt_root)?, &[arg])
}

/// Skip the header line, then split `Name: description` lines.
fn parse_tool_list(stdout: &str) -> BTreeMap<String, String> {
    stdout
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, description)| (name.trim().to_string(), description.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn parse_tool_parameters(stdout: &str) -> Result<Vec<ToolParameter>> {
    let parsed: ToolParameters = serde_json::from_str(stdout.trim())?;
    Ok(parsed.parameters)
}
