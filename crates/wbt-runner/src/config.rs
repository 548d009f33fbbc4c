//! TOML configuration files for the `wbt` binary.
//!
//! ```toml
//! src_dir = "data"
//! files_to_save = ["streams.shp"]
//! save_dir = "results"
//!
//! [arg_dict]
//! BreachDepressions = ["-i=dem.tif", "--fill_pits", "-o=dem_corr.tif"]
//! D8Pointer = ["-i=dem_corr.tif", "-o=fdir.tif"]
//! ```
//!
//! Tools run in the order they appear in `arg_dict`. Relative paths are
//! resolved against the current directory, not the config file.

use crate::api::WhiteboxConfig;
use crate::session::ToolChain;
use crate::{Result, WbtError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct ConfigFile {
    src_dir: Option<PathBuf>,
    arg_dict: Option<toml::Value>,
    files_to_save: Option<Vec<String>>,
    save_dir: Option<PathBuf>,
    wbt_root: Option<PathBuf>,
    compress_rasters: Option<bool>,
    zip_path: Option<PathBuf>,
    refresh_download: Option<bool>,
    max_procs: Option<i32>,
    verbose: Option<bool>,
}

/// Read and validate a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<WhiteboxConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(WbtError::ConfigNotFound(path.to_path_buf()));
    }
    parse_config(&fs::read_to_string(path)?)
}

/// Parse configuration text.
pub fn parse_config(text: &str) -> Result<WhiteboxConfig> {
    let file: ConfigFile = toml::from_str(text)?;

    let src_dir = file
        .src_dir
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or(WbtError::MissingConfigKeys)?;
    let arg_dict: ToolChain = match file.arg_dict {
        Some(table @ toml::Value::Table(_)) => table
            .try_into()
            .map_err(|e| WbtError::InvalidConfig(format!("arg_dict: {e}")))?,
        _ => return Err(WbtError::MissingConfigKeys),
    };

    let mut config = WhiteboxConfig::new(src_dir, arg_dict);
    config.files_to_save = file.files_to_save;
    config.zip_path = file.zip_path;
    if let Some(save_dir) = file.save_dir {
        config.save_dir = save_dir;
    }
    if let Some(wbt_root) = file.wbt_root {
        config.wbt_root = wbt_root;
    }
    if let Some(compress) = file.compress_rasters {
        config.compress_rasters = compress;
    }
    if let Some(refresh) = file.refresh_download {
        config.refresh_download = refresh;
    }
    if let Some(max_procs) = file.max_procs {
        config.max_procs = max_procs;
    }
    if let Some(verbose) = file.verbose {
        config.verbose = verbose;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            src_dir = "data"
            files_to_save = ["streams.shp", "fdir.tif"]
            save_dir = "results"
            wbt_root = "tools/WBT"
            compress_rasters = true
            zip_path = "cache/wbt.zip"
            refresh_download = true
            max_procs = 2
            verbose = true

            [arg_dict]
            D8Pointer = ["-i=dem_corr.tif", "-o=fdir.tif"]
            BreachDepressions = ["-i=dem.tif", "--fill_pits", "-o=dem_corr.tif"]
            "#,
        )
        .unwrap();

        assert_eq!(config.src_dir, PathBuf::from("data"));
        assert_eq!(config.save_dir, PathBuf::from("results"));
        assert_eq!(config.wbt_root, PathBuf::from("tools/WBT"));
        assert_eq!(config.zip_path, Some(PathBuf::from("cache/wbt.zip")));
        assert!(config.compress_rasters && config.refresh_download && config.verbose);
        assert_eq!(config.max_procs, 2);
        assert_eq!(config.files_to_save.as_ref().unwrap().len(), 2);

        let names: Vec<&str> = config.arg_dict.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["D8Pointer", "BreachDepressions"]);
    }

    #[test]
    fn test_defaults() {
        let config = parse_config(
            r#"
            src_dir = "data"
            [arg_dict]
            Slope = ["-i=dem.tif", "-o=slope.tif"]
            "#,
        )
        .unwrap();
        assert_eq!(config.save_dir, PathBuf::from("."));
        assert_eq!(config.wbt_root, PathBuf::from("WBT"));
        assert_eq!(config.max_procs, -1);
        assert!(config.files_to_save.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_missing_keys() {
        let msg = "The TOML file must define 'src_dir' and 'arg_dict'.";
        let no_src = parse_config("[arg_dict]\nSlope = []\n").unwrap_err();
        assert_eq!(no_src.to_string(), msg);

        let no_args = parse_config("src_dir = \"data\"\n").unwrap_err();
        assert_eq!(no_args.to_string(), msg);

        let not_table = parse_config("src_dir = \"data\"\narg_dict = [\"Slope\"]\n").unwrap_err();
        assert_eq!(not_table.to_string(), msg);

        let empty_src = parse_config("src_dir = \"\"\n[arg_dict]\nSlope = []\n").unwrap_err();
        assert_eq!(empty_src.to_string(), msg);
    }

    #[test]
    fn test_invalid_toml() {
        let err = parse_config("src_dir = \"data\n").unwrap_err();
        assert!(err.to_string().starts_with("Invalid TOML file:"));

        let err = parse_config("src_dir = \"data\"\n[arg_dict]\nSlope = 3\n").unwrap_err();
        assert!(matches!(err, WbtError::InvalidConfig(_)));
    }

    #[test]
    fn test_file_not_found() {
        let err = load_config("no/such/config.toml").unwrap_err();
        assert_eq!(err.to_string(), "File not found: no/such/config.toml");
    }
}
