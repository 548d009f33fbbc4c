//! End-to-end tests for preparing and running WhiteboxTools against a fake
//! executable.

#![cfg(unix)]

mod common;

use common::*;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use wbt_runner::{
    list_tools, prepare_wbt, tool_parameters, whitebox_tools, PrepareOptions, ToolChain, WbtError,
    WhiteboxConfig, LOCK_FILE,
};

fn hydro_chain() -> ToolChain {
    ToolChain::new()
        .with("BreachDepressions", ["-i=dem.tif", "--fill_pits", "-o=dem_corr.tif"])
        .with("D8Pointer", ["-i=dem_corr.tif", "-o=fdir.tif"])
        .with("ExtractStreams", ["--flow_accum=fdir.tif", "--threshold=10", "-o=streams.shp"])
}

#[test]
#[serial]
fn test_prepare_from_local_zip() {
    let dir = tempfile::tempdir().unwrap();
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let zip_path = dir.path().join("cache").join("wbt.zip");
    write_fake_release(&zip_path);
    let wbt_root = dir.path().join("WBT");
    let options = PrepareOptions {
        zip_path: Some(zip_path.clone()),
        ..PrepareOptions::new(&wbt_root)
    };

    let version = prepare_wbt(&options);
    let leftover_tmp: Vec<String> = file_names(dir.path())
        .into_iter()
        .filter(|n| n.starts_with("wbt_"))
        .collect();
    std::env::set_current_dir(previous).unwrap();

    assert_eq!(version.unwrap(), FAKE_VERSION);
    assert!(wbt_root.join("whitebox_tools").exists());
    assert!(!wbt_root.join("readme.txt").exists());
    assert!(!wbt_root.join(LOCK_FILE).exists());
    assert!(zip_path.exists(), "a user-supplied archive is kept");
    assert!(leftover_tmp.is_empty(), "temporary directory removed: {:?}", leftover_tmp);

    // Second run reuses the installed executable without the archive.
    fs::remove_file(&zip_path).unwrap();
    assert_eq!(prepare_wbt(&options).unwrap(), FAKE_VERSION);
}

#[test]
#[serial]
fn test_prepare_rejects_invalid_zip() {
    let dir = tempfile::tempdir().unwrap();
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let zip_path = dir.path().join("wbt.zip");
    fs::write(&zip_path, b"<html>not found</html>").unwrap();
    let options = PrepareOptions {
        zip_path: Some(zip_path.clone()),
        max_attempts: 1,
        ..PrepareOptions::new(dir.path().join("WBT"))
    };

    let result = prepare_wbt(&options);
    std::env::set_current_dir(previous).unwrap();

    assert!(matches!(result, Err(WbtError::PrepareFailed { attempts: 1 })));
    assert!(!zip_path.exists(), "a broken archive is deleted");
}

#[test]
fn test_save_selected_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let src = make_src_dir(dir.path());
    let save = dir.path().join("results");
    let wbt_root = dir.path().join("WBT");
    install_fake_wbt(&wbt_root);

    let config = WhiteboxConfig::new(&src, hydro_chain())
        .files_to_save(["fdir.tif", "streams.shp"])
        .save_dir(&save)
        .wbt_root(&wbt_root);
    whitebox_tools(&config).unwrap();

    assert_eq!(
        file_names(&save),
        vec!["fdir.tif", "streams.dbf", "streams.prj", "streams.shp", "streams.shx"]
    );
    assert_eq!(file_names(&src), vec!["calls.log", "dem.tif"]);

    let calls = fs::read_to_string(src.join("calls.log")).unwrap();
    let runs: Vec<&str> = calls
        .lines()
        .map(|l| l.split_whitespace().next().unwrap())
        .collect();
    assert_eq!(
        runs,
        vec!["--run=BreachDepressions", "--run=D8Pointer", "--run=ExtractStreams"]
    );
    assert!(calls.contains("--compress_rasters=false --max_procs=-1"));
}

#[test]
fn test_move_all_outputs_without_selection() {
    let dir = tempfile::tempdir().unwrap();
    let src = make_src_dir(dir.path());
    let save = dir.path().join("results");
    let wbt_root = dir.path().join("WBT");
    install_fake_wbt(&wbt_root);

    // An older copy in save_dir gets replaced.
    fs::create_dir_all(&save).unwrap();
    fs::write(save.join("fdir.tif"), b"stale").unwrap();

    let config = WhiteboxConfig::new(&src, hydro_chain())
        .save_dir(&save)
        .wbt_root(&wbt_root);
    whitebox_tools(&config).unwrap();

    assert_eq!(
        file_names(&save),
        vec![
            "dem_corr.tif",
            "fdir.tif",
            "streams.dbf",
            "streams.prj",
            "streams.shp",
            "streams.shx"
        ]
    );
    assert_ne!(fs::read(save.join("fdir.tif")).unwrap(), b"stale");
    assert_eq!(file_names(&src), vec!["calls.log", "dem.tif"]);
}

#[test]
fn test_same_dir_deletes_unselected_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let src = make_src_dir(dir.path());
    let wbt_root = dir.path().join("WBT");
    install_fake_wbt(&wbt_root);

    let config = WhiteboxConfig::new(&src, hydro_chain())
        .files_to_save(["fdir.tif"])
        .save_dir(&src)
        .wbt_root(&wbt_root);
    whitebox_tools(&config).unwrap();

    assert_eq!(file_names(&src), vec!["calls.log", "dem.tif", "fdir.tif"]);
}

#[test]
fn test_same_dir_keeps_everything_without_selection() {
    let dir = tempfile::tempdir().unwrap();
    let src = make_src_dir(dir.path());
    let wbt_root = dir.path().join("WBT");
    install_fake_wbt(&wbt_root);

    let config = WhiteboxConfig::new(&src, hydro_chain())
        .save_dir(&src)
        .wbt_root(&wbt_root);
    whitebox_tools(&config).unwrap();

    assert_eq!(file_names(&src).len(), 8);
}

#[test]
fn test_failure_removes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let src = make_src_dir(dir.path());
    let save = dir.path().join("results");
    let wbt_root = dir.path().join("WBT");
    install_fake_wbt(&wbt_root);

    let chain = ToolChain::new()
        .with("Slope", ["-i=dem.tif", "-o=slope.tif"])
        .with("Fail", ["-i=slope.tif", "-o=never.tif"]);
    let config = WhiteboxConfig::new(&src, chain)
        .save_dir(&save)
        .wbt_root(&wbt_root);
    let err = whitebox_tools(&config).unwrap_err();

    match err {
        WbtError::ToolFailed { tool, stderr } => {
            assert_eq!(tool, "Fail");
            assert!(stderr.contains("tool crashed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(file_names(&src), vec!["calls.log", "dem.tif"]);
    assert!(file_names(&save).is_empty());
}

#[test]
fn test_missing_file_to_save() {
    let dir = tempfile::tempdir().unwrap();
    let src = make_src_dir(dir.path());
    let wbt_root = dir.path().join("WBT");
    install_fake_wbt(&wbt_root);

    let chain = ToolChain::new().with("Slope", ["-i=dem.tif", "-o=slope.tif"]);
    let config = WhiteboxConfig::new(&src, chain)
        .files_to_save(["aspect.tif"])
        .save_dir(dir.path().join("results"))
        .wbt_root(&wbt_root);
    let err = whitebox_tools(&config).unwrap_err();

    assert!(matches!(err, WbtError::OutputNotFound(ref p) if p.ends_with("aspect.tif")));
}

#[test]
fn test_breach_least_cost_runs_single_process() {
    let dir = tempfile::tempdir().unwrap();
    let src = make_src_dir(dir.path());
    let wbt_root = dir.path().join("WBT");
    install_fake_wbt(&wbt_root);

    let chain =
        ToolChain::new().with("BreachDepressionsLeastCost", ["-i=dem.tif", "-o=breached.tif"]);
    let config = WhiteboxConfig::new(&src, chain)
        .save_dir(&src)
        .max_procs(8)
        .compress_rasters(true)
        .wbt_root(&wbt_root);
    whitebox_tools(&config).unwrap();

    let calls = fs::read_to_string(src.join("calls.log")).unwrap();
    assert!(calls.contains("--compress_rasters=true --max_procs=1"));
    assert!(src.join("breached.tif").exists());
}

#[test]
fn test_empty_chain_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = WhiteboxConfig::new(dir.path(), ToolChain::new()).wbt_root(dir.path().join("WBT"));
    assert!(matches!(whitebox_tools(&config), Err(WbtError::InvalidConfig(_))));
}

#[test]
fn test_list_tools_and_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let wbt_root: PathBuf = dir.path().join("WBT");
    install_fake_wbt(&wbt_root);

    let tools = list_tools(&wbt_root, None).unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools["D8Pointer"], "Calculates a D8 flow pointer raster.");

    let params = tool_parameters("Slope", &wbt_root, None).unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].flags, vec!["-i", "--dem"]);
    assert!(!params[0].optional);
}
