//! Shared fixtures: a fake `whitebox_tools` shell script that understands
//! just enough of the real command line to exercise the runner.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

pub const FAKE_VERSION: &str = "2.4.0";

/// Writes every `-o=`/`--output=` target into `--wd` (plus shapefile
/// sidecars) and appends its argv to `calls.log`. `--run=Fail` exits 1.
pub const FAKE_WBT: &str = r#"#!/bin/sh
wd="."
for arg in "$@"; do
  case "$arg" in
    --version)
      echo "WhiteboxTools v2.4.0 (c) Dr. John Lindsay 2017-2023"
      exit 0 ;;
    --listtools)
      printf 'All 2 Available Tools:\nSlope: Calculates slope gradient from a DEM.\nD8Pointer: Calculates a D8 flow pointer raster.\n'
      exit 0 ;;
    --toolparameters=*)
      echo '{"parameters": [{"name": "Input DEM File", "flags": ["-i", "--dem"], "description": "Input raster DEM file.", "parameter_type": {"ExistingFile": "Raster"}, "default_value": null, "optional": false}]}'
      exit 0 ;;
    --run=Fail)
      echo "tool crashed" >&2
      exit 1 ;;
    --wd=*)
      wd="${arg#--wd=}" ;;
  esac
done
echo "$*" >> "$wd/calls.log"
for arg in "$@"; do
  case "$arg" in
    -o=*|--output=*)
      out="${arg#*=}"
      echo "$*" > "$wd/$out"
      case "$out" in
        *.shp)
          stem="${out%.shp}"
          for ext in dbf prj shx; do : > "$wd/$stem.$ext"; done ;;
      esac ;;
  esac
done
echo "Elapsed Time: 0.1s"
"#;

/// Install the fake executable straight into `wbt_root`.
pub fn install_fake_wbt(wbt_root: &Path) -> PathBuf {
    fs::create_dir_all(wbt_root).unwrap();
    let exe = wbt_root.join("whitebox_tools");
    fs::write(&exe, FAKE_WBT).unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
    exe
}

/// A release-style archive holding the fake executable.
pub fn write_fake_release(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().unix_permissions(0o755);
    zip.start_file("WhiteboxTools_linux_amd64/WBT/whitebox_tools", options)
        .unwrap();
    zip.write_all(FAKE_WBT.as_bytes()).unwrap();
    zip.start_file("WhiteboxTools_linux_amd64/readme.txt", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"WhiteboxTools").unwrap();
    zip.finish().unwrap();
}

/// A source directory containing `dem.tif`.
pub fn make_src_dir(root: &Path) -> PathBuf {
    let src = root.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("dem.tif"), b"dem").unwrap();
    src
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
