//! Download, extract and cache the WhiteboxTools executable.

use crate::invoke::query_version;
use crate::lock::SoftFileLock;
use crate::platform::Platform;
use crate::{Result, WbtError};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Lock file created inside `wbt_root` while preparing.
pub const LOCK_FILE: &str = ".wbt_lock";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Options for [`prepare_wbt`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareOptions {
    /// Directory the `WBT` folder of the release is copied into.
    pub wbt_root: PathBuf,
    /// Keep the downloaded archive here instead of a temporary directory.
    /// The extension is forced to `.zip`.
    pub zip_path: Option<PathBuf>,
    /// Download and extract again even if an executable is present.
    pub refresh_download: bool,
    pub max_attempts: u32,
    /// How long to wait for another process preparing the same `wbt_root`.
    pub lock_timeout: Option<Duration>,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            wbt_root: PathBuf::from("WBT"),
            zip_path: None,
            refresh_download: false,
            max_attempts: 3,
            lock_timeout: None,
        }
    }
}

impl PrepareOptions {
    pub fn new(wbt_root: impl Into<PathBuf>) -> Self {
        Self {
            wbt_root: wbt_root.into(),
            ..Self::default()
        }
    }
}

/// Path of the executable inside `wbt_root` for this platform.
pub fn exe_path(wbt_root: &Path) -> Result<PathBuf> {
    Ok(wbt_root.join(Platform::detect()?.exe_name()))
}

/// Make sure WhiteboxTools is installed in `wbt_root` and return its version.
///
/// Only one process prepares a given `wbt_root` at a time; others wait on
/// the lock file and then reuse the installed executable.
pub fn prepare_wbt(options: &PrepareOptions) -> Result<String> {
    let platform = Platform::detect()?;
    fs::create_dir_all(&options.wbt_root)?;
    let _lock = SoftFileLock::acquire(options.wbt_root.join(LOCK_FILE), options.lock_timeout)?;

    for attempt in 1..=options.max_attempts {
        match attempt_prepare(&platform, options) {
            Ok(version) => return Ok(version),
            Err(e) => {
                warn!("{}", e);
                warn!("Attempt {}/{} failed, retrying...", attempt, options.max_attempts);
            }
        }
    }
    Err(WbtError::PrepareFailed {
        attempts: options.max_attempts,
    })
}

fn attempt_prepare(platform: &Platform, options: &PrepareOptions) -> Result<String> {
    let wbt_root = &options.wbt_root;
    let exe = wbt_root.join(platform.exe_name());
    if exe.exists() && !options.refresh_download {
        info!("Using existing WhiteboxTools executable: {}", exe.display());
        return query_version(&exe).inspect_err(|e| warn!("Existing executable is invalid: {}", e));
    }

    clear_dir(wbt_root)?;
    let tmp = tempfile::Builder::new().prefix("wbt_").tempdir_in(".")?;

    let archive = match &options.zip_path {
        Some(path) => path.with_extension("zip"),
        None => tmp.path().join(platform.archive_name()),
    };
    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if options.refresh_download {
        remove_if_exists(&archive)?;
    }
    if !archive.exists() {
        download(&platform.download_url(), &archive)?;
    }

    let result =
        extract(&archive, wbt_root, tmp.path(), platform).and_then(|_| query_version(&exe));
    if let Err(e) = &result {
        warn!("Extraction failed: {}", e);
        remove_if_exists(&archive)?;
        clear_dir(wbt_root)?;
    }
    result
}

/// Download `url` to `dest`, removing a partial file on failure.
fn download(url: &str, dest: &Path) -> Result<()> {
    info!("Downloading WhiteboxTools from {}", url);
    let result = (|| -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        let mut response = client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(WbtError::Download {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }
        let mut writer = BufWriter::new(File::create(dest)?);
        response.copy_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    })();
    if result.is_err() {
        remove_if_exists(dest)?;
    }
    result
}

/// Unpack the release archive and copy its `WBT` directory into `wbt_root`.
fn extract(archive: &Path, wbt_root: &Path, tmp: &Path, platform: &Platform) -> Result<()> {
    let invalid = |reason: String| WbtError::InvalidArchive {
        path: archive.to_path_buf(),
        reason,
    };
    let mut zip = zip::ZipArchive::new(File::open(archive)?)
        .map_err(|e| invalid(format!("not a valid zip file ({e})")))?;
    zip.extract(tmp).map_err(|e| invalid(e.to_string()))?;

    let wbt_dir = find_wbt_dir(tmp)?
        .ok_or_else(|| invalid("no WhiteboxTools*/WBT directory".into()))?;
    copy_dir_all(&wbt_dir, wbt_root)?;

    #[cfg(unix)]
    make_executable(&wbt_root.join(platform.exe_name()))?;
    #[cfg(not(unix))]
    let _ = platform;

    info!("Extracted WhiteboxTools to {}", wbt_root.display());
    Ok(())
}

/// First `WhiteboxTools*/WBT` directory under `dir`.
fn find_wbt_dir(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("WhiteboxTools"))
        .map(|entry| entry.path().join("WBT"))
        .filter(|path| path.is_dir())
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Remove everything in `dir` except the lock file.
fn clear_dir(dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        if entry.file_name() == LOCK_FILE {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
