//! Working-directory session around a chain of tool calls.
//!
//! A session runs every tool in the source directory, then decides which of
//! the files the chain declared as outputs (`-o=` / `--output=` arguments)
//! survive:
//!
//! | save_dir      | files_to_save | result |
//! |---------------|---------------|--------|
//! | != src_dir    | listed        | listed files moved, other outputs deleted |
//! | != src_dir    | none          | all outputs moved |
//! | == src_dir    | listed        | unlisted outputs deleted |
//! | == src_dir    | none          | everything kept |
//!
//! If any tool fails, all declared outputs are deleted from the source
//! directory before the error is returned.

use crate::install::remove_if_exists;
use crate::invoke::{run_tool, RunSettings};
use crate::{Result, WbtError};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const SHAPEFILE_SIDECARS: [&str; 3] = ["dbf", "prj", "shx"];

/// One tool invocation: the tool name and its own arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub args: Vec<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Files named by `-o=` or `--output...=` arguments.
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.args
            .iter()
            .filter(|arg| arg.starts_with("-o=") || arg.starts_with("--output"))
            .filter_map(|arg| arg.split_once('=').map(|(_, value)| value))
            .filter(|value| !value.is_empty())
    }
}

/// Ordered list of tool calls, run in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolChain {
    calls: Vec<ToolCall>,
}

impl ToolChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tool call.
    pub fn push<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        args: impl IntoIterator<Item = S>,
    ) {
        self.calls
            .push(ToolCall::new(name, args.into_iter().map(Into::into).collect()));
    }

    /// Builder form of [`ToolChain::push`].
    pub fn with<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        args: impl IntoIterator<Item = S>,
    ) -> Self {
        self.push(name, args);
        self
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ToolCall> {
        self.calls.iter()
    }

    /// Every output file the chain declares, shapefile sidecars included.
    pub fn declared_outputs(&self) -> BTreeSet<String> {
        let mut outputs = BTreeSet::new();
        for output in self.calls.iter().flat_map(ToolCall::outputs) {
            outputs.extend(with_sidecars(output));
        }
        outputs
    }
}

impl<'a> IntoIterator for &'a ToolChain {
    type Item = &'a ToolCall;
    type IntoIter = std::slice::Iter<'a, ToolCall>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.iter()
    }
}

impl<K, V, S> FromIterator<(K, V)> for ToolChain
where
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut chain = ToolChain::new();
        for (name, args) in iter {
            chain.push(name, args);
        }
        chain
    }
}

/// Deserializes from a table of tool name to argument list, keeping the
/// table's order.
impl<'de> Deserialize<'de> for ToolChain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ChainVisitor;

        impl<'de> Visitor<'de> for ChainVisitor {
            type Value = ToolChain;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of tool names to argument lists")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<ToolChain, A::Error> {
                let mut chain = ToolChain::new();
                while let Some((name, args)) = map.next_entry::<String, Vec<String>>()? {
                    chain.push(name, args);
                }
                Ok(chain)
            }
        }

        deserializer.deserialize_map(ChainVisitor)
    }
}

/// `name` plus `.dbf`/`.prj`/`.shx` siblings when it is a shapefile.
fn with_sidecars(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string()];
    if let Some(stem) = name.strip_suffix(".shp") {
        names.extend(SHAPEFILE_SIDECARS.iter().map(|ext| format!("{stem}.{ext}")));
    }
    names
}

/// A working-directory session.
#[derive(Debug, Clone)]
pub struct Session {
    src_dir: PathBuf,
    save_dir: PathBuf,
    files_to_save: Option<Vec<String>>,
    version: String,
}

impl Session {
    pub fn new(
        src_dir: impl Into<PathBuf>,
        save_dir: impl Into<PathBuf>,
        files_to_save: Option<Vec<String>>,
        version: impl Into<String>,
    ) -> Self {
        let files_to_save = files_to_save.map(|files| {
            let mut expanded: Vec<String> = Vec::with_capacity(files.len());
            for name in files.iter().flat_map(|f| with_sidecars(f)) {
                if !expanded.contains(&name) {
                    expanded.push(name);
                }
            }
            expanded
        });
        Self {
            src_dir: src_dir.into(),
            save_dir: save_dir.into(),
            files_to_save,
            version: version.into(),
        }
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Files kept after the session, sidecars included.
    pub fn files_to_save(&self) -> Option<&[String]> {
        self.files_to_save.as_deref()
    }

    /// Run the chain and clean up the working directory.
    pub fn run(self, chain: &ToolChain, exe: &Path, settings: &RunSettings) -> Result<()> {
        info!(
            "Starting WhiteboxTools session with source directory: {}",
            display_abs(&self.src_dir)
        );
        let outputs = chain.declared_outputs();

        for call in chain {
            if let Err(e) = run_tool(exe, call, settings, &self.src_dir, &self.version) {
                self.remove_outputs(outputs.iter());
                info!("Deleted all intermediate files.");
                error!("An error occurred: {}", e);
                return Err(e);
            }
        }

        self.cleanup(&outputs)?;
        info!(
            "Completed WhiteboxTools session with source directory: {}",
            display_abs(&self.src_dir)
        );
        Ok(())
    }

    fn cleanup(&self, outputs: &BTreeSet<String>) -> Result<()> {
        if !same_dir(&self.src_dir, &self.save_dir) {
            fs::create_dir_all(&self.save_dir)?;
            match &self.files_to_save {
                Some(files) => {
                    for file in files {
                        let source = self.src_dir.join(file);
                        if !source.exists() {
                            error!("Output file to save {} not found", source.display());
                            return Err(WbtError::OutputNotFound(source));
                        }
                        let destination = self.save_dir.join(file);
                        move_file(&source, &destination)?;
                        info!(
                            "Moved output file {} to {}",
                            source.display(),
                            destination.display()
                        );
                    }
                    self.remove_outputs(outputs.iter());
                    info!("Deleted remaining intermediate files.");
                }
                None => {
                    for file in outputs {
                        let source = self.src_dir.join(file);
                        if !source.exists() {
                            debug!("Declared output {} was not produced", source.display());
                            continue;
                        }
                        move_file(&source, &self.save_dir.join(file))?;
                    }
                }
            }
        } else if let Some(files) = &self.files_to_save {
            let intermediate = outputs.iter().filter(|f| !files.contains(f));
            for file in intermediate {
                remove_if_exists(&self.src_dir.join(file))?;
                info!("Deleted intermediate file {}", file);
            }
        }
        Ok(())
    }

    /// Delete outputs from the source directory, logging failures.
    fn remove_outputs<'a>(&self, outputs: impl Iterator<Item = &'a String>) {
        for file in outputs {
            let path = self.src_dir.join(file);
            if let Err(e) = remove_if_exists(&path) {
                warn!("Failed to delete {}: {}", path.display(), e);
            }
        }
    }
}

/// Move a file, replacing the destination and falling back to copy+remove
/// when a rename is not possible (e.g. across file systems).
fn move_file(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    remove_if_exists(destination)?;
    if let Err(e) = fs::rename(source, destination) {
        debug!("rename {} failed ({}), copying instead", source.display(), e);
        fs::copy(source, destination)?;
        fs::remove_file(source)?;
    }
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn display_abs(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
