//! Versioned storage for uploaded data files.
//!
//! Every upload is written as `penjualan_<YYYY-MM-DD_HH-MM>.csv` into one
//! folder. Two uploads within the same minute share a name; the later one
//! wins. The selection list puts the root-level default file first (when it
//! exists), then saved versions newest first.

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use glob::{glob, Pattern};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

pub const VERSION_PREFIX: &str = "penjualan_";

pub struct VersionStore {
    dir: PathBuf,
    default_file: PathBuf,
}

/// File name an upload received at `at` is stored under.
pub fn version_name(at: NaiveDateTime) -> String {
    format!("{}{}.csv", VERSION_PREFIX, at.format("%Y-%m-%d_%H-%M"))
}

impl VersionStore {
    /// Open the store at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, default_file: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating versions directory {}", dir.display()))?;
        Ok(Self {
            dir,
            default_file: default_file.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist uploaded bytes as a new version and return its path.
    pub fn save_upload(&self, bytes: &[u8], at: NaiveDateTime) -> Result<PathBuf> {
        let path = self.dir.join(version_name(at));
        if path.exists() {
            warn!(path = %path.display(), "overwriting version saved in the same minute");
        }
        fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "saved upload");
        Ok(path)
    }

    /// Saved file names, newest first.
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = Pattern::escape(&self.dir.to_string_lossy());
        let pattern = format!("{}/*", dir);
        let mut names = Vec::new();
        for entry in glob(&pattern).context("invalid glob pattern for versions")? {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!("cannot read versions entry: {:?}", e);
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|f| f.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    fn default_label(&self) -> Option<String> {
        if !self.default_file.is_file() {
            return None;
        }
        Some(self.default_file.display().to_string())
    }

    /// Everything the user can pick from: default file first, then versions.
    pub fn options(&self) -> Result<Vec<String>> {
        let mut opts: Vec<String> = self.default_label().into_iter().collect();
        opts.extend(self.list()?);
        Ok(opts)
    }

    /// The file behind a selection. With no selection, the first option.
    pub fn resolve(&self, choice: Option<&str>) -> Result<PathBuf> {
        let choice = match choice {
            Some(c) => c.to_string(),
            None => match self.options()?.into_iter().next() {
                Some(first) => first,
                None => bail!("no data file available yet; upload a CSV first"),
            },
        };
        if Some(&choice) == self.default_label().as_ref() {
            return Ok(self.default_file.clone());
        }
        let path = self.dir.join(&choice);
        if !path.is_file() {
            bail!("data version `{}` not found in {}", choice, self.dir.display());
        }
        Ok(path)
    }
}
