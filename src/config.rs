use crate::pipeline::ReportOptions;
use crate::process::ColumnMapping;
use crate::stock::DEFAULT_LOW_STOCK_THRESHOLD;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder that uploaded files are versioned into.
    pub versions_dir: PathBuf,
    /// Root-level data file offered ahead of saved versions when it exists.
    pub default_file: PathBuf,
    /// Static CSV to fetch instead of a local file.
    pub remote_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub low_stock_threshold: i64,
    pub top_n: usize,
    pub columns: ColumnMapping,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            versions_dir: PathBuf::from("data_versions"),
            default_file: PathBuf::from("penjualan.csv"),
            remote_url: None,
            cache_ttl_secs: 600,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            top_n: 10,
            columns: ColumnMapping::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(text).context("parsing settings YAML")?;
        Ok(settings)
    }

    /// Read settings from `path`. A missing file means defaults; a file that
    /// exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file; using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings = Self::from_yaml(&text)
            .with_context(|| format!("in settings file {}", path.display()))?;
        debug!(?settings, "loaded settings");
        Ok(settings)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            top_n: self.top_n,
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}
