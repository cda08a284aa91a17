// src/fetch/mod.rs
//! Data source providers. Each call hands back a table snapshot that the
//! caller owns outright; nothing here is shared with a running pipeline.

use crate::process::{load_csv, RawTable};
use anyhow::{Context, Result};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Where the raw table comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A CSV on local disk (root default file or a saved version).
    Local(PathBuf),
    /// Bytes handed over by an upload widget.
    Upload { name: String, bytes: Vec<u8> },
    /// A static CSV served over HTTP.
    Remote(String),
}

impl Source {
    pub fn label(&self) -> String {
        match self {
            Source::Local(p) => p.display().to_string(),
            Source::Upload { name, .. } => name.clone(),
            Source::Remote(u) => u.clone(),
        }
    }
}

/// Parse CSV bytes, whatever their origin.
pub fn table_from_bytes(bytes: &[u8]) -> Result<RawTable> {
    load_csv(Cursor::new(bytes)).context("parsing CSV data")
}

/// Module for reading tables from local files
pub mod local {
    use super::*;
    use std::path::Path;
    use tokio::fs;

    pub async fn read_table(path: impl AsRef<Path>) -> Result<RawTable> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("reading data file {}", path.display()))?;
        let table = table_from_bytes(&bytes)
            .with_context(|| format!("in data file {}", path.display()))?;
        info!(path = %path.display(), rows = table.len(), "read local table");
        Ok(table)
    }
}

/// Module for fetching a remote CSV with a time-boxed cache
pub mod remote {
    use super::*;
    use reqwest::Client;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tracing::debug;
    use url::Url;

    struct Cached {
        fetched_at: Instant,
        table: Arc<RawTable>,
    }

    impl Cached {
        fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
            now.saturating_duration_since(self.fetched_at) < ttl
        }
    }

    /// Download `url` and parse it as CSV.
    pub async fn download_table(client: &Client, url: &Url) -> Result<RawTable> {
        let bytes = client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()?
            .bytes()
            .await
            .with_context(|| format!("reading body from {}", url))?;
        table_from_bytes(&bytes).with_context(|| format!("in CSV from {}", url))
    }

    /// A remote CSV, re-downloaded at most once per `ttl`.
    pub struct RemoteSource {
        client: Client,
        url: Url,
        ttl: Duration,
        cache: Mutex<Option<Cached>>,
    }

    impl RemoteSource {
        pub fn new(client: Client, url: &str, ttl: Duration) -> Result<Self> {
            let url = Url::parse(url).with_context(|| format!("parsing data URL {}", url))?;
            Ok(Self {
                client,
                url,
                ttl,
                cache: Mutex::new(None),
            })
        }

        pub fn url(&self) -> &Url {
            &self.url
        }

        fn cached(&self, now: Instant) -> Option<Arc<RawTable>> {
            let guard = self.cache.lock().ok()?;
            guard
                .as_ref()
                .filter(|c| c.is_fresh(self.ttl, now))
                .map(|c| Arc::clone(&c.table))
        }

        fn store(&self, table: Arc<RawTable>) {
            if let Ok(mut guard) = self.cache.lock() {
                *guard = Some(Cached {
                    fetched_at: Instant::now(),
                    table,
                });
            }
        }

        /// The cached snapshot if still fresh, otherwise a new download.
        #[tracing::instrument(level = "info", skip(self), fields(url = %self.url))]
        pub async fn fetch(&self) -> Result<Arc<RawTable>> {
            if let Some(table) = self.cached(Instant::now()) {
                debug!("remote cache hit");
                return Ok(table);
            }
            let table = Arc::new(download_table(&self.client, &self.url).await?);
            info!(rows = table.len(), "downloaded remote table");
            self.store(Arc::clone(&table));
            Ok(table)
        }

        #[cfg(test)]
        pub(crate) fn prime(&self, table: RawTable) {
            self.store(Arc::new(table));
        }
    }

}

/// Produce a fresh table snapshot from `source`. Remote sources go through
/// `cached` (when it serves the same URL) so repeated calls inside the TTL reuse the last download.
pub async fn load(
    source: &Source,
    cached: Option<&remote::RemoteSource>,
) -> Result<Arc<RawTable>> {
    match source {
        Source::Local(path) => Ok(Arc::new(local::read_table(path).await?)),
        Source::Upload { name, bytes } => {
            let table = table_from_bytes(bytes).with_context(|| format!("in upload {}", name))?;
            Ok(Arc::new(table))
        }
        Source::Remote(url) => {
            let parsed =
                url::Url::parse(url).with_context(|| format!("parsing data URL {}", url))?;
            match cached {
                Some(r) if *r.url() == parsed => r.fetch().await,
                _ => {
                    let client = reqwest::Client::new();
                    Ok(Arc::new(remote::download_table(&client, &parsed).await?))
                }
            }
        }
    }
}
