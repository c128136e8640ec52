//! Retrieving the document register to a local file

use crate::config::SourceConfig;
use crate::error::{ForepageError, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Something that can place the current register at a local path
pub trait RegisterFetcher {
    /// Write the register to `dest`, creating missing parent directories.
    ///
    /// One attempt only; retrying is up to the caller.
    fn fetch(&self, dest: &Path) -> Result<()>;

    /// Human-readable origin, for messages
    fn describe(&self) -> String;
}

/// Downloads the register over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    pub url: String,
    pub timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            url: url.into(),
            timeout_secs,
        }
    }

    pub fn from_config(source: &SourceConfig) -> Self {
        Self::new(source.url.clone(), source.timeout_secs)
    }
}

impl RegisterFetcher for HttpFetcher {
    fn fetch(&self, dest: &Path) -> Result<()> {
        create_parent_dirs(dest)?;
        let body = download(&self.url, self.timeout_secs)?;
        fs::write(dest, &body).map_err(|e| {
            discard_partial(dest);
            ForepageError::Fetch(format!("{}: {e}", dest.display()))
        })?;
        info!(url = %self.url, dest = %dest.display(), bytes = body.len(), "downloaded register");
        Ok(())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Download the whole body of `url`; non-success statuses are errors
#[cfg(feature = "remote-fetch")]
fn download(url: &str, timeout_secs: u64) -> Result<Vec<u8>> {
    use reqwest::blocking::Client;
    use std::time::Duration;

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ForepageError::Fetch(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| ForepageError::Fetch(e.to_string()))?;

    let body = response
        .bytes()
        .map_err(|e| ForepageError::Fetch(e.to_string()))?;
    Ok(body.to_vec())
}

#[cfg(not(feature = "remote-fetch"))]
fn download(url: &str, _timeout_secs: u64) -> Result<Vec<u8>> {
    Err(ForepageError::Fetch(format!(
        "remote fetching is disabled in this build, cannot download {url}"
    )))
}

/// Copies a register that is already on disk (offline use)
#[derive(Debug, Clone)]
pub struct FileFetcher {
    pub source: PathBuf,
}

impl FileFetcher {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl RegisterFetcher for FileFetcher {
    fn fetch(&self, dest: &Path) -> Result<()> {
        create_parent_dirs(dest)?;
        fs::copy(&self.source, dest).map_err(|e| {
            discard_partial(dest);
            ForepageError::Fetch(format!("{}: {e}", self.source.display()))
        })?;
        info!(source = %self.source.display(), dest = %dest.display(), "copied register");
        Ok(())
    }

    fn describe(&self) -> String {
        self.source.display().to_string()
    }
}

fn create_parent_dirs(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ForepageError::Fetch(format!("{}: {e}", parent.display())))?;
    }
    Ok(())
}

/// Remove whatever a failed write left at `dest`
fn discard_partial(dest: &Path) {
    match fs::remove_file(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dest.display(), error = %e, "failed to remove partial register"),
    }
}

/// `<folder>/<YYYYMMDDHHMMSS>_<suffix>`, unique per scan
pub fn register_path(folder: &Path, now: NaiveDateTime, suffix: &str) -> PathBuf {
    folder.join(format!("{}_{suffix}", now.format("%Y%m%d%H%M%S")))
}

/// The folder the register is downloaded into must exist and be writable
pub fn validate_folder(folder: &Path) -> Result<()> {
    let writable = fs::metadata(folder)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false);
    if writable {
        Ok(())
    } else {
        Err(ForepageError::InvalidFolder(folder.to_path_buf()))
    }
}
