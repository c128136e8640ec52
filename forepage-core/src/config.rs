//! Configuration system for the forepage pipeline

use crate::error::{ForepageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Export link of the shared document register
pub const DEFAULT_REGISTER_URL: &str = "https://docs.google.com/spreadsheets/d/1Uvt9HNpA0THgVv42bu8ye-7Zif6VttwyJJ24ywZZk80/export?format=xlsx&id=1Uvt9HNpA0THgVv42bu8ye-7Zif6VttwyJJ24ywZZk80";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForepageConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub layout: ColumnLayout,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub period: PeriodConfig,
}

impl ForepageConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ForepageError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ForepageError::Config(e.to_string()))
    }

    /// Validate values that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        let url = self.source.url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ForepageError::Config(format!(
                "source url must be http(s), got '{url}'"
            )));
        }
        if self.source.file_suffix.trim().is_empty() {
            return Err(ForepageError::Config(
                "source file_suffix must not be empty".to_string(),
            ));
        }

        // Column letters must parse and point at distinct columns
        let mut seen: HashMap<u32, &str> = HashMap::new();
        for (field, letters) in self.layout.named_columns() {
            let index = column_index(letters).ok_or_else(|| {
                ForepageError::Config(format!(
                    "invalid column '{letters}' for layout.{field}"
                ))
            })?;
            if let Some(other) = seen.insert(index, field) {
                return Err(ForepageError::Config(format!(
                    "layout.{field} and layout.{other} both use column '{letters}'"
                )));
            }
        }

        if self.layout.suffix_len == 0 {
            return Err(ForepageError::Config(
                "layout.suffix_len must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Where the register comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Downloaded file is named `<timestamp>_<file_suffix>`
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
            file_suffix: default_file_suffix(),
        }
    }
}

/// Fixed column positions of the register (no header row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnLayout {
    #[serde(default = "default_title_col")]
    pub title: String,
    #[serde(default = "default_identifier_col")]
    pub identifier: String,
    #[serde(default = "default_version_col")]
    pub version: String,
    #[serde(default = "default_submitter_col")]
    pub submitter: String,
    #[serde(default = "default_date_col")]
    pub date: String,
    /// Characters stripped from the end of the identifier (".pdf")
    #[serde(default = "default_suffix_len")]
    pub suffix_len: usize,
}

impl ColumnLayout {
    pub fn named_columns(&self) -> [(&'static str, &str); 5] {
        [
            ("title", self.title.as_str()),
            ("identifier", self.identifier.as_str()),
            ("version", self.version.as_str()),
            ("submitter", self.submitter.as_str()),
            ("date", self.date.as_str()),
        ]
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            title: default_title_col(),
            identifier: default_identifier_col(),
            version: default_version_col(),
            submitter: default_submitter_col(),
            date: default_date_col(),
            suffix_len: default_suffix_len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_template_path")]
    pub path: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: default_template_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    /// Suggested range is `[latest - lookback_days, latest]`
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_REGISTER_URL.to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_file_suffix() -> String {
    "doc-register.xlsx".to_string()
}

fn default_title_col() -> String {
    "B".to_string()
}

fn default_identifier_col() -> String {
    "I".to_string()
}

fn default_version_col() -> String {
    "K".to_string()
}

fn default_submitter_col() -> String {
    "L".to_string()
}

fn default_date_col() -> String {
    "M".to_string()
}

fn default_suffix_len() -> usize {
    4
}

fn default_template_path() -> PathBuf {
    PathBuf::from("template.docx")
}

fn default_lookback_days() -> u32 {
    3
}

/// Convert spreadsheet column letters into a 0-based index ("A" -> 0, "AA" -> 26)
pub fn column_index(letters: &str) -> Option<u32> {
    let letters = letters.trim();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }

    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }

    Some(col - 1)
}
