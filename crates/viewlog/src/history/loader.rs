//! Loading per-profile CSV exports
//!
//! Each profile has its own export file. A missing or unreadable file is
//! logged and contributes no rows; it never aborts the whole load.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use super::ViewingRecord;
use crate::config::HistorySettings;

/// The set of export files to index
#[derive(Debug, Clone)]
pub struct HistorySource {
  pub data_dir: PathBuf,
  pub profiles: u32,
}

impl HistorySource {
  pub fn new(data_dir: impl Into<PathBuf>, profiles: u32) -> Self {
    Self { data_dir: data_dir.into(), profiles }
  }

  /// Path of the export for a 1-based profile number
  pub fn file_for(&self, profile: u32) -> PathBuf {
    self.data_dir.join(format!("NetflixViewingHistory_{profile}.csv"))
  }
}

impl From<&HistorySettings> for HistorySource {
  fn from(settings: &HistorySettings) -> Self {
    Self::new(settings.data_dir.clone(), settings.profiles)
  }
}

#[derive(Debug, Deserialize)]
struct ExportRow {
  #[serde(rename = "Title", default)]
  title: Option<String>,
  #[serde(rename = "Date", default)]
  date: Option<String>,
}

/// Load every profile's export, skipping files that cannot be read
pub async fn load_profiles(source: &HistorySource) -> Vec<ViewingRecord> {
  let mut records = Vec::new();

  for profile in 1..=source.profiles {
    let path = source.file_for(profile);
    match load_profile(&path, profile).await {
      Ok(rows) => {
        info!("Loaded {} rows from profile {profile}", rows.len());
        records.extend(rows);
      }
      Err(e) => warn!("Failed to load profile {profile} data: {e:#}"),
    }
  }

  records
}

/// Load a single export file for the given profile
pub async fn load_profile(path: &Path, profile: u32) -> Result<Vec<ViewingRecord>> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("reading {}", path.display()))?;
  parse_export(&content, profile).with_context(|| format!("parsing {}", path.display()))
}

/// Parse export CSV text; rows without a title or date are dropped, rows with a bad date are skipped
pub fn parse_export(content: &str, profile: u32) -> Result<Vec<ViewingRecord>> {
  let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(content.as_bytes());

  let mut records = Vec::new();
  for row in reader.deserialize::<ExportRow>() {
    let row = row?;
    let (Some(title), Some(date)) = (non_empty(row.title), non_empty(row.date)) else {
      continue;
    };

    match ViewingRecord::from_export(&title, &date, profile) {
      Ok(record) => records.push(record),
      Err(e) => warn!("Failed to parse date for row: {date} ({e})"),
    }
  }

  Ok(records)
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}
