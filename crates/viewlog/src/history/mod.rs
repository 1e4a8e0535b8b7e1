//! Viewing-history records and their ingestion from CSV exports

pub mod dates;
pub mod loader;
pub mod titles;

use serde::{Deserialize, Serialize};

pub use dates::{format_ymd, parse_us_date};
pub use loader::{load_profiles, HistorySource};
pub use titles::main_title;

/// One historical watch event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewingRecord {
  /// Title exactly as exported
  pub title: String,
  /// Normalized `YYYY-MM-DD` date
  pub date: String,
  /// Sub-profile that produced the event
  pub profile: u32,
  /// Show or franchise name with episode suffixes stripped
  pub main_title: String,
}

impl ViewingRecord {
  /// Build a record from raw export fields, normalizing the date and deriving the main title
  pub fn from_export(title: &str, raw_date: &str, profile: u32) -> anyhow::Result<Self> {
    let date = parse_us_date(raw_date)?;
    Ok(Self {
      title: title.to_string(),
      date: format_ymd(date),
      profile,
      main_title: main_title(title),
    })
  }
}
