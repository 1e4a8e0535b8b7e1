//! Environment-derived settings
//!
//! Credentials are optional at load time. Each client checks for the
//! credentials it needs on first use and fails with a `Configuration` error,
//! so the server can start (and answer `/health`) without them.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Result, ViewlogError};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CHROMA_BASE_URL: &str = "https://api.trychroma.com";
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";
pub const DEFAULT_FALLBACK_EMBEDDING_MODEL: &str = "models/gemini-embedding-001";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_COLLECTION: &str = "netflix_viewing_history";
pub const DEFAULT_DATA_DIR: &str = "public/data";
pub const DEFAULT_PROFILES: u32 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Gemini endpoint and model selection
#[derive(Debug, Clone)]
pub struct GeminiSettings {
  pub api_key: Option<String>,
  pub base_url: String,
  pub embedding_model: String,
  pub fallback_embedding_model: String,
  pub generation_model: String,
  pub temperature: f32,
  pub max_output_tokens: u32,
}

/// Chroma Cloud tenant/database/key triple and collection name
#[derive(Debug, Clone)]
pub struct ChromaSettings {
  pub api_key: Option<String>,
  pub tenant: Option<String>,
  pub database: Option<String>,
  pub base_url: String,
  pub collection: String,
}

/// Request timeout and retry ceiling shared by every provider call
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
  pub timeout: Duration,
  pub max_attempts: u32,
}

/// Where the per-profile CSV exports live
#[derive(Debug, Clone)]
pub struct HistorySettings {
  pub data_dir: PathBuf,
  pub profiles: u32,
}

#[derive(Debug, Clone)]
pub struct Settings {
  pub gemini: GeminiSettings,
  pub chroma: ChromaSettings,
  pub http: HttpSettings,
  pub history: HistorySettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      gemini: GeminiSettings {
        api_key: None,
        base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        fallback_embedding_model: DEFAULT_FALLBACK_EMBEDDING_MODEL.to_string(),
        generation_model: DEFAULT_GENERATION_MODEL.to_string(),
        temperature: 0.7,
        max_output_tokens: 2000,
      },
      chroma: ChromaSettings {
        api_key: None,
        tenant: None,
        database: None,
        base_url: DEFAULT_CHROMA_BASE_URL.to_string(),
        collection: DEFAULT_COLLECTION.to_string(),
      },
      http: HttpSettings {
        timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        max_attempts: DEFAULT_MAX_ATTEMPTS,
      },
      history: HistorySettings {
        data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        profiles: DEFAULT_PROFILES,
      },
    }
  }
}

impl Settings {
  /// Load settings from the process environment, reading `.env` first if present
  pub fn from_env() -> Result<Self> {
    // A missing .env file is fine; variables may come from the real environment
    let _ = dotenvy::dotenv();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build settings from an arbitrary key lookup
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let defaults = Self::default();

    let gemini = GeminiSettings {
      api_key: get("GEMINI_API_KEY").or_else(|| get("VITE_GEMINI_API_KEY")),
      base_url: validated_url("GEMINI_BASE_URL", get("GEMINI_BASE_URL"), &defaults.gemini.base_url)?,
      embedding_model: get("VIEWLOG_EMBEDDING_MODEL").unwrap_or(defaults.gemini.embedding_model),
      fallback_embedding_model: get("VIEWLOG_FALLBACK_EMBEDDING_MODEL")
        .unwrap_or(defaults.gemini.fallback_embedding_model),
      generation_model: get("VIEWLOG_GENERATION_MODEL").unwrap_or(defaults.gemini.generation_model),
      ..defaults.gemini
    };

    let chroma = ChromaSettings {
      api_key: get("CHROMA_API_KEY"),
      tenant: get("CHROMA_TENANT"),
      database: get("CHROMA_DATABASE"),
      base_url: validated_url("CHROMA_BASE_URL", get("CHROMA_BASE_URL"), &defaults.chroma.base_url)?,
      collection: get("VIEWLOG_COLLECTION").unwrap_or(defaults.chroma.collection),
    };

    let http = HttpSettings {
      timeout: Duration::from_secs(parse_number("VIEWLOG_TIMEOUT_SECS", get("VIEWLOG_TIMEOUT_SECS"))?
        .unwrap_or(DEFAULT_TIMEOUT_SECS)),
      max_attempts: parse_number("VIEWLOG_MAX_ATTEMPTS", get("VIEWLOG_MAX_ATTEMPTS"))?
        .unwrap_or(DEFAULT_MAX_ATTEMPTS)
        .max(1),
    };

    let history = HistorySettings {
      data_dir: get("VIEWLOG_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.history.data_dir),
      profiles: parse_number("VIEWLOG_PROFILES", get("VIEWLOG_PROFILES"))?
        .unwrap_or(DEFAULT_PROFILES),
    };

    Ok(Self { gemini, chroma, http, history })
  }
}

impl GeminiSettings {
  /// The API key, or a descriptive configuration error
  pub fn require_api_key(&self) -> Result<&str> {
    self.api_key.as_deref().ok_or_else(|| {
      ViewlogError::Configuration(
        "Gemini API key is not configured. Please set GEMINI_API_KEY or VITE_GEMINI_API_KEY."
          .to_string(),
      )
    })
  }
}

/// Resolved Chroma credentials
#[derive(Debug, Clone)]
pub struct ChromaCredentials<'a> {
  pub api_key: &'a str,
  pub tenant: &'a str,
  pub database: &'a str,
}

impl ChromaSettings {
  /// The full credential triple, or a descriptive configuration error
  pub fn require_credentials(&self) -> Result<ChromaCredentials<'_>> {
    match (&self.api_key, &self.tenant, &self.database) {
      (Some(api_key), Some(tenant), Some(database)) => {
        Ok(ChromaCredentials {
          api_key: api_key.as_str(),
          tenant: tenant.as_str(),
          database: database.as_str(),
        })
      }
      _ => Err(ViewlogError::Configuration(
        "ChromaDB credentials are not configured. Please set CHROMA_API_KEY, CHROMA_TENANT, and CHROMA_DATABASE."
          .to_string(),
      )),
    }
  }
}

fn validated_url(key: &str, value: Option<String>, default: &str) -> Result<String> {
  let raw = value.unwrap_or_else(|| default.to_string());
  Url::parse(&raw).map_err(|e| ViewlogError::Configuration(format!("{key} is not a valid URL: {e}")))?;
  Ok(raw.trim_end_matches('/').to_string())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
  value
    .map(|raw| {
      raw
        .parse::<T>()
        .map_err(|_| ViewlogError::Configuration(format!("{key} must be a number, got '{raw}'")))
    })
    .transpose()
}
