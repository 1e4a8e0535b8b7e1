use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;

use viewlog::config::Settings;

const KEYS: &[&str] = &[
  "GEMINI_API_KEY",
  "VITE_GEMINI_API_KEY",
  "CHROMA_API_KEY",
  "CHROMA_TENANT",
  "CHROMA_DATABASE",
  "VIEWLOG_COLLECTION",
  "VIEWLOG_DATA_DIR",
  "VIEWLOG_PROFILES",
  "VIEWLOG_TIMEOUT_SECS",
];

fn clear_env() {
  for key in KEYS {
    std::env::remove_var(key);
  }
}

#[test]
#[serial]
fn settings_are_read_from_the_environment() {
  clear_env();
  std::env::set_var("GEMINI_API_KEY", "gemini-key");
  std::env::set_var("CHROMA_API_KEY", "chroma-key");
  std::env::set_var("CHROMA_TENANT", "tenant");
  std::env::set_var("CHROMA_DATABASE", "db");
  std::env::set_var("VIEWLOG_COLLECTION", "history_test");
  std::env::set_var("VIEWLOG_DATA_DIR", "/tmp/exports");
  std::env::set_var("VIEWLOG_PROFILES", "2");
  std::env::set_var("VIEWLOG_TIMEOUT_SECS", "12");

  let settings = Settings::from_env().unwrap();
  clear_env();

  assert_eq!(settings.gemini.require_api_key().unwrap(), "gemini-key");
  let credentials = settings.chroma.require_credentials().unwrap();
  assert_eq!((credentials.tenant, credentials.database), ("tenant", "db"));
  assert_eq!(settings.chroma.collection, "history_test");
  assert_eq!(settings.history.data_dir, PathBuf::from("/tmp/exports"));
  assert_eq!(settings.history.profiles, 2);
  assert_eq!(settings.http.timeout, Duration::from_secs(12));
}

#[test]
#[serial]
fn blank_values_count_as_unset() {
  clear_env();
  std::env::set_var("GEMINI_API_KEY", "   ");

  let settings = Settings::from_env().unwrap();
  clear_env();

  assert!(settings.gemini.api_key.is_none());
}
