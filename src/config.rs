//! Configuration loading.
//!
//! Settings come from environment variables (optionally via a `.env` file in
//! the working directory). Command-line flags override them.
//!
//! ## Environment Variables
//! - `WT_LOG_PATH`: path of the CSV log (default `weekly_tasks_log.csv`)
//! - `WT_HISTORY_LIMIT`: default row count for `wt history` (default 20)
//! - `WT_EXPORT_LIMIT`: default row count for `wt export` (default 500)

use std::path::PathBuf;

use crate::error::{Result, TrackerError};

pub const DEFAULT_LOG_PATH: &str = "weekly_tasks_log.csv";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_EXPORT_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_path: PathBuf,
    pub history_limit: usize,
    pub export_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            history_limit: DEFAULT_HISTORY_LIMIT,
            export_limit: DEFAULT_EXPORT_LIMIT,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset keys use defaults.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` when a limit is not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Settings::default();
        let log_path = lookup("WT_LOG_PATH")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_path);
        let history_limit = parse_limit(&lookup, "WT_HISTORY_LIMIT")?.unwrap_or(defaults.history_limit);
        let export_limit = parse_limit(&lookup, "WT_EXPORT_LIMIT")?.unwrap_or(defaults.export_limit);
        Ok(Settings { log_path, history_limit, export_limit })
    }
}

fn parse_limit(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(TrackerError::Config(format!("{key} must be a positive integer, got '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(Settings::from_lookup(lookup(&[])).unwrap(), Settings::default());
    }

    #[test]
    fn test_reads_overrides() {
        let s = Settings::from_lookup(lookup(&[
            ("WT_LOG_PATH", "/var/lib/wt/log.csv"),
            ("WT_HISTORY_LIMIT", "50"),
        ]))
        .unwrap();
        assert_eq!(s.log_path, PathBuf::from("/var/lib/wt/log.csv"));
        assert_eq!(s.history_limit, 50);
        assert_eq!(s.export_limit, DEFAULT_EXPORT_LIMIT);
    }

    #[test]
    fn test_rejects_bad_limit() {
        let err = Settings::from_lookup(lookup(&[("WT_EXPORT_LIMIT", "lots")])).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
        assert!(Settings::from_lookup(lookup(&[("WT_HISTORY_LIMIT", "0")])).is_err());
    }
}
