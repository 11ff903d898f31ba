//! Runtime configuration.
//!
//! Values are resolved with priority: environment variables > config file >
//! defaults. The config file is `config.json` in the app data directory
//! (`~/.local/share/toknav` on Linux) unless a path is given explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::host::TokenizerPattern;
use crate::utils::config_path;

/// Default ceiling of tracked documents
pub const DEFAULT_MAX_FILES: usize = 5000;

/// Default token pattern: runs of word characters
pub const DEFAULT_PATTERN: &str = r"\w+";

/// Default document event coalescing window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Files above this size are not read (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of tracked documents
    pub max_files: usize,
    /// Token pattern for languages without an override
    pub default_pattern: String,
    /// Language id -> token pattern
    pub patterns: BTreeMap<String, String>,
    /// Re-touch the highlights captured at preview start when a preview is committed
    pub trailing_highlight: bool,
    /// Document event coalescing window in milliseconds
    pub debounce_ms: u64,
    /// Directory names skipped while walking a workspace
    pub ignored_paths: Vec<String>,
    /// Files larger than this are skipped
    pub max_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        let patterns = [
            ("css", r"[\w-]+"),
            ("scss", r"[\w-]+"),
            ("html", r"[\w-]+"),
            ("clojure", r"[\w\-?!*+/<>=.]+"),
            ("lisp", r"[\w\-?!*+/<>=]+"),
            ("shellscript", r"[\w-]+"),
        ]
        .into_iter()
        .map(|(lang, pattern)| (lang.to_string(), pattern.to_string()))
        .collect();

        Self {
            max_files: DEFAULT_MAX_FILES,
            default_pattern: DEFAULT_PATTERN.to_string(),
            patterns,
            trailing_highlight: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            ignored_paths: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
                "__pycache__".to_string(),
                ".venv".to_string(),
            ],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Config {
    /// Load config from the app data directory (if present), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from an explicit file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply `TOKNAV_*` overrides. Unparseable values are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(n) = var("TOKNAV_MAX_FILES").and_then(|v| v.parse().ok()) {
            self.max_files = n;
        }
        if let Some(ms) = var("TOKNAV_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
            self.debounce_ms = ms;
        }
        if let Some(flag) = var("TOKNAV_TRAILING_HIGHLIGHT").and_then(|v| parse_flag(&v)) {
            self.trailing_highlight = flag;
        }
        if let Some(pattern) = var("TOKNAV_PATTERN").filter(|v| !v.is_empty()) {
            self.default_pattern = pattern;
        }
    }

    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Pattern source for a language id.
    pub fn pattern_for(&self, language_id: &str) -> &str {
        self.patterns
            .get(language_id)
            .map(String::as_str)
            .unwrap_or(&self.default_pattern)
    }
}

impl TokenizerPattern for Config {
    fn pattern(&self, language_id: &str) -> String {
        self.pattern_for(language_id).to_string()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_files, DEFAULT_MAX_FILES);
        assert!(config.trailing_highlight);
        assert_eq!(config.pattern_for("rust"), r"\w+");
        assert_eq!(config.pattern_for("css"), r"[\w-]+");
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{"max_files": 12, "patterns": {"rust": "[a-z]+"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.max_files, 12);
        assert_eq!(config.pattern_for("rust"), "[a-z]+");
        // Overriding the map replaces the default overrides
        assert_eq!(config.pattern_for("css"), r"\w+");
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_config_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TOKNAV_MAX_FILES", "3"),
            ("TOKNAV_TRAILING_HIGHLIGHT", "off"),
            ("TOKNAV_DEBOUNCE_MS", "not a number"),
            ("TOKNAV_PATTERN", "[A-Z]+"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.max_files, 3);
        assert!(!config.trailing_highlight);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.pattern("plaintext"), "[A-Z]+");
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"trailing_highlight": false}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(!config.trailing_highlight);
        assert_eq!(config.max_files, DEFAULT_MAX_FILES);

        fs::write(&path, "{ not json").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
