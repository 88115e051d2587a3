//! Runtime configuration read from the environment

use crate::cellar;
use std::path::PathBuf;

pub const DEFAULT_API_DOMAIN: &str = "https://formulae.brew.sh/api";

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Config {
    pub prefix: PathBuf,
    pub home: PathBuf,
    pub github_token: Option<String>,
    pub ci: bool,
    pub api_domain: String,
    pub brew_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let prefix = non_empty("HOMEBREW_PREFIX")
            .map(PathBuf::from)
            .unwrap_or_else(cellar::default_prefix);
        let home = non_empty("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            prefix,
            home,
            github_token: non_empty("HOMEBREW_GITHUB_API_TOKEN").or_else(|| non_empty("GITHUB_TOKEN")),
            ci: non_empty("CI").is_some(),
            api_domain: non_empty("HOMEBREW_API_DOMAIN")
                .map(|d| d.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_DOMAIN.to_string()),
            brew_file: non_empty("HOMEBREW_BREW_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("brew")),
        }
    }

    pub fn taps_path(&self) -> PathBuf {
        self.prefix.join("Library/Taps")
    }
}
