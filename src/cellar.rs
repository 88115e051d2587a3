//! Homebrew Cellar - reading which formulae are installed

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix used when `HOMEBREW_PREFIX` is not set
pub fn default_prefix() -> PathBuf {
    #[cfg(target_arch = "aarch64")]
    {
        PathBuf::from("/opt/homebrew")
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        PathBuf::from("/usr/local")
    }
}

/// Get the Cellar directory path under a prefix
pub fn cellar_path(prefix: &Path) -> PathBuf {
    prefix.join("Cellar")
}

/// Names of installed formulae, sorted and deduplicated
pub fn list_installed_formulae(prefix: &Path) -> Result<Vec<String>> {
    let cellar = cellar_path(prefix);

    if !cellar.exists() {
        return Ok(vec![]);
    }

    let mut names = BTreeSet::new();

    for entry in fs::read_dir(&cellar)
        .with_context(|| format!("Failed to read Cellar: {}", cellar.display()))?
    {
        let entry = entry?;
        let formula_name = entry.file_name().to_string_lossy().to_string();

        // Skip hidden files
        if formula_name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        // A keg directory without any version inside is a leftover
        let has_version = fs::read_dir(entry.path())?
            .flatten()
            .any(|v| !v.file_name().to_string_lossy().starts_with('.'));
        if has_version {
            names.insert(formula_name);
        }
    }

    Ok(names.into_iter().collect())
}
