//! Upstream version checks
//!
//! Livecheck strategies live in the package definitions and are evaluated by
//! `brew livecheck`. [`BrewLivecheck`] runs it as a subprocess and turns the
//! JSON report into a [`LivecheckResult`]; failures of any kind become
//! [`LivecheckResult::Error`] so a single package can never abort a run.

use crate::package::{Package, PackageKind};
use crate::version_parser::Arch;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What an upstream check reported for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivecheckResult {
    Version {
        latest: String,
        /// `None` when the package is not throttled, `Some(None)` when it
        /// is but no release satisfies the throttle interval yet.
        latest_throttled: Option<Option<String>>,
    },
    Skipped(String),
    Error(String),
}

#[async_trait]
pub trait Livecheck: Send + Sync {
    /// Check upstream for `package` as resolved under `arch`
    async fn check(&self, package: &Package, arch: Option<Arch>) -> LivecheckResult;

    /// Whether `check` can answer differently per architecture. When it
    /// cannot, one result is reused for every architecture of a package.
    fn per_arch(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct LivecheckEntry {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    messages: Vec<String>,
    #[serde(default)]
    version: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Interpret `brew livecheck --json` output for a single package
pub fn parse_livecheck_output(json: &str) -> LivecheckResult {
    let entries: Vec<LivecheckEntry> = match serde_json::from_str(json) {
        Ok(entries) => entries,
        Err(e) => return LivecheckResult::Error(format!("unreadable livecheck output: {}", e)),
    };
    let Some(entry) = entries.into_iter().next() else {
        return LivecheckResult::Error("livecheck returned no results".to_string());
    };

    match entry.status.as_deref() {
        Some("skipped") => return LivecheckResult::Skipped(entry.messages.join(" ")),
        Some("error") => {
            let message = if entry.messages.is_empty() {
                "livecheck failed".to_string()
            } else {
                entry.messages.join(" ")
            };
            return LivecheckResult::Error(message);
        }
        _ => {}
    }

    let Some(version) = entry.version else {
        return LivecheckResult::Error("livecheck reported no version".to_string());
    };
    let Some(latest) = version.get("latest").and_then(|v| v.as_str()) else {
        return LivecheckResult::Error("livecheck reported no latest version".to_string());
    };
    let latest_throttled = version
        .get("latest_throttled")
        .map(|v| v.as_str().map(str::to_string));

    LivecheckResult::Version {
        latest: latest.to_string(),
        latest_throttled,
    }
}

/// Runs `brew livecheck` for each check
pub struct BrewLivecheck {
    brew: PathBuf,
}

impl BrewLivecheck {
    pub fn new(brew: impl Into<PathBuf>) -> Self {
        Self { brew: brew.into() }
    }
}

#[async_trait]
impl Livecheck for BrewLivecheck {
    async fn check(&self, package: &Package, arch: Option<Arch>) -> LivecheckResult {
        let kind_flag = match package.kind() {
            PackageKind::Formula => "--formula",
            PackageKind::Cask => "--cask",
        };

        debug!(
            "Running livecheck for {} ({})",
            package.full_name(),
            arch.map_or("general", Arch::label)
        );

        let output = tokio::process::Command::new(&self.brew)
            .args(["livecheck", "--json", "--quiet", "--full-name", kind_flag])
            .arg(package.full_name())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() || !output.stdout.is_empty() => {
                parse_livecheck_output(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!("livecheck failed for {}: {}", package.full_name(), stderr);
                LivecheckResult::Error(if stderr.is_empty() {
                    format!("livecheck exited with {}", output.status)
                } else {
                    stderr
                })
            }
            Err(e) => LivecheckResult::Error(format!("failed to run livecheck: {}", e)),
        }
    }

    /// brew livecheck evaluates under the host architecture only
    fn per_arch(&self) -> bool {
        false
    }
}
