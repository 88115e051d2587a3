//! Tap metadata - local checkouts of formula and cask repositories
//!
//! Bump decisions read a few files a tap maintains next to its package
//! definitions:
//! - `.github/autobump.txt`: packages a scheduled job already bumps
//! - `synced_versions_formulae.json`: groups of formulae released in lockstep
//! - `Formula/**/<name>.rb` and `Casks/**/<token>.rb`: the definitions
//!   themselves, scanned for a `livecheck` block

use crate::error::{MaintError, Result};
use crate::package::PackageKind;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const AUTOBUMP_FILE: &str = ".github/autobump.txt";
const SYNCED_VERSIONS_FILE: &str = "synced_versions_formulae.json";

/// Parse a tap name into (user, repo) components
/// Input: "user/repo" → Output: ("user", "homebrew-repo")
fn parse_tap_name(tap: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = tap.split('/').collect();
    if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(MaintError::InvalidTap(tap.to_string()));
    }

    let user = parts[0].to_string();
    let mut repo = parts[1].to_string();

    // Add homebrew- prefix if not present
    if !repo.starts_with("homebrew-") {
        repo = format!("homebrew-{}", repo);
    }

    Ok((user, repo))
}

/// GitHub repository a tap is hosted in: `homebrew/core` → `Homebrew/homebrew-core`
pub fn remote_repo(tap: &str) -> Result<String> {
    let (user, repo) = parse_tap_name(tap)?;
    let owner = if user.eq_ignore_ascii_case("homebrew") {
        "Homebrew".to_string()
    } else {
        user
    };
    Ok(format!("{}/{}", owner, repo))
}

/// Read access to tap checkouts under `<prefix>/Library/Taps`
#[derive(Debug, Clone)]
pub struct Taps {
    root: PathBuf,
}

impl Taps {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the directory path for a tap
    pub fn directory(&self, tap: &str) -> Result<PathBuf> {
        let (user, repo) = parse_tap_name(tap)?;
        Ok(self.root.join(user.to_lowercase()).join(repo.to_lowercase()))
    }

    fn read_tap_file(&self, tap: &str, relative: &str) -> Option<String> {
        let path = self.directory(tap).ok()?.join(relative);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Not reading {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Packages the tap bumps on a schedule
    pub fn autobump_list(&self, tap: &str) -> Vec<String> {
        self.read_tap_file(tap, AUTOBUMP_FILE)
            .map(|content| {
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Groups of formulae whose versions must move together
    pub fn synced_versions_formulae(&self, tap: &str) -> Vec<Vec<String>> {
        let Some(content) = self.read_tap_file(tap, SYNCED_VERSIONS_FILE) else {
            return Vec::new();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!("Ignoring malformed {} in {}: {}", SYNCED_VERSIONS_FILE, tap, e);
            Vec::new()
        })
    }

    /// The other members of the synced group `name` belongs to, if any
    pub fn synced_with(&self, tap: &str, name: &str) -> Vec<String> {
        self.synced_versions_formulae(tap)
            .into_iter()
            .find(|group| group.iter().any(|member| member == name))
            .map(|group| group.into_iter().filter(|member| member != name).collect())
            .unwrap_or_default()
    }

    /// Locate the definition file of a package inside its tap checkout
    pub fn source_path(&self, tap: &str, kind: PackageKind, name: &str) -> Option<PathBuf> {
        let tap_dir = self.directory(tap).ok()?;
        let subdir = match kind {
            PackageKind::Formula => "Formula",
            PackageKind::Cask => "Casks",
        };
        let file = format!("{}.rb", name);
        let shard = name.chars().next()?.to_ascii_lowercase().to_string();

        let mut candidates = vec![
            tap_dir.join(subdir).join(&shard).join(&file),
            tap_dir.join(subdir).join(&file),
            tap_dir.join(&file),
        ];
        if kind == PackageKind::Formula && name.starts_with("lib") {
            candidates.push(tap_dir.join(subdir).join("lib").join(&file));
        }

        candidates.into_iter().find(|path| path.is_file())
    }

    /// Whether the package definition declares a `livecheck` block, or
    /// `None` when its source file cannot be read
    pub fn livecheck_defined(&self, tap: &str, kind: PackageKind, name: &str) -> Option<bool> {
        let path = self.source_path(tap, kind, name)?;
        fs::read_to_string(&path)
            .ok()
            .map(|source| defines_livecheck(&source))
    }
}

fn defines_livecheck(source: &str) -> bool {
    source.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("livecheck do")
    })
}

/// Whether `taps` contains a checkout of `tap`
pub fn is_tapped(taps: &Taps, tap: &str) -> bool {
    taps.directory(tap).map(|dir| dir.is_dir()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_parse_tap_name() {
        let (user, repo) = parse_tap_name("user/repo").unwrap();
        assert_eq!(user, "user");
        assert_eq!(repo, "homebrew-repo");

        let (user, repo) = parse_tap_name("user/homebrew-repo").unwrap();
        assert_eq!(user, "user");
        assert_eq!(repo, "homebrew-repo");
    }

    #[test]
    fn test_parse_tap_name_invalid() {
        assert!(parse_tap_name("invalid").is_err());
        assert!(parse_tap_name("too/many/slashes").is_err());
        assert!(parse_tap_name("/repo").is_err());
    }

    #[test]
    fn test_remote_repo() {
        assert_eq!(remote_repo("homebrew/core").unwrap(), "Homebrew/homebrew-core");
        assert_eq!(remote_repo("homebrew/cask").unwrap(), "Homebrew/homebrew-cask");
        assert_eq!(remote_repo("someone/tools").unwrap(), "someone/homebrew-tools");
    }

    #[test]
    fn test_tap_directory() {
        let taps = Taps::new("/opt/homebrew/Library/Taps");
        let dir = taps.directory("User/Repo").unwrap();
        assert!(dir.to_string_lossy().ends_with("Taps/user/homebrew-repo"));
    }

    #[test]
    fn test_autobump_list() {
        let temp = TempDir::new().unwrap();
        let taps = Taps::new(temp.path());
        write(
            &temp.path().join("homebrew/homebrew-core/.github/autobump.txt"),
            "# managed by CI\nwget\n\n  jq  \n",
        );

        assert_eq!(taps.autobump_list("homebrew/core"), vec!["wget", "jq"]);
        assert!(taps.autobump_list("homebrew/cask").is_empty());
    }

    #[test]
    fn test_synced_with() {
        let temp = TempDir::new().unwrap();
        let taps = Taps::new(temp.path());
        write(
            &temp
                .path()
                .join("homebrew/homebrew-core/synced_versions_formulae.json"),
            r#"[["node", "node-headers"], ["llvm", "lld", "lldb"]]"#,
        );

        assert_eq!(taps.synced_with("homebrew/core", "lld"), vec!["llvm", "lldb"]);
        assert!(taps.synced_with("homebrew/core", "wget").is_empty());
    }

    #[test]
    fn test_malformed_synced_file_is_ignored() {
        let temp = TempDir::new().unwrap();
        let taps = Taps::new(temp.path());
        write(
            &temp
                .path()
                .join("homebrew/homebrew-core/synced_versions_formulae.json"),
            "{not json",
        );
        assert!(taps.synced_versions_formulae("homebrew/core").is_empty());
    }

    #[test]
    fn test_livecheck_defined() {
        let temp = TempDir::new().unwrap();
        let taps = Taps::new(temp.path());
        write(
            &temp.path().join("homebrew/homebrew-core/Formula/w/wget.rb"),
            "class Wget < Formula\n  livecheck do\n    url :stable\n  end\nend\n",
        );
        write(
            &temp.path().join("homebrew/homebrew-cask/Casks/f/foo.rb"),
            "cask \"foo\" do\n  # livecheck do\n  version \"1.0\"\nend\n",
        );

        assert_eq!(
            taps.livecheck_defined("homebrew/core", PackageKind::Formula, "wget"),
            Some(true)
        );
        assert_eq!(
            taps.livecheck_defined("homebrew/cask", PackageKind::Cask, "foo"),
            Some(false)
        );
        assert_eq!(
            taps.livecheck_defined("homebrew/core", PackageKind::Formula, "missing"),
            None
        );
        assert!(is_tapped(&taps, "homebrew/core"));
        assert!(!is_tapped(&taps, "other/tap"));
    }
}
