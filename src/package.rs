//! Formulae and casks behind one interface
//!
//! The bump pipeline only needs a handful of capabilities from a package
//! definition. [`Package`] is the two-case sum type exposing them; the
//! architecture re-resolution hook is [`Package::version_for`], which takes
//! the simulated architecture explicitly.

use crate::api::{self, BrewApi};
use crate::error::{MaintError, Result};
use crate::tap::{self, Taps};
use crate::version_parser::Arch;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    Formula,
    Cask,
}

impl PackageKind {
    pub fn label(self) -> &'static str {
        match self {
            PackageKind::Formula => "formula",
            PackageKind::Cask => "cask",
        }
    }

    /// Repology repository tracking this kind of package
    pub fn repology_repository(self) -> &'static str {
        match self {
            PackageKind::Formula => "homebrew",
            PackageKind::Cask => "homebrew_casks",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct FormulaPackage {
    pub formula: api::Formula,
    pub livecheck_defined: bool,
}

#[derive(Debug, Clone)]
pub struct CaskPackage {
    pub cask: api::Cask,
    pub livecheck_defined: bool,
}

impl CaskPackage {
    fn variation_keys(&self, arch: Arch) -> impl Iterator<Item = (&String, &api::CaskVariation)> {
        self.cask.variations.iter().filter(move |(tag, _)| {
            // Linux variations never apply to a cask bump
            if tag.ends_with("_linux") {
                return false;
            }
            match arch {
                Arch::Arm => tag.starts_with("arm64_"),
                Arch::Intel => !tag.starts_with("arm64_"),
            }
        })
    }
}

#[derive(Debug, Clone)]
pub enum Package {
    Formula(FormulaPackage),
    Cask(CaskPackage),
}

impl Package {
    pub fn kind(&self) -> PackageKind {
        match self {
            Package::Formula(_) => PackageKind::Formula,
            Package::Cask(_) => PackageKind::Cask,
        }
    }

    /// Short name (formula name or cask token)
    pub fn name(&self) -> &str {
        match self {
            Package::Formula(f) => &f.formula.name,
            Package::Cask(c) => &c.cask.token,
        }
    }

    /// Tap-qualified name, falling back to the short name
    pub fn full_name(&self) -> &str {
        let full = match self {
            Package::Formula(f) => &f.formula.full_name,
            Package::Cask(c) => &c.cask.full_token,
        };
        if full.is_empty() { self.name() } else { full }
    }

    pub fn tap(&self) -> Option<&str> {
        match self {
            Package::Formula(f) => f.formula.tap.as_deref(),
            Package::Cask(c) => c.cask.tap.as_deref(),
        }
    }

    pub fn deprecated(&self) -> bool {
        match self {
            Package::Formula(f) => f.formula.deprecated,
            Package::Cask(c) => c.cask.deprecated,
        }
    }

    pub fn disabled(&self) -> bool {
        match self {
            Package::Formula(f) => f.formula.disabled,
            Package::Cask(c) => c.cask.disabled,
        }
    }

    /// A formula with a HEAD build but no stable release
    pub fn head_only(&self) -> bool {
        match self {
            Package::Formula(f) => {
                f.formula.versions.stable.is_none() && f.formula.versions.head.is_some()
            }
            Package::Cask(_) => false,
        }
    }

    /// A formula pinned to a major version line (`python@3.12`)
    pub fn versioned_formula(&self) -> bool {
        matches!(self, Package::Formula(f) if f.formula.name.contains('@'))
    }

    pub fn livecheck_defined(&self) -> bool {
        match self {
            Package::Formula(f) => f.livecheck_defined,
            Package::Cask(c) => c.livecheck_defined,
        }
    }

    /// Whether the definition resolves differently per architecture
    pub fn has_arch_variations(&self) -> bool {
        match self {
            Package::Formula(_) => false,
            Package::Cask(c) => c.cask.variations.keys().any(|tag| !tag.ends_with("_linux")),
        }
    }

    /// Version the definition declares, optionally under a simulated architecture
    pub fn version_for(&self, arch: Option<Arch>) -> Option<String> {
        match self {
            Package::Formula(f) => f.formula.versions.stable.clone(),
            Package::Cask(c) => arch
                .and_then(|arch| {
                    c.variation_keys(arch)
                        .find_map(|(_, variation)| variation.version.clone())
                })
                .or_else(|| c.cask.version.clone()),
        }
    }

    /// Deprecation status, optionally under a simulated architecture
    pub fn deprecated_for(&self, arch: Option<Arch>) -> bool {
        match self {
            Package::Formula(f) => f.formula.deprecated,
            Package::Cask(c) => arch
                .and_then(|arch| {
                    c.variation_keys(arch)
                        .find_map(|(_, variation)| variation.deprecated)
                })
                .unwrap_or(c.cask.deprecated),
        }
    }
}

/// Load a package definition and detect its livecheck block from the tap
pub async fn load(
    api: &BrewApi,
    taps: &Taps,
    name: &str,
    kind: Option<PackageKind>,
) -> Result<Package> {
    let package = match kind {
        Some(PackageKind::Formula) => load_formula(api, taps, name).await?,
        Some(PackageKind::Cask) => load_cask(api, taps, name).await?,
        None => match load_formula(api, taps, name).await {
            Ok(formula) => formula,
            Err(MaintError::FormulaNotFound(_)) => match load_cask(api, taps, name).await {
                Ok(cask) => cask,
                Err(MaintError::CaskNotFound(_)) => {
                    return Err(MaintError::PackageNotFound(name.to_string()));
                }
                Err(e) => return Err(e),
            },
            Err(e) => return Err(e),
        },
    };
    Ok(package)
}

/// Without a readable definition the package may still have a livecheck
/// block, so it is treated as having one.
fn livecheck_defined(taps: &Taps, tap: Option<&str>, kind: PackageKind, name: &str) -> bool {
    let known = tap
        .filter(|tap| tap::is_tapped(taps, tap))
        .and_then(|tap| taps.livecheck_defined(tap, kind, name));
    known.unwrap_or_else(|| {
        debug!("No local definition for {}; assuming it has a livecheck block", name);
        true
    })
}

async fn load_formula(api: &BrewApi, taps: &Taps, name: &str) -> Result<Package> {
    let formula = api.fetch_formula(name).await?;
    let livecheck_defined = livecheck_defined(
        taps,
        formula.tap.as_deref(),
        PackageKind::Formula,
        &formula.name,
    );
    Ok(Package::Formula(FormulaPackage {
        formula,
        livecheck_defined,
    }))
}

async fn load_cask(api: &BrewApi, taps: &Taps, token: &str) -> Result<Package> {
    let cask = api.fetch_cask(token).await?;
    let livecheck_defined =
        livecheck_defined(taps, cask.tap.as_deref(), PackageKind::Cask, &cask.token);
    Ok(Package::Cask(CaskPackage {
        cask,
        livecheck_defined,
    }))
}

/// Names to print for each package, in input order.
///
/// Short names are used unless `full_name` is set. When a formula and a cask
/// share a name the cask is shown as `<name> (cask)`; when several packages
/// of the same kind share a name they fall back to their full names.
pub fn display_names(packages: &[Package], full_name: bool) -> Vec<String> {
    let mut by_name: HashMap<&str, Vec<PackageKind>> = HashMap::new();
    for package in packages {
        by_name.entry(package.name()).or_default().push(package.kind());
    }

    packages
        .iter()
        .map(|package| {
            if full_name {
                return package.full_name().to_string();
            }
            let kinds = &by_name[package.name()];
            let same_kind = kinds.iter().filter(|k| **k == package.kind()).count();
            if same_kind > 1 {
                package.full_name().to_string()
            } else if kinds.len() > 1 && package.kind() == PackageKind::Cask {
                format!("{} (cask)", package.name())
            } else {
                package.name().to_string()
            }
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_formula_capabilities() {
        let pkg = formula("wget", Some("1.25.0"));
        assert_eq!(pkg.kind(), PackageKind::Formula);
        assert_eq!(pkg.version_for(None).as_deref(), Some("1.25.0"));
        assert_eq!(pkg.version_for(Some(Arch::Arm)).as_deref(), Some("1.25.0"));
        assert!(!pkg.head_only());
        assert!(!pkg.has_arch_variations());

        assert!(formula("tip", None).head_only());
        assert!(formula("python@3.12", Some("3.12.1")).versioned_formula());
    }

    #[test]
    fn test_cask_arch_resolution() {
        let pkg = cask(
            "foo",
            "2.0",
            &[("sonoma", "1.9"), ("ventura", "1.9"), ("x86_64_linux", "0.1")],
        );
        assert!(pkg.has_arch_variations());
        assert_eq!(pkg.version_for(Some(Arch::Arm)).as_deref(), Some("2.0"));
        assert_eq!(pkg.version_for(Some(Arch::Intel)).as_deref(), Some("1.9"));
        assert_eq!(pkg.version_for(None).as_deref(), Some("2.0"));
    }

    #[test]
    fn test_cask_arm_variation() {
        let pkg = cask("bar", "3.0", &[("arm64_sonoma", "3.1")]);
        assert_eq!(pkg.version_for(Some(Arch::Arm)).as_deref(), Some("3.1"));
        assert_eq!(pkg.version_for(Some(Arch::Intel)).as_deref(), Some("3.0"));
    }

    #[test]
    fn test_cask_deprecation_by_arch() {
        let mut pkg = cask("old", "1.0", &[("sonoma", "1.0")]);
        if let Package::Cask(c) = &mut pkg
            && let Some(intel) = c.cask.variations.get_mut("sonoma")
        {
            intel.deprecated = Some(true);
        }
        assert!(!pkg.deprecated());
        assert!(!pkg.deprecated_for(Some(Arch::Arm)));
        assert!(pkg.deprecated_for(Some(Arch::Intel)));
    }

    #[test]
    fn test_unknown_livecheck_counts_as_defined() {
        let temp = tempfile::TempDir::new().unwrap();
        let formula_dir = temp.path().join("homebrew/homebrew-core/Formula");
        std::fs::create_dir_all(&formula_dir).unwrap();
        std::fs::write(formula_dir.join("plain.rb"), "class Plain < Formula\nend\n").unwrap();
        let taps = Taps::new(temp.path());

        let defined = |tap: Option<&str>, name: &str| {
            livecheck_defined(&taps, tap, PackageKind::Formula, name)
        };
        assert!(!defined(Some("homebrew/core"), "plain"));
        // Tapped, but the definition is not on disk
        assert!(defined(Some("homebrew/core"), "missing"));
        assert!(defined(Some("someone/untapped"), "plain"));
        assert!(defined(None, "plain"));
    }

    #[test]
    fn test_linux_only_variations_are_not_arch_specific() {
        let pkg = cask("baz", "1.0", &[("x86_64_linux", "0.9")]);
        assert!(!pkg.has_arch_variations());
    }

    #[test]
    fn test_display_names_plain() {
        let packages = vec![formula("wget", Some("1.0")), cask("zed", "1.0", &[])];
        assert_eq!(display_names(&packages, false), vec!["wget", "zed"]);
    }

    #[test]
    fn test_display_names_formula_cask_collision() {
        let packages = vec![formula("docker", Some("27.0")), cask("docker", "4.30", &[])];
        assert_eq!(
            display_names(&packages, false),
            vec!["docker", "docker (cask)"]
        );
    }

    #[test]
    fn test_display_names_same_kind_collision() {
        let mut tapped = formula("foo", Some("1.0"));
        if let Package::Formula(f) = &mut tapped {
            f.formula.full_name = "someone/tools/foo".to_string();
        }
        let packages = vec![formula("foo", Some("1.0")), tapped, formula("bar", Some("1.0"))];
        assert_eq!(
            display_names(&packages, false),
            vec!["foo", "someone/tools/foo", "bar"]
        );
    }

    #[test]
    fn test_display_names_full_name_flag() {
        let mut tapped = formula("foo", Some("1.0"));
        if let Package::Formula(f) = &mut tapped {
            f.formula.full_name = "someone/tools/foo".to_string();
        }
        assert_eq!(display_names(&[tapped], true), vec!["someone/tools/foo"]);
    }
}
