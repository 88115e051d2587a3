//! `brewmaint bump` - report outdated packages and open bump pull requests

use crate::api::BrewApi;
use crate::cask;
use crate::cellar;
use crate::config::Config;
use crate::error::{MaintError, Result};
use crate::github::{self, GitHubClient, PullRequestSearch};
use crate::livecheck::BrewLivecheck;
use crate::package::{self, Package, PackageKind};
use crate::repology::{self, RepologyClient};
use crate::resolver::{ResolveOptions, UpstreamVersionResolver, VersionBumpInfo};
use crate::tap::{self, Taps};
use crate::version::VersionReading;
use crate::version_parser::VersionKey;
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, warn};

const PR_MESSAGE: &str = "Created by `brew bump`";

#[derive(Debug, Clone, Default, Args)]
pub struct BumpArgs {
    /// Formula or cask names
    pub names: Vec<String>,

    /// Treat all named arguments as formulae
    #[arg(long, conflicts_with = "cask")]
    pub formula: bool,

    /// Treat all named arguments as casks
    #[arg(long)]
    pub cask: bool,

    /// Check installed formulae and casks
    #[arg(long)]
    pub installed: bool,

    /// Print formulae and casks with fully-qualified names
    #[arg(long)]
    pub full_name: bool,

    /// Do not retrieve pull requests from GitHub
    #[arg(long, conflicts_with = "open_pr")]
    pub no_pull_requests: bool,

    /// Open a pull request for the new version if none have been opened yet
    #[arg(long)]
    pub open_pr: bool,

    /// Don't try to fork the repository
    #[arg(long)]
    pub no_fork: bool,

    /// Don't query Repology for the latest version
    #[arg(long)]
    pub no_repology: bool,

    /// Packages sorting before this name are skipped
    #[arg(long, value_name = "NAME")]
    pub start_with: Option<String>,
}

impl BumpArgs {
    fn kind(&self) -> Option<PackageKind> {
        if self.formula {
            Some(PackageKind::Formula)
        } else if self.cask {
            Some(PackageKind::Cask)
        } else {
            None
        }
    }
}

pub async fn bump(api: &BrewApi, config: &Config, args: &BumpArgs) -> Result<()> {
    if args.names.is_empty() && !args.installed {
        return Err(anyhow::anyhow!("bump needs package names or --installed").into());
    }

    let taps = Taps::new(config.taps_path());
    let packages = select_packages(api, config, &taps, args).await?;
    if packages.is_empty() {
        println!("No packages to check");
        return Ok(());
    }

    let github = GitHubClient::new(github::DEFAULT_BASE_URL, config.github_token.clone())?;
    if args.open_pr {
        check_open_pull_requests(&github, &packages).await?;
    }

    let livecheck = BrewLivecheck::new(&config.brew_file);
    let repology = RepologyClient::new(repology::DEFAULT_BASE_URL)?;
    let resolver = UpstreamVersionResolver::new(&livecheck, &repology, &github);

    let names = package::display_names(&packages, args.full_name);
    let mut autobump: HashMap<String, Vec<String>> = HashMap::new();
    let mut opener =
        PullRequestOpener::new(|pr_args: &[String]| run_brew(&config.brew_file, pr_args));

    for (index, (package, name)) in packages.iter().zip(&names).enumerate() {
        if index > 0 {
            println!();
        }

        let autobumped = package.tap().is_some_and(|tap| {
            autobump
                .entry(tap.to_string())
                .or_insert_with(|| taps.autobump_list(tap))
                .iter()
                .any(|listed| listed == package.name())
        });
        if let Some(reason) = skip_reason(package, autobumped) {
            println!("{} {} {}", "⚠".yellow(), name.bold(), reason);
            continue;
        }

        let options = ResolveOptions {
            pull_requests: !args.no_pull_requests,
            repology: use_repology(package, args, config.ci),
        };
        let info = resolver.resolve(package, options).await?;

        let synced_with = match (package.kind(), package.tap()) {
            (PackageKind::Formula, Some(tap)) => taps.synced_with(tap, package.name()),
            _ => Vec::new(),
        };

        let mut lines = render_report(package, name, &info, &synced_with, options.pull_requests);
        let title = lines.remove(0);
        println!("{} {}", "==>".bold().green(), title.bold());
        for line in lines {
            println!("{}", line);
        }

        if !should_open_pr(args, package, &info) {
            continue;
        }

        let pr_args = pr_creation_args(package, &info, args, &synced_with);
        opener.open(name, &pr_args);
    }

    opener.finish()
}

/// Run `brew` with the given arguments, describing any failure
fn run_brew(brew: &Path, pr_args: &[String]) -> std::result::Result<(), String> {
    debug!("Running {} {}", brew.display(), pr_args.join(" "));
    let command = pr_args.first().map_or("brew", String::as_str);
    match Command::new(brew).args(pr_args).status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(format!("{} failed: {}", command, status)),
        Err(e) => Err(format!("Could not run {}: {}", command, e)),
    }
}

/// Opens bump pull requests one at a time and counts the failures.
///
/// A failed PR never stops the run; [`PullRequestOpener::finish`] reports
/// how many failed once every package has been checked.
pub struct PullRequestOpener<R> {
    run: R,
    failed: usize,
}

impl<R> PullRequestOpener<R>
where
    R: FnMut(&[String]) -> std::result::Result<(), String>,
{
    pub fn new(run: R) -> Self {
        Self { run, failed: 0 }
    }

    pub fn open(&mut self, name: &str, pr_args: &[String]) {
        println!();
        println!("Opening pull request for {}...", name.cyan());

        match (self.run)(pr_args) {
            Ok(()) => {
                println!("  {} Opened pull request for {}", "✓".green(), name.bold());
            }
            Err(message) => {
                println!("  {} {}", "✗".red(), message);
                self.failed += 1;
            }
        }
    }

    pub fn finish(self) -> Result<()> {
        if self.failed > 0 {
            return Err(MaintError::BumpFailed(self.failed));
        }
        Ok(())
    }
}

async fn select_packages(
    api: &BrewApi,
    config: &Config,
    taps: &Taps,
    args: &BumpArgs,
) -> Result<Vec<Package>> {
    let kind = args.kind();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map_err(|e| anyhow::anyhow!(e))?,
    );
    spinner.set_message("Loading packages...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut packages = Vec::new();
    for name in &args.names {
        match package::load(api, taps, name, kind).await {
            Ok(package) => packages.push(package),
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        }
    }

    if args.installed {
        let mut installed = Vec::new();
        if kind != Some(PackageKind::Cask) {
            let formulae = cellar::list_installed_formulae(&config.prefix)?;
            installed.extend(formulae.into_iter().map(|n| (n, PackageKind::Formula)));
        }
        if kind != Some(PackageKind::Formula) {
            let casks = cask::list_installed_casks(&config.prefix)?;
            installed.extend(casks.into_iter().map(|n| (n, PackageKind::Cask)));
        }

        for (name, installed_kind) in installed {
            spinner.set_message(format!("Loading {}...", name));
            match package::load(api, taps, &name, Some(installed_kind)).await {
                Ok(package) => packages.push(package),
                // Installed from a tap the API does not cover
                Err(e) => warn!("Skipping installed {} {}: {}", installed_kind, name, e),
            }
        }
    }

    spinner.finish_and_clear();
    Ok(order_packages(packages, args.start_with.as_deref()))
}

/// Sort by name and kind, drop duplicates and anything before `start_with`
pub fn order_packages(mut packages: Vec<Package>, start_with: Option<&str>) -> Vec<Package> {
    packages.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| a.kind().label().cmp(b.kind().label()))
            .then_with(|| a.full_name().cmp(b.full_name()))
    });
    packages.dedup_by(|a, b| a.kind() == b.kind() && a.full_name() == b.full_name());

    match start_with {
        Some(start) => packages
            .into_iter()
            .filter(|p| p.name() >= start)
            .collect(),
        None => packages,
    }
}

/// Refuse to start when any target repository is already at the open PR cap
async fn check_open_pull_requests(
    github: &dyn PullRequestSearch,
    packages: &[Package],
) -> Result<()> {
    let repos: BTreeSet<String> = packages
        .iter()
        .filter_map(Package::tap)
        .map(tap::remote_repo)
        .collect::<Result<_>>()?;

    for repo in repos {
        let Some(count) = github.open_pull_request_count(&repo).await? else {
            debug!("No GitHub token; not counting open PRs in {}", repo);
            continue;
        };
        if count >= github::MAXIMUM_OPEN_PRS {
            return Err(MaintError::TooManyOpenPrs {
                repo,
                count,
                limit: github::MAXIMUM_OPEN_PRS,
            });
        }
    }
    Ok(())
}

/// Why a package is not checked at all
pub fn skip_reason(package: &Package, autobumped: bool) -> Option<&'static str> {
    match package {
        Package::Formula(_) if package.disabled() => Some("is disabled, skipping"),
        Package::Formula(_) if package.head_only() => Some("is HEAD-only, skipping"),
        Package::Cask(_) if package.disabled() => Some("is disabled, skipping"),
        _ if autobumped => Some(
            "is autobumped so will have bump PRs opened by BrewTestBot every ~3 hours, skipping",
        ),
        _ => None,
    }
}

/// Whether to ask Repology about this package.
///
/// CI jobs that open PRs for packages with their own livecheck block would
/// only burn Repology's rate limit, and versioned formulae never match
/// Repology's unversioned project names.
pub fn use_repology(package: &Package, args: &BumpArgs, ci: bool) -> bool {
    if args.no_repology {
        return false;
    }
    if ci && args.open_pr && package.livecheck_defined() {
        return false;
    }
    !package.versioned_formula()
}

fn annotated_current(info: &VersionBumpInfo) -> String {
    let readings = info.current_version.readings();
    let arch_split = info.current_version.has_arch_readings();

    readings
        .entries()
        .map(|(key, reading)| {
            let mut text = match key {
                VersionKey::General => reading.to_string(),
                VersionKey::Arm => format!("arm: {}", reading),
                VersionKey::Intel => format!("intel: {}", reading),
            };
            if info.newer_than_upstream.get(key) == Some(&true) {
                text.push_str(" (newer than upstream)");
            }
            let deprecated = info
                .deprecated
                .get(key)
                .or_else(|| arch_split.then(|| info.deprecated.get(VersionKey::General)).flatten());
            if deprecated == Some(&true) {
                text.push_str(" (deprecated)");
            }
            text
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Repology knows a newer release than both the current and the suggested
/// version, but the package's livecheck block takes precedence
fn repology_ignored(package: &Package, info: &VersionBumpInfo) -> bool {
    let Some(repology) = info.repology_latest.as_ref().and_then(VersionReading::as_version)
    else {
        return false;
    };
    let newer_than = |reading: Option<&VersionReading>| {
        reading
            .and_then(VersionReading::as_version)
            .is_none_or(|v| repology > v)
    };

    package.livecheck_defined()
        && newer_than(info.current_version.primary())
        && newer_than(info.new_version.primary())
}

/// The report printed for one package; the first line is the title
pub fn render_report(
    package: &Package,
    name: &str,
    info: &VersionBumpInfo,
    synced_with: &[String],
    pull_requests: bool,
) -> Vec<String> {
    let current_label = format!("Current {} version:", info.kind);
    let mut rows: Vec<(String, String)> = vec![
        (current_label, annotated_current(info)),
        (
            "Latest livecheck version:".to_string(),
            info.new_version.to_string(),
        ),
    ];
    if let Some(repology) = &info.repology_latest {
        rows.push(("Latest Repology version:".to_string(), repology.to_string()));
    }
    if !synced_with.is_empty() {
        rows.push((
            "Version syncing:".to_string(),
            format!(
                "{} version should be kept in sync with {}.",
                name,
                synced_with.join(", ")
            ),
        ));
    }
    if pull_requests && info.bump_candidate() {
        rows.push((
            "Duplicate pull requests:".to_string(),
            info.duplicate_pull_requests
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ));
        if info.duplicate_pull_requests.is_none() {
            rows.push((
                "Maybe duplicate pull requests:".to_string(),
                info.maybe_duplicate_pull_requests
                    .clone()
                    .unwrap_or_else(|| "none".to_string()),
            ));
        }
    }

    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut lines = vec![name.to_string()];
    lines.extend(
        rows.into_iter()
            .map(|(label, value)| format!("{:<width$} {}", label, value, width = width)),
    );

    if repology_ignored(package, info) {
        lines.push(format!(
            "{} was not bumped to the Repology version because it has a `livecheck` block.",
            name
        ));
    }
    lines
}

/// Whether `--open-pr` should actually open one for this package.
///
/// Requires that the duplicate search actually ran and found nothing, and
/// never bumps to a Repology version when the package may have a livecheck
/// block of its own.
pub fn should_open_pr(args: &BumpArgs, package: &Package, info: &VersionBumpInfo) -> bool {
    args.open_pr
        && !args.no_pull_requests
        && info.bump_candidate()
        && info.pull_requests_checked
        && info.duplicate_pull_requests.is_none()
        && !(info.new_from_repology && package.livecheck_defined())
}

/// Arguments for `brew bump-<kind>-pr`
pub fn pr_creation_args(
    package: &Package,
    info: &VersionBumpInfo,
    args: &BumpArgs,
    synced_with: &[String],
) -> Vec<String> {
    let mut pr_args = vec![
        format!("bump-{}-pr", package.kind()),
        package.full_name().to_string(),
    ];

    let new = &info.new_version;
    match (new.arm(), new.intel()) {
        (Some(arm), Some(intel)) => {
            pr_args.push(format!("--version-arm={}", arm));
            pr_args.push(format!("--version-intel={}", intel));
        }
        _ => {
            if let Some(version) = new.primary() {
                pr_args.push(format!("--version={}", version));
            }
        }
    }

    pr_args.push("--no-browse".to_string());
    pr_args.push(format!("--message={}", PR_MESSAGE));
    if args.no_fork {
        pr_args.push("--no-fork".to_string());
    }
    if package.kind() == PackageKind::Formula && !synced_with.is_empty() {
        pr_args.push(format!("--bump-synced={}", synced_with.join(",")));
    }
    pr_args
}
