//! Reconciling a package's current version with upstream.
//!
//! For every architecture the package resolves differently under, the
//! resolver asks livecheck for the latest upstream release and picks one
//! "new version" reading, consulting Repology only when the package has no
//! livecheck block of its own. The per-architecture readings are folded into
//! [`VersionParser`]s, compared, and, when a bump looks warranted, checked
//! against pull requests that already propose it.

use crate::error::{MaintError, Result};
use crate::github::{self, PullRequest, PullRequestSearch};
use crate::livecheck::{Livecheck, LivecheckResult};
use crate::package::{Package, PackageKind};
use crate::repology::Catalog;
use crate::tap;
use crate::version::{Version, VersionMessage, VersionReading};
use crate::version_parser::{
    self, Arch, ByArch, Comparison, MultipleVersions, VersionKey, VersionParser,
};
use tracing::{debug, warn};

/// Per-package switches decided by the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    pub pull_requests: bool,
    pub repology: bool,
}

/// Everything the bump report knows about one package
#[derive(Debug, Clone)]
pub struct VersionBumpInfo {
    pub kind: PackageKind,
    pub deprecated: ByArch<bool>,
    pub multiple_versions: MultipleVersions,
    pub current_version: VersionParser,
    pub new_version: VersionParser,
    /// `None` when Repology was not consulted
    pub repology_latest: Option<VersionReading>,
    pub newer_than_upstream: ByArch<bool>,
    /// At least one architecture's new version was taken from Repology
    pub new_from_repology: bool,
    /// The duplicate pull request search ran for this package
    pub pull_requests_checked: bool,
    pub duplicate_pull_requests: Option<String>,
    pub maybe_duplicate_pull_requests: Option<String>,
}

impl VersionBumpInfo {
    /// The new version is a real version, differs from the current one and
    /// not every architecture is already ahead of upstream.
    pub fn bump_candidate(&self) -> bool {
        self.new_version.all_versions()
            && self.new_version != self.current_version
            && !self.newer_than_upstream.all_true()
    }
}

/// Choose the new-version reading for one architecture
pub fn select_new_version(
    current: &Version,
    livecheck: &VersionReading,
    repology: Option<&VersionReading>,
    livecheck_defined: bool,
) -> Option<VersionReading> {
    let repology_version = repology.and_then(VersionReading::as_version);

    if let Some(latest) = livecheck.as_version()
        && latest >= current
    {
        return Some(livecheck.clone());
    }
    if current.is_latest() {
        return Some(livecheck.clone());
    }
    if livecheck == &VersionReading::Message(VersionMessage::Skipped) {
        return Some(livecheck.clone());
    }
    if let Some(repology_version) = repology_version
        && repology_version > current
        && !livecheck_defined
    {
        return Some(VersionReading::Version(repology_version.clone()));
    }

    // Surface whatever real version we have, even an older one
    if livecheck.is_version() {
        return Some(livecheck.clone());
    }
    if !livecheck_defined {
        return repology_version.cloned().map(VersionReading::Version);
    }
    None
}

fn livecheck_reading(result: LivecheckResult) -> VersionReading {
    match result {
        LivecheckResult::Version {
            latest,
            latest_throttled,
        } => match latest_throttled {
            None => VersionReading::version(&latest),
            Some(Some(throttled)) => VersionReading::version(&throttled),
            Some(None) => VersionMessage::UnableToGetThrottledVersions.into(),
        },
        LivecheckResult::Skipped(reason) => {
            debug!("livecheck skipped: {}", reason);
            VersionMessage::Skipped.into()
        }
        LivecheckResult::Error(message) => VersionMessage::Error(message).into(),
    }
}

pub struct UpstreamVersionResolver<'a> {
    livecheck: &'a dyn Livecheck,
    catalog: &'a dyn Catalog,
    pull_requests: &'a dyn PullRequestSearch,
}

impl<'a> UpstreamVersionResolver<'a> {
    pub fn new(
        livecheck: &'a dyn Livecheck,
        catalog: &'a dyn Catalog,
        pull_requests: &'a dyn PullRequestSearch,
    ) -> Self {
        Self {
            livecheck,
            catalog,
            pull_requests,
        }
    }

    async fn repology_latest(&self, package: &Package) -> VersionReading {
        let repositories = [package.kind().repology_repository()];
        match self.catalog.latest_version(package.name(), &repositories).await {
            Ok(Some(version)) => VersionReading::version(&version),
            Ok(None) => VersionMessage::NotFound.into(),
            Err(e) => {
                warn!("Repology lookup failed for {}: {}", package.name(), e);
                VersionMessage::Error(e.to_string()).into()
            }
        }
    }

    pub async fn resolve(
        &self,
        package: &Package,
        options: ResolveOptions,
    ) -> Result<VersionBumpInfo> {
        let repology_latest = if options.repology {
            Some(self.repology_latest(package).await)
        } else {
            None
        };

        let arches: Vec<Option<Arch>> = if package.has_arch_variations() {
            Arch::ALL.into_iter().map(Some).collect()
        } else {
            vec![None]
        };

        let mut current_readings = ByArch::default();
        let mut new_readings = ByArch::default();
        let mut deprecated = ByArch::default();
        let mut new_from_repology = false;
        let mut host_result: Option<LivecheckResult> = None;

        for arch in arches {
            let key = VersionKey::from(arch);
            deprecated.set(key, package.deprecated_for(arch));

            let Some(current_raw) = package.version_for(arch) else {
                continue;
            };
            let current = Version::parse(&current_raw);

            let result = match host_result.clone() {
                Some(result) => result,
                None => {
                    let result = self.livecheck.check(package, arch).await;
                    if !self.livecheck.per_arch() {
                        host_result = Some(result.clone());
                    }
                    result
                }
            };
            let livecheck = livecheck_reading(result);
            if let Some(new) = select_new_version(
                &current,
                &livecheck,
                repology_latest.as_ref(),
                package.livecheck_defined(),
            ) {
                new_from_repology |= new != livecheck;
                new_readings.set(key, new);
            }
            current_readings.set(key, VersionReading::Version(current));
        }

        current_readings.collapse_identical_arches();
        new_readings.collapse_identical_arches();
        deprecated.collapse_identical_arches();

        let current_version = VersionParser::from_readings(current_readings)?;
        let new_version = VersionParser::from_readings(new_readings).unwrap_or_else(|_| {
            VersionParser::general_only(VersionMessage::UnableToGetVersions.into())
        });

        let Comparison {
            multiple_versions,
            newer_than_upstream,
        } = version_parser::compare(&current_version, &new_version);

        let mut info = VersionBumpInfo {
            kind: package.kind(),
            deprecated,
            multiple_versions,
            current_version,
            new_version,
            repology_latest,
            newer_than_upstream,
            new_from_repology,
            pull_requests_checked: false,
            duplicate_pull_requests: None,
            maybe_duplicate_pull_requests: None,
        };

        if options.pull_requests
            && info.bump_candidate()
            && let Some(tap) = package.tap()
        {
            let repo = tap::remote_repo(tap)?;
            let version = info.new_version.primary().map(ToString::to_string);

            let duplicates = self
                .search_pull_requests(package.name(), &repo, version.as_deref())
                .await?;
            info.pull_requests_checked = true;
            info.duplicate_pull_requests = github::format_pull_requests(&duplicates);

            if duplicates.is_empty() {
                let maybe = self.search_pull_requests(package.name(), &repo, None).await?;
                info.maybe_duplicate_pull_requests = github::format_pull_requests(&maybe);
            }
        }

        Ok(info)
    }

    async fn search_pull_requests(
        &self,
        name: &str,
        repo: &str,
        version: Option<&str>,
    ) -> Result<Vec<PullRequest>> {
        match self
            .pull_requests
            .search_pull_requests(name, repo, version)
            .await
        {
            Err(MaintError::ValidationFailed(message)) => {
                debug!("PR search for {} rejected: {}", name, message);
                Ok(Vec::new())
            }
            other => other,
        }
    }
}
