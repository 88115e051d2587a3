//! Per-architecture version sets and the comparison between them.
//!
//! A package can report one version for every architecture (`general`) or a
//! separate version for Apple Silicon (`arm`) and Intel (`intel`). The bump
//! report needs to know, per architecture, whether the version we ship is
//! ahead of the one upstream publishes.

use crate::error::{MaintError, Result};
use crate::version::{Version, VersionReading};
use std::fmt;

/// Architectures a package definition can be re-resolved under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    Arm,
    Intel,
}

impl Arch {
    pub const ALL: [Arch; 2] = [Arch::Arm, Arch::Intel];

    pub fn label(self) -> &'static str {
        match self {
            Arch::Arm => "arm",
            Arch::Intel => "intel",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Slot a value is recorded under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionKey {
    General,
    Arm,
    Intel,
}

impl From<Arch> for VersionKey {
    fn from(arch: Arch) -> Self {
        match arch {
            Arch::Arm => VersionKey::Arm,
            Arch::Intel => VersionKey::Intel,
        }
    }
}

impl From<Option<Arch>> for VersionKey {
    fn from(arch: Option<Arch>) -> Self {
        arch.map_or(VersionKey::General, VersionKey::from)
    }
}

/// One optional value per [`VersionKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByArch<T> {
    pub general: Option<T>,
    pub arm: Option<T>,
    pub intel: Option<T>,
}

impl<T> Default for ByArch<T> {
    fn default() -> Self {
        Self {
            general: None,
            arm: None,
            intel: None,
        }
    }
}

impl<T> ByArch<T> {
    pub fn general(value: T) -> Self {
        Self {
            general: Some(value),
            ..Self::default()
        }
    }

    pub fn get(&self, key: VersionKey) -> Option<&T> {
        match key {
            VersionKey::General => self.general.as_ref(),
            VersionKey::Arm => self.arm.as_ref(),
            VersionKey::Intel => self.intel.as_ref(),
        }
    }

    pub fn set(&mut self, key: VersionKey, value: T) {
        match key {
            VersionKey::General => self.general = Some(value),
            VersionKey::Arm => self.arm = Some(value),
            VersionKey::Intel => self.intel = Some(value),
        }
    }

    /// Populated slots in `general`, `arm`, `intel` order
    pub fn entries(&self) -> impl Iterator<Item = (VersionKey, &T)> {
        [
            (VersionKey::General, self.general.as_ref()),
            (VersionKey::Arm, self.arm.as_ref()),
            (VersionKey::Intel, self.intel.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: PartialEq> ByArch<T> {
    /// Fold identical `arm` and `intel` values into `general`.
    ///
    /// An existing `general` value is kept as is.
    pub fn collapse_identical_arches(&mut self) {
        if self.arm.is_some() && self.arm == self.intel {
            let shared = self.arm.take();
            self.intel = None;
            if self.general.is_none() {
                self.general = shared;
            }
        }
    }
}

impl ByArch<bool> {
    /// True when at least one value is present and all present values are true
    pub fn all_true(&self) -> bool {
        !self.is_empty() && self.entries().all(|(_, flag)| *flag)
    }
}

/// Up to three version readings for one package.
///
/// Invariant: at least one slot is populated, and `arm`/`intel` are never
/// both present with the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParser {
    readings: ByArch<VersionReading>,
}

impl VersionParser {
    pub fn new(
        general: Option<VersionReading>,
        arm: Option<VersionReading>,
        intel: Option<VersionReading>,
    ) -> Result<Self> {
        Self::from_readings(ByArch {
            general,
            arm,
            intel,
        })
    }

    pub fn from_readings(mut readings: ByArch<VersionReading>) -> Result<Self> {
        if readings.is_empty() {
            return Err(MaintError::EmptyVersions);
        }
        readings.collapse_identical_arches();
        Ok(Self { readings })
    }

    pub fn general_only(reading: VersionReading) -> Self {
        Self {
            readings: ByArch::general(reading),
        }
    }

    pub fn general(&self) -> Option<&VersionReading> {
        self.readings.general.as_ref()
    }

    pub fn arm(&self) -> Option<&VersionReading> {
        self.readings.arm.as_ref()
    }

    pub fn intel(&self) -> Option<&VersionReading> {
        self.readings.intel.as_ref()
    }

    pub fn readings(&self) -> &ByArch<VersionReading> {
        &self.readings
    }

    pub fn has_arch_readings(&self) -> bool {
        self.readings.arm.is_some() || self.readings.intel.is_some()
    }

    /// More than one distinct slot is populated
    pub fn multiple_versions(&self) -> bool {
        self.readings.len() > 1
    }

    /// Highest real version among the `arm` and `intel` readings
    pub fn max_arch_version(&self) -> Option<&Version> {
        [self.arm(), self.intel()]
            .into_iter()
            .flatten()
            .filter_map(VersionReading::as_version)
            .max()
    }

    /// The reading a PR should be tagged with: `arm` when versions split by
    /// architecture, otherwise `general`.
    pub fn primary(&self) -> Option<&VersionReading> {
        self.arm().or(self.general()).or(self.intel())
    }

    /// Every populated reading is a real version
    pub fn all_versions(&self) -> bool {
        self.readings.entries().all(|(_, r)| r.is_version())
    }
}

impl fmt::Display for VersionParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_arch_readings() {
            if let Some(general) = self.general() {
                return general.fmt(f);
            }
        }

        let parts: Vec<String> = [(Arch::Arm, self.arm()), (Arch::Intel, self.intel())]
            .into_iter()
            .filter_map(|(arch, reading)| reading.map(|r| format!("{}: {}", arch, r)))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Whether `current` or `new` carries more than one version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MultipleVersions {
    pub current: bool,
    pub new: bool,
}

/// Outcome of comparing a package's current and upstream versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub multiple_versions: MultipleVersions,
    pub newer_than_upstream: ByArch<bool>,
}

fn newer(current: &VersionReading, new: Option<&Version>) -> bool {
    match (current.as_version(), new) {
        (Some(current), Some(new)) if !current.is_latest() => current > new,
        _ => false,
    }
}

/// Compare the versions we ship against what upstream publishes.
///
/// Readings are paired per architecture: same slot first, then each current
/// architecture against upstream's `general`, then current `general` against
/// the highest real upstream architecture version. A pair whose upstream side
/// is a message is never reported as newer.
pub fn compare(current: &VersionParser, new: &VersionParser) -> Comparison {
    let mut newer_than_upstream = ByArch::default();

    for (key, current_reading) in current.readings().entries() {
        let upstream = match new.readings().get(key) {
            Some(reading) => reading.as_version(),
            None if key != VersionKey::General => {
                new.general().and_then(VersionReading::as_version)
            }
            None => new.max_arch_version(),
        };

        newer_than_upstream.set(key, newer(current_reading, upstream));
    }

    Comparison {
        multiple_versions: MultipleVersions {
            current: current.multiple_versions(),
            new: new.multiple_versions(),
        },
        newer_than_upstream,
    }
}
