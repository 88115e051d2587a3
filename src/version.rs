//! Package version strings and the readings collected for them.
//!
//! A [`Version`] orders the way the package manager orders versions: the
//! string is split into numeric and alphabetic tokens, numbers compare
//! numerically, pre-release markers (`alpha`, `beta`, `pre`, `rc`) sort below
//! a missing component and patch markers (`p`, `patch`, `post`) above it.
//!
//! A [`VersionReading`] is what a collaborator reported for a package: either
//! a comparable [`Version`] or a [`VersionMessage`] explaining why no version
//! could be determined. Messages never compare as versions.
//!
//! # Examples
//!
//! ```
//! use brewmaint::version::Version;
//!
//! assert!(Version::parse("1.0rc1") < Version::parse("1.0"));
//! assert_eq!(Version::parse("1.0"), Version::parse("1.0.0"));
//! assert!(Version::parse("1.10") > Version::parse("1.9"));
//! ```

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+|[a-z]+").expect("valid token pattern"));

const LATEST: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Digits with leading zeros trimmed, compared by length then lexically
    /// so date-stamped versions never overflow.
    Numeric(String),
    /// `alpha` < `beta` < `pre` < `rc`, then the trailing number.
    PreRelease(u8, u64),
    Patch(u64),
    Alpha(String),
}

fn pre_release_rank(word: &str) -> Option<u8> {
    match word {
        "a" | "alpha" => Some(0),
        "b" | "beta" => Some(1),
        "pre" | "dev" => Some(2),
        "rc" => Some(3),
        _ => None,
    }
}

fn is_patch_marker(word: &str) -> bool {
    matches!(word, "p" | "patch" | "post" | "pl")
}

fn numeric_cmp(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn is_zero(digits: &str) -> bool {
    digits.is_empty()
}

/// Compare two tokens, where `None` is a missing trailing component.
fn cmp_tokens(a: Option<&Token>, b: Option<&Token>) -> Ordering {
    use Token::*;

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(other)) => cmp_tokens(Some(other), None).reverse(),
        (Some(Numeric(n)), None) => {
            if is_zero(n) {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        (Some(PreRelease(..)), None) => Ordering::Less,
        (Some(Patch(_)), None) | (Some(Alpha(_)), None) => Ordering::Greater,

        (Some(Numeric(x)), Some(Numeric(y))) => numeric_cmp(x, y),
        (Some(Numeric(_)), Some(_)) => Ordering::Greater,
        (Some(_), Some(Numeric(_))) => Ordering::Less,

        (Some(PreRelease(r1, n1)), Some(PreRelease(r2, n2))) => r1.cmp(r2).then(n1.cmp(n2)),
        (Some(PreRelease(..)), Some(_)) => Ordering::Less,
        (Some(_), Some(PreRelease(..))) => Ordering::Greater,

        (Some(Patch(x)), Some(Patch(y))) => x.cmp(y),
        (Some(Patch(_)), Some(Alpha(_))) => Ordering::Greater,
        (Some(Alpha(_)), Some(Patch(_))) => Ordering::Less,

        (Some(Alpha(x)), Some(Alpha(y))) => x.cmp(y),
    }
}

/// Strip a trailing `_N` formula revision (`1.4.0_32` -> `1.4.0`)
fn strip_revision(version: &str) -> &str {
    if let Some(pos) = version.rfind('_') {
        let suffix = &version[pos + 1..];
        if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
            return &version[..pos];
        }
    }
    version
}

fn tokenize(version: &str) -> Vec<Token> {
    let lowered = strip_revision(version).to_ascii_lowercase();
    let mut tokens = Vec::new();
    let mut matches = TOKEN_RE.find_iter(&lowered).peekable();

    while let Some(m) = matches.next() {
        let text = m.as_str();
        if text.as_bytes()[0].is_ascii_digit() {
            tokens.push(Token::Numeric(text.trim_start_matches('0').to_string()));
            continue;
        }

        // A marker directly followed by digits owns them (`rc1`, `p2`)
        let mut attached = || -> u64 {
            match matches.peek() {
                Some(next)
                    if next.start() == m.end() && next.as_str().as_bytes()[0].is_ascii_digit() =>
                {
                    let value = next.as_str().parse().unwrap_or(u64::MAX);
                    matches.next();
                    value
                }
                _ => 0,
            }
        };

        if let Some(rank) = pre_release_rank(text) {
            tokens.push(Token::PreRelease(rank, attached()));
        } else if is_patch_marker(text) {
            tokens.push(Token::Patch(attached()));
        } else {
            tokens.push(Token::Alpha(text.to_string()));
        }
    }

    tokens
}

/// A comparable package version
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    tokens: Vec<Token>,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        Self {
            raw: raw.to_string(),
            tokens: tokenize(raw),
        }
    }

    /// Whether this is the `latest` sentinel casks use for unversioned downloads
    pub fn is_latest(&self) -> bool {
        self.raw.eq_ignore_ascii_case(LATEST)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.tokens.len().max(other.tokens.len());
        for i in 0..len {
            match cmp_tokens(self.tokens.get(i), other.tokens.get(i)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Why a collaborator could not produce a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionMessage {
    Skipped,
    UnableToGetVersions,
    UnableToGetThrottledVersions,
    /// The catalog has no entry for the package
    NotFound,
    Error(String),
}

impl fmt::Display for VersionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => f.write_str("skipped"),
            Self::UnableToGetVersions => f.write_str("unable to get versions"),
            Self::UnableToGetThrottledVersions => f.write_str("unable to get throttled versions"),
            Self::NotFound => f.write_str("not found"),
            Self::Error(details) => write!(f, "error: {}", details),
        }
    }
}

/// A single observation of a package's version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionReading {
    Version(Version),
    Message(VersionMessage),
}

impl VersionReading {
    pub fn version(raw: &str) -> Self {
        Self::Version(Version::parse(raw))
    }

    pub fn as_version(&self) -> Option<&Version> {
        match self {
            Self::Version(v) => Some(v),
            Self::Message(_) => None,
        }
    }

    pub fn is_version(&self) -> bool {
        matches!(self, Self::Version(_))
    }
}

impl From<Version> for VersionReading {
    fn from(version: Version) -> Self {
        Self::Version(version)
    }
}

impl From<VersionMessage> for VersionReading {
    fn from(message: VersionMessage) -> Self {
        Self::Message(message)
    }
}

impl fmt::Display for VersionReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version(v) => v.fmt(f),
            Self::Message(m) => m.fmt(f),
        }
    }
}
