//! Library interface for brewmaint, a Homebrew maintainer toolkit
//!
//! Two tools share this crate: `bump`, which compares formulae and casks
//! against their upstream releases and opens version bump pull requests, and
//! `generate-zap`, which infers the `zap` stanza of a cask from the files an
//! application leaves on disk.

pub mod api;
pub mod cask;
pub mod cellar;
pub mod colors;
pub mod commands;
pub mod config;
pub mod error;
pub mod github;
pub mod livecheck;
pub mod package;
pub mod repology;
pub mod resolver;
pub mod tap;
pub mod version;
pub mod version_parser;
pub mod zap;

pub use error::{MaintError, Result};
pub use version::{Version, VersionMessage, VersionReading};
pub use zap::{ZapScanner, ZapStanza, collapse_to_wildcards};
