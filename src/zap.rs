//! Zap stanza inference - finding the files an application leaves behind.
//!
//! Generation runs in four passes:
//!
//! 1. [`ZapScanner::scan`] lists entries in a fixed catalog of user and system
//!    locations whose name contains the application name (case-insensitive),
//!    plus dotfiles directly under the home directory.
//! 2. [`collapse_to_wildcards`] merges siblings that share a literal prefix
//!    (`com.example.foo`, `com.example.foo.plist` → `com.example.foo*`).
//! 3. [`replace_uuids`] turns UUID path segments into `*`.
//! 4. [`derive_rmdir_candidates`] proposes the app's own container
//!    directories for `rmdir:`, never shared system locations.
//!
//! [`ZapStanza`] renders the result in cask syntax.

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Locations relative to the home directory
pub const USER_LOCATIONS: &[&str] = &[
    "Library",
    "Library/Application Scripts",
    "Library/Application Support",
    "Library/Application Support/CrashReporter",
    "Library/Application Support/com.apple.sharedfilelist/com.apple.LSSharedFileList.ApplicationRecentDocuments",
    "Library/Caches",
    "Library/Caches/com.apple.helpd/Generated",
    "Library/Caches/com.plausiblelabs.crashreporter.data",
    "Library/Containers",
    "Library/Cookies",
    "Library/Group Containers",
    "Library/HTTPStorages",
    "Library/Internet Plug-Ins",
    "Library/LaunchAgents",
    "Library/Logs",
    "Library/Logs/DiagnosticReports",
    "Library/Preferences",
    "Library/Preferences/ByHost",
    "Library/Saved Application State",
    "Library/WebKit",
];

/// Absolute system locations
pub const SYSTEM_LOCATIONS: &[&str] = &[
    "/Library/Application Support",
    "/Library/Caches",
    "/Library/Extensions",
    "/Library/Internet Plug-Ins",
    "/Library/LaunchAgents",
    "/Library/LaunchDaemons",
    "/Library/Logs",
    "/Library/Preferences",
    "/Library/PrivilegedHelperTools",
    "/Users/Shared",
    "/private/var/db/receipts",
    "/private/var/tmp",
];

/// Shared directories `rmdir:` must never propose. Entries without a leading
/// `/` are home-relative and match with or without the `~/` prefix.
const RMDIR_DENYLIST: &[&str] = &[
    "Library",
    "Library/Application Scripts",
    "Library/Application Support",
    "Library/Application Support/CrashReporter",
    "Library/Application Support/com.apple.sharedfilelist",
    "Library/Caches",
    "Library/Containers",
    "Library/Group Containers",
    "Library/Logs",
    "Library/Preferences",
    "Library/Preferences/ByHost",
    "/Library",
    "/Library/Application Support",
    "/Library/Caches",
    "/Library/LaunchAgents",
    "/Library/LaunchDaemons",
    "/Library/Logs",
    "/Library/Preferences",
    "/Library/PrivilegedHelperTools",
    "/Users/Shared",
    "/private/var/db/receipts",
];

/// Parent segments under which an app owns its own directory
const RMDIR_PARENTS: &[&str] = &["Application Support", "Containers", "Group Containers"];

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid UUID pattern")
});

/// Rewrite a path under `home` as `~/...`
pub fn normalize_home(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.display().to_string(),
    }
}

/// Matched paths, split by how the stanza removes them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Paths under the home directory, moved to the trash
    pub trash: Vec<String>,
    /// System paths, deleted outright
    pub delete: Vec<String>,
}

/// Walks the location catalog looking for an application's files
#[derive(Debug, Clone)]
pub struct ZapScanner {
    home: PathBuf,
    root: PathBuf,
}

impl ZapScanner {
    /// `root` is where absolute system locations are resolved (`/` normally)
    pub fn new(home: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            root: root.into(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn scan(&self, app_name: &str) -> ScanResult {
        let pattern = app_name.to_lowercase();
        let mut trash = BTreeSet::new();
        let mut delete = BTreeSet::new();

        for location in USER_LOCATIONS {
            for path in matching_entries(&self.home.join(location), &pattern, false) {
                trash.insert(normalize_home(&path, &self.home));
            }
        }

        for path in matching_entries(&self.home, &pattern, true) {
            trash.insert(normalize_home(&path, &self.home));
        }

        for location in SYSTEM_LOCATIONS {
            let relative = location.trim_start_matches('/');
            for path in matching_entries(&self.root.join(relative), &pattern, false) {
                if let Ok(rest) = path.strip_prefix(&self.root) {
                    delete.insert(format!("/{}", rest.display()));
                }
            }
        }

        ScanResult {
            trash: trash.into_iter().collect(),
            delete: delete.into_iter().collect(),
        }
    }
}

/// Entries of `dir` whose name contains `pattern`. A missing or unreadable
/// directory has no matches.
fn matching_entries(dir: &Path, pattern: &str, dotfiles_only: bool) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    entries
        .flatten()
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            (!dotfiles_only || name.starts_with('.')) && name.contains(pattern)
        })
        .map(|entry| entry.path())
        .collect()
}

fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

fn join_parent(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Merge siblings sharing a literal filename prefix into `<prefix>*`.
///
/// Within each directory, basenames are taken in input order; each unclaimed
/// basename claims every later-or-earlier unclaimed sibling that starts with
/// it. Clusters of two or more become a wildcard, singletons pass through.
/// Entries in different directories never merge. Output is sorted.
pub fn collapse_to_wildcards(paths: &[String]) -> Vec<String> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for path in paths {
        let (parent, name) = split_parent(path);
        match groups.iter_mut().find(|(p, _)| *p == parent) {
            Some((_, names)) => {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            None => groups.push((parent, vec![name])),
        }
    }

    let mut collapsed = BTreeSet::new();
    for (parent, names) in groups {
        let mut claimed = vec![false; names.len()];
        for i in 0..names.len() {
            if claimed[i] {
                continue;
            }
            claimed[i] = true;

            let mut members = 1;
            for j in 0..names.len() {
                if !claimed[j] && names[j].starts_with(names[i]) {
                    claimed[j] = true;
                    members += 1;
                }
            }

            let entry = if members > 1 {
                format!("{}*", names[i])
            } else {
                names[i].to_string()
            };
            collapsed.insert(join_parent(parent, &entry));
        }
    }

    collapsed.into_iter().collect()
}

/// Replace UUID-shaped tokens with `*`, then deduplicate and sort
pub fn replace_uuids(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|path| UUID_RE.replace_all(path, "*").into_owned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Shared directories, plus every location the scanner searches
fn denylisted(candidate: &str) -> bool {
    let mut shared = RMDIR_DENYLIST
        .iter()
        .chain(USER_LOCATIONS)
        .chain(SYSTEM_LOCATIONS);
    shared.any(|entry| {
        candidate == *entry
            || candidate
                .strip_prefix("~/")
                .is_some_and(|bare| !entry.starts_with('/') && bare == *entry)
    })
}

/// Parent directories of matched paths that can be removed once empty.
///
/// Only parents inside an `Application Support`, `Containers` or
/// `Group Containers` directory qualify; shared locations and paths already
/// listed for removal are excluded.
pub fn derive_rmdir_candidates(paths: &[String], home: &Path) -> Vec<String> {
    let matched: HashSet<&str> = paths.iter().map(String::as_str).collect();

    paths
        .iter()
        .filter_map(|path| {
            let (parent, _) = split_parent(path);
            if parent.is_empty() {
                return None;
            }
            let owned_by_app = parent
                .split('/')
                .any(|segment| RMDIR_PARENTS.contains(&segment));
            owned_by_app.then(|| normalize_home(Path::new(parent), home))
        })
        .filter(|candidate| !denylisted(candidate))
        .filter(|candidate| !matched.contains(candidate.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The directives of a `zap` stanza
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZapStanza {
    pub trash: Vec<String>,
    pub delete: Vec<String>,
    pub rmdir: Vec<String>,
}

impl ZapStanza {
    /// Run the full inference pipeline over a scan
    pub fn from_scan(scan: ScanResult, home: &Path) -> Self {
        let trash = replace_uuids(&collapse_to_wildcards(&scan.trash));
        let delete = replace_uuids(&collapse_to_wildcards(&scan.delete));

        let combined: Vec<String> = trash.iter().chain(delete.iter()).cloned().collect();
        let rmdir = derive_rmdir_candidates(&combined, home);

        Self {
            trash,
            delete,
            rmdir,
        }
    }

    /// Nothing to trash or delete, so the cask needs no stanza
    pub fn is_empty(&self) -> bool {
        self.trash.is_empty() && self.delete.is_empty()
    }
}

fn render_directive(key: &str, paths: &[String]) -> String {
    if let [single] = paths {
        return format!("{}: \"{}\"", key, single);
    }

    let mut out = format!("{}: [\n", key);
    for path in paths {
        out.push_str(&format!("       \"{}\",\n", path));
    }
    out.push_str("    ]");
    out
}

impl fmt::Display for ZapStanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let directives: Vec<String> = [
            ("trash", &self.trash),
            ("delete", &self.delete),
            ("rmdir", &self.rmdir),
        ]
        .into_iter()
        .filter(|(_, paths)| !paths.is_empty())
        .map(|(key, paths)| render_directive(key, paths))
        .collect();

        write!(f, "zap {}", directives.join(",\n    "))
    }
}

/// Printed in place of a stanza when nothing was found
pub const NO_ZAP_STANZA: &str = "no zap stanza required";

/// Render a stanza from already-inferred directives; `None` when there is
/// nothing to trash or delete
pub fn format_stanza(trash: &[String], delete: &[String], rmdir: &[String]) -> Option<String> {
    let stanza = ZapStanza {
        trash: trash.to_vec(),
        delete: delete.to_vec(),
        rmdir: rmdir.to_vec(),
    };
    (!stanza.is_empty()).then(|| stanza.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_normalize_home() {
        let home = Path::new("/Users/me");
        assert_eq!(
            normalize_home(Path::new("/Users/me/Library/Caches/foo"), home),
            "~/Library/Caches/foo"
        );
        assert_eq!(normalize_home(Path::new("/Users/me"), home), "~");
        assert_eq!(
            normalize_home(Path::new("/Library/Caches/foo"), home),
            "/Library/Caches/foo"
        );
        assert_eq!(
            normalize_home(Path::new("/Users/meagain/foo"), home),
            "/Users/meagain/foo"
        );
    }

    #[test]
    fn test_collapse_siblings() {
        let paths = strings(&[
            "~/Library/Application Scripts/com.example.foo",
            "~/Library/Application Scripts/com.example.foo.plist",
        ]);
        assert_eq!(
            collapse_to_wildcards(&paths),
            strings(&["~/Library/Application Scripts/com.example.foo*"])
        );
    }

    #[test]
    fn test_collapse_keeps_singletons() {
        let paths = strings(&[
            "~/Library/Caches/com.example.foo",
            "~/Library/Caches/org.other.foo",
        ]);
        assert_eq!(collapse_to_wildcards(&paths), paths);
    }

    #[test]
    fn test_collapse_never_crosses_directories() {
        let paths = strings(&[
            "~/Library/Caches/com.example.foo",
            "~/Library/Preferences/com.example.foo.plist",
        ]);
        assert_eq!(collapse_to_wildcards(&paths), paths);
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let paths = strings(&[
            "~/Library/Caches/com.example.foo",
            "~/Library/Caches/com.example.foo.helper",
            "~/Library/Preferences/com.example.foo.plist",
        ]);
        let once = collapse_to_wildcards(&paths);
        assert_eq!(collapse_to_wildcards(&once), once);
    }

    #[test]
    fn test_collapse_is_order_independent_across_directories() {
        let a = strings(&[
            "~/Library/Caches/foo",
            "~/Library/Caches/foo.bar",
            "~/Library/Logs/foo",
        ]);
        let b = strings(&[
            "~/Library/Logs/foo",
            "~/Library/Caches/foo",
            "~/Library/Caches/foo.bar",
        ]);
        assert_eq!(collapse_to_wildcards(&a), collapse_to_wildcards(&b));
    }

    #[test]
    fn test_collapse_first_seen_is_representative() {
        // The longer name comes first, so it cannot claim its own prefix
        let paths = strings(&["~/Library/Caches/foo.bar", "~/Library/Caches/foo"]);
        assert_eq!(
            collapse_to_wildcards(&paths),
            strings(&["~/Library/Caches/foo", "~/Library/Caches/foo.bar"])
        );

        let paths = strings(&[
            "~/Library/Caches/foo",
            "~/Library/Caches/foo.bar",
            "~/Library/Caches/foo.baz",
        ]);
        assert_eq!(
            collapse_to_wildcards(&paths),
            strings(&["~/Library/Caches/foo*"])
        );
    }

    #[test]
    fn test_replace_uuids() {
        let paths = strings(&[
            "~/Library/Group Containers/1BBE8750-D851-5930-A16F-BE4B820B4537.com.example.foo",
            "~/Library/Group Containers/2ccf9861-e962-6a41-b27a-cf5c931c5648.com.example.foo",
        ]);
        assert_eq!(
            replace_uuids(&paths),
            strings(&["~/Library/Group Containers/*.com.example.foo"])
        );
    }

    #[test]
    fn test_replace_uuids_ignores_non_uuid() {
        let paths = strings(&["~/Library/Caches/1BBE8750-D851-com.example"]);
        assert_eq!(replace_uuids(&paths), paths);
    }

    #[test]
    fn test_rmdir_includes_app_directory() {
        let home = Path::new("/Users/me");
        let paths = strings(&["~/Library/Application Support/Foo/config.json"]);
        assert_eq!(
            derive_rmdir_candidates(&paths, home),
            strings(&["~/Library/Application Support/Foo"])
        );
    }

    #[test]
    fn test_rmdir_excludes_shared_locations() {
        let home = Path::new("/Users/me");
        let paths = strings(&[
            "~/Library/Preferences/com.example.foo.plist",
            "~/Library/Application Support/CrashReporter/Foo_1234.plist",
            "~/Library/Application Support/Foo",
            "~/Library/Containers/com.example.foo",
            "/Library/Application Support/Foo",
        ]);
        assert!(derive_rmdir_candidates(&paths, home).is_empty());
    }

    #[test]
    fn test_rmdir_excludes_scanned_locations() {
        let home = Path::new("/Users/me");
        let paths = strings(&[
            "~/Library/Application Support/com.apple.sharedfilelist/com.apple.LSSharedFileList.ApplicationRecentDocuments/com.example.foo.sfl3",
        ]);
        assert!(derive_rmdir_candidates(&paths, home).is_empty());

        for location in USER_LOCATIONS {
            assert!(denylisted(&format!("~/{}", location)), "{}", location);
        }
        for location in SYSTEM_LOCATIONS {
            assert!(denylisted(location), "{}", location);
        }
    }

    #[test]
    fn test_rmdir_excludes_already_matched() {
        let home = Path::new("/Users/me");
        let paths = strings(&[
            "~/Library/Group Containers/group.foo",
            "~/Library/Group Containers/group.foo/Library",
        ]);
        assert!(derive_rmdir_candidates(&paths, home).is_empty());
    }

    #[test]
    fn test_rmdir_normalizes_home() {
        let home = Path::new("/Users/me");
        let paths = strings(&["/Users/me/Library/Containers/com.foo/Data"]);
        assert_eq!(
            derive_rmdir_candidates(&paths, home),
            strings(&["~/Library/Containers/com.foo"])
        );
    }

    #[test]
    fn test_format_single_trash() {
        let stanza = ZapStanza {
            trash: strings(&["~/Library/Preferences/com.example.foo.plist"]),
            ..ZapStanza::default()
        };
        assert_eq!(
            stanza.to_string(),
            r#"zap trash: "~/Library/Preferences/com.example.foo.plist""#
        );
    }

    #[test]
    fn test_format_multiple_trash() {
        let stanza = ZapStanza {
            trash: strings(&["~/Library/Caches/foo", "~/Library/Preferences/foo.plist"]),
            ..ZapStanza::default()
        };
        assert_eq!(
            stanza.to_string(),
            "zap trash: [\n       \"~/Library/Caches/foo\",\n       \"~/Library/Preferences/foo.plist\",\n    ]"
        );
    }

    #[test]
    fn test_format_all_directives() {
        let stanza = ZapStanza {
            trash: strings(&["~/Library/Application Support/Foo/a", "~/Library/Caches/foo"]),
            delete: strings(&["/Library/LaunchDaemons/com.foo.helper.plist"]),
            rmdir: strings(&["~/Library/Application Support/Foo"]),
        };
        let expected = "zap trash: [\n       \"~/Library/Application Support/Foo/a\",\n       \"~/Library/Caches/foo\",\n    ],\n    delete: \"/Library/LaunchDaemons/com.foo.helper.plist\",\n    rmdir: \"~/Library/Application Support/Foo\"";
        assert_eq!(stanza.to_string(), expected);

        let rendered = stanza.to_string();
        let trash = rendered.find("trash:").unwrap();
        let delete = rendered.find("delete:").unwrap();
        let rmdir = rendered.find("rmdir:").unwrap();
        assert!(trash < delete && delete < rmdir);
    }

    #[test]
    fn test_format_stanza() {
        assert_eq!(format_stanza(&[], &[], &strings(&["~/Library/Containers/foo"])), None);
        assert_eq!(
            format_stanza(&[], &strings(&["/Library/Logs/foo.log"]), &[]).as_deref(),
            Some(r#"zap delete: "/Library/Logs/foo.log""#)
        );
    }

    #[test]
    fn test_empty_stanza() {
        assert!(ZapStanza::default().is_empty());
        let only_rmdir = ZapStanza {
            rmdir: strings(&["~/Library/Application Support/Foo"]),
            ..ZapStanza::default()
        };
        assert!(only_rmdir.is_empty());
    }
}
