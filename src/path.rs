// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Two kinds of paths matter to ghkeep. __Logical__ paths are what callers
//! hand to the file manager, e.g., `docs/README.md`. __Physical__ paths are
//! what the remote repository actually stores, i.e., the logical path
//! prefixed by the active namespace, e.g., `my-project/docs/README.md`.
//!
//! Resolution only ever goes one way per call. A physical path must never be
//! fed back into [`resolve`], otherwise it gets prefixed twice. Paths handed
//! back by the remote store are turned into logical paths again through
//! [`strip_namespace`].
//!
//! This module also determines where per-user files live on the local
//! machine.

use std::path::{Component, Path, PathBuf};

/// Resolve logical path into physical path under a namespace.
///
/// An empty namespace leaves the logical path untouched. Otherwise at most
/// one leading separator is stripped from the logical path before it gets
/// joined onto the namespace.
pub fn resolve(namespace: &str, logical: &str) -> String {
    if namespace.is_empty() {
        return logical.to_string();
    }

    let stripped = logical.strip_prefix('/').unwrap_or(logical);
    format!("{namespace}/{stripped}")
}

/// Turn physical path handed back by remote store into logical path.
///
/// Paths that do not live under the namespace are returned as is.
pub fn strip_namespace<'a>(namespace: &str, physical: &'a str) -> &'a str {
    if namespace.is_empty() {
        return physical;
    }

    match physical.strip_prefix(namespace) {
        Some("") => "",
        Some(rest) => rest.strip_prefix('/').unwrap_or(physical),
        None => physical,
    }
}

/// Fold `.` and `..` components out of a path without touching the filesystem.
///
/// A `..` at the root stays at the root. A leading `..` on a relative path is
/// kept, since there is nothing to fold it into.
pub fn normalize(path: &Path) -> PathBuf {
    let mut folded = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match folded.components().next_back() {
                Some(Component::Normal(_)) => {
                    folded.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => folded.push(".."),
            },
            component => folded.push(component),
        }
    }

    folded
}

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to global identity file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/ghkeep/config.toml`. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_global_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("ghkeep").join("config.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("", "docs/README.md", "docs/README.md"; "no namespace")]
    #[test_case("", "/docs/README.md", "/docs/README.md"; "no namespace keeps slash")]
    #[test_case("proj", "docs/README.md", "proj/docs/README.md"; "plain prefix")]
    #[test_case("proj", "/docs/README.md", "proj/docs/README.md"; "one slash stripped")]
    #[test_case("proj", "//docs/README.md", "proj//docs/README.md"; "only one slash stripped")]
    #[test_case("proj", "", "proj/"; "namespace root")]
    #[test]
    fn resolve_logical_path(namespace: &str, logical: &str, expect: &str) {
        assert_eq!(resolve(namespace, logical), expect);
    }

    #[test_case("/a/b/..", "/a"; "parent folds")]
    #[test_case("/a/./b/", "/a/b"; "current dir dropped")]
    #[test_case("/a/b/../../..", "/"; "root absorbs parent")]
    #[test_case("a/../../b", "../b"; "relative keeps leading parent")]
    #[test_case("/a/b/../c/..", "/a"; "repeated folding")]
    #[test]
    fn normalize_folds_dots(path: &str, expect: &str) {
        assert_eq!(normalize(Path::new(path)), PathBuf::from(expect));
    }

    #[test]
    fn resolve_never_looks_at_existing_prefix() {
        // Physical paths are not recognized, so feeding one back prefixes again.
        assert_eq!(resolve("proj", "proj/a.md"), "proj/proj/a.md");
    }

    #[test_case("", "proj/a.md", "proj/a.md"; "no namespace")]
    #[test_case("proj", "proj/a.md", "a.md"; "under namespace")]
    #[test_case("proj", "proj", ""; "namespace itself")]
    #[test_case("proj", "project/a.md", "project/a.md"; "sibling with same prefix")]
    #[test_case("proj", "other/a.md", "other/a.md"; "outside namespace")]
    #[test]
    fn strip_namespace_from_physical_path(namespace: &str, physical: &str, expect: &str) {
        assert_eq!(strip_namespace(namespace, physical), expect);
    }
}
