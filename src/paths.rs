use std::fmt;
use std::path::{Component, Path};

/// Whether the filesystem under a root compares names case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    /// Best guess for the host platform: macOS and Windows default to
    /// case-insensitive volumes.
    pub fn native() -> Self {
        if cfg!(any(target_os = "macos", windows)) {
            CaseSensitivity::Insensitive
        } else {
            CaseSensitivity::Sensitive
        }
    }

    pub fn is_insensitive(self) -> bool {
        self == CaseSensitivity::Insensitive
    }

    /// Build the membership key for a relative path.
    pub fn key(self, path: &str) -> PathKey {
        match self {
            CaseSensitivity::Sensitive => PathKey(path.to_string()),
            CaseSensitivity::Insensitive => PathKey(path.to_lowercase()),
        }
    }

    /// Compare two names under this sensitivity.
    pub fn names_equal(self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => a == b || a.to_lowercase() == b.to_lowercase(),
        }
    }
}

impl Default for CaseSensitivity {
    fn default() -> Self {
        Self::native()
    }
}

/// Comparison key for a relative path. Only used for set membership; the
/// original spelling is always kept alongside for display and emission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a relative path to posix form.
///
/// `.` components are dropped and `..` components are folded. Returns `None`
/// for absolute paths, paths that climb above the root, and empty paths.
pub fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Turn a native relative path into posix form without further checks.
pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory part of a relative posix path (`""` for root-level files).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final component of a relative posix path.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Extension of a file name, if it has one. Dotfiles such as `.gitignore`
/// and names ending in a dot have none.
pub fn extension(name: &str) -> Option<&str> {
    let idx = name.rfind('.')?;
    if idx == 0 || idx + 1 == name.len() {
        return None;
    }
    Some(&name[idx + 1..])
}

/// All proper ancestor directories of a relative path, nearest first,
/// ending with the root (`""`).
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(path);
    std::iter::from_fn(move || {
        let path = current?;
        if path.is_empty() {
            current = None;
            return None;
        }
        let parent = parent_dir(path);
        current = Some(parent);
        Some(parent)
    })
}

/// Whether `path` lies inside directory `dir` (at any depth).
pub fn is_within(path: &str, dir: &str) -> bool {
    dir.is_empty()
        || (path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/')
}

/// Whether a path component marks a hidden entry.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}
