use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use tracing::{debug, trace, warn};

use crate::error::PatternError;
use crate::fs::{FileSystem, FsEntry, OsFileSystem};
use crate::paths::{ancestors, is_hidden, normalize_relative, CaseSensitivity, PathKey};
use crate::pattern::{compile_glob_set, is_literal, unescape_literal, ParsedPatternSet};

/// Knobs for expanding patterns against a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Descend into symlinked directories and return symlinked files, as long
    /// as they resolve inside the root.
    pub follow_symlinks: bool,
    /// Match dot-prefixed files and directories.
    pub include_hidden: bool,
    /// Honor `.gitignore` files found during the walk.
    pub respect_gitignore: bool,
    pub case: CaseSensitivity,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: false,
            respect_gitignore: true,
            case: CaseSensitivity::native(),
        }
    }
}

/// Expands pattern sets against a root through a [`FileSystem`].
pub struct PatternMatcher<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    options: MatchOptions,
}

impl<'a, F: FileSystem + ?Sized> PatternMatcher<'a, F> {
    pub fn new(fs: &'a F, options: MatchOptions) -> Self {
        Self { fs, options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Expand `set` under `root` into sorted, unique relative paths.
    ///
    /// Glob includes are matched against the walked tree. Literal includes
    /// name one file and are looked up directly, so they also reach files the
    /// walk hides (dotfiles, gitignored files, symlinks). Excludes veto a file
    /// when they match it or any of its parent directories.
    pub fn expand(&self, root: &Path, set: &ParsedPatternSet) -> Result<Vec<String>, PatternError> {
        let real_root = self.check_root(root)?;
        let case = self.options.case;

        let (literals, globs): (Vec<&String>, Vec<&String>) =
            set.include.iter().partition(|p| is_literal(p));
        let excludes = compile_glob_set(&set.exclude, case);

        let mut found: BTreeMap<PathKey, String> = BTreeMap::new();

        if !globs.is_empty() {
            let includes = compile_glob_set(globs.iter().copied(), case);
            for path in self.walk_from(root, &real_root)? {
                if includes.is_match(&path) && !is_excluded(&excludes, &path) {
                    found.entry(case.key(&path)).or_insert(path);
                }
            }
        }

        for literal in literals {
            let Some(rel) = normalize_relative(&unescape_literal(literal)) else {
                warn!("skipping pattern outside the root: {}", literal);
                continue;
            };
            if let Some(path) = self.resolve_literal(root, &rel)? {
                if !is_excluded(&excludes, &path) {
                    found.entry(case.key(&path)).or_insert(path);
                }
            }
        }

        let mut paths: Vec<String> = found.into_values().collect();
        paths.sort();
        debug!("expanded {} patterns to {} files", set.include.len(), paths.len());
        Ok(paths)
    }

    /// Every file a catch-all include would reach, sorted.
    pub fn walk(&self, root: &Path) -> Result<Vec<String>, PatternError> {
        let real_root = self.check_root(root)?;
        self.walk_from(root, &real_root)
    }

    /// Look up one relative path, returning its on-disk spelling when it
    /// names an existing file.
    pub fn resolve_literal(&self, root: &Path, rel: &str) -> Result<Option<String>, PatternError> {
        let segments: Vec<&str> = rel.split('/').collect();
        let mut abs = root.to_path_buf();
        let mut parts: Vec<String> = Vec::with_capacity(segments.len());

        for (idx, segment) in segments.iter().enumerate() {
            let entries = match self.fs.list_directory(&abs) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(PatternError::io(&abs, e)),
            };
            let Some(entry) = self.find_entry(&entries, segment) else {
                return Ok(None);
            };

            let last = idx + 1 == segments.len();
            if (last && !entry.is_file) || (!last && !entry.is_dir) {
                return Ok(None);
            }
            abs.push(&entry.name);
            parts.push(entry.name.clone());
        }

        Ok(Some(parts.join("/")))
    }

    fn find_entry<'e>(&self, entries: &'e [FsEntry], name: &str) -> Option<&'e FsEntry> {
        entries.iter().find(|e| e.name == name).or_else(|| {
            if self.options.case.is_insensitive() {
                entries
                    .iter()
                    .find(|e| self.options.case.names_equal(&e.name, name))
            } else {
                None
            }
        })
    }

    fn check_root(&self, root: &Path) -> Result<PathBuf, PatternError> {
        let not_found = || PatternError::RootNotFound {
            path: root.to_path_buf(),
        };
        if !self.fs.is_dir(root) {
            return Err(not_found());
        }
        self.fs.real_path(root).map_err(|_| not_found())
    }

    fn walk_from(&self, root: &Path, real_root: &Path) -> Result<Vec<String>, PatternError> {
        let mut walk = Walk {
            real_root,
            ignores: Vec::new(),
            visited: HashSet::from([real_root.to_path_buf()]),
            files: Vec::new(),
        };
        self.walk_dir(root, "", &mut walk)?;
        walk.files.sort();
        Ok(walk.files)
    }

    fn walk_dir(&self, abs_dir: &Path, rel_dir: &str, walk: &mut Walk<'_>) -> Result<(), PatternError> {
        let entries = self
            .fs
            .list_directory(abs_dir)
            .map_err(|e| PatternError::io(abs_dir, e))?;

        let pushed = match self.load_gitignore(abs_dir, &entries) {
            Some(gitignore) => {
                walk.ignores.push(gitignore);
                true
            }
            None => false,
        };

        for entry in &entries {
            if entry.name == ".git" {
                continue;
            }
            if !self.options.include_hidden && is_hidden(&entry.name) {
                continue;
            }

            let abs = abs_dir.join(&entry.name);
            let rel = if rel_dir.is_empty() {
                entry.name.clone()
            } else {
                format!("{rel_dir}/{}", entry.name)
            };

            if entry.is_symlink {
                if !self.options.follow_symlinks {
                    trace!("not following symlink {}", rel);
                    continue;
                }
                let Ok(real) = self.fs.real_path(&abs) else {
                    trace!("dangling symlink {}", rel);
                    continue;
                };
                if !real.starts_with(walk.real_root) {
                    debug!("symlink {} resolves outside the root, skipping", rel);
                    continue;
                }
                if entry.is_dir && !walk.visited.insert(real) {
                    debug!("symlink cycle at {}, skipping", rel);
                    continue;
                }
            }

            if !entry.is_file && !entry.is_dir {
                continue;
            }
            if is_ignored(&walk.ignores, &abs, entry.is_dir) {
                trace!("gitignored: {}", rel);
                continue;
            }

            if entry.is_dir {
                self.walk_dir(&abs, &rel, walk)?;
            } else {
                walk.files.push(rel);
            }
        }

        if pushed {
            walk.ignores.pop();
        }
        Ok(())
    }

    fn load_gitignore(&self, dir: &Path, entries: &[FsEntry]) -> Option<Gitignore> {
        if !self.options.respect_gitignore {
            return None;
        }
        entries.iter().find(|e| e.name == ".gitignore" && e.is_file)?;

        let path = dir.join(".gitignore");
        let contents = match self.fs.read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                return None;
            }
        };

        let mut builder = GitignoreBuilder::new(dir);
        builder.case_insensitive(self.options.case.is_insensitive()).ok()?;
        for line in contents.lines() {
            if let Err(e) = builder.add_line(Some(path.clone()), line) {
                warn!("{}: {}", path.display(), e);
            }
        }
        match builder.build() {
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                None
            }
        }
    }
}

struct Walk<'r> {
    real_root: &'r Path,
    /// One matcher per directory on the current path that has a `.gitignore`.
    ignores: Vec<Gitignore>,
    visited: HashSet<PathBuf>,
    files: Vec<String>,
}

/// Deepest `.gitignore` with an opinion wins.
fn is_ignored(ignores: &[Gitignore], path: &Path, is_dir: bool) -> bool {
    for gitignore in ignores.iter().rev() {
        match gitignore.matched(path, is_dir) {
            Match::Ignore(_) => return true,
            Match::Whitelist(_) => return false,
            Match::None => {}
        }
    }
    false
}

fn is_excluded(excludes: &GlobSet, path: &str) -> bool {
    if excludes.is_empty() {
        return false;
    }
    excludes.is_match(path) || ancestors(path).any(|dir| !dir.is_empty() && excludes.is_match(dir))
}

/// Expand `set` under `root` on the host filesystem.
pub fn match_patterns(
    root: &Path,
    set: &ParsedPatternSet,
    options: &MatchOptions,
) -> Result<Vec<String>, PatternError> {
    PatternMatcher::new(&OsFileSystem, *options).expand(root, set)
}
