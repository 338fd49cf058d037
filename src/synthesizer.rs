use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::PatternError;
use crate::fs::{FileSystem, OsFileSystem};
use crate::matcher::{MatchOptions, PatternMatcher};
use crate::paths::{
    ancestors, extension, file_name, is_within, normalize_relative, parent_dir, to_posix,
    CaseSensitivity, PathKey,
};
use crate::pattern::{compile_glob, escape_literal};

/// A directory wildcard is only worth it once it replaces this many paths.
const MIN_FILES_FOR_DIRECTORY_WILDCARD: usize = 3;
/// An extension wildcard is only worth it once it replaces this many paths.
const MIN_FILES_FOR_EXTENSION_WILDCARD: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    /// `dir/**`
    Recursive { dir: String },
    /// `dir/*`
    Direct { dir: String },
    /// `dir/*.ext`
    Extension { dir: String, ext: String },
}

impl Candidate {
    fn dir(&self) -> &str {
        match self {
            Candidate::Recursive { dir } | Candidate::Direct { dir } | Candidate::Extension { dir, .. } => dir,
        }
    }

    fn pattern(&self) -> String {
        let prefix = if self.dir().is_empty() {
            String::new()
        } else {
            format!("{}/", escape_literal(self.dir()))
        };
        match self {
            Candidate::Recursive { .. } => format!("{prefix}**"),
            Candidate::Direct { .. } => format!("{prefix}*"),
            Candidate::Extension { ext, .. } => format!("{prefix}*.{}", escape_literal(ext)),
        }
    }
}

/// Selected files sitting directly in one directory.
#[derive(Debug, Default)]
struct DirectoryGroup {
    files: Vec<String>,
    /// Extension key -> (canonical spelling, files).
    extensions: BTreeMap<String, (String, Vec<String>)>,
    /// Selected files without an extension.
    bare: usize,
}

impl DirectoryGroup {
    fn kinds(&self) -> usize {
        self.extensions.len() + usize::from(self.bare > 0)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    total: usize,
    selected: usize,
}

impl Counts {
    fn fully_selected(&self) -> bool {
        self.total > 0 && self.total == self.selected
    }
}

/// Compresses a file selection into the shortest pattern list whose
/// expansion gives back exactly that selection.
pub struct PatternSynthesizer<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    matcher: PatternMatcher<'a, F>,
}

impl<'a, F: FileSystem + ?Sized> PatternSynthesizer<'a, F> {
    pub fn new(fs: &'a F, options: MatchOptions) -> Self {
        Self {
            fs,
            matcher: PatternMatcher::new(fs, options),
        }
    }

    fn case(&self) -> CaseSensitivity {
        self.matcher.options().case
    }

    /// Synthesize patterns for `selected` (paths relative to `root`, or
    /// absolute paths under it).
    ///
    /// Wildcards come first, then explicit paths, each group sorted.
    pub fn synthesize<S: AsRef<str>>(&self, root: &Path, selected: &[S]) -> Result<Vec<String>, PatternError> {
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let selection = self.normalize_selection(root, selected);
        if selection.is_empty() {
            return Ok(Vec::new());
        }

        let case = self.case();
        let universe: BTreeMap<PathKey, String> = self
            .matcher
            .walk(root)?
            .into_iter()
            .map(|path| (case.key(&path), path))
            .collect();

        // Paths the walk never yields can only be named explicitly.
        let eligible: BTreeMap<&PathKey, &String> = selection
            .iter()
            .filter(|(key, _)| universe.contains_key(*key))
            .collect();
        for (key, path) in &selection {
            if !universe.contains_key(key) {
                debug!("{} is outside the walk, keeping it explicit", path);
            }
        }

        let display_dirs = canonical_dirs(eligible.values().map(|p| p.as_str()), case);
        let (direct, recursive) = count_by_directory(&universe, &selection, case);
        let groups = group_by_directory(eligible.values().map(|p| p.as_str()), case);

        let candidates = self.collect_candidates(&display_dirs, &groups, &direct, &recursive);
        let candidates = eliminate_redundant(candidates, case);

        let mut covered: BTreeSet<PathKey> = BTreeSet::new();
        let mut wildcards: Vec<String> = Vec::new();
        for candidate in candidates {
            let pattern = candidate.pattern();
            match self.expansion_within_selection(&pattern, &universe, &selection) {
                Some(keys) => {
                    debug!("{} covers {} files", pattern, keys.len());
                    covered.extend(keys);
                    wildcards.push(pattern);
                }
                None => debug!("{} would over-select, skipping", pattern),
            }
        }

        let mut explicit: Vec<String> = selection
            .iter()
            .filter(|(key, _)| !covered.contains(*key))
            .map(|(_, path)| escape_literal(path))
            .collect();

        wildcards.sort();
        wildcards.dedup();
        explicit.sort();

        wildcards.extend(explicit);
        Ok(wildcards)
    }

    /// Posix-normalize, drop paths outside the root, and dedupe by key. The
    /// first spelling in sorted order becomes the canonical one.
    ///
    /// Absolute paths are made relative to `root` as given or to its
    /// canonical form, so `.` as a root still accepts absolute paths.
    fn normalize_selection<S: AsRef<str>>(&self, root: &Path, selected: &[S]) -> BTreeMap<PathKey, String> {
        let real_root = self.fs.real_path(root).ok();
        let mut normalized: Vec<String> = Vec::with_capacity(selected.len());
        for raw in selected {
            let raw = raw.as_ref();
            let path = Path::new(raw);
            let candidate = if path.is_absolute() {
                let rel = path
                    .strip_prefix(root)
                    .ok()
                    .or_else(|| real_root.as_deref().and_then(|real| path.strip_prefix(real).ok()));
                match rel {
                    Some(rel) => to_posix(rel),
                    None => {
                        warn!("ignoring selected path outside the root: {}", raw);
                        continue;
                    }
                }
            } else {
                raw.to_string()
            };
            match normalize_relative(&candidate) {
                Some(rel) => normalized.push(rel),
                None => warn!("ignoring selected path outside the root: {}", raw),
            }
        }
        normalized.sort();

        let case = self.case();
        let mut selection = BTreeMap::new();
        for path in normalized {
            selection.entry(case.key(&path)).or_insert(path);
        }
        selection
    }

    fn collect_candidates(
        &self,
        display_dirs: &BTreeMap<PathKey, String>,
        groups: &BTreeMap<PathKey, DirectoryGroup>,
        direct: &BTreeMap<PathKey, Counts>,
        recursive: &BTreeMap<PathKey, Counts>,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for (key, dir) in display_dirs {
            let counts = recursive.get(key).copied().unwrap_or_default();
            if counts.fully_selected() && counts.selected >= MIN_FILES_FOR_DIRECTORY_WILDCARD {
                candidates.push(Candidate::Recursive { dir: dir.clone() });
            }
        }

        for (key, group) in groups {
            let Some(dir) = display_dirs.get(key) else {
                continue;
            };
            if group.files.len() < MIN_FILES_FOR_EXTENSION_WILDCARD {
                continue;
            }

            let counts = direct.get(key).copied().unwrap_or_default();
            if counts.fully_selected()
                && counts.selected >= MIN_FILES_FOR_DIRECTORY_WILDCARD
                && group.kinds() > 1
            {
                candidates.push(Candidate::Direct { dir: dir.clone() });
                continue;
            }

            for (ext, files) in group.extensions.values() {
                if files.len() >= MIN_FILES_FOR_EXTENSION_WILDCARD {
                    candidates.push(Candidate::Extension {
                        dir: dir.clone(),
                        ext: ext.clone(),
                    });
                }
            }
        }

        candidates
    }

    /// Expand `pattern` over the walk and return the covered keys, or `None`
    /// when it would pull in anything unselected (or nothing at all).
    fn expansion_within_selection(
        &self,
        pattern: &str,
        universe: &BTreeMap<PathKey, String>,
        selection: &BTreeMap<PathKey, String>,
    ) -> Option<Vec<PathKey>> {
        let glob = match compile_glob(pattern, self.case()) {
            Ok(glob) => glob,
            Err(e) => {
                warn!("generated pattern {} did not compile: {}", pattern, e);
                return None;
            }
        };

        let mut keys = Vec::new();
        for (key, path) in universe {
            if glob.is_match(path) {
                if !selection.contains_key(key) {
                    return None;
                }
                keys.push(key.clone());
            }
        }
        (!keys.is_empty()).then_some(keys)
    }
}

/// Canonical spelling of every directory that holds a selected file,
/// including all of their ancestors and the root (`""`).
fn canonical_dirs<'p>(paths: impl Iterator<Item = &'p str>, case: CaseSensitivity) -> BTreeMap<PathKey, String> {
    let mut dirs = BTreeMap::new();
    for path in paths {
        for dir in ancestors(path) {
            dirs.entry(case.key(dir)).or_insert_with(|| dir.to_string());
        }
    }
    dirs
}

/// File counts per directory over the walk: direct children and all
/// descendants, with how many of them are selected.
fn count_by_directory(
    universe: &BTreeMap<PathKey, String>,
    selection: &BTreeMap<PathKey, String>,
    case: CaseSensitivity,
) -> (BTreeMap<PathKey, Counts>, BTreeMap<PathKey, Counts>) {
    let mut direct: BTreeMap<PathKey, Counts> = BTreeMap::new();
    let mut recursive: BTreeMap<PathKey, Counts> = BTreeMap::new();

    for (key, path) in universe {
        let is_selected = usize::from(selection.contains_key(key));

        let entry = direct.entry(case.key(parent_dir(path))).or_default();
        entry.total += 1;
        entry.selected += is_selected;

        for dir in ancestors(path) {
            let entry = recursive.entry(case.key(dir)).or_default();
            entry.total += 1;
            entry.selected += is_selected;
        }
    }

    (direct, recursive)
}

fn group_by_directory<'p>(paths: impl Iterator<Item = &'p str>, case: CaseSensitivity) -> BTreeMap<PathKey, DirectoryGroup> {
    let mut groups: BTreeMap<PathKey, DirectoryGroup> = BTreeMap::new();
    for path in paths {
        let group = groups.entry(case.key(parent_dir(path))).or_default();
        group.files.push(path.to_string());
        match extension(file_name(path)) {
            Some(ext) => {
                let ext_key = case.key(ext).as_str().to_string();
                group
                    .extensions
                    .entry(ext_key)
                    .or_insert_with(|| (ext.to_string(), Vec::new()))
                    .1
                    .push(path.to_string());
            }
            None => group.bare += 1,
        }
    }
    groups
}

/// Drop candidates already covered by an ancestor `**`, walking from the
/// deepest directories up to the root.
fn eliminate_redundant(mut candidates: Vec<Candidate>, case: CaseSensitivity) -> Vec<Candidate> {
    let recursive: Vec<PathKey> = candidates
        .iter()
        .filter(|c| matches!(c, Candidate::Recursive { .. }))
        .map(|c| case.key(c.dir()))
        .collect();

    let depth = |c: &Candidate| if c.dir().is_empty() { 0 } else { c.dir().split('/').count() };
    candidates.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.pattern().cmp(&b.pattern())));

    candidates.retain(|candidate| {
        let dir_key = case.key(candidate.dir());
        let subsumed = recursive.iter().any(|ancestor| {
            let is_self = *ancestor == dir_key;
            let is_ancestor = is_within(dir_key.as_str(), ancestor.as_str()) && !is_self;
            match candidate {
                Candidate::Recursive { .. } => is_ancestor,
                _ => is_ancestor || is_self,
            }
        });
        if subsumed {
            debug!("{} is covered by an ancestor wildcard", candidate.pattern());
        }
        !subsumed
    });

    candidates
}

/// Synthesize patterns for `selected` under `root` on the host filesystem.
pub fn synthesize_patterns<S: AsRef<str>>(
    root: &Path,
    selected: &[S],
    options: &MatchOptions,
) -> Result<Vec<String>, PatternError> {
    PatternSynthesizer::new(&OsFileSystem, *options).synthesize(root, selected)
}
