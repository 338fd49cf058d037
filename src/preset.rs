use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::pattern::{parse_pattern_text, ParsedPatternSet};

/// Directory (relative to the project root) holding preset files.
pub const PRESET_DIR: &str = ".promptcode/presets";
pub const PRESET_EXTENSION: &str = "patterns";

/// Template written by `preset create` when no files are given.
pub const DEFAULT_TEMPLATE: &str = "\
# Include patterns, one per line (gitignore-style globs)
**/*

# Exclude patterns start with !
!node_modules/**
!target/**
!dist/**
!build/**
!**/*.lock
";

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("preset '{name}' not found (looked for {})", path.display())]
    NotFound { name: String, path: PathBuf },

    #[error("preset '{name}' already exists at {} (use --force to overwrite)", path.display())]
    AlreadyExists { name: String, path: PathBuf },

    #[error("invalid preset name '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidName(String),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Preset files stored under a project root.
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(PRESET_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> Result<PathBuf, PresetError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{PRESET_EXTENSION}")))
    }

    /// Names of all stored presets, sorted.
    pub fn list(&self) -> Result<Vec<String>, PresetError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PresetError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == PRESET_EXTENSION))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Raw text of a preset file.
    pub fn read(&self, name: &str) -> Result<String, PresetError> {
        let path = self.path(name)?;
        fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                PresetError::NotFound {
                    name: name.to_string(),
                    path,
                }
            } else {
                PresetError::Io { path, source }
            }
        })
    }

    /// Read and parse a preset. Invalid lines are skipped.
    pub fn load(&self, name: &str) -> Result<ParsedPatternSet, PresetError> {
        debug!("loading preset '{}'", name);
        Ok(parse_pattern_text(&self.read(name)?))
    }

    /// Write a preset, creating the preset directory if needed.
    pub fn save(&self, name: &str, contents: &str, overwrite: bool) -> Result<PathBuf, PresetError> {
        let path = self.path(name)?;
        if !overwrite && path.exists() {
            return Err(PresetError::AlreadyExists {
                name: name.to_string(),
                path,
            });
        }

        fs::create_dir_all(&self.dir).map_err(|source| PresetError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, contents).map_err(|source| PresetError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("wrote preset {}", path.display());
        Ok(path)
    }
}

/// Render a preset file from a header comment and pattern lines.
pub fn render_preset(header: &str, patterns: &[String]) -> String {
    let mut out = String::new();
    for line in header.lines() {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    for pattern in patterns {
        out.push_str(pattern);
        out.push('\n');
    }
    out
}

fn validate_name(name: &str) -> Result<(), PresetError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(PresetError::InvalidName(name.to_string()))
    }
}
