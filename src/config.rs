use crate::matcher::MatchOptions;
use std::path::PathBuf;

/// Where `generate` takes its patterns from
#[derive(Debug, Clone, PartialEq)]
pub enum PatternSource {
    /// A named preset under `<root>/.promptcode/presets/`
    Preset(String),
    /// A patterns file anywhere on disk
    File(PathBuf),
    /// Include globs given on the command line; none means everything
    Inline(Vec<String>),
}

/// Exclude globs as preset lines (`!` in front)
pub fn exclude_lines(exclude: &[String]) -> Vec<String> {
    exclude
        .iter()
        .map(|p| {
            if p.starts_with('!') {
                p.clone()
            } else {
                format!("!{p}")
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub source: PatternSource,
    /// Extra excludes layered over whatever `source` selects
    pub exclude: Vec<String>,
    pub instructions: Option<String>,
    pub output_file: Option<PathBuf>,
    pub dry_run: bool,
    pub stats_only: bool,
    pub max_file_size: u64,
    pub match_options: MatchOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            source: PatternSource::Inline(Vec::new()),
            exclude: Vec::new(),
            instructions: None,
            output_file: None,
            dry_run: false,
            stats_only: false,
            max_file_size: 1024 * 1024, // 1MB
            match_options: MatchOptions::default(),
        }
    }
}
