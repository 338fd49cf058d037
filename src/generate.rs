use crate::config::{exclude_lines, Config, PatternSource};
use crate::filters::{check_file, SkipReason};
use crate::matcher::match_patterns;
use crate::output::{OutputWriter, Statistics};
use crate::pattern::{parse_pattern_lines, parse_pattern_text, ParsedPatternSet};
use crate::preset::PresetStore;
use crate::tokens::estimate_file_tokens;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file that made it into the prompt
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub content: String,
    pub tokens: usize,
}

/// Load the pattern set `config` points at, plus its extra excludes
pub fn resolve_patterns(config: &Config) -> Result<ParsedPatternSet> {
    let mut set = match &config.source {
        PatternSource::Preset(name) => PresetStore::new(&config.path).load(name)?,
        PatternSource::File(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read patterns file: {}", path.display()))?;
            debug!("patterns from {}", path.display());
            parse_pattern_text(&text)
        }
        PatternSource::Inline(include) => parse_pattern_lines(include),
    };

    if !config.exclude.is_empty() {
        let extra = parse_pattern_lines(exclude_lines(&config.exclude));
        set.exclude.extend(extra.exclude);
    }
    Ok(set)
}

/// Expand the configured patterns and collect the files worth sending
pub fn collect_files(config: &Config, stats: &mut Statistics) -> Result<Vec<SelectedFile>> {
    let patterns = resolve_patterns(config)?;
    let matched = match_patterns(&config.path, &patterns, &config.match_options)?;
    debug!("{} files matched", matched.len());

    let mut files = Vec::new();
    for rel_path in matched {
        let abs_path = config.path.join(&rel_path);

        if let Some(reason) = check_file(&abs_path, config.max_file_size) {
            skip(stats, &rel_path, reason, config.stats_only);
            continue;
        }

        match fs::read_to_string(&abs_path) {
            Ok(content) => {
                let tokens = estimate_file_tokens(&abs_path, &content);
                let extension = Path::new(&rel_path).extension().and_then(|e| e.to_str());
                stats.add_included(extension, tokens);
                files.push(SelectedFile {
                    rel_path,
                    abs_path,
                    content,
                    tokens,
                });
            }
            Err(e) => {
                warn!("Error reading {}: {}", rel_path, e);
                stats.add_skipped(SkipReason::ReadError);
            }
        }
    }

    Ok(files)
}

fn skip(stats: &mut Statistics, rel_path: &str, reason: SkipReason, quiet: bool) {
    if !quiet {
        warn!("Skipping {}: {}", rel_path, reason);
    }
    stats.add_skipped(reason);
}

/// Build the prompt for `config` and write it out
pub fn generate(config: &Config) -> Result<Statistics> {
    let mut stats = Statistics::new();
    let files = collect_files(config, &mut stats)?;

    if config.stats_only {
        eprintln!("{}", stats.format_summary());
        return Ok(stats);
    }

    let writer: Box<dyn Write> = match &config.output_file {
        Some(path) => Box::new(
            fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut output = OutputWriter::new(writer);

    let paths: Vec<String> = files.iter().map(|f| f.rel_path.clone()).collect();

    if config.dry_run {
        for path in &paths {
            output.write_file_path(path)?;
        }
        output.write_summary(&stats)?;
        return Ok(stats);
    }

    output.write_file_tree(&paths)?;
    for file in &files {
        output.write_file_content(&file.rel_path, &file.content)?;
    }
    if let Some(instructions) = &config.instructions {
        output.write_instructions(instructions)?;
    }
    output.write_summary(&stats)?;

    Ok(stats)
}
