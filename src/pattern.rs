use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::error::InvalidPattern;
use crate::paths::CaseSensitivity;

/// Include pattern used when a preset lists only excludes.
pub const CATCH_ALL: &str = "**";

/// Include and exclude patterns parsed from preset lines.
///
/// Excludes form a single veto set applied after all includes are unioned;
/// a later `!` line never re-includes anything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPatternSet {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Lines that were skipped, with their original line numbers.
    pub invalid: Vec<InvalidPattern>,
}

impl ParsedPatternSet {
    /// Render back to preset lines: includes first, then `!` excludes.
    pub fn to_lines(&self) -> Vec<String> {
        self.include
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|p| format!("!{p}")))
            .collect()
    }

    pub fn is_catch_all(&self) -> bool {
        self.include.len() == 1 && self.include[0] == CATCH_ALL
    }
}

/// Parse preset lines into a [`ParsedPatternSet`].
///
/// Blank lines and `#` comments are dropped, each line is trimmed (a
/// backslash keeps a trailing space), and a leading `!` marks an exclude.
/// Malformed lines are collected in `invalid` and logged; they never abort
/// the parse. The include set becomes [`CATCH_ALL`] only when no include
/// line was written at all; if every include line was invalid it stays
/// empty and selects nothing.
pub fn parse_pattern_lines<I, S>(lines: I) -> ParsedPatternSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = ParsedPatternSet::default();
    let mut wrote_include = false;

    for (idx, raw) in lines.into_iter().enumerate() {
        let line = trim_line(raw.as_ref());
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (is_exclude, body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, line),
        };
        wrote_include |= !is_exclude;

        match validate_pattern(body) {
            Ok(pattern) => {
                if is_exclude {
                    set.exclude.push(pattern);
                } else {
                    set.include.push(pattern);
                }
            }
            Err(reason) => {
                let invalid = InvalidPattern {
                    line: idx + 1,
                    pattern: line.to_string(),
                    reason,
                };
                warn!("skipping {}", invalid);
                set.invalid.push(invalid);
            }
        }
    }

    if !wrote_include {
        set.include.push(CATCH_ALL.to_string());
    } else if set.include.is_empty() {
        warn!("every include pattern was invalid; the set selects no files");
    }

    set
}

/// Trim surrounding whitespace, keeping a trailing whitespace character that
/// is escaped with a backslash.
fn trim_line(raw: &str) -> &str {
    let start = raw.trim_start();
    let end = start.trim_end();
    let backslashes = end.chars().rev().take_while(|&c| c == '\\').count();
    if backslashes % 2 == 1 {
        if let Some(kept) = start[end.len()..].chars().next() {
            return &start[..end.len() + kept.len_utf8()];
        }
    }
    end
}

/// Parse the full text of a preset file.
pub fn parse_pattern_text(text: &str) -> ParsedPatternSet {
    parse_pattern_lines(text.lines())
}

/// Check a single pattern body (without `!`) and return its normalized form.
pub fn validate_pattern(body: &str) -> Result<String, String> {
    let body = body.strip_prefix("./").unwrap_or(body);
    if body.is_empty() {
        return Err("empty pattern".to_string());
    }
    if body.starts_with('/') || looks_like_drive(body) {
        return Err("absolute paths are not allowed; patterns are relative to the root".to_string());
    }
    if body.split('/').any(|part| part == "..") {
        return Err("`..` would escape the root directory".to_string());
    }
    builder(body, CaseSensitivity::Sensitive)
        .build()
        .map_err(|e| e.kind().to_string())?;
    Ok(body.to_string())
}

fn looks_like_drive(body: &str) -> bool {
    let bytes = body.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Whether a pattern has no unescaped glob metacharacters.
pub fn is_literal(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '?' | '[' | '{' => return false,
            _ => {}
        }
    }
    true
}

/// Strip escaping from a literal pattern, yielding the path it names.
pub fn unescape_literal(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Escape a relative path so that it matches only itself as a pattern and
/// survives a trip through [`parse_pattern_lines`], including line trimming.
pub fn escape_literal(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let last = path.chars().count().saturating_sub(1);
    for (idx, c) in path.chars().enumerate() {
        let leading = idx == 0 && (c == '!' || c == '#' || c.is_whitespace());
        let trailing = idx == last && c.is_whitespace();
        if leading || trailing || matches!(c, '\\' | '*' | '?' | '[' | ']' | '{' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn builder(pattern: &str, case: CaseSensitivity) -> GlobBuilder<'_> {
    let mut builder = GlobBuilder::new(pattern);
    builder
        .literal_separator(true)
        .backslash_escape(true)
        .case_insensitive(case.is_insensitive());
    builder
}

/// Compile one pattern with the engine's glob dialect: `*` stays within a
/// path segment, `**` crosses them.
pub fn compile_glob(pattern: &str, case: CaseSensitivity) -> Result<GlobMatcher, globset::Error> {
    Ok(builder(pattern, case).build()?.compile_matcher())
}

/// Compile many patterns into a set, skipping (and logging) the bad ones.
pub fn compile_glob_set<'a, I>(patterns: I, case: CaseSensitivity) -> GlobSet
where
    I: IntoIterator<Item = &'a String>,
{
    let mut set = GlobSetBuilder::new();
    for pattern in patterns {
        match builder(pattern, case).build() {
            Ok(glob) => {
                set.add(glob);
            }
            Err(e) => warn!("invalid glob pattern '{}': {}", pattern, e),
        }
    }
    set.build().unwrap_or_else(|e| {
        warn!("failed to build glob set: {}", e);
        GlobSet::empty()
    })
}
