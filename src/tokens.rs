use std::path::Path;

/// Estimate tokens for a file's content.
///
/// Pessimistic on purpose so prompts stay inside a context window:
/// roughly 3 bytes per token for code and 4 for prose.
pub fn estimate_tokens(content: &str, is_prose: bool) -> usize {
    let bytes_per_token = if is_prose { 4 } else { 3 };
    content.len().div_ceil(bytes_per_token)
}

/// Estimate tokens for a file, picking the ratio from its extension.
pub fn estimate_file_tokens(path: &Path, content: &str) -> usize {
    let is_prose = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(is_prose_extension);
    estimate_tokens(content, is_prose)
}

pub fn is_prose_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "md" | "markdown" | "txt" | "rst" | "adoc" | "org"
    )
}

/// Human-readable token count (`950`, `12.3k`, `1.2M`).
pub fn format_tokens(tokens: usize) -> String {
    match tokens {
        0..=999 => tokens.to_string(),
        1_000..=999_999 => format!("{:.1}k", tokens as f64 / 1_000.0),
        _ => format!("{:.1}M", tokens as f64 / 1_000_000.0),
    }
}
