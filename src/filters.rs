use std::fs::File;
use std::io::Read;
use std::path::Path;

use content_inspector::ContentType;

/// Extensions that never hold prompt-worthy text
const BINARY_EXTENSIONS: &[&str] = &[
    // Images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff",
    // Media
    "mp4", "mp3", "wav", "avi", "mov", "flac", "ogg", "webm",
    // Archives
    "zip", "tar", "gz", "7z", "rar", "bz2", "xz", "zst",
    // Native and bytecode
    "exe", "dll", "so", "dylib", "bin", "wasm", "class", "pyc", "o", "a", "lib", "rlib",
    // Documents and fonts
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "woff", "woff2", "ttf", "otf",
    // Databases
    "sqlite", "db",
];

/// Bytes sniffed when deciding whether a file is text
const SNIFF_LEN: usize = 8192;

/// Why a matched file was left out of the prompt
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Binary,
    TooLarge,
    ReadError,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Binary => write!(f, "binary"),
            SkipReason::TooLarge => write!(f, "too large"),
            SkipReason::ReadError => write!(f, "read error"),
        }
    }
}

/// Check a matched file before its content goes into the prompt
pub fn check_file(path: &Path, max_size: u64) -> Option<SkipReason> {
    if is_binary_extension(path) {
        return Some(SkipReason::Binary);
    }

    match std::fs::metadata(path) {
        Ok(metadata) if metadata.len() > max_size => return Some(SkipReason::TooLarge),
        Ok(_) => {}
        Err(_) => return Some(SkipReason::ReadError),
    }

    if is_binary_content(path) {
        return Some(SkipReason::Binary);
    }

    None
}

pub fn is_binary_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
}

/// Sniff the first few KB of a file
pub fn is_binary_content(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };

    let mut buffer = Vec::with_capacity(SNIFF_LEN);
    match file.take(SNIFF_LEN as u64).read_to_end(&mut buffer) {
        Ok(_) => content_inspector::inspect(&buffer) == ContentType::BINARY,
        Err(_) => false,
    }
}
