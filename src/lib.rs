pub mod config;
pub mod error;
pub mod filters;
pub mod fs;
pub mod generate;
pub mod matcher;
pub mod output;
pub mod paths;
pub mod pattern;
pub mod preset;
pub mod synthesizer;
pub mod tokens;

pub use config::{Config, PatternSource};
pub use error::{InvalidPattern, PatternError};
pub use fs::{FileSystem, FsEntry, MemoryFileSystem, OsFileSystem};
pub use generate::generate;
pub use matcher::{match_patterns, MatchOptions, PatternMatcher};
pub use paths::CaseSensitivity;
pub use pattern::{parse_pattern_lines, parse_pattern_text, ParsedPatternSet};
pub use preset::{PresetError, PresetStore};
pub use synthesizer::{synthesize_patterns, PatternSynthesizer};
