use crate::filters::SkipReason;
use crate::tokens::format_tokens;
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Default)]
pub struct Statistics {
    pub matched_files: usize,
    pub included_files: usize,
    pub total_tokens: usize,
    pub skipped_by_reason: HashMap<String, usize>,
    pub included_by_extension: HashMap<String, usize>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_included(&mut self, extension: Option<&str>, tokens: usize) {
        self.matched_files += 1;
        self.included_files += 1;
        self.total_tokens += tokens;
        let ext = extension.unwrap_or("no extension").to_string();
        *self.included_by_extension.entry(ext).or_insert(0) += 1;
    }

    pub fn add_skipped(&mut self, reason: SkipReason) {
        self.matched_files += 1;
        *self.skipped_by_reason.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped_by_reason.values().sum()
    }

    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "<summary>\nMatched files: {}\nIncluded: {}",
            self.matched_files, self.included_files
        );

        if !self.included_by_extension.is_empty() {
            let mut extensions: Vec<_> = self.included_by_extension.iter().collect();
            extensions.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

            let ext_str = extensions
                .iter()
                .map(|(ext, count)| {
                    if *ext == "no extension" {
                        format!("{} without extension", count)
                    } else {
                        format!("{} .{}", count, ext)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");

            summary.push_str(&format!(" ({})", ext_str));
        }
        summary.push('\n');

        if self.total_skipped() > 0 {
            let mut reasons: Vec<_> = self.skipped_by_reason.iter().collect();
            reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

            let reason_str = reasons
                .iter()
                .map(|(reason, count)| format!("{} {}", count, reason))
                .collect::<Vec<_>>()
                .join(", ");

            summary.push_str(&format!("Skipped: {} ({})\n", self.total_skipped(), reason_str));
        }

        summary.push_str(&format!(
            "Estimated tokens: {}\n</summary>\n",
            format_tokens(self.total_tokens)
        ));
        summary
    }
}

/// Writes the prompt sections to any sink
pub struct OutputWriter {
    writer: Box<dyn Write>,
}

impl OutputWriter {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }

    pub fn write_file_tree(&mut self, paths: &[String]) -> std::io::Result<()> {
        writeln!(self.writer, "<file_tree>")?;
        write!(self.writer, "{}", render_file_tree(paths))?;
        writeln!(self.writer, "</file_tree>")?;
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn write_file_content(&mut self, path: &str, content: &str) -> std::io::Result<()> {
        writeln!(self.writer, "<file path=\"{}\">", escape_xml(path))?;
        write!(self.writer, "{}", content)?;
        if !content.ends_with('\n') {
            writeln!(self.writer)?;
        }
        writeln!(self.writer, "</file>")?;
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn write_instructions(&mut self, instructions: &str) -> std::io::Result<()> {
        writeln!(self.writer, "<instructions>")?;
        writeln!(self.writer, "{}", instructions.trim_end())?;
        writeln!(self.writer, "</instructions>")?;
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn write_summary(&mut self, stats: &Statistics) -> std::io::Result<()> {
        write!(self.writer, "{}", stats.format_summary())?;
        self.writer.flush()
    }

    pub fn write_file_path(&mut self, path: &str) -> std::io::Result<()> {
        writeln!(self.writer, "{}", path)
    }
}

/// Indented tree of sorted relative paths, directories suffixed with `/`
pub fn render_file_tree(paths: &[String]) -> String {
    let mut out = String::new();
    let mut open: Vec<&str> = Vec::new();

    for path in paths {
        let parts: Vec<&str> = path.split('/').collect();
        let (dirs, file) = parts.split_at(parts.len() - 1);

        let shared = open
            .iter()
            .zip(dirs)
            .take_while(|(a, b)| a == b)
            .count();
        open.truncate(shared);

        for dir in &dirs[shared..] {
            out.push_str(&"  ".repeat(open.len()));
            out.push_str(dir);
            out.push_str("/\n");
            open.push(*dir);
        }

        out.push_str(&"  ".repeat(open.len()));
        out.push_str(file[0]);
        out.push('\n');
    }

    out
}

/// Escape XML special characters in strings
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
