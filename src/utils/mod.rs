//! Source text helpers for reporting

use std::collections::HashMap;

/// Trimmed source lines of the files that produced violations, read once per
/// file.
#[derive(Debug, Default)]
pub struct SourceLines {
    files: HashMap<String, Vec<String>>,
}

impl SourceLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// The trimmed text of `line` (1-indexed); empty when the file or line
    /// is unavailable
    pub fn get(&mut self, file_path: &str, line: usize) -> &str {
        let lines = self
            .files
            .entry(file_path.to_string())
            .or_insert_with(|| read_lines(file_path));
        lines
            .get(line.saturating_sub(1))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

fn read_lines(file_path: &str) -> Vec<String> {
    match std::fs::read_to_string(file_path) {
        Ok(content) => content.lines().map(|l| l.trim().to_string()).collect(),
        Err(e) => {
            log::debug!("Cannot read {} for source lines: {}", file_path, e);
            Vec::new()
        }
    }
}

/// Truncate source line if too long
pub fn truncate_source_line(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}
