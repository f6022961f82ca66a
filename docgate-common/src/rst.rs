//! Line-level authoring conventions for reStructuredText sources.

use serde::{Deserialize, Serialize};

/// How far back (in bytes) a `code-block::` directive may sit before a
/// literal-block marker and still count as highlighting it.
pub const HIGHLIGHT_LOOKBACK_BYTES: usize = 100;

/// A single convention rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RstRule {
    /// No line longer than `max` characters, except in `exempt_files`.
    MaxLineLength { max: usize, exempt_files: Vec<String> },
    /// Literal-block markers have a blank line before and after.
    LiteralBlockSpacing,
    /// Literal-block markers are preceded by a `code-block::` directive.
    LiteralBlockHighlighting,
}

impl RstRule {
    pub fn describe(&self) -> String {
        match self {
            Self::MaxLineLength { max, .. } => format!("lines are at most {max} characters"),
            Self::LiteralBlockSpacing => "literal blocks are surrounded by blank lines".to_string(),
            Self::LiteralBlockHighlighting => {
                "literal blocks declare syntax highlighting".to_string()
            }
        }
    }

    /// Apply the rule to one file. `file_name` is the bare name, used for
    /// exemptions.
    pub fn check(&self, file_name: &str, content: &str) -> Vec<Violation> {
        match self {
            Self::MaxLineLength { max, exempt_files } => {
                if exempt_files.iter().any(|f| f == file_name) {
                    Vec::new()
                } else {
                    long_lines(content, *max)
                }
            }
            Self::LiteralBlockSpacing => literal_block_spacing(content),
            Self::LiteralBlockHighlighting => literal_block_highlighting(content),
        }
    }
}

/// A rule violation at a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub line: usize,
    pub message: String,
}

/// A paragraph line ending in `::` (or a bare `::`), excluding `..`
/// directive lines such as `.. note::`.
pub fn is_literal_marker(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.ends_with("::") && !trimmed.starts_with("..")
}

pub fn long_lines(content: &str, max: usize) -> Vec<Violation> {
    content
        .split('\n')
        .enumerate()
        .filter_map(|(idx, line)| {
            let len = line.trim_end_matches('\r').chars().count();
            (len > max).then(|| Violation {
                line: idx + 1,
                message: format!("line exceeds {max} characters ({len})"),
            })
        })
        .collect()
}

pub fn literal_block_spacing(content: &str) -> Vec<Violation> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut violations = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if !is_literal_marker(line) {
            continue;
        }
        if idx > 0 && !lines[idx - 1].trim().is_empty() {
            violations.push(Violation {
                line: idx + 1,
                message: "missing blank line before code block".to_string(),
            });
        }
        if idx + 1 < lines.len() && !lines[idx + 1].trim().is_empty() {
            violations.push(Violation {
                line: idx + 1,
                message: "missing blank line after code block".to_string(),
            });
        }
    }
    violations
}

pub fn literal_block_highlighting(content: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut offset: usize = 0;
    for (idx, line) in content.split('\n').enumerate() {
        if is_literal_marker(line) {
            let mut start = offset.saturating_sub(HIGHLIGHT_LOOKBACK_BYTES);
            while !content.is_char_boundary(start) {
                start += 1;
            }
            let window = &content[start..offset];
            if !window.contains("code-block::") {
                violations.push(Violation {
                    line: idx + 1,
                    message: "code block without syntax highlighting".to_string(),
                });
            }
        }
        offset += line.len() + 1;
    }
    violations
}
