use serde::{Deserialize, Serialize};

use crate::shared_str::SharedStr;

/// Rightmost column of a whole-line range. Editors clamp it to the line end.
pub const LINE_END_CHARACTER: u32 = 9999;

/// A 0-based line/column position, as editors address text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Span the whole of one editor line.
    pub fn full_line(line: u32) -> Self {
        Self {
            start: Position::new(line, 0),
            end: Position::new(line, LINE_END_CHARACTER),
        }
    }

    /// Span the whole line for a profiler line number.
    ///
    /// Profilers count lines from 1 and use 0 (or a negative value) for
    /// "unknown"; editors count from 0. Unknown lines land on the first line.
    pub fn for_source_line(line: i64) -> Self {
        Self::full_line(to_editor_line(line))
    }
}

/// Convert a 1-based profiler line to a 0-based editor line, clamped at 0.
pub fn to_editor_line(line: i64) -> u32 {
    if line > 0 {
        u32::try_from(line - 1).unwrap_or(u32::MAX)
    } else {
        0
    }
}

/// A place in a (possibly different) file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub uri: SharedStr,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// A secondary message attached to a diagnostic, pointing at another
/// location (for hot spots: a caller of the hot function).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedInformation {
    pub location: Location,
    pub message: String,
}

/// One editor diagnostic, shaped after the language-server wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub message: String,
    pub range: Range,
    pub severity: Severity,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_information: Option<Vec<RelatedInformation>>,
}
