//! Migration file representation and source-position diagnostics.
//!
//! File discovery and filename parsing live outside the engine; this module
//! only models the already-parsed [`MigrationFile`] value that a driver
//! consumes, plus the offset-to-line/column helpers drivers use to render
//! statement errors.

use std::path::PathBuf;

use crate::error::Result;

/// Direction of a migration file.
///
/// Up files are applied in ascending version order, Down files in
/// descending order (the reverse of the matching Up sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A single migration file, discovered and parsed by an external collaborator.
///
/// Content is loaded lazily: a file is read at most once, consumed by exactly
/// one apply operation, then discarded with the value.
#[derive(Debug, Clone)]
pub struct MigrationFile {
    /// Path to the file on disk.
    pub path: PathBuf,
    /// Human-readable label parsed from the filename.
    pub name: String,
    /// Monotonically increasing version, unique within a direction-ordered
    /// sequence.
    pub version: u64,
    /// Apply or revert.
    pub direction: Direction,
    /// Raw content, `None` until loaded.
    pub content: Option<String>,
}

impl MigrationFile {
    /// Create a file whose content will be read lazily from `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        version: u64,
        direction: Direction,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            version,
            direction,
            content: None,
        }
    }

    /// Create a file with content supplied up front (used by tests and by
    /// callers that already hold the bytes).
    pub fn with_content(
        name: impl Into<String>,
        version: u64,
        direction: Direction,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: PathBuf::new(),
            name: name.into(),
            version,
            direction,
            content: Some(content.into()),
        }
    }

    /// Load the file content if it has not been loaded yet and return it.
    pub async fn read_content(&mut self) -> Result<&str> {
        if self.content.is_none() {
            self.content = Some(tokio::fs::read_to_string(&self.path).await?);
        }
        Ok(self.content.as_deref().unwrap_or_default())
    }
}

/// Translate a 0-based byte offset into 1-based (line, column).
///
/// Offsets past the end of the content resolve to the last position.
pub fn line_column_from_offset(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let mut line = 1;
    let mut column = 1;
    for byte in content.as_bytes()[..offset].iter() {
        if *byte == b'\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Render a window of `before`/`after` lines around the 1-based `line_no`,
/// marking the target line when `mark` is set.
pub fn lines_before_and_after(
    content: &str,
    line_no: usize,
    before: usize,
    after: usize,
    mark: bool,
) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() || line_no == 0 {
        return String::new();
    }
    let target = line_no.min(lines.len()) - 1;
    let start = target.saturating_sub(before);
    let end = (target + after + 1).min(lines.len());

    let mut out = String::new();
    for (idx, line) in lines[start..end].iter().enumerate() {
        let prefix = if mark && start + idx == target {
            "-> "
        } else {
            "   "
        };
        out.push_str(prefix);
        out.push_str(line);
        out.push('\n');
    }
    out
}
