use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether a line was introduced or taken away by a hunk.
///
/// # Examples
///
/// ```
/// use truechurn_core::EditKind;
///
/// assert_eq!(EditKind::Added.to_string(), "added");
/// assert_eq!(EditKind::Removed.to_string(), "removed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    /// A `+` line; positioned in the new file.
    Added,
    /// A `-` line; positioned in the old file.
    Removed,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditKind::Added => write!(f, "added"),
            EditKind::Removed => write!(f, "removed"),
        }
    }
}

/// A single line-level edit extracted from a hunk.
///
/// `position` is 1-based: the new-file line for [`EditKind::Added`], the
/// old-file line for [`EditKind::Removed`].
///
/// # Examples
///
/// ```
/// use truechurn_core::{EditKind, LineEdit};
///
/// let edit = LineEdit::added(12, "let x = 1;");
/// assert_eq!(edit.kind, EditKind::Added);
/// assert_eq!(edit.position, 12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEdit {
    /// Added or removed.
    pub kind: EditKind,
    /// 1-based line position in the file version relevant to `kind`.
    pub position: u32,
    /// Line text without the diff prefix.
    pub text: String,
}

impl LineEdit {
    /// An added line at `position` in the new file.
    pub fn added(position: u32, text: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Added,
            position,
            text: text.into(),
        }
    }

    /// A removed line at `position` in the old file.
    pub fn removed(position: u32, text: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Removed,
            position,
            text: text.into(),
        }
    }
}

/// One contiguous changed region of a unified diff, with its line edits.
///
/// # Examples
///
/// ```
/// use truechurn_core::{Hunk, LineEdit};
///
/// let hunk = Hunk {
///     header: "@@ -3 +3 @@".into(),
///     old_start: 3,
///     old_lines: 1,
///     new_start: 3,
///     new_lines: 1,
///     edits: vec![LineEdit::removed(3, "old"), LineEdit::added(3, "new")],
/// };
/// assert_eq!(hunk.added(), 1);
/// assert_eq!(hunk.removed(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// The raw `@@ ... @@` header line.
    pub header: String,
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// Edits in body order.
    pub edits: Vec<LineEdit>,
}

impl Hunk {
    /// Number of `+` lines in this hunk.
    pub fn added(&self) -> usize {
        self.edits
            .iter()
            .filter(|e| e.kind == EditKind::Added)
            .count()
    }

    /// Number of `-` lines in this hunk.
    pub fn removed(&self) -> usize {
        self.edits
            .iter()
            .filter(|e| e.kind == EditKind::Removed)
            .count()
    }
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use truechurn_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
