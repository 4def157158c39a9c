use std::fmt;
use std::path::{Path, PathBuf};

use truechurn_core::{ChurnError, Hunk, LineEdit, Result};

/// A complete diff for a single file, containing one or more hunks.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::parser::{parse_unified_diff, FileDiff};
///
/// let diff = "\
/// diff --git a/hello.py b/hello.py
/// --- a/hello.py
/// +++ b/hello.py
/// @@ -1,2 +1,3 @@
///  def main():
/// +    print(\"hello\")
///      pass
/// ";
/// let files = parse_unified_diff(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].hunks[0].edits.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Path in the old version.
    pub old_path: PathBuf,
    /// Path in the new version.
    pub new_path: PathBuf,
    /// Parsed hunks for this file, in patch order.
    pub hunks: Vec<Hunk>,
    /// Whether this is a newly created file.
    pub is_new_file: bool,
    /// Whether this file was deleted.
    pub is_deleted_file: bool,
    /// Whether this file was renamed.
    pub is_rename: bool,
}

impl FileDiff {
    fn empty() -> Self {
        Self {
            old_path: PathBuf::new(),
            new_path: PathBuf::new(),
            hunks: Vec::new(),
            is_new_file: false,
            is_deleted_file: false,
            is_rename: false,
        }
    }

    /// The path line edits are attributed to: the new path, or the old one
    /// when the file was deleted.
    pub fn path(&self) -> &Path {
        if self.is_deleted_file {
            &self.old_path
        } else {
            &self.new_path
        }
    }

    /// Total number of line edits across all hunks.
    pub fn edit_count(&self) -> usize {
        self.hunks.iter().map(|h| h.edits.len()).sum()
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} hunks)",
            self.path().display(),
            self.hunks.len()
        )
    }
}

/// Parse a unified diff string (as produced by `git show` or `git diff`) into
/// structured [`FileDiff`] entries with line-level edits.
///
/// Handles new files, deleted files, renamed files, and binary files (which
/// are skipped). Hunk bodies are consumed exactly as far as their header
/// counts declare.
///
/// # Errors
///
/// Returns [`ChurnError::Parse`] naming the file and hunk if a hunk header is
/// malformed, a body line has an unknown prefix, or a body disagrees with its
/// header counts.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::parser::parse_unified_diff;
///
/// let files = parse_unified_diff("").unwrap();
/// assert!(files.is_empty());
/// ```
pub fn parse_unified_diff(input: &str) -> Result<Vec<FileDiff>> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut is_binary = false;
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        if line.starts_with("diff --git ") {
            if let Some(file) = current.take() {
                push_file(&mut files, file, is_binary);
            }
            is_binary = false;
            current = Some(FileDiff::empty());
            continue;
        }

        // Plain patches may lack the "diff --git" line.
        if line.starts_with("--- ") && current.is_none() {
            current = Some(FileDiff::empty());
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            is_binary = true;
            continue;
        }

        if line.starts_with("new file mode") {
            file.is_new_file = true;
            continue;
        }

        if line.starts_with("deleted file mode") {
            file.is_deleted_file = true;
            continue;
        }

        if line.starts_with("rename from ") || line.starts_with("rename to ") {
            file.is_rename = true;
            continue;
        }

        if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = parse_path(path);
            continue;
        }

        if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = parse_path(path);
            if file.new_path == Path::new("/dev/null") {
                file.is_deleted_file = true;
            }
            continue;
        }

        if line.starts_with("@@") {
            let with_file = |e: ChurnError| match e {
                ChurnError::Parse(msg) => {
                    ChurnError::Parse(format!("{}: {msg}", file.path().display()))
                }
                other => other,
            };

            let mut builder = HunkBuilder::new(line).map_err(with_file)?;
            while !builder.is_complete() {
                let Some(body) = lines.next() else {
                    break;
                };
                builder.push_line(body).map_err(with_file)?;
            }
            while lines.peek().is_some_and(|l| l.starts_with('\\')) {
                lines.next();
            }
            let hunk = builder.finish().map_err(with_file)?;
            file.hunks.push(hunk);
            continue;
        }

        if line.starts_with(['+', '-', ' ']) {
            tracing::warn!(
                path = %file.path().display(),
                line,
                "ignoring body line outside of any hunk"
            );
        }
        // index, similarity, mode change lines and anything else between hunks
    }

    if let Some(file) = current.take() {
        push_file(&mut files, file, is_binary);
    }

    Ok(files)
}

/// Parse a single hunk from its header and body lines.
///
/// Two cursors start at the header's old and new start lines. A context line
/// advances both, a `-` line yields a removal at the old cursor, and a `+`
/// line yields an addition at the new cursor.
///
/// # Errors
///
/// Returns [`ChurnError::Parse`] naming the hunk header on any malformed input.
///
/// # Examples
///
/// ```
/// use truechurn_core::{EditKind, LineEdit};
/// use truechurn_difflens::parser::parse_hunk;
///
/// let hunk = parse_hunk("@@ -10,2 +10,2 @@", &[" keep", "-old", "+new"]).unwrap();
/// assert_eq!(hunk.edits, vec![LineEdit::removed(11, "old"), LineEdit::added(11, "new")]);
///
/// assert!(parse_hunk("@@ -x +1 @@", &[]).is_err());
/// ```
pub fn parse_hunk(header: &str, body: &[&str]) -> Result<Hunk> {
    let mut builder = HunkBuilder::new(header)?;
    for line in body {
        builder.push_line(line)?;
    }
    builder.finish()
}

fn push_file(files: &mut Vec<FileDiff>, file: FileDiff, is_binary: bool) {
    if is_binary {
        tracing::trace!(path = %file.path().display(), "skipping binary file");
    } else {
        files.push(file);
    }
}

struct HunkBuilder {
    hunk: Hunk,
    old_cursor: u32,
    new_cursor: u32,
    old_left: u32,
    new_left: u32,
}

impl HunkBuilder {
    fn new(header: &str) -> Result<Self> {
        let (old_start, old_lines, new_start, new_lines) = parse_hunk_header(header)?;
        Ok(Self {
            hunk: Hunk {
                header: header.to_string(),
                old_start,
                old_lines,
                new_start,
                new_lines,
                edits: Vec::new(),
            },
            old_cursor: old_start,
            new_cursor: new_start,
            old_left: old_lines,
            new_left: new_lines,
        })
    }

    fn is_complete(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }

    fn push_line(&mut self, line: &str) -> Result<()> {
        if line.starts_with('\\') {
            return Ok(());
        }

        let mut chars = line.chars();
        // An empty line is a context line whose trailing space was stripped.
        let prefix = chars.next().unwrap_or(' ');
        let text = chars.as_str();

        match prefix {
            ' ' => {
                self.take_old(line)?;
                self.take_new(line)?;
                self.old_cursor = self.advance(self.old_cursor)?;
                self.new_cursor = self.advance(self.new_cursor)?;
            }
            '-' => {
                self.take_old(line)?;
                self.hunk
                    .edits
                    .push(LineEdit::removed(self.old_cursor, text));
                self.old_cursor = self.advance(self.old_cursor)?;
            }
            '+' => {
                self.take_new(line)?;
                self.hunk.edits.push(LineEdit::added(self.new_cursor, text));
                self.new_cursor = self.advance(self.new_cursor)?;
            }
            _ => {
                return Err(ChurnError::Parse(format!(
                    "unexpected line in hunk {}: {line:?}",
                    self.hunk.header
                )));
            }
        }
        Ok(())
    }

    fn advance(&self, cursor: u32) -> Result<u32> {
        cursor.checked_add(1).ok_or_else(|| {
            ChurnError::Parse(format!(
                "hunk {} overflows line numbers",
                self.hunk.header
            ))
        })
    }

    fn take_old(&mut self, line: &str) -> Result<()> {
        self.old_left = self.old_left.checked_sub(1).ok_or_else(|| {
            ChurnError::Parse(format!(
                "hunk {} has more old-side lines than declared at {line:?}",
                self.hunk.header
            ))
        })?;
        Ok(())
    }

    fn take_new(&mut self, line: &str) -> Result<()> {
        self.new_left = self.new_left.checked_sub(1).ok_or_else(|| {
            ChurnError::Parse(format!(
                "hunk {} has more new-side lines than declared at {line:?}",
                self.hunk.header
            ))
        })?;
        Ok(())
    }

    fn finish(self) -> Result<Hunk> {
        if !self.is_complete() {
            return Err(ChurnError::Parse(format!(
                "truncated hunk {}: {} old and {} new lines missing",
                self.hunk.header, self.old_left, self.new_left
            )));
        }
        Ok(self.hunk)
    }
}

fn parse_path(raw: &str) -> PathBuf {
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return PathBuf::from("/dev/null");
    }

    let stripped = normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized);

    PathBuf::from(stripped)
}

fn parse_hunk_header(line: &str) -> Result<(u32, u32, u32, u32)> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| ChurnError::Parse(format!("invalid hunk header: {line}")))?;

    let parts: Vec<&str> = inner.split(' ').collect();
    if parts.len() != 2 {
        return Err(ChurnError::Parse(format!("invalid hunk header: {line}")));
    }

    let old = parts[0]
        .strip_prefix('-')
        .ok_or_else(|| ChurnError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = parts[1]
        .strip_prefix('+')
        .ok_or_else(|| ChurnError::Parse(format!("invalid new range in hunk: {line}")))?;

    let (old_start, old_lines) = parse_range(old, line)?;
    let (new_start, new_lines) = parse_range(new, line)?;

    Ok((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32)> {
    if let Some((start, count)) = range.split_once(',') {
        let s = start
            .parse()
            .map_err(|_| ChurnError::Parse(format!("invalid range number in: {context}")))?;
        let c = count
            .parse()
            .map_err(|_| ChurnError::Parse(format!("invalid range count in: {context}")))?;
        Ok((s, c))
    } else {
        let s = range
            .parse()
            .map_err(|_| ChurnError::Parse(format!("invalid range number in: {context}")))?;
        Ok((s, 1))
    }
}
