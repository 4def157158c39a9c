//! Contribution vs. churn accounting.
//!
//! Commits are replayed oldest first. Every added line counts as
//! contribution; a removed line counts as churn when the ledger shows the
//! position was itself added earlier in the window, and as negative
//! contribution otherwise.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use truechurn_core::{EditKind, LineEdit, Result};
use truechurn_difflens::filter::PathFilter;
use truechurn_difflens::parser::{parse_unified_diff, FileDiff};

use crate::ledger::{Ledger, LineKey, Verdict};
use crate::mining::{CommitInfo, CommitQuery, DiffSource};
use crate::window::DateWindow;

/// Whose totals are tracked.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::churn::AuthorSelection;
///
/// assert_eq!(AuthorSelection::from_filter(Some("")), AuthorSelection::All);
/// assert_eq!(AuthorSelection::from_filter(Some("alice")).filter(), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorSelection {
    /// One set of totals, keyed by the given author filter.
    Single(String),
    /// One set of totals per distinct commit author.
    All,
}

impl AuthorSelection {
    /// `None` or an empty filter selects every author.
    pub fn from_filter(author: Option<&str>) -> Self {
        match author {
            Some(a) if !a.is_empty() => AuthorSelection::Single(a.to_string()),
            _ => AuthorSelection::All,
        }
    }

    /// The author filter to hand to the diff source.
    pub fn filter(&self) -> Option<&str> {
        match self {
            AuthorSelection::Single(a) => Some(a),
            AuthorSelection::All => None,
        }
    }
}

/// Running totals for one author.
///
/// `churn` is never positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorTotals {
    /// Lines added minus lines removed that predate the window.
    pub contribution: i64,
    /// Negated count of in-window lines that were removed again.
    pub churn: i64,
    /// Commits applied for this author.
    pub commits: usize,
}

/// Per-position event counts for detailed reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDetail {
    /// Repository-relative file path.
    pub file: String,
    /// 1-based line position.
    pub position: u32,
    /// Added events observed at this position.
    pub added: u32,
    /// Removed events observed at this position.
    pub removed: u32,
}

/// How a single edit was counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// An added line.
    Contribution,
    /// Removal of a line added earlier in the window.
    Churn,
    /// Removal of a line that predates the window.
    PlainRemoval,
}

#[derive(Debug, Default)]
struct DetailLog {
    rows: Vec<LineDetail>,
    index: HashMap<LineKey, usize>,
}

impl DetailLog {
    fn record(&mut self, file: &str, edit: &LineEdit) {
        let key = LineKey::new(file, edit.position);
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.rows.push(LineDetail {
                    file: file.to_string(),
                    position: edit.position,
                    added: 0,
                    removed: 0,
                });
                self.index.insert(key, self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        match edit.kind {
            EditKind::Added => self.rows[idx].added += 1,
            EditKind::Removed => self.rows[idx].removed += 1,
        }
    }
}

/// Applies parsed edits to a shared [`Ledger`] and keeps per-author totals.
///
/// # Examples
///
/// ```
/// use truechurn_core::LineEdit;
/// use truechurn_gitpulse::churn::{AuthorSelection, ChurnAccumulator, Classification};
///
/// let mut acc = ChurnAccumulator::new(AuthorSelection::All, false);
/// acc.apply_edit("alice", "a.py", &LineEdit::added(10, "x = 1")).unwrap();
/// let verdict = acc.apply_edit("alice", "a.py", &LineEdit::removed(10, "x = 1")).unwrap();
/// assert_eq!(verdict, Classification::Churn);
///
/// let totals = acc.finish();
/// assert_eq!(totals.authors["alice"].contribution, 1);
/// assert_eq!(totals.authors["alice"].churn, -1);
/// ```
#[derive(Debug)]
pub struct ChurnAccumulator {
    ledger: Ledger,
    selection: AuthorSelection,
    totals: BTreeMap<String, AuthorTotals>,
    detail: Option<DetailLog>,
}

/// Final totals of a completed replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChurnTotals {
    /// Totals keyed by author.
    pub authors: BTreeMap<String, AuthorTotals>,
    /// Detail rows in first-observed order; empty unless detail was enabled.
    pub detail: Vec<LineDetail>,
}

impl ChurnAccumulator {
    /// Start a run with a fresh ledger.
    pub fn new(selection: AuthorSelection, detail: bool) -> Self {
        let mut totals = BTreeMap::new();
        if let AuthorSelection::Single(author) = &selection {
            totals.insert(author.clone(), AuthorTotals::default());
        }
        Self {
            ledger: Ledger::new(),
            selection,
            totals,
            detail: detail.then(DetailLog::default),
        }
    }

    fn totals_key<'a>(&'a self, author: &'a str) -> &'a str {
        match &self.selection {
            AuthorSelection::Single(name) => name,
            AuthorSelection::All => author,
        }
    }

    fn totals_mut(&mut self, author: &str) -> &mut AuthorTotals {
        let key = self.totals_key(author).to_string();
        self.totals.entry(key).or_default()
    }

    /// Apply every edit of one commit, file by file and hunk by hunk.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Ledger`](truechurn_core::ChurnError::Ledger) if the ledger detects a bookkeeping defect.
    pub fn apply_commit(&mut self, author: &str, files: &[FileDiff]) -> Result<()> {
        self.totals_mut(author).commits += 1;
        for file in files {
            let path = file.path().to_string_lossy().replace('\\', "/");
            for hunk in &file.hunks {
                for edit in &hunk.edits {
                    self.apply_edit(author, &path, edit)?;
                }
            }
        }
        Ok(())
    }

    /// Classify a single edit and update the author's totals.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Ledger`](truechurn_core::ChurnError::Ledger) if the ledger detects a bookkeeping defect.
    pub fn apply_edit(
        &mut self,
        author: &str,
        file: &str,
        edit: &LineEdit,
    ) -> Result<Classification> {
        let classification = match edit.kind {
            EditKind::Added => {
                self.ledger.record_add(file, edit.position);
                self.totals_mut(author).contribution += 1;
                Classification::Contribution
            }
            EditKind::Removed => match self.ledger.record_remove(file, edit.position)? {
                Verdict::Churn => {
                    self.totals_mut(author).churn -= 1;
                    Classification::Churn
                }
                Verdict::PlainRemoval => {
                    self.totals_mut(author).contribution -= 1;
                    Classification::PlainRemoval
                }
            },
        };

        if let Some(detail) = self.detail.as_mut() {
            detail.record(file, edit);
        }
        Ok(classification)
    }

    /// Current totals.
    pub fn totals(&self) -> &BTreeMap<String, AuthorTotals> {
        &self.totals
    }

    /// The ledger backing this run.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// End the run and hand out the final totals.
    pub fn finish(self) -> ChurnTotals {
        ChurnTotals {
            authors: self.totals,
            detail: self.detail.map(|d| d.rows).unwrap_or_default(),
        }
    }
}

/// Everything one analysis run needs besides its diff source.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Commits outside this window are ignored.
    pub window: DateWindow,
    /// Which authors to track.
    pub selection: AuthorSelection,
    /// Which paths take part.
    pub filter: PathFilter,
    /// Collect per-position detail rows.
    pub detail: bool,
}

/// Totals for one author in a finished report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorReport {
    /// Author name (or the author filter in single-author mode).
    pub author: String,
    /// Net contributed lines.
    pub contribution: i64,
    /// Net rewritten in-window lines (non-positive).
    pub churn: i64,
    /// Commits analysed for this author.
    pub commits: usize,
}

/// The outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnReport {
    /// The analysed window.
    pub window: DateWindow,
    /// The author filter, if one was given.
    pub author_filter: Option<String>,
    /// Per-author totals, sorted by author.
    pub authors: Vec<AuthorReport>,
    /// Per-position detail rows, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<LineDetail>,
    /// Number of commits replayed.
    pub commits_analyzed: usize,
    /// Number of file diffs dropped by the path filter.
    pub files_skipped: usize,
}

impl ChurnReport {
    /// Sum of contribution over all authors.
    pub fn total_contribution(&self) -> i64 {
        self.authors.iter().map(|a| a.contribution).sum()
    }

    /// Sum of churn over all authors.
    pub fn total_churn(&self) -> i64 {
        self.authors.iter().map(|a| a.churn).sum()
    }
}

/// Replay every qualifying commit from `source` and compute churn.
///
/// `progress` is called after each commit with `(done, total)`.
///
/// # Errors
///
/// Any source, parse or ledger failure aborts the run and is returned wrapped
/// in [`ChurnError::InCommit`](truechurn_core::ChurnError::InCommit); no partial report is produced.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::filter::PathFilter;
/// use truechurn_gitpulse::churn::{analyze, AnalysisRequest, AuthorSelection};
/// use truechurn_gitpulse::mining::MemorySource;
/// use truechurn_gitpulse::window::DateWindow;
///
/// let request = AnalysisRequest {
///     window: DateWindow::parse("2024-01", "2024-02").unwrap(),
///     selection: AuthorSelection::Single("alice".into()),
///     filter: PathFilter::allow_all(),
///     detail: false,
/// };
/// let report = analyze(&MemorySource::new(), &request, |_, _| {}).unwrap();
/// assert_eq!(report.commits_analyzed, 0);
/// assert_eq!(report.authors[0].contribution, 0);
/// ```
pub fn analyze<S: DiffSource + ?Sized>(
    source: &S,
    request: &AnalysisRequest,
    mut progress: impl FnMut(usize, usize),
) -> Result<ChurnReport> {
    let query = CommitQuery {
        window: request.window,
        author: request.selection.filter().map(str::to_string),
    };
    let commits = source.list_commits(&query)?;
    tracing::info!(commits = commits.len(), window = %request.window, "starting churn replay");

    let mut acc = ChurnAccumulator::new(request.selection.clone(), request.detail);
    let mut files_skipped = 0;

    for (i, commit) in commits.iter().enumerate() {
        files_skipped += apply_one(source, &mut acc, &request.filter, commit)
            .map_err(|e| e.in_commit(commit.short_hash()))?;
        progress(i + 1, commits.len());
    }

    let files_touched = acc.ledger().files().len();
    let totals = acc.finish();
    let authors = totals
        .authors
        .into_iter()
        .map(|(author, t)| AuthorReport {
            author,
            contribution: t.contribution,
            churn: t.churn,
            commits: t.commits,
        })
        .collect();

    let report = ChurnReport {
        window: request.window,
        author_filter: request.selection.filter().map(str::to_string),
        authors,
        detail: totals.detail,
        commits_analyzed: commits.len(),
        files_skipped,
    };
    tracing::info!(
        contribution = report.total_contribution(),
        churn = report.total_churn(),
        files_touched,
        "churn replay finished"
    );
    Ok(report)
}

fn apply_one<S: DiffSource + ?Sized>(
    source: &S,
    acc: &mut ChurnAccumulator,
    filter: &PathFilter,
    commit: &CommitInfo,
) -> Result<usize> {
    let patch = source.commit_patch(commit)?;
    let files = parse_unified_diff(&patch)?;
    let result = filter.filter(files);
    acc.apply_commit(&commit.author, &result.kept)?;
    tracing::debug!(
        commit = commit.short_hash(),
        author = %commit.author,
        files = result.kept.len(),
        skipped = result.skipped.len(),
        "applied commit"
    );
    Ok(result.skipped.len())
}
