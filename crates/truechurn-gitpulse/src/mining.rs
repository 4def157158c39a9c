//! Commit and patch extraction.
//!
//! A [`DiffSource`] lists the commits of the analysed branch in
//! chronological order and hands out the raw unified diff of each one.
//! [`GitSource`] reads a real repository via git2; [`MemorySource`] replays
//! prepared patches.

use std::path::Path;

use git2::{DiffFormat, DiffOptions, Oid, Repository, Sort};
use truechurn_core::{ChurnError, Result};

use crate::window::DateWindow;

/// Commit metadata extracted from history.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::mining::CommitInfo;
///
/// let info = CommitInfo {
///     hash: "abc123".into(),
///     author: "alice".into(),
///     email: "alice@example.com".into(),
///     timestamp: 1700000000,
///     message: "fix: auth bug".into(),
/// };
/// assert_eq!(info.short_hash(), "abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit hash.
    pub hash: String,
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Unix timestamp of the commit.
    pub timestamp: i64,
    /// First line of commit message.
    pub message: String,
}

impl CommitInfo {
    /// The first eight characters of the hash.
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(8)]
    }
}

/// Which commits a source should yield.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::mining::CommitQuery;
/// use truechurn_gitpulse::window::DateWindow;
///
/// let query = CommitQuery {
///     window: DateWindow::parse("2024-01", "2024-02").unwrap(),
///     author: Some("alice".into()),
/// };
/// assert!(query.matches_author("Alice Smith", "alice@example.com"));
/// assert!(!query.matches_author("Bob", "bob@example.com"));
/// ```
#[derive(Debug, Clone)]
pub struct CommitQuery {
    /// Commits must fall inside this window.
    pub window: DateWindow,
    /// Substring matched against author name or email; `None` keeps everyone.
    pub author: Option<String>,
}

impl CommitQuery {
    /// Whether an author passes the filter.
    pub fn matches_author(&self, name: &str, email: &str) -> bool {
        match self.author.as_deref() {
            None | Some("") => true,
            Some(filter) => name.contains(filter) || email.contains(filter),
        }
    }

    fn accepts(&self, commit: &CommitInfo) -> bool {
        self.window.contains(commit.timestamp) && self.matches_author(&commit.author, &commit.email)
    }
}

/// Where commits and their diffs come from.
///
/// Implementations return non-merge commits of the analysed branch, oldest
/// first. Correct churn accounting depends on that order.
pub trait DiffSource {
    /// List qualifying commits, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::SourceUnavailable`] if history cannot be read.
    fn list_commits(&self, query: &CommitQuery) -> Result<Vec<CommitInfo>>;

    /// The unified diff (zero context lines) a commit introduced.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::SourceUnavailable`] if the diff cannot be produced.
    fn commit_patch(&self, commit: &CommitInfo) -> Result<String>;
}

/// A [`DiffSource`] backed by a git repository on disk.
pub struct GitSource {
    repo: Repository,
    prefix: Option<String>,
}

impl GitSource {
    /// Open the repository containing `path`.
    ///
    /// When `path` is a subdirectory of the work tree, its repository-relative
    /// path is available from [`GitSource::workdir_prefix`].
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::SourceUnavailable`] if no repository is found.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use truechurn_gitpulse::mining::GitSource;
    ///
    /// let source = GitSource::open(Path::new(".")).unwrap();
    /// println!("{:?}", source.workdir_prefix());
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| {
            ChurnError::SourceUnavailable(format!(
                "failed to open repository at {}: {e}",
                path.display()
            ))
        })?;

        let prefix = match repo.workdir() {
            Some(workdir) => relative_prefix(workdir, path),
            None => None,
        };

        tracing::debug!(path = %path.display(), prefix = ?prefix, "opened repository");
        Ok(Self { repo, prefix })
    }

    /// Repository-relative directory the source was opened from, if not the root.
    pub fn workdir_prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

fn relative_prefix(workdir: &Path, path: &Path) -> Option<String> {
    let workdir = workdir.canonicalize().ok()?;
    let path = path.canonicalize().ok()?;
    let rel = path.strip_prefix(&workdir).ok()?;
    let prefix = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    }
}

impl DiffSource for GitSource {
    fn list_commits(&self, query: &CommitQuery) -> Result<Vec<CommitInfo>> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| ChurnError::SourceUnavailable(format!("failed to create revwalk: {e}")))?;

        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)
            .map_err(|e| ChurnError::SourceUnavailable(format!("failed to sort revwalk: {e}")))?;
        revwalk
            .push_head()
            .map_err(|e| ChurnError::SourceUnavailable(format!("failed to push HEAD: {e}")))?;

        let mut commits = Vec::new();

        for oid_result in revwalk {
            let oid = oid_result
                .map_err(|e| ChurnError::SourceUnavailable(format!("revwalk error: {e}")))?;

            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| ChurnError::SourceUnavailable(format!("failed to find commit: {e}")))?;

            if commit.parent_count() > 1 {
                tracing::trace!(commit = %oid, "skipping merge commit");
                continue;
            }

            let author = commit.author();
            let info = CommitInfo {
                hash: oid.to_string(),
                author: author.name().unwrap_or("unknown").to_string(),
                email: author.email().unwrap_or("unknown").to_string(),
                timestamp: commit.time().seconds(),
                message: commit
                    .message()
                    .unwrap_or("")
                    .lines()
                    .next()
                    .unwrap_or("")
                    .to_string(),
            };

            if query.accepts(&info) {
                commits.push(info);
            }
        }

        Ok(commits)
    }

    fn commit_patch(&self, info: &CommitInfo) -> Result<String> {
        let oid = Oid::from_str(&info.hash).map_err(|e| {
            ChurnError::SourceUnavailable(format!("invalid commit id {}: {e}", info.hash))
        })?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| ChurnError::SourceUnavailable(format!("failed to find commit: {e}")))?;

        let commit_tree = commit
            .tree()
            .map_err(|e| ChurnError::SourceUnavailable(format!("failed to get commit tree: {e}")))?;

        let parent_tree = if commit.parent_count() > 0 {
            let parent = commit
                .parent(0)
                .map_err(|e| ChurnError::SourceUnavailable(format!("failed to get parent: {e}")))?;
            Some(parent.tree().map_err(|e| {
                ChurnError::SourceUnavailable(format!("failed to get parent tree: {e}"))
            })?)
        } else {
            None
        };

        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(0);
        let diff = self
            .repo
            .diff_tree_to_tree(
                parent_tree.as_ref(),
                Some(&commit_tree),
                Some(&mut diff_opts),
            )
            .map_err(|e| ChurnError::SourceUnavailable(format!("failed to compute diff: {e}")))?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let content = String::from_utf8_lossy(line.content());
            match line.origin() {
                '+' | '-' | ' ' => {
                    patch.push(line.origin());
                    patch.push_str(&content);
                }
                'F' | 'H' | 'B' => patch.push_str(&content),
                // end-of-file newline markers
                _ => return true,
            }
            if !patch.ends_with('\n') {
                patch.push('\n');
            }
            true
        })
        .map_err(|e| ChurnError::SourceUnavailable(format!("failed to print diff: {e}")))?;

        Ok(patch)
    }
}

/// An in-memory [`DiffSource`] holding prepared commits and patches.
///
/// Commits are yielded sorted by timestamp; ties keep insertion order.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::mining::{CommitInfo, CommitQuery, DiffSource, MemorySource};
/// use truechurn_gitpulse::window::DateWindow;
///
/// let mut source = MemorySource::new();
/// source.push(
///     CommitInfo {
///         hash: "c1".into(),
///         author: "alice".into(),
///         email: "alice@example.com".into(),
///         timestamp: 1_704_153_600,
///         message: "init".into(),
///     },
///     "",
/// );
/// let query = CommitQuery {
///     window: DateWindow::parse("2024-01", "2024-02").unwrap(),
///     author: None,
/// };
/// assert_eq!(source.list_commits(&query).unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    commits: Vec<(CommitInfo, String)>,
}

impl MemorySource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit and the patch it introduced.
    pub fn push(&mut self, commit: CommitInfo, patch: impl Into<String>) {
        self.commits.push((commit, patch.into()));
    }
}

impl DiffSource for MemorySource {
    fn list_commits(&self, query: &CommitQuery) -> Result<Vec<CommitInfo>> {
        let mut commits: Vec<CommitInfo> = self
            .commits
            .iter()
            .map(|(c, _)| c)
            .filter(|c| query.accepts(c))
            .cloned()
            .collect();
        commits.sort_by_key(|c| c.timestamp);
        Ok(commits)
    }

    fn commit_patch(&self, commit: &CommitInfo) -> Result<String> {
        self.commits
            .iter()
            .find(|(c, _)| c.hash == commit.hash)
            .map(|(_, patch)| patch.clone())
            .ok_or_else(|| ChurnError::SourceUnavailable(format!("unknown commit {}", commit.hash)))
    }
}
