use std::path::PathBuf;

/// Errors that can occur while computing churn.
///
/// Library crates use this type directly; the binary crate reports it as a
/// `miette` diagnostic.
///
/// # Examples
///
/// ```
/// use truechurn_core::ChurnError;
///
/// let err = ChurnError::InvalidDateRange("2024-05-01 is not before 2024-01-01".into());
/// assert!(err.to_string().contains("2024-05-01"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ChurnError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The commit/diff source could not be reached or failed.
    #[error("diff source unavailable: {0}")]
    #[diagnostic(
        code(truechurn::source),
        help("run inside a git repository or pass --dir <path-to-repo>")
    )]
    SourceUnavailable(String),

    /// Malformed hunk header or body line.
    #[error("parse error: {0}")]
    #[diagnostic(code(truechurn::parse))]
    Parse(String),

    /// Unparsable date, or `after` not strictly before `before`.
    #[error("invalid date range: {0}")]
    #[diagnostic(
        code(truechurn::date_range),
        help("dates use YYYY[-MM[-DD]] and --after must be earlier than --before")
    )]
    InvalidDateRange(String),

    /// The ledger was asked to do something that breaks its counting invariant.
    #[error("ledger invariant violated: {0}")]
    #[diagnostic(code(truechurn::ledger))]
    Ledger(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An error raised while processing a specific commit.
    #[error("commit {commit}: {source}")]
    InCommit {
        /// Hash of the offending commit.
        commit: String,
        /// The underlying failure.
        #[source]
        source: Box<ChurnError>,
    },
}

impl ChurnError {
    /// Attach the hash of the commit being processed.
    ///
    /// # Examples
    ///
    /// ```
    /// use truechurn_core::ChurnError;
    ///
    /// let err = ChurnError::Parse("invalid hunk header: @@ x @@".into()).in_commit("abc123");
    /// assert!(err.to_string().starts_with("commit abc123: parse error"));
    /// ```
    pub fn in_commit(self, commit: impl Into<String>) -> Self {
        ChurnError::InCommit {
            commit: commit.into(),
            source: Box::new(self),
        }
    }
}
