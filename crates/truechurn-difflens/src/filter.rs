//! Directory inclusion/exclusion applied to file diffs before their edits
//! reach the churn accumulator.
//!
//! Exclusions mirror git's `:(exclude,icase)` pathspec: a listed
//! subdirectory removes every path below it, compared case-insensitively.

use std::path::PathBuf;

use truechurn_core::{ChurnError, FilterConfig, Result};

use crate::parser::FileDiff;

/// Decides which repository paths take part in the analysis.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::filter::PathFilter;
///
/// let filter = PathFilter::new(None, &["vendor".to_string()], &[]).unwrap();
/// assert!(!filter.allows("Vendor/lib.py"));
/// assert!(filter.allows("src/lib.py"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include_dir: Option<String>,
    exclude_dirs: Vec<String>,
    exclude_patterns: Vec<glob::Pattern>,
}

impl PathFilter {
    /// A filter that keeps every path.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Build a filter from an optional inclusion directory, excluded
    /// subdirectories, and glob patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] if a glob pattern is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use truechurn_difflens::filter::PathFilter;
    ///
    /// let filter = PathFilter::new(Some("app"), &[], &["*.lock".to_string()]).unwrap();
    /// assert!(filter.allows("app/main.py"));
    /// assert!(!filter.allows("lib/main.py"));
    /// assert!(!filter.allows("app/poetry.lock"));
    ///
    /// assert!(PathFilter::new(None, &[], &["[".to_string()]).is_err());
    /// ```
    pub fn new(
        include_dir: Option<&str>,
        exclude_dirs: &[String],
        exclude_patterns: &[String],
    ) -> Result<Self> {
        let include_dir = include_dir.map(normalize_dir).filter(|d| !d.is_empty());

        let exclude_dirs = exclude_dirs
            .iter()
            .map(|d| normalize_dir(d).to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let mut patterns = Vec::new();
        for pat in exclude_patterns {
            let p = glob::Pattern::new(pat)
                .map_err(|e| ChurnError::Config(format!("invalid exclude pattern '{pat}': {e}")))?;
            patterns.push(p);
        }

        Ok(Self {
            include_dir,
            exclude_dirs,
            exclude_patterns: patterns,
        })
    }

    /// Build a filter from the `[filter]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] if a glob pattern is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use truechurn_core::FilterConfig;
    /// use truechurn_difflens::filter::PathFilter;
    ///
    /// let config = FilterConfig {
    ///     exclude_dirs: vec!["docs".into()],
    ///     ..FilterConfig::default()
    /// };
    /// let filter = PathFilter::from_config(&config).unwrap();
    /// assert!(!filter.allows("docs/index.md"));
    /// ```
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::new(
            config.include_dir.as_deref(),
            &config.exclude_dirs,
            &config.exclude_patterns,
        )
    }

    /// Check whether a repository-relative path is analysed.
    pub fn allows(&self, path: &str) -> bool {
        self.check_skip(path).is_none()
    }

    /// Split diffs into those that are analysed and those that are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use truechurn_difflens::filter::PathFilter;
    /// use truechurn_difflens::parser::parse_unified_diff;
    ///
    /// let diff = "diff --git a/vendor/x.py b/vendor/x.py\n\
    ///             --- a/vendor/x.py\n\
    ///             +++ b/vendor/x.py\n\
    ///             @@ -1,0 +1 @@\n\
    ///             +new\n";
    /// let diffs = parse_unified_diff(diff).unwrap();
    /// let filter = PathFilter::new(None, &["vendor".to_string()], &[]).unwrap();
    /// let result = filter.filter(diffs);
    /// assert!(result.kept.is_empty());
    /// assert_eq!(result.skipped.len(), 1);
    /// ```
    pub fn filter(&self, diffs: Vec<FileDiff>) -> FilterResult {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();

        for diff in diffs {
            let path = diff.path().to_string_lossy().replace('\\', "/");
            match self.check_skip(&path) {
                Some(reason) => {
                    tracing::debug!(path = %path, %reason, "skipping file");
                    skipped.push(SkippedFile {
                        path: diff.path().to_path_buf(),
                        reason,
                    });
                }
                None => kept.push(diff),
            }
        }

        FilterResult { kept, skipped }
    }

    fn check_skip(&self, path: &str) -> Option<SkipReason> {
        if let Some(dir) = &self.include_dir {
            if !is_under(path, dir) {
                return Some(SkipReason::OutsideDir(dir.clone()));
            }
        }

        let lowered = path.to_lowercase();
        for dir in &self.exclude_dirs {
            if is_under(&lowered, dir) {
                return Some(SkipReason::ExcludedDir(dir.clone()));
            }
        }

        for pat in &self.exclude_patterns {
            if pat.matches(path) {
                return Some(SkipReason::PatternMatch(pat.to_string()));
            }
        }

        None
    }
}

fn normalize_dir(dir: &str) -> String {
    let dir = dir.replace('\\', "/");
    let dir = dir.trim_start_matches("./").trim_matches('/');
    if dir == "." {
        String::new()
    } else {
        dir.to_string()
    }
}

fn is_under(path: &str, dir: &str) -> bool {
    path == dir
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Result of filtering diffs.
pub struct FilterResult {
    /// Diffs that passed the filter.
    pub kept: Vec<FileDiff>,
    /// Files that were skipped with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was skipped during filtering.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was skipped.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::filter::SkipReason;
///
/// let reason = SkipReason::ExcludedDir("vendor".into());
/// assert_eq!(format!("{reason}"), "excluded dir: vendor");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not below the included directory.
    OutsideDir(String),
    /// Below an excluded subdirectory.
    ExcludedDir(String),
    /// Matched an exclude glob pattern.
    PatternMatch(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::OutsideDir(dir) => write!(f, "outside dir: {dir}"),
            SkipReason::ExcludedDir(dir) => write!(f, "excluded dir: {dir}"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
        }
    }
}
