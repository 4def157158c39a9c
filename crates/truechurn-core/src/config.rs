use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ChurnError;
use crate::Result;
use crate::types::OutputFormat;

/// Top-level configuration loaded from `.truechurn.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use truechurn_core::ChurnConfig;
///
/// let config = ChurnConfig::default();
/// assert!(config.window.author.is_none());
/// assert!(!config.output.detail);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// Default analysis window and author.
    #[serde(default)]
    pub window: WindowConfig,
    /// Path inclusion/exclusion settings.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Report rendering settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl ChurnConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::FileNotFound`] if the file does not exist,
    /// [`ChurnError::Io`] if it cannot be read, or [`ChurnError::Toml`] if
    /// the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use truechurn_core::ChurnConfig;
    /// use std::path::Path;
    ///
    /// let config = ChurnConfig::from_file(Path::new(".truechurn.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ChurnError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use truechurn_core::ChurnConfig;
    ///
    /// let toml = r#"
    /// [window]
    /// author = "alice"
    /// "#;
    /// let config = ChurnConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.window.author.as_deref(), Some("alice"));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Default analysis window, used when the CLI does not supply one.
///
/// Dates use the `YYYY[-MM[-DD]]` format.
///
/// # Examples
///
/// ```
/// use truechurn_core::WindowConfig;
///
/// let window = WindowConfig::default();
/// assert!(window.after.is_none() && window.before.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Inclusive lower bound of the window.
    pub after: Option<String>,
    /// Exclusive upper bound of the window.
    pub before: Option<String>,
    /// Author filter; matched against author name or email.
    pub author: Option<String>,
}

/// Which file paths take part in the analysis.
///
/// # Examples
///
/// ```
/// use truechurn_core::FilterConfig;
///
/// let filter = FilterConfig::default();
/// assert!(filter.exclude_dirs.is_empty());
/// assert!(filter.include_dir.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Only analyse files below this repository-relative directory.
    pub include_dir: Option<String>,
    /// Repository-relative subdirectories to exclude (case-insensitive).
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    /// Glob patterns matched against repository-relative paths.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Report rendering configuration.
///
/// # Examples
///
/// ```
/// use truechurn_core::{OutputConfig, OutputFormat};
///
/// let output = OutputConfig::default();
/// assert_eq!(output.format, OutputFormat::Text);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (default: text).
    #[serde(default)]
    pub format: OutputFormat,
    /// Include the per-line detail log.
    #[serde(default)]
    pub detail: bool,
}
