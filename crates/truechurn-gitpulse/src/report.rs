//! Rendering of a [`ChurnReport`] as text, Markdown or JSON.

use std::fmt::Write;

use truechurn_core::{ChurnError, OutputFormat, Result};

use crate::churn::ChurnReport;

/// Render a report in the requested format.
///
/// # Errors
///
/// Returns [`ChurnError::Serialization`] if JSON serialization fails.
pub fn render(report: &ChurnReport, format: OutputFormat, use_color: bool) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report, use_color)),
        OutputFormat::Markdown => Ok(render_markdown(report)),
        OutputFormat::Json => render_json(report),
    }
}

/// Human-readable table of per-author totals, followed by detail rows when
/// present.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::filter::PathFilter;
/// use truechurn_gitpulse::churn::{analyze, AnalysisRequest, AuthorSelection};
/// use truechurn_gitpulse::mining::MemorySource;
/// use truechurn_gitpulse::report::render_text;
/// use truechurn_gitpulse::window::DateWindow;
///
/// let request = AnalysisRequest {
///     window: DateWindow::parse("2024-01", "2024-02").unwrap(),
///     selection: AuthorSelection::Single("alice".into()),
///     filter: PathFilter::allow_all(),
///     detail: false,
/// };
/// let report = analyze(&MemorySource::new(), &request, |_, _| {}).unwrap();
/// let text = render_text(&report, false);
/// assert!(text.contains("alice"));
/// assert!(text.contains("2024-01-01 .. 2024-02-01"));
/// ```
pub fn render_text(report: &ChurnReport, use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "window:  {}", report.window);
    if let Some(author) = &report.author_filter {
        let _ = writeln!(out, "author:  {author}");
    }
    let _ = writeln!(
        out,
        "commits: {} ({} files skipped)\n",
        report.commits_analyzed, report.files_skipped
    );

    if report.authors.is_empty() {
        let _ = writeln!(out, "No qualifying commits.");
        return out;
    }

    let width = report
        .authors
        .iter()
        .map(|a| a.author.chars().count())
        .max()
        .unwrap_or(0)
        .max("author".len());

    let _ = writeln!(
        out,
        "{:<width$}  {:>12}  {:>8}  {:>7}",
        "author", "contribution", "churn", "commits"
    );
    for a in &report.authors {
        let churn = format!("{:>8}", a.churn);
        let churn = if use_color && a.churn < 0 {
            format!("\x1b[31m{churn}\x1b[0m")
        } else {
            churn
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:>12}  {churn}  {:>7}",
            a.author, a.contribution, a.commits
        );
    }

    if report.authors.len() > 1 {
        let _ = writeln!(
            out,
            "{:<width$}  {:>12}  {:>8}",
            "total",
            report.total_contribution(),
            report.total_churn()
        );
    }

    if !report.detail.is_empty() {
        let _ = writeln!(out, "\ndetail:");
        for row in &report.detail {
            let _ = writeln!(
                out,
                "  {}:{}  +{} -{}",
                row.file, row.position, row.added, row.removed
            );
        }
    }

    out
}

/// GitHub-flavored Markdown rendering.
pub fn render_markdown(report: &ChurnReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Code Churn\n");
    let _ = writeln!(out, "Window: `{}`\n", report.window);
    if let Some(author) = &report.author_filter {
        let _ = writeln!(out, "Author filter: `{author}`\n");
    }

    if report.authors.is_empty() {
        let _ = writeln!(out, "No qualifying commits.");
        return out;
    }

    let _ = writeln!(out, "| Author | Contribution | Churn | Commits |");
    let _ = writeln!(out, "|--------|-------------:|------:|--------:|");
    for a in &report.authors {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            a.author.replace('|', "\\|"),
            a.contribution,
            a.churn,
            a.commits
        );
    }

    let _ = writeln!(
        out,
        "\n{} commits analyzed, {} file diffs skipped.",
        report.commits_analyzed, report.files_skipped
    );

    if !report.detail.is_empty() {
        let _ = writeln!(out, "\n## Line detail\n");
        let _ = writeln!(out, "| File | Line | Added | Removed |");
        let _ = writeln!(out, "|------|-----:|------:|--------:|");
        for row in &report.detail {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} | {} |",
                row.file, row.position, row.added, row.removed
            );
        }
    }

    out
}

/// Pretty JSON with camelCase keys.
///
/// # Errors
///
/// Returns [`ChurnError::Serialization`] if serialization fails.
pub fn render_json(report: &ChurnReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(ChurnError::from)
}
