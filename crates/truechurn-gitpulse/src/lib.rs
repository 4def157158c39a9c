//! Git history replay and true-churn accounting.
//!
//! Reads the commits of a branch in chronological order via git2, replays
//! their line edits against a sparse per-line ledger, and reports per-author
//! contribution and churn: lines rewritten within the same window in which
//! they were written.

pub mod churn;
pub mod ledger;
pub mod mining;
pub mod report;
pub mod window;
