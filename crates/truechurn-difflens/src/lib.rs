//! Unified-diff parsing and path filtering.
//!
//! Turns the raw patch text of a commit into per-file hunks of line-level
//! edits, and drops files that fall outside the analysed directories before
//! their edits reach the churn ledger.

pub mod filter;
pub mod parser;
