//! Core types, configuration, and error handling for truechurn.
//!
//! This crate provides the shared foundation used by the other truechurn crates:
//! - [`ChurnError`] — unified error type using `thiserror`
//! - [`ChurnConfig`] — configuration loaded from `.truechurn.toml`
//! - Shared types: [`Hunk`], [`LineEdit`], [`EditKind`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{ChurnConfig, FilterConfig, OutputConfig, WindowConfig};
pub use error::ChurnError;
pub use types::{EditKind, Hunk, LineEdit, OutputFormat};

/// A convenience `Result` type for truechurn operations.
pub type Result<T> = std::result::Result<T, ChurnError>;
