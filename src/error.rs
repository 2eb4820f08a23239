//! Error types for lease file parsing and reporting.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants. Problems inside a single lease
//! entry are not errors at this level: they are collected per record as
//! [`FieldError`](crate::lease::FieldError) values and only cause that one
//! record to be rejected.

use std::path::PathBuf;

/// Errors that can occur while reading a lease snapshot or writing a report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error while reading the lease stream or writing output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The lease file could not be opened.
    #[error("Cannot open lease file {}: {source}", path.display())]
    LeaseFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (config file or JSON report).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV report could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration.
    ///
    /// Returned by [`Config::validate`](crate::Config::validate).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A time zone setting that is neither `utc`, `local` nor a UTC offset.
    #[error("Invalid time zone {0:?} (expected \"utc\", \"local\" or an offset such as \"-05:00\")")]
    InvalidTimeZone(String),
}

/// A specialized Result type for lease parsing operations.
pub type Result<T> = std::result::Result<T, Error>;
