//! Error types for Pica+ operations.
//!
//! This module provides the [`PicaError`] type for all library operations
//! and the [`Result`] convenience type.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for all Pica+ library operations.
///
/// Covers framing failures while splitting a dump into records, lookups that
/// find zero or several matches, corrupt persisted indexes, and I/O.
#[derive(Error, Debug)]
pub enum PicaError {
    /// The stream ended before any boundary marker line was seen.
    #[error("Framing error: no records found")]
    NoRecords,

    /// A boundary marker line does not carry enough tokens to hold a key.
    #[error("Framing error: malformed boundary marker: {0:?}")]
    MalformedMarker(String),

    /// A requested tag or subfield code is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single-value accessor found more than one match.
    ///
    /// `key` is the tag or subfield code that was asked for, `values` holds
    /// every matching raw body or subfield value in source order.
    #[error("{key:?} contains multiple values ({}), use the get_all accessor", values.len())]
    MultipleValues {
        /// Tag or subfield code that was requested
        key: String,
        /// All matches, in source order
        values: Vec<String>,
    },

    /// A record key is not present in an offset index.
    #[error("Key not found in index: {0}")]
    KeyNotFound(String),

    /// Record construction input is inconsistent.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A persisted index file could not be parsed.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// The dump file referenced by an index does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`PicaError`].
pub type Result<T> = std::result::Result<T, PicaError>;
