//! Error types for the data-loader crate.
//!
//! Loading is all-or-nothing: any error returned from
//! [`Catalogue::load_from_file`](crate::Catalogue::load_from_file) means no
//! catalogue was produced.
//!
//! Rust error handling concepts demonstrated:
//! - thiserror for defining custom error types
//! - Struct-like variants that carry the context of the failure
//! - `#[from]` so `?` converts `std::io::Error` automatically

use crate::types::MovieId;
use thiserror::Error;

/// Errors that can occur while loading, parsing, or writing the catalogue
///
/// Rust concept: each variant names one failure mode, so callers can `match`
/// on the ones they want to recover from (a bad row) and propagate the rest.
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// The backing file is missing, unreadable, empty, or lacks a required column
    #[error("Movie data unavailable at {path}: {reason}")]
    DataUnavailable { path: String, reason: String },

    /// A single row could not be parsed
    ///
    /// Whether this aborts the load or only drops the row is decided by
    /// [`MalformedPolicy`](crate::MalformedPolicy).
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// Two rows (or an appended movie) share the same id
    #[error("Duplicate movie id {id}")]
    DuplicateKey { id: MovieId },

    /// A field value was rejected on the write path
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// The catalogue was loaded with malformed rows skipped
    ///
    /// Writing it back would delete those rows from disk, so saving is
    /// refused until the file is fixed and reloaded.
    #[error("Refusing to save: {skipped} malformed rows were skipped when the catalogue was loaded")]
    IncompleteCatalogue { skipped: usize },

    /// I/O error while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in this crate
///
/// Rust concept: Type aliases make code more readable.
/// Instead of writing `Result<T, DataLoadError>` everywhere,
/// we can write `Result<T>`
pub type Result<T> = std::result::Result<T, DataLoadError>;
