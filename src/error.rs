//! Crate-wide error type.
//!
//! Mirrors the five error kinds this system distinguishes: a failure talking to
//! the backing store, an expected "nothing found" result, a recoverable
//! duplicate-insert attempt, a per-record problem during ingestion, and an
//! internal consistency violation that should never happen and is fatal when it
//! does. `NotFound` is deliberately not logged as an error anywhere it is
//! produced; see the call sites in `store`, `ingest`, and `query`.

use std::fmt;

/// Why one record was not added to the corpus during ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordIssue {
    /// The record parser could not decode the raw record at all.
    Parse(String),
    /// The record parsed but failed an admission rule (§4.4).
    Rejected(String),
    /// A move in the record's move list was illegal under the rules engine.
    InvalidMove(String),
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIssue::Parse(reason) => write!(f, "parse error: {reason}"),
            RecordIssue::Rejected(reason) => write!(f, "rejected: {reason}"),
            RecordIssue::InvalidMove(reason) => write!(f, "invalid move: {reason}"),
        }
    }
}

/// A failure in any of Coord, Rules, Hasher, RecordAdapter, Ingestor, Store, or
/// Query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoshelfError {
    /// The backing store could not complete an operation (I/O, constraint
    /// violation). Fatal to the operation in progress.
    StoreFailure(String),
    /// A lookup returned nothing. Expected at several call sites; callers
    /// should match on this rather than treat it as exceptional.
    NotFound,
    /// An insert collided with an existing unique key (player name, final
    /// position hash). Recoverable: the caller should switch to a lookup.
    Duplicate(String),
    /// A single record failed during ingestion. Counted and logged; never
    /// aborts the session.
    Record(RecordIssue),
    /// An internal consistency check failed (e.g. an out-of-range coordinate
    /// returned from the store). This should never happen; treat as fatal.
    Invariant(String),
}

impl fmt::Display for GoshelfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoshelfError::StoreFailure(reason) => write!(f, "store failure: {reason}"),
            GoshelfError::NotFound => write!(f, "not found"),
            GoshelfError::Duplicate(what) => write!(f, "duplicate: {what}"),
            GoshelfError::Record(issue) => write!(f, "{issue}"),
            GoshelfError::Invariant(reason) => write!(f, "invariant violation: {reason}"),
        }
    }
}

impl std::error::Error for GoshelfError {}
