//! Error taxonomy: fatal (abort the job) vs non-fatal (abandon one item).
//!
//! `pfutils.c`'s `errsend(fatal, ...)` carried the same message down one of two
//! paths; here the severity is a property of how a [`PfError`] is handled at a
//! role boundary, not a separate type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PfError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("short read on {path}: expected {expected}, got {got}")]
    ShortRead { path: PathBuf, expected: u64, got: u64 },

    #[error("short write on {path}: expected {expected}, got {got}")]
    ShortWrite { path: PathBuf, expected: u64, got: u64 },

    #[error("stat failed for {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("symlink operation failed for {path}: {source}")]
    Symlink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mkpath failed: {path} exists and is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("mkpath failed for {path}: {source}")]
    Mkpath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk {chkidx} of {path} already in flight")]
    ChunkBusy { path: PathBuf, chkidx: u64 },

    #[error("fatal: {0}")]
    Fatal(String),
}

/// Severity classification per spec: fatal aborts the whole job, non-fatal
/// abandons only the current item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    NonFatal,
}

impl PfError {
    /// Classify this error per the taxonomy. `ChunkBusy` is handled separately
    /// by callers (it is a soft conflict, not an error severity) but is given
    /// a severity here too so a generic `errsend`-style dispatcher can match
    /// on `PfError` alone.
    pub fn severity(&self) -> Severity {
        match self {
            PfError::Io { .. }
            | PfError::ShortRead { .. }
            | PfError::ShortWrite { .. }
            | PfError::Stat { .. }
            | PfError::Symlink { .. } => Severity::NonFatal,
            PfError::NotADirectory { .. } | PfError::Mkpath { .. } | PfError::ChunkBusy { .. } => {
                Severity::NonFatal
            }
            PfError::Fatal(_) => Severity::Fatal,
        }
    }

    /// Format the way the output role prefixes lines, per spec.md §7.
    pub fn output_line(&self) -> String {
        match self.severity() {
            Severity::Fatal => format!("ERROR FATAL: {self}"),
            Severity::NonFatal => format!("ERROR NONFATAL: {self}"),
        }
    }
}
