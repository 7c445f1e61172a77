//! Error taxonomy (spec §7)
//!
//! `ArchiveError` names the seven recoverable/fatal kinds the rest of the
//! crate distinguishes on. Propagation still goes through `anyhow`/
//! `anyhow_ext` exactly as the rest of the crate does — `ArchiveError`
//! implements `std::error::Error`, so `?` converts it into `anyhow::Error`
//! at any call site without extra glue.

use thiserror::Error;

/// Taxonomy of kinds named by spec §7. Not every fallible operation in the
/// crate returns this type directly — most propagate through `anyhow`, and
/// construct one of these variants only where the caller needs to branch
/// on *which kind* of failure occurred (e.g. the pipeline's recoverable
/// vs. fatal dispatch, or a reader surfacing `MissingEncoding`).
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Archive or raw file not openable; fatal.
    #[error("I/O failure on {path}: {source}")]
    IoFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Existing archive's schema version differs from the writer's.
    /// Fatal on write, recoverable on read (open read-only).
    #[error("schema mismatch: archive is version {found}, expected {expected}")]
    SchemaMismatch { found: String, expected: String },

    /// Blob length inconsistent with its scan-record headers. Skip the
    /// tile, log, continue reading.
    #[error("corrupt bounding box blob (bb_id={bb_id}): {reason}")]
    CorruptBlob { bb_id: i64, reason: String },

    /// A data-encoding id referenced by a spectrum is absent from the
    /// encodings arena. Fatal on read.
    #[error("missing data encoding id {data_encoding_id} referenced by spectrum {spectrum_id}")]
    MissingEncoding {
        spectrum_id: i64,
        data_encoding_id: i64,
    },

    /// Optimizer failed to improve the centroid estimate; caller keeps
    /// the raw centroids and continues.
    #[error("curve fit did not converge for spectrum {spectrum_id}: {reason}")]
    FitFailed { spectrum_id: i64, reason: String },

    /// Raw arrays were empty; emit a zero-peak scan, log once per
    /// conversion.
    #[error("empty spectrum {spectrum_id}")]
    EmptySpectrum { spectrum_id: i64 },

    /// Cooperative cancellation: drain the current cycle and exit
    /// cleanly.
    #[error("cancellation requested")]
    CancelRequested,
}

impl ArchiveError {
    /// True for the kinds spec §7 calls fatal; false for recoverable ones.
    /// `CancelRequested` is neither — it is handled as a distinct
    /// cooperative-shutdown path by the pipeline, never logged as an error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ArchiveError::IoFailed { .. }
                | ArchiveError::SchemaMismatch { .. }
                | ArchiveError::MissingEncoding { .. }
        )
    }
}
