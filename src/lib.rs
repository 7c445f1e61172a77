//! msarchive: a Rust library for reading and writing mzDB-style mass
//! spectrometry archives — SQLite-backed, bounding-box-tiled spectra with
//! R-tree spatial indexing.
//!
//! # Example
//! ```no_run
//! use msarchive::ArchiveReader;
//!
//! let reader = ArchiveReader::open("path/to/file.mzDB").unwrap();
//! for spectrum in reader.iter_spectra(None).unwrap() {
//!     println!("Spectrum {}: {} peaks", spectrum.header.id, spectrum.data.peaks_count);
//! }
//! ```

mod err_loc;

pub mod cache;
pub mod codec;
pub mod chromatogram;
pub mod config;
pub mod error;
pub mod iterator;
pub mod metadata;
pub mod model;
pub mod mzdb;
pub mod peak;
pub mod pipeline;
pub mod queries;
pub mod queries_extended;
pub mod query_utils;
pub mod raw;
pub mod region_extractor;
pub mod rtree;
pub mod writer;
pub mod xml;

// Re-export main types for convenience
pub use model::{
    AcquisitionMode, BBSizes, BoundingBox, BoundingBoxIndex, ByteOrder, DataEncoding,
    DataEncodingsCache, DataMode, EntityCache, IsolationWindow, MzRange, PeakEncoding, Spectrum,
    SpectrumData, SpectrumHeader, SpectrumSlice, XicMethod, XicPeak,
};
pub use error::ArchiveError;

use anyhow::Result;
use anyhow_ext::Context;
use rusqlite::Connection;

use crate::iterator::for_each_spectrum;
use crate::mzdb::create_entity_cache;
use crate::queries::{get_archive_version, get_ms_xic, get_spectrum, get_writer_version};

/// Main entry point for reading archive files.
pub struct ArchiveReader {
    connection: Connection,
    entity_cache: EntityCache,
}

impl ArchiveReader {
    /// Open an archive file for reading.
    pub fn open(path: &str) -> Result<Self> {
        let connection = Connection::open(path).context("failed to open archive")?;
        let entity_cache = create_entity_cache(&connection)?;
        Ok(Self {
            connection,
            entity_cache,
        })
    }

    /// Archive format version, as stored in `meta_archive`.
    pub fn get_version(&self) -> Result<Option<String>> {
        get_archive_version(&self.connection)
    }

    /// The writer version that produced this archive.
    pub fn get_writer_version(&self) -> Result<Option<String>> {
        get_writer_version(&self.connection)
    }

    /// Bounding box sizes this archive was written with.
    pub fn get_bb_sizes(&self) -> &BBSizes {
        &self.entity_cache.bb_sizes
    }

    /// All spectrum headers, in storage order.
    pub fn get_spectrum_headers(&self) -> &[SpectrumHeader] {
        &self.entity_cache.spectrum_headers
    }

    /// Read a single spectrum by id.
    pub fn get_spectrum(&self, spectrum_id: i64) -> Result<Spectrum> {
        get_spectrum(&self.connection, spectrum_id, &self.entity_cache)
    }

    /// Stream every spectrum in ascending id order, optionally restricted to
    /// one MS level.
    pub fn iter_spectra(&self, ms_level: Option<i64>) -> Result<Vec<Spectrum>> {
        let mut spectra = Vec::new();
        for_each_spectrum(&self.connection, &self.entity_cache, ms_level, |s| {
            spectra.push(s.clone());
            Ok(())
        })?;
        Ok(spectra)
    }

    /// Extracted ion chromatogram (XIC) around one m/z, within an optional
    /// retention-time window.
    pub fn get_xic(
        &self,
        mz: f64,
        mz_tol_ppm: f64,
        min_rt: Option<f32>,
        max_rt: Option<f32>,
        method: XicMethod,
    ) -> Result<Vec<XicPeak>> {
        get_ms_xic(
            &self.connection,
            mz,
            mz_tol_ppm,
            min_rt,
            max_rt,
            method,
            &self.entity_cache,
        )
    }

    /// Raw SQLite connection, for queries not covered by this API.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The entity cache (bb sizes, data encodings, spectrum headers).
    pub fn entity_cache(&self) -> &EntityCache {
        &self.entity_cache
    }
}
