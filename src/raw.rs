//! Reference `RawReader` (spec §6 "RawReader interface (consumed)").
//!
//! Vendor-file decoding is explicitly out of scope for the core (spec §1):
//! real instrument SDKs are proprietary and not part of this crate's
//! dependency stack. This module ships one concrete, openly-specified
//! implementation of the trait — a newline-delimited JSON format, one
//! object per spectrum — so the conversion CLI and integration tests have
//! something concrete to drive `pipeline::convert` with, the same role
//! `Demo`/`Convert` play in `filiprumenovski-mzpeak-rs`'s CLI relative to
//! its `thermo`/`mzml` feature-gated vendor readers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::peak::VendorTag;
use crate::pipeline::{RawReader, RawSpectrum};

/// One line of the JSONL raw format.
#[derive(Deserialize)]
struct RawSpectrumRecord {
    id: i64,
    ms_level: i64,
    rt: f32,
    #[serde(default)]
    polarity: i32,
    mz: Vec<f64>,
    intensity: Vec<f32>,
    #[serde(default)]
    precursor_mz: Option<f64>,
    #[serde(default)]
    precursor_charge: Option<i32>,
}

impl From<RawSpectrumRecord> for RawSpectrum {
    fn from(r: RawSpectrumRecord) -> Self {
        RawSpectrum {
            id: r.id,
            ms_level: r.ms_level,
            rt: r.rt,
            polarity: r.polarity,
            mz: r.mz,
            intensity: r.intensity,
            precursor_mz: r.precursor_mz,
            precursor_charge: r.precursor_charge,
        }
    }
}

/// Reads spectra from a newline-delimited JSON file, one `RawSpectrum` per
/// line, in file order. Blank lines are skipped.
pub struct JsonlRawReader {
    lines: std::io::Lines<BufReader<File>>,
    vendor: VendorTag,
}

impl JsonlRawReader {
    /// Open `path` for reading, tagging every spectrum it yields with
    /// `vendor` (selects the peak-picking algorithm per spec §4.C).
    pub fn open(path: impl AsRef<Path>, vendor: VendorTag) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("failed to open raw input {}", path.as_ref().display()))?;
        Ok(JsonlRawReader {
            lines: BufReader::new(file).lines(),
            vendor,
        })
    }
}

impl RawReader for JsonlRawReader {
    fn vendor(&self) -> VendorTag {
        self.vendor
    }

    fn next_spectrum(&mut self) -> Result<Option<RawSpectrum>> {
        loop {
            match self.lines.next() {
                None => return Ok(None),
                Some(line) => {
                    let line = line.context("failed to read raw input line")?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record: RawSpectrumRecord = serde_json::from_str(&line)
                        .with_context(|| format!("malformed raw spectrum record: {line}"))?;
                    return Ok(Some(record.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_spectra_in_order_and_skips_blank_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.jsonl");
        let mut f = File::create(&path).unwrap();
        writeln!(
            f,
            r#"{{"id":1,"ms_level":1,"rt":1.0,"mz":[100.1,100.2],"intensity":[10.0,20.0]}}"#
        )
        .unwrap();
        writeln!(f).unwrap();
        writeln!(
            f,
            r#"{{"id":2,"ms_level":2,"rt":1.1,"mz":[50.0],"intensity":[5.0],"precursor_mz":100.2,"precursor_charge":2}}"#
        )
        .unwrap();
        drop(f);

        let mut reader = JsonlRawReader::open(&path, VendorTag::Other).unwrap();
        assert_eq!(reader.vendor(), VendorTag::Other);

        let first = reader.next_spectrum().unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.ms_level, 1);
        assert_eq!(first.mz, vec![100.1, 100.2]);

        let second = reader.next_spectrum().unwrap().unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(second.precursor_mz, Some(100.2));

        assert!(reader.next_spectrum().unwrap().is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(JsonlRawReader::open("/no/such/path.jsonl", VendorTag::Other).is_err());
    }
}
