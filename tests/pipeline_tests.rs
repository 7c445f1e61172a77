//! End-to-end tests for the conversion pipeline (spec §5), driven through
//! `pipeline::convert` with the bundled `JsonlRawReader`.

use std::fs::File;
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use msarchive::config::ConversionConfig;
use msarchive::model::DataMode;
use msarchive::peak::VendorTag;
use msarchive::pipeline::convert;
use msarchive::queries::get_spectrum;
use msarchive::raw::JsonlRawReader;
use msarchive::writer::WriterMetadata;
use msarchive::ArchiveReader;

fn jsonl_file(dir: &tempfile::TempDir, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join("run.jsonl");
    let mut f = File::create(&path).unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
    path
}

/// Spec §8: "Empty spectrum produces a row with `n_points = 0` and no tile
/// contribution." The pipeline must not drop the spectrum or treat it as a
/// picking failure (spec §7 `EmptySpectrum` is recoverable).
#[test]
fn empty_spectrum_is_written_as_a_zero_point_row() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = jsonl_file(
        &dir,
        &[
            r#"{"id":1,"ms_level":1,"rt":0.0,"mz":[100.1,100.2],"intensity":[10.0,20.0]}"#,
            r#"{"id":2,"ms_level":1,"rt":1.0,"mz":[],"intensity":[]}"#,
            r#"{"id":3,"ms_level":1,"rt":2.0,"mz":[100.3,100.4],"intensity":[15.0,25.0]}"#,
        ],
    );

    let mut config = ConversionConfig::new(input.to_str().unwrap());
    config.output = dir.path().join("run.archive").to_str().unwrap().to_string();
    config
        .data_mode_overrides
        .push(msarchive::config::MsLevelRange {
            min_level: 1,
            max_level: 1,
            mode: DataMode::Centroid,
        });

    let mut reader = JsonlRawReader::open(&input, VendorTag::Other).unwrap();
    let report = convert(
        &mut reader,
        &config,
        WriterMetadata::with_defaults(),
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .expect("conversion should not fail on an empty spectrum");

    assert_eq!(report.spectra_written, 3, "all three scans should be written, including the empty one");
    assert!(!report.cancelled);

    let archive = ArchiveReader::open(&config.output).expect("open archive");
    let headers = archive.get_spectrum_headers();
    assert_eq!(headers.len(), 3);

    let empty_header = headers.iter().find(|h| h.id == 2).expect("scan 2 present");
    assert_eq!(empty_header.peaks_count, 0);

    let empty_spectrum = get_spectrum(archive.connection(), 2, archive.entity_cache())
        .expect("fetch empty spectrum");
    assert_eq!(empty_spectrum.data.peaks_count, 0);
    assert!(empty_spectrum.data.mz_array.is_empty());

    // Neighboring non-empty scans are unaffected by the empty one.
    let first = get_spectrum(archive.connection(), 1, archive.entity_cache()).unwrap();
    assert_eq!(first.data.peaks_count, 2);
    let third = get_spectrum(archive.connection(), 3, archive.entity_cache()).unwrap();
    assert_eq!(third.data.peaks_count, 2);
}

/// Three consecutive empty spectra are each recoverable individually and
/// must not trip the "three consecutive picking failures" fatal guard
/// (spec §5 "Timeouts"), since `EmptySpectrum` is not a picking failure.
#[test]
fn consecutive_empty_spectra_do_not_abort_conversion() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = jsonl_file(
        &dir,
        &[
            r#"{"id":1,"ms_level":1,"rt":0.0,"mz":[],"intensity":[]}"#,
            r#"{"id":2,"ms_level":1,"rt":1.0,"mz":[],"intensity":[]}"#,
            r#"{"id":3,"ms_level":1,"rt":2.0,"mz":[],"intensity":[]}"#,
            r#"{"id":4,"ms_level":1,"rt":3.0,"mz":[100.0],"intensity":[10.0]}"#,
        ],
    );

    let mut config = ConversionConfig::new(input.to_str().unwrap());
    config.output = dir.path().join("run.archive").to_str().unwrap().to_string();

    let mut reader = JsonlRawReader::open(&input, VendorTag::Other).unwrap();
    let report = convert(
        &mut reader,
        &config,
        WriterMetadata::with_defaults(),
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .expect("conversion should survive repeated empty spectra");

    assert_eq!(report.spectra_written, 4);
}
