//! Integration tests against archives built on the fly with `MzDbWriter`.

mod common;

use common::{write_archive, RawScan};
use msarchive::model::{ByteOrder, DataEncoding, DataMode, PeakEncoding, SpectrumData, XicMethod};
use msarchive::mzdb::create_entity_cache;
use msarchive::queries::{get_archive_version, get_ms_xic, get_spectrum, list_data_encodings};
use msarchive::{ArchiveReader, BBSizes};
use rusqlite::Connection;

fn three_ms1_scans() -> Vec<RawScan> {
    vec![
        RawScan::new(1, 0.0, vec![100.0, 200.0, 300.0], vec![1000.0, 2000.0, 1500.0]),
        RawScan::new(1, 1.0, vec![100.1, 200.1], vec![900.0, 1800.0]),
        RawScan::new(1, 2.0, vec![100.2, 200.2, 300.2], vec![800.0, 1700.0, 1400.0]),
    ]
}

fn mixed_ms_levels() -> Vec<RawScan> {
    vec![
        RawScan::new(1, 0.0, vec![500.0, 600.0], vec![100.0, 200.0]),
        RawScan::new(2, 0.5, vec![150.0], vec![50.0]),
        RawScan::new(1, 1.0, vec![500.1, 600.1], vec![110.0, 210.0]),
        RawScan::new(2, 1.5, vec![155.0, 160.0], vec![55.0, 60.0]),
    ]
}

#[test]
fn test_open_archive() {
    let (_dir, path) = write_archive(BBSizes::default(), three_ms1_scans());
    let reader = ArchiveReader::open(path.to_str().unwrap()).expect("open archive");
    assert!(!reader.get_spectrum_headers().is_empty());
}

#[test]
fn test_get_archive_version() {
    let (_dir, path) = write_archive(BBSizes::default(), three_ms1_scans());
    let db = Connection::open(&path).expect("open db");
    let version = get_archive_version(&db).expect("get version");
    assert!(version.is_some(), "archive version should be present");
}

#[test]
fn test_create_entity_cache() {
    let (_dir, path) = write_archive(BBSizes::default(), three_ms1_scans());
    let db = Connection::open(&path).expect("open db");
    let cache = create_entity_cache(&db).expect("create entity cache");

    assert_eq!(cache.spectrum_headers.len(), 3);
    assert!(cache.bb_sizes.bb_mz_height_ms1 > 0.0);
}

#[test]
fn test_list_data_encodings() {
    let (_dir, path) = write_archive(BBSizes::default(), three_ms1_scans());
    let db = Connection::open(&path).expect("open db");
    let encodings = list_data_encodings(&db).expect("list data encodings");

    assert!(!encodings.is_empty());
    for enc in &encodings {
        assert!(enc.id > 0);
    }
}

#[test]
fn test_get_spectrum_round_trip() {
    let (_dir, path) = write_archive(BBSizes::default(), three_ms1_scans());
    let db = Connection::open(&path).expect("open db");
    let cache = create_entity_cache(&db).expect("create cache");

    let spectrum = get_spectrum(&db, 1, &cache).expect("get spectrum 1");
    assert_eq!(spectrum.header.id, 1);
    assert_eq!(spectrum.data.peaks_count, 3);
    assert_eq!(spectrum.data.mz_array, vec![100.0, 200.0, 300.0]);

    for i in 1..spectrum.data.mz_array.len() {
        assert!(spectrum.data.mz_array[i] >= spectrum.data.mz_array[i - 1]);
    }
}

#[test]
fn test_iter_spectra_ms1_only() {
    let (_dir, path) = write_archive(BBSizes::default(), mixed_ms_levels());
    let reader = ArchiveReader::open(path.to_str().unwrap()).expect("open archive");

    let ms1 = reader.iter_spectra(Some(1)).expect("iterate MS1");
    assert_eq!(ms1.len(), 2);
    assert!(ms1.iter().all(|s| s.header.ms_level == 1));

    let all = reader.iter_spectra(None).expect("iterate all");
    assert_eq!(all.len(), 4);
    // ascending scan-id order regardless of ms level interleaving
    for i in 1..all.len() {
        assert!(all[i].header.id > all[i - 1].header.id);
    }
}

#[test]
fn test_xic_generation() {
    let (_dir, path) = write_archive(BBSizes::default(), three_ms1_scans());
    let reader = ArchiveReader::open(path.to_str().unwrap()).expect("open archive");

    let xic = reader
        .get_xic(100.0, 50.0, None, None, XicMethod::Max)
        .expect("generate xic");
    assert!(!xic.is_empty(), "should find points near m/z 100");
}

#[test]
fn test_spectrum_data_get_nearest_peak() {
    let (_dir, path) = write_archive(BBSizes::default(), three_ms1_scans());
    let db = Connection::open(&path).expect("open db");
    let cache = create_entity_cache(&db).expect("create cache");

    let spectrum = get_spectrum(&db, 1, &cache).expect("get spectrum");
    let peak = spectrum.data.get_nearest_peak(100.0, 50.0, 0.0);
    assert!(peak.is_some());
    assert!((peak.unwrap().mz - 100.0).abs() < 0.01);
}

// Unit tests for model types, unrelated to any fixture archive.
mod model_tests {
    use super::*;

    #[test]
    fn test_data_encoding_peak_size() {
        let enc_lowres = DataEncoding {
            id: 1,
            mode: DataMode::Centroid,
            peak_encoding: PeakEncoding::LowRes,
            compression: "none".to_string(),
            byte_order: ByteOrder::LittleEndian,
        };
        assert_eq!(enc_lowres.get_peak_size(), 8);

        let enc_highres = DataEncoding {
            id: 2,
            mode: DataMode::Centroid,
            peak_encoding: PeakEncoding::HighRes,
            compression: "none".to_string(),
            byte_order: ByteOrder::LittleEndian,
        };
        assert_eq!(enc_highres.get_peak_size(), 12);

        let enc_fitted = DataEncoding {
            id: 3,
            mode: DataMode::Fitted,
            peak_encoding: PeakEncoding::HighRes,
            compression: "none".to_string(),
            byte_order: ByteOrder::LittleEndian,
        };
        assert_eq!(enc_fitted.get_peak_size(), 20);
    }

    #[test]
    fn test_spectrum_data_new() {
        let enc = DataEncoding {
            id: 1,
            mode: DataMode::Centroid,
            peak_encoding: PeakEncoding::HighRes,
            compression: "none".to_string(),
            byte_order: ByteOrder::LittleEndian,
        };

        let mz = vec![100.0, 200.0, 300.0];
        let intensity = vec![1000.0, 2000.0, 1500.0];

        let data = SpectrumData::new(enc, mz.clone(), intensity.clone(), None, None);

        assert_eq!(data.peaks_count, 3);
        assert_eq!(data.mz_array, mz);
        assert_eq!(data.intensity_array, intensity);
        assert!(data.lwhm_array.is_empty());
        assert!(data.rwhm_array.is_empty());
    }
}
