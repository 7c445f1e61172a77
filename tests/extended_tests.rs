//! Tests for metadata, chromatogram, and R-tree functionality, against
//! archives built on the fly with `MzDbWriter` (see `tests/common`).

mod common;

use common::{write_archive, RawScan};
use msarchive::BBSizes;
use rusqlite::Connection;

fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
    write_archive(
        BBSizes::default(),
        vec![
            RawScan::new(1, 0.0, vec![500.0, 600.0], vec![100.0, 200.0]),
            RawScan::new(2, 0.5, vec![150.0], vec![50.0]),
            RawScan::new(1, 1.0, vec![500.1, 600.1], vec![110.0, 210.0]),
        ],
    )
}

// ============================================================================
// ArchiveReader high-level API tests
// ============================================================================

mod reader_tests {
    use super::*;
    use msarchive::ArchiveReader;

    #[test]
    fn test_open_reader() {
        let (_dir, path) = fixture();
        let reader = ArchiveReader::open(path.to_str().unwrap()).expect("open reader");
        assert!(!reader.get_spectrum_headers().is_empty());
    }

    #[test]
    fn test_file_metadata() {
        let (_dir, path) = fixture();
        let reader = ArchiveReader::open(path.to_str().unwrap()).unwrap();

        let version = reader.get_version().unwrap();
        assert!(version.is_some());

        let bb_sizes = reader.get_bb_sizes();
        assert!(bb_sizes.bb_mz_height_ms1 > 0.0);
        assert!(bb_sizes.bb_rt_width_ms1 > 0.0);
    }

    #[test]
    fn test_spectrum_access() {
        let (_dir, path) = fixture();
        let reader = ArchiveReader::open(path.to_str().unwrap()).unwrap();

        let headers = reader.get_spectrum_headers();
        assert_eq!(headers.len(), 3);

        let spectrum = reader.get_spectrum(1).unwrap();
        assert_eq!(spectrum.header.id, 1);
        assert_eq!(spectrum.data.peaks_count, 2);
    }

    #[test]
    fn test_xic_generation() {
        let (_dir, path) = fixture();
        let reader = ArchiveReader::open(path.to_str().unwrap()).unwrap();

        let spectrum = reader.get_spectrum(1).unwrap();
        assert_eq!(spectrum.header.ms_level, 1);
        let search_mz = spectrum.data.mz_array[0];

        let xic = reader
            .get_xic(search_mz, 20.0, None, None, msarchive::model::XicMethod::Max)
            .unwrap();
        assert!(!xic.is_empty());
    }
}

// ============================================================================
// Metadata tests
// ============================================================================

mod metadata_tests {
    use super::*;
    use msarchive::metadata::*;

    #[test]
    fn test_mzdb_metadata() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();

        let meta = get_mzdb_metadata(&db).unwrap();
        assert!(meta.is_some());
        let meta = meta.unwrap();
        assert!(!meta.version.is_empty());
    }

    #[test]
    fn test_runs() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();

        let runs = list_runs(&db).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "run_1");

        let fetched = get_run(&db, runs[0].id).unwrap();
        assert_eq!(fetched.unwrap().name, runs[0].name);
    }

    #[test]
    fn test_samples() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let samples = list_samples(&db).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_software() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();

        let software = list_software(&db).unwrap();
        assert!(!software.is_empty());

        let found = get_software_by_name(&db, "%any2mzdb%").unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_source_files() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let files = list_source_files(&db).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_instrument_configurations() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let configs = list_instrument_configurations(&db).unwrap();
        assert_eq!(configs.len(), 1);
    }

    #[test]
    fn test_data_processing() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();

        // Nothing is registered by `WriterMetadata::with_defaults`; an
        // empty list is a valid outcome, not a broken query.
        let processings = list_data_processings(&db).unwrap();
        for proc in &processings {
            let _ = get_processing_methods_for_workflow(&db, proc.id).unwrap();
        }
    }

    #[test]
    fn test_controlled_vocabularies() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let cvs = list_controlled_vocabularies(&db).unwrap();
        println!("CVs: {}", cvs.len());
    }

    #[test]
    fn test_cv_terms() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let terms = list_cv_terms(&db).unwrap();
        let scan_terms = search_cv_terms(&db, "scan").unwrap();
        assert!(scan_terms.len() <= terms.len());
    }

    #[test]
    fn test_cv_units() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let units = list_cv_units(&db).unwrap();
        println!("CV units: {}", units.len());
    }
}

// ============================================================================
// Chromatogram tests
//
// `MzDbWriter` does not populate the `chromatogram` table (spec §4
// Non-goals: no chromatogram writer), so these assert the table is present
// and queryable, not that it has rows.
// ============================================================================

mod chromatogram_tests {
    use super::*;
    use msarchive::chromatogram::*;

    #[test]
    fn test_list_chromatograms() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let chroms = list_chromatograms(&db).unwrap();
        assert!(chroms.is_empty());
    }

    #[test]
    fn test_get_tic() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let tic = get_tic_chromatogram(&db).unwrap();
        assert!(tic.is_none());
    }

    #[test]
    fn test_srm_chromatograms() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let srm_chroms = list_srm_chromatograms(&db).unwrap();
        for chrom in &srm_chroms {
            assert!(chrom.is_srm());
        }
    }
}

// ============================================================================
// R-tree tests
// ============================================================================

mod rtree_tests {
    use super::*;
    use msarchive::rtree::*;

    #[test]
    fn test_rtree_availability() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        assert!(has_rtree(&db).unwrap());
    }

    #[test]
    fn test_rtree_stats() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let stats = get_rtree_stats(&db).unwrap();
        assert!(stats.is_some());
        let stats = stats.unwrap();
        assert!(stats.entry_count > 0);
        assert!(stats.global_max_mz >= stats.global_min_mz);
    }

    #[test]
    fn test_rtree_mz_query() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();

        let entries = query_bounding_boxes_in_mz_range(&db, 400.0, 700.0).unwrap();
        assert!(!entries.is_empty());

        let entries_ppm = query_bounding_boxes_at_mz_ppm(&db, 500.0, 100_000.0).unwrap();
        assert!(!entries_ppm.is_empty());
    }

    #[test]
    fn test_rtree_region_query() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();

        let entries = query_bounding_boxes_in_region(&db, 400.0, 700.0, 0.0, 2.0).unwrap();
        assert!(!entries.is_empty());
        for entry in &entries {
            assert!(entry.max_mz >= entry.min_mz);
            assert!(entry.max_time >= entry.min_time);
        }
    }

    #[test]
    fn test_rtree_point_query() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let entries = query_bounding_boxes_containing_point(&db, 500.0, 0.0).unwrap();
        assert!(!entries.is_empty());
    }

    #[test]
    fn test_entry_methods() {
        let entry = BoundingBoxRTreeEntry {
            id: 1,
            min_mz: 400.0,
            max_mz: 600.0,
            min_time: 10.0,
            max_time: 20.0,
        };

        assert!(entry.contains_mz(500.0));
        assert!(!entry.contains_mz(300.0));
        assert!(entry.contains_time(15.0));
        assert!(entry.contains_point(500.0, 15.0));
        assert_eq!(entry.mz_width(), 200.0);
        assert_eq!(entry.time_width(), 10.0);
        assert_eq!(entry.center_mz(), 500.0);
        assert_eq!(entry.center_time(), 15.0);
    }

    #[test]
    fn test_parent_mz_windows() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        if has_msn_rtree(&db).unwrap() {
            let windows = get_parent_mz_windows(&db).unwrap();
            println!("Parent m/z windows: {}", windows.len());
        }
    }
}

// ============================================================================
// Extended query tests
// ============================================================================

mod query_tests {
    use super::*;
    use msarchive::mzdb::create_entity_cache;

    #[test]
    fn test_spectrum_headers_struct() {
        let (_dir, path) = fixture();
        let db = Connection::open(&path).unwrap();
        let cache = create_entity_cache(&db).unwrap();

        assert_eq!(cache.spectrum_headers.len(), 3);
        for header in &cache.spectrum_headers {
            assert!(header.id > 0);
            assert!(header.ms_level == 1 || header.ms_level == 2);
        }
    }
}
