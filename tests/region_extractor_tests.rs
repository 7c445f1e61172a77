//! Exercises the bounding-box builder's run-slice partitioning and the
//! `RegionExtractor` against the archive it produces, per spec §8
//! scenarios 3 ("Run-slice partition") and 4 ("R-tree region query").

mod common;

use common::{write_archive, RawScan};
use msarchive::model::BBSizes;
use msarchive::mzdb::create_entity_cache;
use msarchive::region_extractor::{extract_region, extract_run_slice};
use rusqlite::Connection;

/// `bb_height = 5 Da`, one scan with peaks at 301.0, 305.0, 306.0, 311.0:
/// three run-slices `[300,305) [305,310) [310,315)` and three tiles.
fn scenario_3_fixture() -> (tempfile::TempDir, std::path::PathBuf) {
    write_archive(
        BBSizes::default(),
        vec![RawScan::new(
            1,
            0.0,
            vec![301.0, 305.0, 306.0, 311.0],
            vec![10.0, 20.0, 30.0, 40.0],
        )],
    )
}

#[test]
fn run_slice_partition_yields_three_tiles() {
    let (_dir, path) = scenario_3_fixture();
    let db = Connection::open(&path).unwrap();

    let tile_count: i64 = db
        .query_row("SELECT COUNT(*) FROM bounding_box", [], |r| r.get(0))
        .unwrap();
    assert_eq!(tile_count, 3);

    let run_slice_count: i64 = db
        .query_row("SELECT COUNT(*) FROM run_slice", [], |r| r.get(0))
        .unwrap();
    assert_eq!(run_slice_count, 3);

    let mut stmt = db
        .prepare("SELECT begin_mz, end_mz FROM run_slice ORDER BY begin_mz ASC")
        .unwrap();
    let bounds: Vec<(f64, f64)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(bounds, vec![(300.0, 305.0), (305.0, 310.0), (310.0, 315.0)]);
}

#[test]
fn region_query_returns_exactly_the_contained_peaks() {
    let (_dir, path) = scenario_3_fixture();
    let db = Connection::open(&path).unwrap();
    let entity_cache = create_entity_cache(&db).unwrap();

    let scans = extract_region(&db, &entity_cache, 304.5, 307.5, 0.0, f32::INFINITY, 1).unwrap();

    assert_eq!(scans.len(), 1);
    let scan = &scans[0];
    assert_eq!(scan.data.mz_array, vec![305.0, 306.0]);
    assert_eq!(scan.data.intensity_array, vec![20.0, 30.0]);
}

#[test]
fn run_slice_query_is_exact_in_mz_with_no_rt_clipping() {
    let (_dir, path) = scenario_3_fixture();
    let db = Connection::open(&path).unwrap();
    let entity_cache = create_entity_cache(&db).unwrap();

    let scans = extract_run_slice(&db, &entity_cache, 305.0, 310.0, 1).unwrap();

    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].data.mz_array, vec![305.0, 306.0]);
}

#[test]
fn query_rectangle_outside_archive_is_empty() {
    let (_dir, path) = scenario_3_fixture();
    let db = Connection::open(&path).unwrap();
    let entity_cache = create_entity_cache(&db).unwrap();

    let scans = extract_region(&db, &entity_cache, 900.0, 950.0, 0.0, 10.0, 1).unwrap();
    assert!(scans.is_empty());
}
