//! Exercises `BoundingBoxCache`'s row-flushing cadence against spec §8
//! scenario 5 ("Cycle boundary"): ten MS1 scans two seconds apart with the
//! default 15s MS1 bounding-box width split into exactly two rows, the
//! second one opening at the first scan whose time exceeds the first
//! row's start by more than the configured width.

mod common;

use common::{write_archive, RawScan};
use msarchive::model::BBSizes;
use rusqlite::Connection;

#[test]
fn ten_scans_two_seconds_apart_split_at_the_fifteen_second_mark() {
    let scans: Vec<RawScan> = (0..10)
        .map(|i| RawScan::new(1, (i * 2) as f32, vec![500.0], vec![10.0]))
        .collect();
    let (_dir, path) = write_archive(BBSizes::default(), scans);
    let db = Connection::open(&path).unwrap();

    let row_count: i64 = db
        .query_row("SELECT COUNT(*) FROM bounding_box", [], |r| r.get(0))
        .unwrap();
    assert_eq!(row_count, 2, "expected exactly two bounding-box rows");

    let mut stmt = db
        .prepare("SELECT first_spectrum_id, last_spectrum_id FROM bounding_box ORDER BY first_spectrum_id ASC")
        .unwrap();
    let spans: Vec<(i64, i64)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();

    // Scan ids 1..8 carry rt 0,2,...,14 (row stays open while current - first <= 15);
    // scan id 9 at rt=16 tips 16-0=16 > 15 and opens the second row, which
    // then holds scan id 10 at rt=18.
    assert_eq!(spans, vec![(1, 8), (9, 10)]);
}
