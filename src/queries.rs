//! Catalog queries: metadata lookups and single-spectrum reads.
//!
//! Scan decoding itself lives in `codec.rs`; this module handles the SQL
//! side (locating the bounding boxes a spectrum spans) and merges the
//! decoded slices back into one `Spectrum`.

use anyhow::*;
use rusqlite::{Connection, Row, Statement};

use crate::err_loc::*;
use crate::codec::{decode_scan_at, index_bbox, merge_spectrum_slices};
use crate::model::*;

pub const BOUNDING_BOX_TABLE_NAME: &str = "bounding_box";
pub const DATA_ENCODING_TABLE_NAME: &str = "data_encoding";
pub const SPECTRUM_TABLE_NAME: &str = "spectrum";

fn get_first_string(db: &Connection, query_str: &str) -> Result<Option<String>> {
    let mut stmt = db.prepare(query_str).location(here!())?;
    stmt.query_row([], |row| row.get(0))
        .optional()
        .map_err(anyhow::Error::msg)
        .location(here!())
}

fn get_strings(db: &Connection, query_str: &str) -> Result<Vec<String>> {
    let mut stmt: Statement = db.prepare(query_str).location(here!())?;
    let values = stmt.query_map([], |row| row.get(0)).location(here!())?;
    let mut strings = Vec::new();
    for value in values {
        strings.push(value.location(here!())?);
    }
    Ok(strings)
}

fn get_first_int(db: &Connection, query_str: &str) -> Result<Option<i64>> {
    let mut stmt = db.prepare(query_str).location(here!())?;
    stmt.query_row([], |row| row.get(0))
        .optional()
        .map_err(anyhow::Error::msg)
        .location(here!())
}

fn get_first_int_no_option(db: &Connection, query_str: &str) -> Result<i64> {
    let mut stmt = db.prepare(query_str).location(here!())?;
    stmt.query_row([], |row| row.get(0)).location(here!())
}

fn get_first_real(db: &Connection, query_str: &str) -> Result<Option<f32>> {
    let mut stmt = db.prepare(query_str).location(here!())?;
    stmt.query_row([], |row| row.get(0))
        .optional()
        .map_err(anyhow::Error::msg)
        .location(here!())
}

fn get_first_f64(db: &Connection, query_str: &str) -> Result<Option<f64>> {
    let mut stmt = db.prepare(query_str).location(here!())?;
    stmt.query_row([], |row| row.get(0))
        .optional()
        .map_err(anyhow::Error::msg)
        .location(here!())
}

/// Archive format version, stored in `meta_archive`.
pub fn get_archive_version(db: &Connection) -> Result<Option<String>> {
    get_first_string(db, "SELECT version FROM meta_archive LIMIT 1")
}

/// Writer version that produced this archive.
pub fn get_writer_version(db: &Connection) -> Result<Option<String>> {
    get_first_string(db, "SELECT version FROM software WHERE name LIKE '%archive%'")
}

pub fn get_param_tree_chromatogram_rows(db: &Connection) -> Result<Vec<String>> {
    get_strings(db, "SELECT param_tree FROM chromatogram")
}

pub fn get_param_tree_spectrum(db: &Connection, spectrum_id: i64) -> Result<Option<String>> {
    get_first_string(
        db,
        &format!("SELECT param_tree FROM spectrum WHERE id = {spectrum_id}"),
    )
}

pub fn get_param_tree_archive(db: &Connection) -> Result<Option<String>> {
    get_first_string(db, "SELECT param_tree FROM meta_archive LIMIT 1")
}

pub fn get_processing_method_param_trees(db: &Connection) -> Result<Vec<String>> {
    get_strings(db, "SELECT param_tree FROM processing_method")
}

pub fn get_last_cycle_number(db: &Connection) -> Result<Option<i64>> {
    get_first_int(db, "SELECT cycle FROM spectrum ORDER BY id DESC LIMIT 1")
}

pub fn get_last_time(db: &Connection) -> Result<Option<f32>> {
    get_first_real(db, "SELECT time FROM spectrum ORDER BY id DESC LIMIT 1")
}

pub fn get_max_ms_level(db: &Connection) -> Result<Option<i64>> {
    get_first_int(db, "SELECT max(ms_level) FROM run_slice")
}

pub fn get_run_slice_bounding_boxes_count(db: &Connection, run_slice_id: i64) -> Result<Option<i64>> {
    get_first_int(
        db,
        &format!("SELECT count(*) FROM bounding_box WHERE run_slice_id = {run_slice_id}"),
    )
}

pub fn get_spectra_count_single_ms_level(db: &Connection, ms_level: i64) -> Result<Option<i64>> {
    get_first_int(
        db,
        &format!("SELECT count(id) FROM spectrum WHERE ms_level = {ms_level}"),
    )
}

pub fn get_table_records_count(db: &Connection, name: &str) -> Result<Option<i64>> {
    get_first_int(
        db,
        &format!("SELECT seq FROM sqlite_sequence WHERE name = {name:?}"),
    )
}

pub fn get_bounding_box_first_spectrum_id(db: &Connection, spectrum_id: i64) -> Result<Option<i64>> {
    get_first_int(
        db,
        &format!("SELECT bb_first_spectrum_id FROM spectrum WHERE id = {spectrum_id}"),
    )
}

pub fn get_bounding_box_min_mz(db: &Connection, bb_rtree_id: i64) -> Result<Option<f32>> {
    get_first_real(
        db,
        &format!("SELECT min_mz FROM bounding_box_rtree WHERE id = {bb_rtree_id}"),
    )
}

pub fn get_bounding_box_min_time(db: &Connection, bb_rtree_id: i64) -> Result<Option<f64>> {
    get_first_f64(
        db,
        &format!("SELECT min_time FROM bounding_box_rtree WHERE id = {bb_rtree_id}"),
    )
}

pub fn get_run_slice_id(db: &Connection, bb_id: i64) -> Result<Option<i64>> {
    get_first_int(db, &format!("SELECT run_slice_id FROM bounding_box WHERE id = {bb_id}"))
}

pub fn get_ms_level_from_run_slice_id(db: &Connection, run_slice_id: i64) -> Result<Option<i64>> {
    get_first_int(
        db,
        &format!("SELECT ms_level FROM run_slice WHERE id = {run_slice_id}"),
    )
}

pub fn get_bounding_box_ms_level(db: &Connection, bb_id: i64) -> Result<Option<i64>> {
    let run_slice_id = get_first_int_no_option(
        db,
        &format!("SELECT run_slice_id FROM bounding_box WHERE id = {bb_id}"),
    )
    .location(here!())?;
    get_first_int(
        db,
        &format!("SELECT ms_level FROM run_slice WHERE id = {run_slice_id}"),
    )
}

pub fn get_data_encoding_id(db: &Connection, bb_id: i64) -> Result<Option<i64>> {
    get_first_int(
        db,
        &format!(
            "SELECT s.data_encoding_id FROM spectrum s, bounding_box b \
             WHERE b.id = {bb_id} AND b.first_spectrum_id = s.id"
        ),
    )
}

pub fn get_data_encoding_count(db: &Connection) -> Result<Option<i64>> {
    get_first_int(db, "SELECT count(id) FROM data_encoding")
}

pub fn list_data_encodings(db: &Connection) -> Result<Vec<DataEncoding>> {
    let mut stmt = db.prepare("SELECT id, mode, compression, byte_order, mz_precision, intensity_precision FROM data_encoding").location(here!())?;

    let values = stmt
        .query_map([], |row| {
            let mode_str: String = row.get(1)?;
            let byte_order_str: String = row.get(3)?;
            let mz_precision: i64 = row.get(4)?;
            let intensity_precision: i64 = row.get(5)?;

            let mode = DataMode::from_db_str(&mode_str).unwrap_or(DataMode::Profile);
            let byte_order = ByteOrder::from_db_str(&byte_order_str).unwrap_or(ByteOrder::LittleEndian);
            let peak_encoding = if mz_precision == 32 {
                PeakEncoding::LowRes
            } else if intensity_precision == 32 {
                PeakEncoding::HighRes
            } else {
                PeakEncoding::NoLoss
            };

            rusqlite::Result::Ok(DataEncoding {
                id: row.get(0)?,
                mode,
                peak_encoding,
                compression: row.get(2)?,
                byte_order,
            })
        })
        .location(here!())?;

    let mut result = Vec::new();
    for value in values {
        result.push(value.location(here!())?);
    }
    Ok(result)
}

/// Materialize a `BoundingBox` row. Column order matches `writer::schema`'s
/// `bounding_box` table: `id, data, run_slice_id, first_spectrum_id, last_spectrum_id`.
pub fn create_bbox(row: &Row) -> Result<BoundingBox> {
    let id: i64 = row.get(0).location(here!())?;
    let blob = row.get_ref(1).location(here!())?.as_blob().location(here!())?;
    let run_slice_id: i64 = row.get(2).location(here!())?;
    let first_spectrum_id: i64 = row.get(3).location(here!())?;
    let last_spectrum_id: i64 = row.get(4).location(here!())?;

    Ok(BoundingBox {
        id,
        blob_data: blob.to_vec(),
        run_slice_id,
        first_spectrum_id,
        last_spectrum_id,
    })
}

/// Extracted ion chromatogram: for every MS1 spectrum in `[min_rt, max_rt]`,
/// find the peak nearest `mz` within `mz_tol_ppm` and report it as one XIC
/// point. `method` only matters when several peaks fall in the tolerance
/// window for a given scan — `get_nearest_peak` already applies it.
pub fn get_ms_xic(
    db: &Connection,
    mz: f64,
    mz_tol_ppm: f64,
    min_rt: Option<f32>,
    max_rt: Option<f32>,
    _method: XicMethod,
    entity_cache: &EntityCache,
) -> Result<Vec<XicPeak>> {
    let query = match (min_rt, max_rt) {
        (Some(_), Some(_)) => {
            "SELECT id FROM spectrum WHERE ms_level = 1 AND time >= ?1 AND time <= ?2 ORDER BY id"
        }
        _ => "SELECT id FROM spectrum WHERE ms_level = 1 ORDER BY id",
    };
    let mut stmt = db.prepare(query).location(here!())?;

    let ids: Vec<i64> = match (min_rt, max_rt) {
        (Some(lo), Some(hi)) => stmt
            .query_map([lo, hi], |row| row.get(0))
            .location(here!())?
            .collect::<rusqlite::Result<Vec<_>>>()
            .location(here!())?,
        _ => stmt
            .query_map([], |row| row.get(0))
            .location(here!())?
            .collect::<rusqlite::Result<Vec<_>>>()
            .location(here!())?,
    };

    let mut xic = Vec::with_capacity(ids.len());
    for spectrum_id in ids {
        let spectrum = get_spectrum(db, spectrum_id, entity_cache).location(here!())?;
        if let Some(peak) = spectrum.data.get_nearest_peak(mz, mz_tol_ppm, spectrum.header.time) {
            xic.push(peak);
        }
    }
    Ok(xic)
}

/// Read a whole spectrum by id, spanning every bounding box it is split
/// across.
pub fn get_spectrum(db: &Connection, spectrum_id: i64, entity_cache: &EntityCache) -> Result<Spectrum> {
    let spectrum_header = entity_cache
        .spectrum_headers
        .get((spectrum_id - 1) as usize)
        .context(format!("can't retrieve spectrum with ID={spectrum_id}"))
        .location(here!())?;

    if spectrum_header.peaks_count == 0 {
        // Empty spectrum: no tile was ever registered for it, so there is
        // nothing to decode or merge.
        let de_cache = &entity_cache.data_encodings_cache;
        let data_encoding = de_cache
            .get_data_encoding_by_spectrum_id(&spectrum_id)
            .context(format!("can't retrieve data encoding for spectrum ID={spectrum_id}"))
            .location(here!())?
            .clone();
        return Ok(Spectrum {
            header: spectrum_header.clone(),
            data: SpectrumData {
                data_encoding,
                peaks_count: 0,
                mz_array: Vec::new(),
                intensity_array: Vec::new(),
                lwhm_array: Vec::new(),
                rwhm_array: Vec::new(),
            },
        });
    }

    let bb_first_spec_id = get_bounding_box_first_spectrum_id(db, spectrum_id)
        .location(here!())?
        .context(format!("can't get bb_first_spectrum_id for spectrum ID={spectrum_id}"))
        .location(here!())?;

    let mut stmt = db
        .prepare("SELECT id, data, run_slice_id, first_spectrum_id, last_spectrum_id FROM bounding_box WHERE first_spectrum_id = ?")
        .location(here!())?;

    let de_cache = &entity_cache.data_encodings_cache;
    let data_encoding = de_cache
        .get_data_encoding_by_spectrum_id(&spectrum_id)
        .context(format!("can't retrieve data encoding for spectrum ID={spectrum_id}"))
        .location(here!())?;

    let mut target_slice_idx: Option<usize> = None;
    let mut sd_slices = Vec::new();

    let mut rows = stmt.query([bb_first_spec_id]).location(here!())?;
    while let Some(row) = rows.next().location(here!())? {
        let bb = create_bbox(row).location(here!())?;
        let bb_index = index_bbox(&bb, de_cache).location(here!())?;

        if target_slice_idx.is_none() {
            target_slice_idx = bb_index
                .spectra_ids
                .iter()
                .position(|&id| id == spectrum_id);
        }

        let slice_idx = target_slice_idx
            .context(format!("can't find spectrum ID={spectrum_id} in bounding box {}", bb.id))
            .location(here!())?;

        let slice = decode_scan_at(&bb, &bb_index, data_encoding, slice_idx, None, None).location(here!())?;
        sd_slices.push(slice);
    }

    let total_peaks = sd_slices.iter().map(|s| s.peaks_count).sum();
    let spectrum_data = merge_spectrum_slices(&mut sd_slices, total_peaks).location(here!())?;

    Ok(Spectrum {
        header: spectrum_header.clone(),
        data: spectrum_data,
    })
}
