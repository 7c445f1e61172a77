//! RegionExtractor (spec §4.J): rectangle and run-slice queries against the
//! archive. Both operations share the same shape as `iterator.rs`'s
//! streaming reassembly — group candidate tiles by `first_spectrum_id`,
//! decode each group once, merge slices into whole scans — except the
//! candidate tile set comes from an oracle (R-tree or run-slice) instead of
//! a full table scan, and the result is post-filtered to the exact query
//! bounds rather than the oracle's (possibly inflated) bounding rectangle.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use rusqlite::Connection;

use crate::codec::{decode_scan_at, index_bbox, merge_spectrum_slices};
use crate::err_loc::*;
use crate::model::*;
use crate::queries_extended::get_bounding_box_ids_for_run_slice;
use crate::rtree::query_bounding_boxes_in_region;

/// Rectangle query: inflate by one bb step per side, consult the R-tree
/// oracle, decode every hit, then drop whole scans outside `[rt_min,
/// rt_max]` and peaks outside `[mz_min, mz_max]` within the survivors.
pub fn extract_region(
    db: &Connection,
    entity_cache: &EntityCache,
    mz_min: f64,
    mz_max: f64,
    rt_min: f32,
    rt_max: f32,
    ms_level: i64,
) -> Result<Vec<Spectrum>> {
    let bb_sizes = &entity_cache.bb_sizes;
    let (mz_step, rt_step) = if ms_level == 1 {
        (bb_sizes.bb_mz_height_ms1, bb_sizes.bb_rt_width_ms1 as f64)
    } else {
        (bb_sizes.bb_mz_height_msn, bb_sizes.bb_rt_width_msn as f64)
    };

    let inflated_mz_min = mz_min - mz_step;
    let inflated_mz_max = mz_max + mz_step;
    let inflated_rt_min = rt_min as f64 - rt_step;
    let inflated_rt_max = rt_max as f64 + rt_step;

    let entries = query_bounding_boxes_in_region(
        db,
        inflated_mz_min,
        inflated_mz_max,
        inflated_rt_min,
        inflated_rt_max,
    )
    .location(here!())?;

    let bb_ids: Vec<i64> = entries.into_iter().map(|e| e.id).collect();
    let bboxes = fetch_bounding_boxes(db, &bb_ids, ms_level).location(here!())?;
    let spectra = decode_bb_groups(&bboxes, entity_cache).location(here!())?;

    let mut out: Vec<Spectrum> = spectra
        .into_iter()
        .filter(|s| s.header.time >= rt_min && s.header.time <= rt_max)
        .map(|mut s| {
            clip_mz_range(&mut s.data, mz_min, mz_max);
            s
        })
        .collect();

    out.sort_by_key(|s| s.header.id);
    Ok(out)
}

/// Run-slice query: identical to `extract_region` but the candidate set
/// comes from the exact run-slice join (no inflation, no rt clipping).
pub fn extract_run_slice(
    db: &Connection,
    entity_cache: &EntityCache,
    mz_min: f64,
    mz_max: f64,
    ms_level: i64,
) -> Result<Vec<Spectrum>> {
    let run_slice_ids = run_slices_overlapping(db, mz_min, mz_max, ms_level).location(here!())?;

    let mut bb_ids = Vec::new();
    for rs_id in run_slice_ids {
        bb_ids.extend(get_bounding_box_ids_for_run_slice(db, rs_id).location(here!())?);
    }

    let bboxes = fetch_bounding_boxes(db, &bb_ids, ms_level).location(here!())?;
    let spectra = decode_bb_groups(&bboxes, entity_cache).location(here!())?;

    let mut out: Vec<Spectrum> = spectra
        .into_iter()
        .map(|mut s| {
            clip_mz_range(&mut s.data, mz_min, mz_max);
            s
        })
        .collect();

    out.sort_by_key(|s| s.header.id);
    Ok(out)
}

fn run_slices_overlapping(
    db: &Connection,
    mz_min: f64,
    mz_max: f64,
    ms_level: i64,
) -> Result<Vec<i64>> {
    let mut stmt = db
        .prepare(
            "SELECT id FROM run_slice \
             WHERE ms_level = ?1 AND begin_mz < ?3 AND end_mz > ?2",
        )
        .location(here!())?;
    let ids = stmt
        .query_map(rusqlite::params![ms_level, mz_min, mz_max], |row| row.get(0))
        .location(here!())?;
    ids.collect::<rusqlite::Result<Vec<i64>>>().location(here!())
}

fn fetch_bounding_boxes(db: &Connection, bb_ids: &[i64], ms_level: i64) -> Result<Vec<BoundingBox>> {
    let mut out = Vec::with_capacity(bb_ids.len());
    let mut stmt = db
        .prepare(
            "SELECT b.id, b.data, b.run_slice_id, b.first_spectrum_id, b.last_spectrum_id \
             FROM bounding_box b, spectrum s \
             WHERE b.id = ?1 AND s.id = b.first_spectrum_id AND s.ms_level = ?2",
        )
        .location(here!())?;

    for &id in bb_ids {
        let mut rows = stmt.query(rusqlite::params![id, ms_level]).location(here!())?;
        if let Some(row) = rows.next().location(here!())? {
            out.push(BoundingBox {
                id: row.get(0)?,
                blob_data: row.get(1)?,
                run_slice_id: row.get(2)?,
                first_spectrum_id: row.get(3)?,
                last_spectrum_id: row.get(4)?,
            });
        }
    }
    Ok(out)
}

/// Group tiles by shared `first_spectrum_id` and decode each group exactly
/// once, mirroring `iterator.rs::flush_bb_group` but over an arbitrary
/// (unordered, oracle-selected) tile set rather than a full table walk.
fn decode_bb_groups(bboxes: &[BoundingBox], entity_cache: &EntityCache) -> Result<Vec<Spectrum>> {
    let mut groups: BTreeMap<i64, Vec<&BoundingBox>> = BTreeMap::new();
    for bb in bboxes {
        groups.entry(bb.first_spectrum_id).or_default().push(bb);
    }

    let de_cache = &entity_cache.data_encodings_cache;
    let mut spectra = Vec::new();

    for group in groups.values() {
        let indexed: Vec<_> = group
            .iter()
            .map(|bb| index_bbox(bb, de_cache))
            .collect::<Result<Vec<_>>>()
            .location(here!())?;

        let n_spectra = indexed[0].spectra_ids.len();

        for slice_idx in 0..n_spectra {
            let spectrum_id = indexed[0].spectra_ids[slice_idx];
            let spectrum_header = entity_cache
                .spectrum_headers
                .get((spectrum_id - 1) as usize)
                .ok_or_else(|| anyhow!("missing spectrum header for ID={spectrum_id}"))
                .location(here!())?;

            let data_encoding = de_cache
                .get_data_encoding_by_spectrum_id(&spectrum_id)
                .ok_or_else(|| anyhow!("can't retrieve data encoding for spectrum ID={spectrum_id}"))
                .location(here!())?;

            let mut slices = Vec::with_capacity(group.len());
            for (bb, bb_index) in group.iter().zip(indexed.iter()) {
                let slice =
                    decode_scan_at(bb, bb_index, data_encoding, slice_idx, None, None).location(here!())?;
                slices.push(slice);
            }

            let total_peaks = slices.iter().map(|s| s.peaks_count).sum();
            let spectrum_data = merge_spectrum_slices(&mut slices, total_peaks).location(here!())?;

            spectra.push(Spectrum {
                header: spectrum_header.clone(),
                data: spectrum_data,
            });
        }
    }

    Ok(spectra)
}

/// Drop peaks (and their parallel per-point arrays) outside `[mz_min,
/// mz_max]`; the R-tree/run-slice oracle only bounds which tiles to read,
/// not which peaks within a surviving scan belong to the query rectangle.
fn clip_mz_range(data: &mut SpectrumData, mz_min: f64, mz_max: f64) {
    let has_hwhm = !data.lwhm_array.is_empty();
    let mut new_mz = Vec::with_capacity(data.peaks_count);
    let mut new_intensity = Vec::with_capacity(data.peaks_count);
    let mut new_lwhm = Vec::new();
    let mut new_rwhm = Vec::new();

    for i in 0..data.peaks_count {
        let mz = data.mz_array[i];
        if mz >= mz_min && mz <= mz_max {
            new_mz.push(mz);
            new_intensity.push(data.intensity_array[i]);
            if has_hwhm {
                new_lwhm.push(data.lwhm_array[i]);
                new_rwhm.push(data.rwhm_array[i]);
            }
        }
    }

    data.peaks_count = new_mz.len();
    data.mz_array = new_mz;
    data.intensity_array = new_intensity;
    data.lwhm_array = new_lwhm;
    data.rwhm_array = new_rwhm;
}
