//! SpectrumIterator (spec §4.I): streams spectra out in ascending id
//! order by walking bounding boxes grouped by `first_spectrum_id`,
//! buffering one MS1-anchored group (its MS1 scan plus every MSn scan
//! co-located with it) at a time.

use anyhow::{anyhow, Result};
use rusqlite::{Connection, Statement};

use crate::err_loc::*;
use crate::codec::{index_bbox, merge_spectrum_slices, decode_scan_at};
use crate::model::*;
use crate::queries::create_bbox;

const SQL_ALL_MS_LEVELS: &str =
    "SELECT b.id, b.data, b.run_slice_id, b.first_spectrum_id, b.last_spectrum_id \
     FROM bounding_box b, spectrum s WHERE s.id = b.first_spectrum_id";

pub fn create_bb_iter_stmt_for_all_ms_levels(db: &Connection) -> Result<Statement> {
    db.prepare(SQL_ALL_MS_LEVELS).location(here!())
}

pub fn create_bb_iter_stmt_for_single_ms_level(db: &Connection, ms_level: i64) -> Result<Statement> {
    db.prepare(&format!("{SQL_ALL_MS_LEVELS} AND s.ms_level = {ms_level}"))
        .location(here!())
}

fn iterate_bb<'stmt>(
    stmt: &'stmt mut Statement,
) -> Result<impl Iterator<Item = rusqlite::Result<BoundingBox>> + 'stmt> {
    let rows = stmt
        .query_map([], |row| {
            rusqlite::Result::Ok(BoundingBox {
                id: row.get(0)?,
                blob_data: row.get(1)?,
                run_slice_id: row.get(2)?,
                first_spectrum_id: row.get(3)?,
                last_spectrum_id: row.get(4)?,
            })
        })
        .location(here!())?;
    Ok(rows)
}

/// Walk every bounding box row, optionally restricted to one ms level, in
/// storage order.
pub fn for_each_bb<F>(db: &Connection, ms_level: Option<i64>, mut on_each_bb: F) -> Result<()>
where
    F: FnMut(BoundingBox) -> Result<()>,
{
    let mut stmt = match ms_level {
        None => create_bb_iter_stmt_for_all_ms_levels(db).location(here!())?,
        Some(level) => create_bb_iter_stmt_for_single_ms_level(db, level).location(here!())?,
    };

    for bb in iterate_bb(&mut stmt).location(here!())? {
        on_each_bb(bb?)?;
    }
    Ok(())
}

/// Stream whole spectra in ascending id order (spec §4.I). Bounding boxes
/// are grouped by their shared `first_spectrum_id`: the buffer is flushed
/// (sorted by spectrum id, then emitted) each time a new MS1-first group
/// begins, so exactly one MS1 scan plus its co-located MSn scans are held
/// in memory at once.
pub fn for_each_spectrum<F>(
    db: &Connection,
    entity_cache: &EntityCache,
    ms_level: Option<i64>,
    mut on_each_spectrum: F,
) -> Result<()>
where
    F: FnMut(&Spectrum) -> Result<()>,
{
    let mut bb_group: Vec<BoundingBox> = Vec::with_capacity(100);
    let mut spectrum_buffer: Vec<Spectrum> = Vec::with_capacity(100);
    let mut prev_first_spectrum_id: Option<i64> = None;
    let mut empty_cursor: usize = 0;

    for_each_bb(db, ms_level, |bb: BoundingBox| {
        if prev_first_spectrum_id.is_none() {
            prev_first_spectrum_id = Some(bb.first_spectrum_id);
        }

        let spec_idx = (bb.first_spectrum_id - 1) as usize;
        let group_ms_level = entity_cache
            .spectrum_headers
            .get(spec_idx)
            .map(|h| h.ms_level)
            .unwrap_or(1);

        if bb.first_spectrum_id != prev_first_spectrum_id.unwrap() {
            let boundary_id = bb.first_spectrum_id;
            prev_first_spectrum_id = Some(boundary_id);

            flush_bb_group(&bb_group, &mut spectrum_buffer, entity_cache).location(here!())?;
            bb_group.clear();

            if group_ms_level == 1 {
                push_empty_spectra_before(entity_cache, ms_level, &mut empty_cursor, boundary_id, &mut spectrum_buffer).location(here!())?;
                emit_sorted(&mut spectrum_buffer, &mut on_each_spectrum).location(here!())?;
            }
        }

        bb_group.push(bb);
        Ok(())
    })?;

    flush_bb_group(&bb_group, &mut spectrum_buffer, entity_cache).location(here!())?;
    push_empty_spectra_before(entity_cache, ms_level, &mut empty_cursor, i64::MAX, &mut spectrum_buffer).location(here!())?;
    emit_sorted(&mut spectrum_buffer, &mut on_each_spectrum).location(here!())?;

    Ok(())
}

/// Append zero-peak spectra (no bounding box was ever registered for them)
/// with id strictly below `boundary_id` to `out`, in ascending id order.
/// `entity_cache.spectrum_headers` is already sorted by id, so `cursor`
/// only ever advances forward across calls.
fn push_empty_spectra_before(
    entity_cache: &EntityCache,
    ms_level: Option<i64>,
    cursor: &mut usize,
    boundary_id: i64,
    out: &mut Vec<Spectrum>,
) -> Result<()> {
    while *cursor < entity_cache.spectrum_headers.len() {
        let header = &entity_cache.spectrum_headers[*cursor];
        if header.id >= boundary_id {
            break;
        }
        *cursor += 1;

        if header.peaks_count != 0 {
            continue;
        }
        if let Some(level) = ms_level {
            if header.ms_level != level {
                continue;
            }
        }

        let data_encoding = entity_cache
            .data_encodings_cache
            .get_data_encoding_by_spectrum_id(&header.id)
            .ok_or_else(|| anyhow!("can't retrieve data encoding for spectrum ID={}", header.id))
            .location(here!())?
            .clone();

        out.push(Spectrum {
            header: header.clone(),
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
    Ok(())
}

fn emit_sorted<F>(buffer: &mut Vec<Spectrum>, on_each_spectrum: &mut F) -> Result<()>
where
    F: FnMut(&Spectrum) -> Result<()>,
{
    buffer.sort_by_key(|s| s.header.id);
    for s in buffer.iter() {
        on_each_spectrum(s)?;
    }
    buffer.clear();
    Ok(())
}

/// Decode every spectrum slice spanned by one group of same-`first_spectrum_id`
/// bounding boxes and append the merged spectra to `spectrum_buffer`.
fn flush_bb_group(
    bb_group: &[BoundingBox],
    spectrum_buffer: &mut Vec<Spectrum>,
    entity_cache: &EntityCache,
) -> Result<()> {
    if bb_group.is_empty() {
        return Ok(());
    }

    let de_cache = &entity_cache.data_encodings_cache;
    let indexed: Vec<_> = bb_group
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

        let mut slices = Vec::with_capacity(bb_group.len());
        for (bb, bb_index) in bb_group.iter().zip(indexed.iter()) {
            let slice = decode_scan_at(bb, bb_index, data_encoding, slice_idx, None, None).location(here!())?;
            slices.push(slice);
        }

        let total_peaks = slices.iter().map(|s| s.peaks_count).sum();
        let spectrum_data = merge_spectrum_slices(&mut slices, total_peaks).location(here!())?;

        spectrum_buffer.push(Spectrum {
            header: spectrum_header.clone(),
            data: spectrum_data,
        });
    }

    Ok(())
}
