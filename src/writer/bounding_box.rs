//! Bounding Box Cache and Serialization
//!
//! This module handles:
//! - Caching spectrum data in bounding boxes before writing to disk
//! - Binary serialization of peak data
//! - Flushing bounding box rows to the database

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::model::*;

/// Index into a spectrum's peak data
#[derive(Clone, Debug)]
pub struct SpectrumSliceIndex {
    /// Reference to the spectrum data
    pub spectrum_data: SpectrumData,
    
    /// Index of first peak in this slice
    pub first_peak_idx: usize,
    
    /// Index of last peak in this slice (inclusive)
    pub last_peak_idx: usize,
}

impl SpectrumSliceIndex {
    /// Get the number of peaks in this slice
    pub fn peaks_count(&self) -> usize {
        if self.last_peak_idx < self.first_peak_idx {
            0
        } else {
            1 + self.last_peak_idx - self.first_peak_idx
        }
    }
}

/// A bounding box accumulating spectrum slices
#[derive(Clone, Debug)]
pub struct BoundingBoxWriter {
    pub id: i64,
    pub first_time: f32,
    pub last_time: f32,
    pub run_slice_id: i64,
    pub ms_level: i64,
    pub data_encoding: DataEncoding,
    pub isolation_window: Option<MzRange>,
    pub spectrum_ids: Vec<i64>,
    pub spectrum_slices: Vec<Option<SpectrumSliceIndex>>,
}

/// Bit-exact key for an isolation window, since `MzRange` holds `f64`
/// fields and implements neither `Eq` nor `Hash`.
type IsolationWindowKey = Option<(u64, u64)>;

fn iso_win_key(isolation_window: Option<MzRange>) -> IsolationWindowKey {
    isolation_window.map(|w| (w.min_mz.to_bits(), w.max_mz.to_bits()))
}

/// Cache for accumulating bounding boxes before writing
pub struct BoundingBoxCache {
    /// BB dimensions
    bb_sizes: BBSizes,

    /// Map from (run_slice_id, isolation_window) to BoundingBox
    bounding_boxes: HashMap<(i64, IsolationWindowKey), BoundingBoxWriter>,

    /// Next available bounding box ID
    next_bb_id: i64,
}

impl BoundingBoxCache {
    /// Create a new cache with the given bounding box sizes
    pub fn new(bb_sizes: BBSizes) -> Self {
        Self {
            bb_sizes,
            bounding_boxes: HashMap::new(),
            next_bb_id: 1,
        }
    }
    
    /// Check if it's time to start a new bounding box row
    ///
    /// A new row is needed when the retention time exceeds the BB RT width
    pub fn is_time_for_new_bb_row(
        &self,
        ms_level: i64,
        isolation_window: Option<&MzRange>,
        current_time: f32,
    ) -> bool {
        let first_time = self.find_bb_first_time(ms_level, isolation_window);
        
        if first_time.is_none() {
            return true;
        }
        
        let max_rt_width = if ms_level == 1 {
            self.bb_sizes.bb_rt_width_ms1
        } else {
            self.bb_sizes.bb_rt_width_msn
        };
        
        (current_time - first_time.unwrap()) > max_rt_width
    }
    
    /// Find the first retention time for a BB row
    fn find_bb_first_time(
        &self,
        ms_level: i64,
        isolation_window: Option<&MzRange>,
    ) -> Option<f32> {
        for bb in self.bounding_boxes.values() {
            if bb.ms_level == ms_level && bb.isolation_window.as_ref() == isolation_window {
                return Some(bb.first_time);
            }
        }
        None
    }
    
    /// Get a cached bounding box
    pub fn get_cached_bb(
        &mut self,
        run_slice_id: i64,
        isolation_window: Option<MzRange>,
    ) -> Option<&mut BoundingBoxWriter> {
        let key = (run_slice_id, iso_win_key(isolation_window));
        self.bounding_boxes.get_mut(&key)
    }
    
    /// Create a new bounding box in the cache
    pub fn create_bb(
        &mut self,
        spectrum_time: f32,
        run_slice_id: i64,
        ms_level: i64,
        data_encoding: DataEncoding,
        isolation_window: Option<MzRange>,
        slices_count_hint: usize,
    ) -> &mut BoundingBoxWriter {
        let bb_id = self.next_bb_id;
        self.next_bb_id += 1;
        
        let bb = BoundingBoxWriter {
            id: bb_id,
            first_time: spectrum_time,
            last_time: spectrum_time,
            run_slice_id,
            ms_level,
            data_encoding,
            isolation_window,
            spectrum_ids: Vec::with_capacity(slices_count_hint),
            spectrum_slices: Vec::with_capacity(slices_count_hint),
        };
        
        let key = (run_slice_id, iso_win_key(isolation_window));
        self.bounding_boxes.insert(key, bb);
        self.bounding_boxes.get_mut(&key).unwrap()
    }
    
    /// Execute a function for each cached BB matching the criteria
    pub fn for_each_cached_bb<F>(
        &self,
        ms_level: i64,
        isolation_window: Option<&MzRange>,
        mut f: F,
    ) where
        F: FnMut(&BoundingBoxWriter),
    {
        let mut bbs: Vec<_> = self.bounding_boxes
            .values()
            .filter(|bb| {
                bb.ms_level == ms_level && 
                bb.isolation_window.as_ref() == isolation_window
            })
            .collect();
        
        // Sort by run_slice_id for consistent ordering
        bbs.sort_by_key(|bb| bb.run_slice_id);
        
        for bb in bbs {
            f(bb);
        }
    }
    
    /// Remove all bounding boxes for a given MS level and isolation window
    pub fn remove_bb_row(
        &mut self,
        ms_level: i64,
        isolation_window: Option<&MzRange>,
    ) {
        let keys_to_remove: Vec<_> = self.bounding_boxes
            .iter()
            .filter(|(_, bb)| {
                bb.ms_level == ms_level &&
                bb.isolation_window.as_ref() == isolation_window
            })
            .map(|(key, _)| *key)
            .collect();

        for key in keys_to_remove {
            self.bounding_boxes.remove(&key);
        }
    }
    
    /// Get all unique (ms_level, isolation_window) pairs
    pub fn get_bb_row_keys(&self) -> Vec<(i64, Option<MzRange>)> {
        let mut keys: Vec<_> = self.bounding_boxes
            .values()
            .map(|bb| (bb.ms_level, bb.isolation_window))
            .collect();

        keys.sort_by(|(a_level, a_win), (b_level, b_win)| {
            (*a_level, a_win.map(|w| (OrderedFloat(w.min_mz), OrderedFloat(w.max_mz))))
                .cmp(&(*b_level, b_win.map(|w| (OrderedFloat(w.min_mz), OrderedFloat(w.max_mz)))))
        });
        keys.dedup_by(|(a_level, a_win), (b_level, b_win)| {
            a_level == b_level
                && a_win.map(|w| (w.min_mz.to_bits(), w.max_mz.to_bits()))
                    == b_win.map(|w| (w.min_mz.to_bits(), w.max_mz.to_bits()))
        });

        keys
    }
}

/// Wrapper for f64 that implements Ord for sorting
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
struct OrderedFloat(f64);

impl Eq for OrderedFloat {}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Serialize a bounding box to binary format, delegating the per-scan
/// layout to `codec::encode_scan` — the same layout the reader's
/// `codec::decode_scan_at` expects.
pub fn serialize_bounding_box(bb: &BoundingBoxWriter) -> Result<Vec<u8>> {
    let peak_struct_size = bb.data_encoding.get_peak_size();
    let slices_count = bb.spectrum_slices.len();

    let total_peaks_count: usize = bb
        .spectrum_slices
        .iter()
        .filter_map(|s| s.as_ref())
        .map(|s| s.peaks_count())
        .sum();

    let bb_len = (8 * slices_count) + (peak_struct_size * total_peaks_count);
    let mut buffer = Vec::with_capacity(bb_len);

    for (slice_idx, spectrum_slice_opt) in bb.spectrum_slices.iter().enumerate() {
        let spectrum_id = bb.spectrum_ids[slice_idx];

        let (mz, intensity, lwhm, rwhm): (Vec<f64>, Vec<f32>, Vec<f32>, Vec<f32>) =
            match spectrum_slice_opt {
                Some(slice) => {
                    let sd = &slice.spectrum_data;
                    let range = slice.first_peak_idx..=slice.last_peak_idx;
                    (
                        range.clone().map(|i| sd.get_mz_at(i)).collect::<Result<_>>()?,
                        range.clone().map(|i| sd.get_intensity_at(i)).collect::<Result<_>>()?,
                        range
                            .clone()
                            .map(|i| sd.get_left_hwhm_at(i).unwrap_or(0.0))
                            .collect(),
                        range.map(|i| sd.get_right_hwhm_at(i).unwrap_or(0.0)).collect(),
                    )
                }
                None => (Vec::new(), Vec::new(), Vec::new(), Vec::new()),
            };

        let scan = crate::codec::ScanRecord {
            spectrum_id,
            mz: &mz,
            intensity: &intensity,
            left_hwhm: &lwhm,
            right_hwhm: &rwhm,
        };
        crate::codec::encode_scan(&mut buffer, &scan, &bb.data_encoding)?;
    }

    Ok(buffer)
}

/// Flush a bounding box row to the database
pub(crate) fn flush_bb_row(
    writer: &mut crate::writer::MzDbWriter,
    ms_level: i64,
    isolation_window: Option<MzRange>,
) -> Result<()> {
    // Collect all spectrum IDs across all BBs in this row
    let mut all_spectrum_ids = Vec::new();
    writer.bb_cache.for_each_cached_bb(
        ms_level,
        isolation_window.as_ref(),
        |bb| {
            all_spectrum_ids.extend(bb.spectrum_ids.iter().copied());
        }
    );
    
    // Get distinct, sorted spectrum IDs
    all_spectrum_ids.sort_unstable();
    all_spectrum_ids.dedup();
    
    // Insert each bounding box
    let conn = writer.connection.as_ref()
        .context("No active connection")?;
    
    // Clone the BBs we need to insert (to avoid borrow issues)
    let bbs_to_insert: Vec<_> = {
        let mut bbs = Vec::new();
        writer.bb_cache.for_each_cached_bb(
            ms_level,
            isolation_window.as_ref(),
            |bb| {
                bbs.push(bb.clone());
            }
        );
        bbs
    };
    
    for mut bb in bbs_to_insert {
        // Build spectrum slice map
        let mut slice_by_id: HashMap<i64, SpectrumSliceIndex> = bb.spectrum_ids
            .iter()
            .zip(bb.spectrum_slices.iter())
            .filter_map(|(id, slice_opt)| {
                slice_opt.as_ref().map(|s| (*id, s.clone()))
            })
            .collect();
        
        // Create complete spectrum slices array with Nones for missing
        let complete_slices: Vec<_> = all_spectrum_ids
            .iter()
            .map(|id| slice_by_id.remove(id))
            .collect();
        
        // Update BB with complete data
        bb.spectrum_ids = all_spectrum_ids.clone();
        bb.spectrum_slices = complete_slices;
        
        // Serialize and insert
        insert_bounding_box(conn, &bb, &writer.run_slice_factory)?;
        
        // Insert R-tree index
        insert_rtree_index(conn, &bb, &writer.run_slice_factory, writer.is_dia)?;
    }
    
    // Remove this BB row from cache
    writer.bb_cache.remove_bb_row(ms_level, isolation_window.as_ref());
    
    Ok(())
}

/// Insert a bounding box into the database
fn insert_bounding_box(
    conn: &rusqlite::Connection,
    bb: &BoundingBoxWriter,
    run_slice_factory: &crate::writer::RunSliceFactory,
) -> Result<i64> {
    let bb_data = serialize_bounding_box(bb)?;
    
    let first_spectrum_id = bb.spectrum_ids.first().copied().unwrap_or(0);
    let last_spectrum_id = bb.spectrum_ids.last().copied().unwrap_or(0);
    
    conn.execute(
        "INSERT INTO bounding_box VALUES (NULL, ?, ?, ?, ?)",
        rusqlite::params![
            &bb_data,
            bb.run_slice_id,
            first_spectrum_id,
            last_spectrum_id,
        ],
    )?;
    
    Ok(conn.last_insert_rowid())
}

/// Insert R-tree index for a bounding box
fn insert_rtree_index(
    conn: &rusqlite::Connection,
    bb: &BoundingBoxWriter,
    run_slice_factory: &crate::writer::RunSliceFactory,
    is_dia: bool,
) -> Result<()> {
    let run_slice = run_slice_factory.get_run_slice(bb.run_slice_id)
        .context("Run slice not found")?;
    
    let bb_id = conn.last_insert_rowid();
    
    if bb.ms_level == 1 {
        // MS1 - use simple R-tree
        conn.execute(
            "INSERT INTO bounding_box_rtree VALUES (?, ?, ?, ?, ?)",
            rusqlite::params![
                bb_id,
                run_slice.begin_mz,
                run_slice.end_mz,
                bb.first_time,
                bb.last_time,
            ],
        )?;
    } else if bb.ms_level == 2 && is_dia {
        // MS2 DIA - use MSn R-tree with isolation window
        if let Some(iso_win) = &bb.isolation_window {
            conn.execute(
                "INSERT INTO bounding_box_msn_rtree VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    bb_id,
                    bb.ms_level,
                    bb.ms_level,
                    iso_win.min_mz,
                    iso_win.max_mz,
                    run_slice.begin_mz,
                    run_slice.end_mz,
                    bb.first_time,
                    bb.last_time,
                ],
            )?;
        }
    }
    
    Ok(())
}
