//! BlobCodec (spec §4.E): encodes/decodes the packed per-scan peak
//! arrays stored in a bounding box blob.
//!
//! Blob layout is a sequence of scan records, each
//! `[spectrum_id: i32][peak_count: i32][peak_count * peak_size bytes]`,
//! peak layout depending on the scan's `DataEncoding` (component model.rs).

use anyhow::{bail, Result};

use crate::model::{
    BoundingBox, BoundingBoxIndex, DataEncoding, DataEncodingsCache, DataMode, PeakEncoding,
    SpectrumData,
};

const SCAN_HEADER_SIZE: usize = 8;

fn read_i32(bytes: &[u8], offset: usize) -> Result<i32> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| anyhow::anyhow!("blob truncated reading i32 at offset {offset}"))?;
    Ok(i32::from_le_bytes(slice.try_into().unwrap()))
}

fn read_f32(bytes: &[u8], offset: usize, big_endian: bool) -> Result<f32> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| anyhow::anyhow!("blob truncated reading f32 at offset {offset}"))?;
    let array: [u8; 4] = slice.try_into().unwrap();
    Ok(if big_endian {
        f32::from_be_bytes(array)
    } else {
        f32::from_le_bytes(array)
    })
}

fn read_f64(bytes: &[u8], offset: usize, big_endian: bool) -> Result<f64> {
    let slice = bytes
        .get(offset..offset + 8)
        .ok_or_else(|| anyhow::anyhow!("blob truncated reading f64 at offset {offset}"))?;
    let array: [u8; 8] = slice.try_into().unwrap();
    Ok(if big_endian {
        f64::from_be_bytes(array)
    } else {
        f64::from_le_bytes(array)
    })
}

fn write_f32(buf: &mut Vec<u8>, value: f32, big_endian: bool) {
    buf.extend_from_slice(&if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    });
}

fn write_f64(buf: &mut Vec<u8>, value: f64, big_endian: bool) {
    buf.extend_from_slice(&if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    });
}

/// Walk one bounding box blob's scan records and index the byte offset,
/// spectrum id and peak count of each, without decoding peaks — decoding
/// happens lazily per scan via `decode_scan_at`.
pub fn index_bbox(bbox: &BoundingBox, cache: &DataEncodingsCache) -> Result<BoundingBoxIndex> {
    let estimated_slice_count = (1 + bbox.last_spectrum_id - bbox.first_spectrum_id).max(0) as usize;

    let mut slices_indexes = Vec::with_capacity(estimated_slice_count);
    let mut spectra_ids = Vec::with_capacity(estimated_slice_count);
    let mut peaks_counts = Vec::with_capacity(estimated_slice_count);

    let blob = bbox.blob_data.as_slice();
    let n_bytes = blob.len();
    let mut offset = 0usize;
    let mut slices_count = 0usize;

    while offset < n_bytes {
        slices_indexes.push(offset);

        let spectrum_id = read_i32(blob, offset)? as i64;
        spectra_ids.push(spectrum_id);

        let peak_count = read_i32(blob, offset + 4)?.max(0) as usize;
        peaks_counts.push(peak_count);

        let data_encoding = cache
            .get_data_encoding_by_spectrum_id(&spectrum_id)
            .ok_or_else(|| anyhow::anyhow!("no data encoding registered for spectrum {spectrum_id}"))?;

        let peak_size = data_encoding.get_peak_size();
        offset += SCAN_HEADER_SIZE + peak_size * peak_count;
        slices_count += 1;
    }

    if offset != n_bytes {
        bail!(
            "bounding box {} blob length {n_bytes} does not align with scan records (stopped at {offset})",
            bbox.id
        );
    }

    Ok(BoundingBoxIndex {
        bb_id: bbox.id,
        spectrum_slices_count: slices_count,
        spectra_ids,
        slices_indexes,
        peaks_counts,
    })
}

/// Decode one scan's peak arrays out of a bounding box blob, optionally
/// restricted to an m/z window (`min_mz`/`max_mz`, both inclusive).
pub fn decode_scan_at(
    bbox: &BoundingBox,
    index: &BoundingBoxIndex,
    data_encoding: &DataEncoding,
    slice_idx: usize,
    min_mz: Option<f64>,
    max_mz: Option<f64>,
) -> Result<SpectrumData> {
    let total_peaks = index.peaks_counts[slice_idx];
    let scan_start = index.slices_indexes[slice_idx] + SCAN_HEADER_SIZE;
    decode_peaks(
        &bbox.blob_data,
        scan_start,
        total_peaks,
        data_encoding,
        min_mz,
        max_mz,
    )
}

fn decode_peaks(
    blob: &[u8],
    peaks_start: usize,
    total_peaks: usize,
    de: &DataEncoding,
    min_mz: Option<f64>,
    max_mz: Option<f64>,
) -> Result<SpectrumData> {
    let peak_size = de.get_peak_size();
    let big_endian = de.byte_order.is_big_endian();
    let mz_is_f32 = de.peak_encoding == PeakEncoding::LowRes;
    let intensity_is_f64 = de.peak_encoding == PeakEncoding::NoLoss;
    let is_fitted = de.mode == DataMode::Fitted;

    let mut mz_array = Vec::with_capacity(total_peaks);
    let mut intensity_array = Vec::with_capacity(total_peaks);
    let mut lwhm_array = Vec::new();
    let mut rwhm_array = Vec::new();

    for peak_idx in 0..total_peaks {
        let peak_offset = peaks_start + peak_idx * peak_size;

        let mz = if mz_is_f32 {
            read_f32(blob, peak_offset, big_endian)? as f64
        } else {
            read_f64(blob, peak_offset, big_endian)?
        };

        if let Some(min) = min_mz {
            if mz < min {
                continue;
            }
        }
        if let Some(max) = max_mz {
            if mz > max {
                continue;
            }
        }

        let mz_size = if mz_is_f32 { 4 } else { 8 };
        let intensity_offset = peak_offset + mz_size;
        let intensity = if intensity_is_f64 {
            read_f64(blob, intensity_offset, big_endian)? as f32
        } else {
            read_f32(blob, intensity_offset, big_endian)?
        };

        mz_array.push(mz);
        intensity_array.push(intensity);

        if is_fitted {
            let intensity_size = if intensity_is_f64 { 8 } else { 4 };
            let hwhm_offset = intensity_offset + intensity_size;
            lwhm_array.push(read_f32(blob, hwhm_offset, big_endian)?);
            rwhm_array.push(read_f32(blob, hwhm_offset + 4, big_endian)?);
        }
    }

    let peak_count = mz_array.len();
    Ok(SpectrumData {
        data_encoding: de.clone(),
        peaks_count: peak_count,
        mz_array,
        intensity_array,
        lwhm_array,
        rwhm_array,
    })
}

/// Merge the per-bounding-box slices of one logical spectrum (produced by
/// one `decode_scan_at` call per bounding box row) back into a single
/// `SpectrumData`, in bounding-box order.
pub fn merge_spectrum_slices(slices: &mut Vec<SpectrumData>, total_peak_count: usize) -> Result<SpectrumData> {
    let data_encoding = slices
        .first()
        .map(|sd| sd.data_encoding.clone())
        .ok_or_else(|| anyhow::anyhow!("cannot merge an empty list of spectrum slices"))?;

    let is_fitted = data_encoding.mode == DataMode::Fitted;

    let mut mz_array = Vec::with_capacity(total_peak_count);
    let mut intensity_array = Vec::with_capacity(total_peak_count);
    let mut lwhm_array = if is_fitted { Vec::with_capacity(total_peak_count) } else { Vec::new() };
    let mut rwhm_array = if is_fitted { Vec::with_capacity(total_peak_count) } else { Vec::new() };

    for slice in slices.iter_mut() {
        mz_array.append(&mut slice.mz_array);
        intensity_array.append(&mut slice.intensity_array);
        if is_fitted {
            lwhm_array.append(&mut slice.lwhm_array);
            rwhm_array.append(&mut slice.rwhm_array);
        }
    }

    Ok(SpectrumData {
        data_encoding,
        peaks_count: mz_array.len(),
        mz_array,
        intensity_array,
        lwhm_array,
        rwhm_array,
    })
}

/// One scan's worth of peaks about to be appended to a bounding box blob
/// being built by the writer (component F).
pub struct ScanRecord<'a> {
    pub spectrum_id: i64,
    pub mz: &'a [f64],
    pub intensity: &'a [f32],
    pub left_hwhm: &'a [f32],
    pub right_hwhm: &'a [f32],
}

/// Append one scan's encoded record to a growing bounding box blob buffer.
pub fn encode_scan(buf: &mut Vec<u8>, scan: &ScanRecord, de: &DataEncoding) -> Result<()> {
    if scan.mz.len() != scan.intensity.len() {
        bail!(
            "mz/intensity length mismatch for spectrum {}: {} vs {}",
            scan.spectrum_id,
            scan.mz.len(),
            scan.intensity.len()
        );
    }

    let big_endian = de.byte_order.is_big_endian();
    let mz_is_f32 = de.peak_encoding == PeakEncoding::LowRes;
    let intensity_is_f64 = de.peak_encoding == PeakEncoding::NoLoss;
    let is_fitted = de.mode == DataMode::Fitted;

    buf.extend_from_slice(&(scan.spectrum_id as i32).to_le_bytes());
    buf.extend_from_slice(&(scan.mz.len() as i32).to_le_bytes());

    for (i, (&mz, &intensity)) in scan.mz.iter().zip(scan.intensity.iter()).enumerate() {
        if mz_is_f32 {
            write_f32(buf, mz as f32, big_endian);
        } else {
            write_f64(buf, mz, big_endian);
        }

        if intensity_is_f64 {
            write_f64(buf, intensity as f64, big_endian);
        } else {
            write_f32(buf, intensity, big_endian);
        }

        if is_fitted {
            let lwhm = scan.left_hwhm.get(i).copied().unwrap_or(0.0);
            let rwhm = scan.right_hwhm.get(i).copied().unwrap_or(0.0);
            write_f32(buf, lwhm, big_endian);
            write_f32(buf, rwhm, big_endian);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ByteOrder;

    fn high_res_profile() -> DataEncoding {
        DataEncoding {
            id: 1,
            mode: DataMode::Profile,
            peak_encoding: PeakEncoding::HighRes,
            compression: "none".to_string(),
            byte_order: ByteOrder::LittleEndian,
        }
    }

    #[test]
    fn round_trips_a_high_res_scan() {
        let de = high_res_profile();
        let mz = vec![100.1, 100.2, 100.3];
        let intensity = vec![10.0, 50.0, 10.0];
        let scan = ScanRecord {
            spectrum_id: 7,
            mz: &mz,
            intensity: &intensity,
            left_hwhm: &[],
            right_hwhm: &[],
        };

        let mut buf = Vec::new();
        encode_scan(&mut buf, &scan, &de).unwrap();

        let decoded = decode_peaks(&buf, SCAN_HEADER_SIZE, 3, &de, None, None).unwrap();
        assert_eq!(decoded.mz_array, mz);
        assert_eq!(decoded.intensity_array, intensity);
    }

    #[test]
    fn round_trips_a_no_loss_scan() {
        let de = DataEncoding {
            peak_encoding: PeakEncoding::NoLoss,
            ..high_res_profile()
        };
        let mz = vec![100.123456789, 200.987654321];
        let intensity = vec![12345.678, 98765.4321];
        let scan = ScanRecord {
            spectrum_id: 1,
            mz: &mz,
            intensity: &intensity,
            left_hwhm: &[],
            right_hwhm: &[],
        };

        let mut buf = Vec::new();
        encode_scan(&mut buf, &scan, &de).unwrap();

        let decoded = decode_peaks(&buf, SCAN_HEADER_SIZE, 2, &de, None, None).unwrap();
        assert_eq!(decoded.mz_array, mz);
        assert_eq!(decoded.intensity_array, intensity);
    }

    #[test]
    fn mz_filter_excludes_peaks_outside_the_window() {
        let de = high_res_profile();
        let mz = vec![100.0, 200.0, 300.0];
        let intensity = vec![1.0, 2.0, 3.0];
        let scan = ScanRecord {
            spectrum_id: 1,
            mz: &mz,
            intensity: &intensity,
            left_hwhm: &[],
            right_hwhm: &[],
        };

        let mut buf = Vec::new();
        encode_scan(&mut buf, &scan, &de).unwrap();

        let decoded = decode_peaks(&buf, SCAN_HEADER_SIZE, 3, &de, Some(150.0), Some(250.0)).unwrap();
        assert_eq!(decoded.mz_array, vec![200.0]);
    }

    #[test]
    fn fitted_scan_round_trips_hwhm_arrays() {
        let de = DataEncoding {
            mode: DataMode::Fitted,
            ..high_res_profile()
        };
        let mz = vec![100.0];
        let intensity = vec![10.0];
        let scan = ScanRecord {
            spectrum_id: 1,
            mz: &mz,
            intensity: &intensity,
            left_hwhm: &[0.01],
            right_hwhm: &[0.02],
        };

        let mut buf = Vec::new();
        encode_scan(&mut buf, &scan, &de).unwrap();

        let decoded = decode_peaks(&buf, SCAN_HEADER_SIZE, 1, &de, None, None).unwrap();
        assert_eq!(decoded.lwhm_array, vec![0.01]);
        assert_eq!(decoded.rwhm_array, vec![0.02]);
    }
}
