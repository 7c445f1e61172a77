//! Shared fixture builder for integration tests.
//!
//! No bundled `.mzDB` sample ships with this crate, so tests build small
//! archives on the fly with `MzDbWriter` and read them back through the
//! public API. Each helper returns a `TempDir` that must stay alive for
//! as long as the path is in use.

use msarchive::writer::{MzDbWriterBuilder, WriterMetadata};
use msarchive::{BBSizes, ByteOrder, DataEncoding, DataMode, PeakEncoding, Spectrum, SpectrumData, SpectrumHeader};
use tempfile::TempDir;

/// One scan's worth of input to [`write_archive`]: level, retention time,
/// and its centroided peaks.
pub struct RawScan {
    pub ms_level: i64,
    pub rt: f32,
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
}

impl RawScan {
    pub fn new(ms_level: i64, rt: f32, mz: Vec<f64>, intensity: Vec<f32>) -> Self {
        Self {
            ms_level,
            rt,
            mz,
            intensity,
        }
    }
}

fn data_encoding_for(mode: DataMode) -> DataEncoding {
    DataEncoding {
        id: 0,
        mode,
        peak_encoding: PeakEncoding::HighRes,
        compression: "none".to_string(),
        byte_order: ByteOrder::LittleEndian,
    }
}

fn header_for(id: i64, scan: &RawScan) -> SpectrumHeader {
    SpectrumHeader {
        id,
        initial_id: id,
        title: format!("scan={id}"),
        cycle: 0,
        time: scan.rt,
        ms_level: scan.ms_level,
        activation_type: None,
        tic: scan.intensity.iter().map(|&v| v as f64).sum::<f64>() as f32,
        base_peak_mz: scan
            .mz
            .iter()
            .zip(scan.intensity.iter())
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(mz, _)| *mz)
            .unwrap_or(0.0),
        base_peak_intensity: scan.intensity.iter().cloned().fold(0.0_f32, f32::max),
        precursor_mz: None,
        precursor_charge: None,
        peaks_count: scan.mz.len() as i64,
        param_tree_str: None,
        scan_list_str: None,
        precursor_list_str: None,
        product_list_str: None,
        shared_param_tree_id: None,
        instrument_configuration_id: 1,
        source_file_id: 1,
        run_id: 1,
        data_processing_id: 1,
        data_encoding_id: 0,
        bb_first_spectrum_id: id,
    }
}

/// Build a tiny archive from already-centroided scans, written in the
/// order given (callers are responsible for ascending scan-id order, same
/// as the real pipeline hands cycles to the writer in order).
pub fn write_archive(bb_sizes: BBSizes, scans: Vec<RawScan>) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("create tempdir");
    let path = dir.path().join("test.mzDB");

    let mut writer = MzDbWriterBuilder::new(&path)
        .metadata(WriterMetadata::with_defaults())
        .bb_sizes(bb_sizes)
        .is_dia(false)
        .build()
        .expect("build writer");
    writer.open().expect("open writer");

    for (i, scan) in scans.iter().enumerate() {
        let id = (i + 1) as i64;
        let header = header_for(id, scan);
        let data_encoding = data_encoding_for(DataMode::Centroid);
        let data = SpectrumData {
            data_encoding: data_encoding.clone(),
            peaks_count: scan.mz.len(),
            mz_array: scan.mz.clone(),
            intensity_array: scan.intensity.clone(),
            lwhm_array: Vec::new(),
            rwhm_array: Vec::new(),
        };
        let spectrum = Spectrum { header, data };
        writer
            .insert_spectrum(&spectrum, &data_encoding)
            .unwrap_or_else(|e| panic!("insert spectrum {id}: {e:#}"));
    }

    writer.close().expect("close writer");
    (dir, path)
}
