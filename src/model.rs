//! Data model types for the archive format
//!
//! Structures representing mass spectrometry data held in the archive:
//! spectra, peaks, data encodings, run slices, tiles and metadata.
#![allow(unused)]

use anyhow::*;
use roxmltree::Document;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::DataMode::Fitted;

// ============================================================================
// Acquisition mode constants and enum
// ============================================================================

/// Data Dependent Acquisition mode description
pub const ACQUISITION_MODE_DDA: &str = "Data Dependant Acquisition (Thermo designation), Warning: in ABI this is called IDA (Information Dependant Acquisition)";
/// SWATH acquisition mode description
pub const ACQUISITION_MODE_SWATH: &str = "ABI Swath acquisition or Thermo swath acquisition";
/// Multiple Reaction Monitoring mode description
pub const ACQUISITION_MODE_MRM: &str = "Multiple reaction monitoring";
/// Single Reaction Monitoring mode description
pub const ACQUISITION_MODE_SRM: &str = "SRM (Single reaction monitoring) acquisition";
/// Unknown acquisition mode description
pub const ACQUISITION_MODE_UNKNOWN: &str = "unknown acquisition mode";

/// Platform-wide minimum HWHM (spec §3, §4.B): HWHMs never go below this.
pub const MIN_HWHM: f32 = 1e-3;

/// Mass spectrometry acquisition mode
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AcquisitionMode {
    /// Data Dependent Acquisition
    DDA,
    /// SWATH acquisition
    SWATH,
    /// Multiple Reaction Monitoring
    MRM,
    /// Single Reaction Monitoring
    SRM,
    /// Unknown acquisition mode
    Unknown,
}

/// A peak with 32-bit m/z and 32-bit intensity
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DataPoint3232 {
    pub x: f32,
    pub y: f32,
}

/// A peak with 64-bit m/z and 32-bit intensity
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DataPoint6432 {
    pub x: f64,
    pub y: f32,
}

/// A peak with 64-bit m/z and 64-bit intensity
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DataPoint6464 {
    pub x: f64,
    pub y: f64,
}

/// A fitted peak with half-width at half-maximum values
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FittedPeak {
    /// m/z value
    pub x: f64,
    /// Intensity value
    pub y: f32,
    /// Left half-width at half-maximum
    pub left_hwhm: f32,
    /// Right half-width at half-maximum
    pub right_hwhm: f32,
}

/// A peak in an extracted ion chromatogram (XIC)
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct XicPeak {
    /// m/z value
    pub mz: f64,
    /// Intensity value
    pub intensity: f32,
    /// Retention time
    pub rt: f32,
}

/// A controlled-vocabulary key/value pair attached to a catalog entity.
///
/// Mirrors mzML's `cvParam` element: every attribute but `accession` is
/// genuinely optional on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CvParam {
    pub cv_ref: Option<String>,
    pub accession: String,
    pub name: Option<String>,
    pub value: Option<String>,
    pub unit_cv_ref: Option<String>,
    pub unit_accession: Option<String>,
    pub unit_name: Option<String>,
}

/// A free-form typed name/value pair attached to a catalog entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserParam {
    pub cv_ref: Option<String>,
    pub accession: Option<String>,
    pub name: String,
    pub value: Option<String>,
    pub param_type: Option<String>,
    pub unit_cv_ref: Option<String>,
    pub unit_accession: Option<String>,
    pub unit_name: Option<String>,
}

/// A free-form named text blob attached to a catalog entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserText {
    pub cv_ref: Option<String>,
    pub accession: Option<String>,
    pub name: String,
    pub text_type: Option<String>,
    pub text: String,
}

/// An XML-like key/value container attached to a catalog entity (spec §3).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamTree {
    pub cv_params: Vec<CvParam>,
    pub user_params: Vec<UserParam>,
    pub user_texts: Vec<UserText>,
}

impl ParamTree {
    /// Look up a CV param's value by accession.
    pub fn cv_value(&self, accession: &str) -> Option<&str> {
        self.cv_params
            .iter()
            .find(|p| p.accession == accession)
            .and_then(|p| p.value.as_deref())
    }

    /// Look up a user param's value by name.
    pub fn user_value(&self, name: &str) -> Option<&str> {
        self.user_params
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.value.as_deref())
    }
}

/// Archive-level param tree fields (`meta_archive.param_tree`, spec §4.G).
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveParamTree {
    pub ms1_bb_mz_width: f64,
    pub msn_bb_mz_width: f64,
    pub ms1_bb_time_width: f32,
    pub msn_bb_time_width: f32,
    pub is_lossless: bool,
    pub unfinished: bool,
}

/// Data acquisition mode for a scan (spec §3: Profile / Centroid / Fitted).
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(i32)]
pub enum DataMode {
    /// Profile (continuous) data
    Profile = -1,
    /// Centroided (discrete peaks) data
    Centroid = 12,
    /// Fitted peaks with peak shape parameters
    Fitted = 20,
}

impl DataMode {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DataMode::Profile => "profile",
            DataMode::Centroid => "centroid",
            DataMode::Fitted => "fitted",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "profile" => Ok(DataMode::Profile),
            "centroid" => Ok(DataMode::Centroid),
            "fitted" => Ok(DataMode::Fitted),
            other => bail!("unknown data mode '{}'", other),
        }
    }
}

/// Peak encoding format specifying byte sizes (spec §3).
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(i32)]
pub enum PeakEncoding {
    /// Low resolution: 32-bit m/z, 32-bit intensity (8 bytes per peak)
    LowRes = 8,
    /// High resolution: 64-bit m/z, 32-bit intensity (12 bytes per peak)
    HighRes = 12,
    /// No loss: 64-bit m/z, 64-bit intensity (16 bytes per peak)
    NoLoss = 16,
}

impl PeakEncoding {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PeakEncoding::LowRes => "low_res",
            PeakEncoding::HighRes => "high_res",
            PeakEncoding::NoLoss => "no_loss",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "low_res" => Ok(PeakEncoding::LowRes),
            "high_res" => Ok(PeakEncoding::HighRes),
            "no_loss" => Ok(PeakEncoding::NoLoss),
            other => bail!("unknown peak encoding '{}'", other),
        }
    }
}

/// Byte order for binary data
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ByteOrder {
    /// Big-endian byte order
    BigEndian,
    /// Little-endian byte order
    LittleEndian,
}

impl ByteOrder {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ByteOrder::BigEndian => "big_endian",
            ByteOrder::LittleEndian => "little_endian",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "big_endian" => Ok(ByteOrder::BigEndian),
            "little_endian" => Ok(ByteOrder::LittleEndian),
            other => bail!("unknown byte order '{}'", other),
        }
    }

    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    pub fn is_big_endian(&self) -> bool {
        matches!(self, ByteOrder::BigEndian)
    }
}

/// Data encoding specification for spectrum/tile data (spec §3).
#[derive(Clone, Debug, PartialEq)]
pub struct DataEncoding {
    /// Unique identifier
    pub id: i64,
    /// Data mode (profile, centroid, or fitted)
    pub mode: DataMode,
    /// Peak encoding format
    pub peak_encoding: PeakEncoding,
    /// Compression algorithm (e.g., "none", "zlib")
    pub compression: String,
    /// Byte order for numeric values
    pub byte_order: ByteOrder,
}

impl DataEncoding {
    /// Bytes per point, including the Fitted half-width suffix if applicable
    /// (spec §3: "the stored per-point width is encoding + 8 B" when Fitted).
    pub fn get_peak_size(&self) -> usize {
        let pe = self.peak_encoding as usize;
        if self.mode == Fitted { pe + 8 } else { pe }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataEncodingsCache {
    data_encoding_by_id: HashMap<i64, DataEncoding>,
    data_encoding_id_by_spectrum_id: HashMap<i64, i64>,
}

impl DataEncodingsCache {
    pub fn new(
        data_encoding_by_id: HashMap<i64, DataEncoding>,
        data_encoding_id_by_spectrum_id: HashMap<i64, i64>,
    ) -> Self {
        Self {
            data_encoding_by_id,
            data_encoding_id_by_spectrum_id,
        }
    }

    pub fn get_data_encoding_by_id(&self, de_id: &i64) -> Option<&DataEncoding> {
        self.data_encoding_by_id.get(de_id)
    }

    pub fn get_data_encoding_by_spectrum_id(&self, spectrum_id: &i64) -> Option<&DataEncoding> {
        let de_id = self.data_encoding_id_by_spectrum_id.get(spectrum_id)?;
        self.data_encoding_by_id.get(de_id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataPoints32x32 {
    pub x_list: Vec<f32>,
    pub y_list: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataPoints64x32 {
    pub x_list: Vec<f64>,
    pub y_list: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataPoints64x64 {
    pub x_list: Vec<f64>,
    pub y_list: Vec<f64>,
}

/// A half-open m/z interval `[min_mz, max_mz)` (spec §3 RunSlice, §4.H
/// isolation windows, and the writer's per-bucket bounds).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MzRange {
    pub min_mz: f64,
    pub max_mz: f64,
}

impl MzRange {
    pub fn new(min_mz: f64, max_mz: f64) -> Self {
        Self { min_mz, max_mz }
    }

    pub fn width(&self) -> f64 {
        self.max_mz - self.min_mz
    }

    pub fn contains(&self, mz: f64) -> bool {
        mz >= self.min_mz && mz < self.max_mz
    }
}

/// Isolation window selected for a precursor (DIA/SWATH acquisitions).
pub type IsolationWindow = MzRange;

/// Spectrum data: peak arrays plus the encoding they came from.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumData {
    /// Data encoding used for this spectrum
    pub data_encoding: DataEncoding,
    /// Number of peaks
    pub peaks_count: usize,
    /// m/z values array (ascending, spec §3 Scan invariant)
    pub mz_array: Vec<f64>,
    /// Intensity values array
    pub intensity_array: Vec<f32>,
    /// Left half-width at half-maximum (for fitted peaks)
    pub lwhm_array: Vec<f32>,
    /// Right half-width at half-maximum (for fitted peaks)
    pub rwhm_array: Vec<f32>,
}

impl SpectrumData {
    /// Create new spectrum data
    pub fn new(
        data_encoding: DataEncoding,
        mz_list: Vec<f64>,
        intensity_list: Vec<f32>,
        left_hwhm_list: Option<Vec<f32>>,
        right_hwhm_list: Option<Vec<f32>>,
    ) -> Self {
        let peaks_count = mz_list.len();
        SpectrumData {
            data_encoding,
            peaks_count,
            mz_array: mz_list,
            intensity_array: intensity_list,
            lwhm_array: left_hwhm_list.unwrap_or_default(),
            rwhm_array: right_hwhm_list.unwrap_or_default(),
        }
    }

    pub fn get_mz_at(&self, i: usize) -> Result<f64> {
        self.mz_array
            .get(i)
            .copied()
            .ok_or_else(|| anyhow!("peak index {} out of range (len={})", i, self.peaks_count))
    }

    pub fn get_intensity_at(&self, i: usize) -> Result<f32> {
        self.intensity_array
            .get(i)
            .copied()
            .ok_or_else(|| anyhow!("peak index {} out of range (len={})", i, self.peaks_count))
    }

    pub fn get_left_hwhm_at(&self, i: usize) -> Result<f32> {
        self.lwhm_array
            .get(i)
            .copied()
            .ok_or_else(|| anyhow!("lwhm index {} out of range", i))
    }

    pub fn get_right_hwhm_at(&self, i: usize) -> Result<f32> {
        self.rwhm_array
            .get(i)
            .copied()
            .ok_or_else(|| anyhow!("rwhm index {} out of range", i))
    }

    /// Convert ppm tolerance to Daltons at a given m/z
    fn ppm_to_da(&self, mz: f64, ppm: f64) -> f64 {
        mz * ppm / 1_000_000.0
    }

    /// Find the nearest peak to a given m/z within tolerance
    pub fn get_nearest_peak(&self, mz: f64, mz_tol_ppm: f64, rt: f32) -> Option<XicPeak> {
        if self.peaks_count == 0 {
            return None;
        }

        let mz_da = self.ppm_to_da(mz, mz_tol_ppm);
        let idx = self
            .mz_array
            .binary_search_by(|&probe| probe.partial_cmp(&mz).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or_else(|i| i);

        let new_idx = if idx == self.peaks_count {
            let prev_val = self.mz_array[self.peaks_count - 1];
            if (mz - prev_val).abs() > mz_da {
                return None;
            }
            idx - 1
        } else if idx == 0 {
            let next_val = self.mz_array[idx];
            if (mz - next_val).abs() > mz_da {
                return None;
            }
            idx
        } else {
            let next_val = self.mz_array[idx];
            let prev_val = self.mz_array[idx - 1];
            let diff_next_val = (mz - next_val).abs();
            let diff_prev_val = (mz - prev_val).abs();
            if diff_next_val < diff_prev_val {
                if diff_next_val > mz_da {
                    return None;
                }
                idx
            } else {
                if diff_prev_val > mz_da {
                    return None;
                }
                idx - 1
            }
        };

        Some(XicPeak {
            mz: self.mz_array[new_idx],
            intensity: self.intensity_array[new_idx],
            rt,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectrumHeader {
    pub id: i64,
    pub initial_id: i64,
    pub title: String,
    pub cycle: i64,
    pub time: f32,
    pub ms_level: i64,
    pub activation_type: Option<String>,
    pub tic: f32,
    pub base_peak_mz: f64,
    pub base_peak_intensity: f32,
    #[serde(rename = "main_precursor_mz")]
    pub precursor_mz: Option<f64>,
    #[serde(rename = "main_precursor_charge")]
    pub precursor_charge: Option<i32>,
    #[serde(rename = "data_points_count")]
    pub peaks_count: i64,
    #[serde(rename = "param_tree")]
    pub param_tree_str: Option<String>,
    #[serde(rename = "scan_list")]
    pub scan_list_str: Option<String>,
    #[serde(rename = "precursor_list")]
    pub precursor_list_str: Option<String>,
    #[serde(rename = "product_list")]
    pub product_list_str: Option<String>,
    pub shared_param_tree_id: Option<i64>,
    pub instrument_configuration_id: i64,
    pub source_file_id: i64,
    pub run_id: i64,
    pub data_processing_id: i64,
    pub data_encoding_id: i64,
    pub bb_first_spectrum_id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    pub header: SpectrumHeader,
    pub data: SpectrumData,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumSlice {
    pub spectrum: Spectrum,
    pub run_slice_id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSliceHeader {
    pub id: i64,
    pub ms_level: i64,
    pub number: i64,
    pub begin_mz: f64,
    pub end_mz: f64,
    pub run_id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSliceData {
    pub id: i64,
    pub spectrum_slice: Vec<SpectrumSlice>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSlice {
    pub header: RunSliceHeader,
    pub data: RunSliceData,
}

/// Tile dimensions: m/z height and time width per MS1 vs MSn (spec §4.F).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BBSizes {
    pub bb_mz_height_ms1: f64,
    pub bb_mz_height_msn: f64,
    pub bb_rt_width_ms1: f32,
    pub bb_rt_width_msn: f32,
}

impl Default for BBSizes {
    fn default() -> Self {
        // Spec §4.F defaults: 5 Da / 10,000 Da m/z height, 15 s / 0 s time width.
        BBSizes {
            bb_mz_height_ms1: 5.0,
            bb_mz_height_msn: 10_000.0,
            bb_rt_width_ms1: 15.0,
            bb_rt_width_msn: 0.0,
        }
    }
}

impl BBSizes {
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;

        let mut sizes = BBSizes::default();

        for user_param in doc
            .descendants()
            .filter(|n| n.tag_name().name() == "userParam")
        {
            if let Some(name) = user_param.attribute("name") {
                match name {
                    "ms1_bb_mz_width" => {
                        if let Some(value) = user_param.attribute("value") {
                            sizes.bb_mz_height_ms1 = value.parse::<f64>()?;
                        }
                    }
                    "msn_bb_mz_width" => {
                        if let Some(value) = user_param.attribute("value") {
                            sizes.bb_mz_height_msn = value.parse::<f64>()?;
                        }
                    }
                    "ms1_bb_time_width" => {
                        if let Some(value) = user_param.attribute("value") {
                            sizes.bb_rt_width_ms1 = value.parse::<f32>()?;
                        }
                    }
                    "msn_bb_time_width" => {
                        if let Some(value) = user_param.attribute("value") {
                            sizes.bb_rt_width_msn = value.parse::<f32>()?;
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(sizes)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub id: i64,
    pub first_spectrum_id: i64,
    pub last_spectrum_id: i64,
    pub run_slice_id: i64,
    pub blob_data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBoxIndex {
    pub bb_id: i64,
    pub spectrum_slices_count: usize,
    pub spectra_ids: Vec<i64>,
    pub slices_indexes: Vec<usize>,
    pub peaks_counts: Vec<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum XicMethod {
    Max = 0,
    Nearest = 1,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityCache {
    pub bb_sizes: BBSizes,
    pub data_encodings_cache: DataEncodingsCache,
    pub spectrum_headers: Vec<SpectrumHeader>,
}
