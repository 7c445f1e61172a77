//! Conversion pipeline (spec §5): a producer reads raw spectra
//! sequentially and groups them into cycles (spec §4.F, `N` consecutive
//! MS1 scans plus their MSn children); a `rayon` thread pool picks peaks
//! (and, where configured, fits them) for every spectrum in a cycle in
//! parallel; a single consumer drains cycles in scan-id order and drives
//! `MzDbWriter`, the sole writer of the catalog and tile storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{info, warn};
use rayon::prelude::*;

use crate::config::ConversionConfig;
use crate::model::{ByteOrder, DataEncoding, DataMode, PeakEncoding, Spectrum, SpectrumData, SpectrumHeader};
use crate::peak::{algorithm_for_vendor, pick_and_centroid, ExternalPeakPicker, VendorTag};
use crate::writer::{MzDbWriterBuilder, WriterMetadata};

/// One raw spectrum as surfaced by the vendor-file reader (spec §6,
/// "RawReader interface (consumed)"): `RawSpectrum = { id, ms_level, rt,
/// polarity, mz[], intensity[], precursor? }`.
#[derive(Clone, Debug)]
pub struct RawSpectrum {
    pub id: i64,
    pub ms_level: i64,
    pub rt: f32,
    pub polarity: i32,
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
    pub precursor_mz: Option<f64>,
    pub precursor_charge: Option<i32>,
}

/// The vendor-file decoder's interface to the core. Implementations own
/// whatever vendor SDK handle they need; the core never speaks to vendor
/// libraries directly, only through this trait.
pub trait RawReader {
    /// Instrument family, used to pick the peak-picking algorithm (§4.C).
    fn vendor(&self) -> VendorTag;
    /// Next spectrum in acquisition order, or `None` at end of input.
    fn next_spectrum(&mut self) -> Result<Option<RawSpectrum>>;
}

/// Summary returned by `convert` once the run ends (normally or by
/// cancellation).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversionReport {
    pub spectra_written: i64,
    pub cycles_written: i64,
    pub cancelled: bool,
}

/// Cooperative cancellation flag (spec §5 "Cancellation"): checked only at
/// cycle boundaries, never inside an in-flight picking task.
pub type CancelToken = Arc<AtomicBool>;

/// Number of consecutive per-spectrum picking failures before the whole
/// conversion aborts (spec §5 "Timeouts": "if three consecutive spectra
/// fail, aborts conversion").
const MAX_CONSECUTIVE_FAILURES: usize = 3;

/// Drive one full conversion: open `output`, read every raw spectrum from
/// `reader`, peak-pick/fit it according to `config`, and write the
/// resulting archive. Returns a report even when `cancel` was raised
/// mid-run; the archive committed so far stays queryable.
pub fn convert(
    reader: &mut dyn RawReader,
    config: &ConversionConfig,
    metadata: WriterMetadata,
    cancel: CancelToken,
    external_picker: Option<&(dyn ExternalPeakPicker + Sync)>,
) -> Result<ConversionReport> {
    let mut writer = MzDbWriterBuilder::new(&config.output)
        .metadata(metadata)
        .bb_sizes(config.bb_sizes)
        .is_dia(config.is_dia)
        .build()?;
    writer.open()?;

    if let Some(n) = config.worker_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok(); // already-initialized global pool is not an error here
    }

    let vendor = reader.vendor();
    let (vendor_algorithm, vendor_params) = algorithm_for_vendor(vendor);
    // A caller-supplied `peak_finder` (non-default) wins over the vendor's
    // own defaults; the algorithm choice always follows the vendor.
    let params = if config.peak_finder == crate::config::PeakFinderParams::default() {
        vendor_params
    } else {
        config.peak_finder
    };
    let algorithm = vendor_algorithm;

    let mut report = ConversionReport::default();
    let mut consecutive_failures = 0usize;
    let mut ms1_scans_seen: u64 = 0;
    let mut pending_first: Option<RawSpectrum> = None;
    // spec §7 EmptySpectrum: "log once per conversion" regardless of how
    // many empty spectra this run actually produces.
    let empty_logged = AtomicBool::new(false);

    loop {
        if cancel.load(Ordering::SeqCst) {
            info!("cancellation requested at cycle boundary, stopping");
            report.cancelled = true;
            writer.mark_unfinished()?;
            break;
        }

        let cycle = match read_cycle(
            reader,
            config.cycle_window,
            config.nscans,
            &mut ms1_scans_seen,
            &mut pending_first,
        )? {
            Some(c) if !c.is_empty() => c,
            _ => break,
        };

        let picked = pick_cycle(
            &cycle,
            config,
            algorithm,
            &params,
            external_picker,
            &mut consecutive_failures,
            &empty_logged,
        )?;

        // (a) catalog insertions become durable in scan-id order.
        let mut ordered = picked;
        ordered.sort_by_key(|s| s.header.id);

        for spectrum in &ordered {
            writer.insert_spectrum(spectrum, &spectrum.data.data_encoding)?;
            report.spectra_written += 1;
        }
        report.cycles_written += 1;

        if config
            .nscans
            .map(|n| ms1_scans_seen >= n)
            .unwrap_or(false)
        {
            break;
        }
    }

    writer.close()?;
    Ok(report)
}

/// Pull up to `cycle_window` MS1 scans from `reader`, plus every MSn scan
/// that follows each one until the next MS1 scan, honoring `nscans` (stop
/// reading once that many MS1 scans have been produced in total).
/// `pending_first` carries over an MS1 scan already read while closing the
/// previous cycle, so no spectrum is read twice.
fn read_cycle(
    reader: &mut dyn RawReader,
    cycle_window: usize,
    nscans: Option<u64>,
    ms1_scans_seen: &mut u64,
    pending_first: &mut Option<RawSpectrum>,
) -> Result<Option<Vec<RawSpectrum>>> {
    let mut cycle = Vec::new();
    let mut ms1_in_cycle = 0usize;

    if let Some(first) = pending_first.take() {
        ms1_in_cycle += 1;
        *ms1_scans_seen += 1;
        cycle.push(first);
    }

    loop {
        if ms1_in_cycle >= cycle_window {
            break;
        }
        if let Some(n) = nscans {
            if *ms1_scans_seen >= n {
                break;
            }
        }

        match reader.next_spectrum()? {
            None => break,
            Some(spectrum) => {
                if spectrum.ms_level == 1 {
                    if ms1_in_cycle == 0 {
                        ms1_in_cycle += 1;
                        *ms1_scans_seen += 1;
                        cycle.push(spectrum);
                    } else {
                        // Belongs to the *next* cycle; hand it back.
                        *pending_first = Some(spectrum);
                        return Ok(Some(cycle));
                    }
                } else {
                    cycle.push(spectrum);
                }
            }
        }
    }

    if cycle.is_empty() {
        Ok(None)
    } else {
        Ok(Some(cycle))
    }
}

/// Peak-pick (and, where `config` selects `Fitted`, curve-fit) every
/// spectrum of one cycle in parallel, joining before returning (spec §5:
/// "dispatched as parallel tasks that join before the cycle is handed to
/// the builder"). Failures are recoverable per-spectrum (§7
/// `FitFailed`/picking failure: log and continue with an empty scan)
/// unless `MAX_CONSECUTIVE_FAILURES` is reached, which is fatal.
fn pick_cycle(
    cycle: &[RawSpectrum],
    config: &ConversionConfig,
    algorithm: crate::peak::PeakFinderAlgorithm,
    params: &crate::config::PeakFinderParams,
    external_picker: Option<&(dyn ExternalPeakPicker + Sync)>,
    consecutive_failures: &mut usize,
    empty_logged: &AtomicBool,
) -> Result<Vec<Spectrum>> {
    let peak_encoding = if config.no_loss {
        PeakEncoding::NoLoss
    } else {
        PeakEncoding::HighRes
    };

    let results: Vec<Result<Spectrum>> = cycle
        .par_iter()
        .map(|raw| {
            pick_one_spectrum(
                raw,
                config,
                algorithm,
                params,
                external_picker,
                peak_encoding,
                empty_logged,
            )
        })
        .collect();

    let mut out = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(spectrum) => {
                *consecutive_failures = 0;
                out.push(spectrum);
            }
            Err(e) => {
                warn!("spectrum picking failed, emitting empty scan: {e:#}");
                *consecutive_failures += 1;
                if *consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    return Err(anyhow!(
                        "{} consecutive spectrum failures, aborting conversion",
                        MAX_CONSECUTIVE_FAILURES
                    ));
                }
            }
        }
    }

    Ok(out)
}

fn pick_one_spectrum(
    raw: &RawSpectrum,
    config: &ConversionConfig,
    algorithm: crate::peak::PeakFinderAlgorithm,
    params: &crate::config::PeakFinderParams,
    external_picker: Option<&(dyn ExternalPeakPicker + Sync)>,
    peak_encoding: PeakEncoding,
    empty_logged: &AtomicBool,
) -> Result<Spectrum> {
    // spec §7 EmptySpectrum is recoverable: emit a zero-peak scan rather
    // than dropping the spectrum or counting it as a picking failure.
    if raw.mz.is_empty() {
        if empty_logged.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            warn!(
                "empty spectrum {} (raw arrays are empty); emitting zero-peak scan",
                raw.id
            );
        }
        return Ok(empty_spectrum(raw, config, peak_encoding));
    }

    let data_mode = config.data_mode_for(raw.ms_level);
    let use_fitting = data_mode == DataMode::Fitted;

    let centroids = match data_mode {
        DataMode::Profile => {
            // No picking: the scan is stored as-is, one "peak" per sample.
            raw.mz
                .iter()
                .zip(raw.intensity.iter())
                .map(|(&mz, &intensity)| crate::peak::Centroid {
                    mz,
                    intensity,
                    left_hwhm: crate::model::MIN_HWHM,
                    right_hwhm: crate::model::MIN_HWHM,
                    rt: raw.rt,
                })
                .collect()
        }
        DataMode::Centroid | DataMode::Fitted => pick_and_centroid(
            &raw.mz,
            &raw.intensity,
            raw.rt,
            raw.id,
            algorithm,
            params,
            use_fitting,
            external_picker.map(|p| p as &dyn ExternalPeakPicker),
        )?,
    };

    let data_encoding = DataEncoding {
        id: 0,
        mode: data_mode,
        peak_encoding,
        compression: "none".to_string(),
        byte_order: ByteOrder::LittleEndian,
    };

    Ok(build_spectrum(raw, data_encoding, &centroids, data_mode))
}

/// Spec §8 boundary behavior: "Empty spectrum produces a row with
/// `n_points = 0` and no tile contribution." Still goes through
/// `build_spectrum` so the header fields (tic=0, base peaks=0, etc.) are
/// derived the same way as any other scan, just over an empty centroid
/// list.
fn empty_spectrum(raw: &RawSpectrum, config: &ConversionConfig, peak_encoding: PeakEncoding) -> Spectrum {
    let data_mode = config.data_mode_for(raw.ms_level);
    let data_encoding = DataEncoding {
        id: 0,
        mode: data_mode,
        peak_encoding,
        compression: "none".to_string(),
        byte_order: ByteOrder::LittleEndian,
    };
    build_spectrum(raw, data_encoding, &[], data_mode)
}

fn build_spectrum(
    raw: &RawSpectrum,
    data_encoding: DataEncoding,
    centroids: &[crate::peak::Centroid],
    data_mode: DataMode,
) -> Spectrum {
    let mz_array = centroids.iter().map(|c| c.mz).collect::<Vec<_>>();
    let intensity_array = centroids.iter().map(|c| c.intensity).collect::<Vec<_>>();
    let (lwhm_array, rwhm_array) = if data_mode == DataMode::Fitted {
        (
            centroids.iter().map(|c| c.left_hwhm).collect(),
            centroids.iter().map(|c| c.right_hwhm).collect(),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    let data = SpectrumData {
        data_encoding,
        peaks_count: centroids.len(),
        mz_array,
        intensity_array,
        lwhm_array,
        rwhm_array,
    };

    let header = SpectrumHeader {
        id: raw.id,
        initial_id: raw.id,
        title: format!("scan={}", raw.id),
        cycle: 0,
        time: raw.rt,
        ms_level: raw.ms_level,
        activation_type: None,
        tic: raw.intensity.iter().map(|&v| v as f64).sum::<f64>() as f32,
        base_peak_mz: data
            .mz_array
            .iter()
            .zip(data.intensity_array.iter())
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(mz, _)| *mz)
            .unwrap_or(0.0),
        base_peak_intensity: data
            .intensity_array
            .iter()
            .cloned()
            .fold(0.0_f32, f32::max),
        precursor_mz: raw.precursor_mz,
        precursor_charge: raw.precursor_charge,
        peaks_count: data.peaks_count as i64,
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
        bb_first_spectrum_id: raw.id,
    };

    Spectrum { header, data }
}
