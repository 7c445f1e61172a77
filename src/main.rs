//! `ms2archive`: conversion CLI (spec §6).
//!
//! Reads a raw acquisition through the `RawReader` boundary (spec §1: the
//! vendor decoder itself is out of scope; this binary drives
//! [`msarchive::raw::JsonlRawReader`], the crate's one concrete, openly
//! specified `RawReader`), peak-picks it per the configured data modes,
//! and writes the resulting archive.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use msarchive::config::{parse_ms_level_range, ConversionConfig, MsLevelRange};
use msarchive::model::{BBSizes, DataMode};
use msarchive::peak::VendorTag;
use msarchive::pipeline::convert;
use msarchive::raw::JsonlRawReader;
use msarchive::writer::WriterMetadata;

/// Converts a raw mass-spectrometry acquisition into a bounding-box archive.
#[derive(Parser)]
#[command(name = "ms2archive", author, version, about, long_about = None)]
struct Cli {
    /// Raw acquisition path (newline-delimited JSON spectra; see
    /// `msarchive::raw::JsonlRawReader`).
    #[arg(long)]
    input: PathBuf,

    /// Archive path; default: `<input>.archive`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Store ms-levels in this range as centroid-only (e.g. `2` or `2-5`).
    #[arg(long = "centroid", value_name = "RANGE")]
    centroid: Vec<String>,

    /// Store ms-levels in this range as raw profile.
    #[arg(long = "profile", value_name = "RANGE")]
    profile: Vec<String>,

    /// Store ms-levels in this range as fitted peaks (centroid + HWHM).
    #[arg(long = "fitted", value_name = "RANGE")]
    fitted: Vec<String>,

    /// MS1 bounding-box retention-time width, in seconds.
    #[arg(long = "bbTimeWidth")]
    bb_time_width: Option<f32>,

    /// MSn bounding-box retention-time width, in seconds.
    #[arg(long = "bbTimeWidthMSn")]
    bb_time_width_msn: Option<f32>,

    /// MS1 bounding-box m/z width, in Da.
    #[arg(long = "bbMzWidth")]
    bb_mz_width: Option<f64>,

    /// MSn bounding-box m/z width, in Da.
    #[arg(long = "bbMzWidthMSn")]
    bb_mz_width_msn: Option<f64>,

    /// Use the lossless (64-bit m/z and intensity) peak encoding throughout.
    #[arg(long = "no_loss")]
    no_loss: bool,

    /// Mark the acquisition as data-independent (DIA/SWATH).
    #[arg(long = "dia")]
    dia: bool,

    /// Stop after this many MS1 scans.
    #[arg(long = "nscans")]
    nscans: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // `--help`/`--version` report themselves via `DisplayHelp`/
            // `DisplayVersion` and exit 0; anything else is a usage error
            // (spec §6 exit code 1).
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(report) => {
            info!(
                "conversion finished: {} spectra, {} cycles{}",
                report.spectra_written,
                report.cycles_written,
                if report.cancelled { " (cancelled)" } else { "" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("conversion failed: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<msarchive::pipeline::ConversionReport> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.archive", cli.input.display())));

    let mut bb_sizes = BBSizes::default();
    if let Some(w) = cli.bb_time_width {
        bb_sizes.bb_rt_width_ms1 = w;
    }
    if let Some(w) = cli.bb_time_width_msn {
        bb_sizes.bb_rt_width_msn = w;
    }
    if let Some(w) = cli.bb_mz_width {
        bb_sizes.bb_mz_height_ms1 = w;
    }
    if let Some(w) = cli.bb_mz_width_msn {
        bb_sizes.bb_mz_height_msn = w;
    }

    let mut data_mode_overrides: Vec<MsLevelRange> = Vec::new();
    for range in &cli.fitted {
        data_mode_overrides.push(parse_ms_level_range(range, DataMode::Fitted)?);
    }
    for range in &cli.centroid {
        data_mode_overrides.push(parse_ms_level_range(range, DataMode::Centroid)?);
    }
    for range in &cli.profile {
        data_mode_overrides.push(parse_ms_level_range(range, DataMode::Profile)?);
    }

    let mut config = ConversionConfig::new(cli.input.to_string_lossy().into_owned());
    config.output = output.to_string_lossy().into_owned();
    config.bb_sizes = bb_sizes;
    config.no_loss = cli.no_loss;
    config.is_dia = cli.dia;
    config.nscans = cli.nscans;
    config.data_mode_overrides = data_mode_overrides;

    let mut reader = JsonlRawReader::open(&cli.input, VendorTag::Other)?;
    // Spec §5 cancellation is a cooperative flag library callers can flip
    // from another thread; no signal-handling crate is in this binary's
    // dependency stack, so the CLI path just never trips it.
    let cancel: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));

    convert(
        &mut reader,
        &config,
        WriterMetadata::with_defaults(),
        cancel,
        None,
    )
}
