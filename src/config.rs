//! Conversion configuration (spec §6)
//!
//! `ConversionConfig` collects every tunable the core's components need.
//! `main.rs` builds one from `clap`-parsed CLI flags; library callers can
//! construct one directly without going through the CLI at all.

use crate::model::{BBSizes, DataMode};

/// Per-ms-level data-mode override, e.g. `--centroid 2-5`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MsLevelRange {
    pub min_level: i64,
    pub max_level: i64,
    pub mode: DataMode,
}

impl MsLevelRange {
    pub fn contains(&self, ms_level: i64) -> bool {
        ms_level >= self.min_level && ms_level <= self.max_level
    }
}

/// Parse a `--centroid`/`--profile`/`--fitted` range argument: either a
/// single integer (`2`) or a closed range (`2-5`).
pub fn parse_ms_level_range(arg: &str, mode: DataMode) -> anyhow::Result<MsLevelRange> {
    if let Some((lo, hi)) = arg.split_once('-') {
        Ok(MsLevelRange {
            min_level: lo.trim().parse()?,
            max_level: hi.trim().parse()?,
            mode,
        })
    } else {
        let level: i64 = arg.trim().parse()?;
        Ok(MsLevelRange {
            min_level: level,
            max_level: level,
            mode,
        })
    }
}

/// Peak-finding parameters (spec §4.C `params`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PeakFinderParams {
    pub min_snr: f64,
    pub fwhm: f64,
    pub baseline: f64,
    pub noise: f64,
    pub adaptive_baseline_and_noise: bool,
}

impl Default for PeakFinderParams {
    fn default() -> Self {
        PeakFinderParams {
            min_snr: 0.0,
            fwhm: 0.01,
            baseline: 0.0,
            noise: 1.0,
            adaptive_baseline_and_noise: true,
        }
    }
}

/// Top-level conversion configuration, covering every component in §4.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionConfig {
    pub input: String,
    pub output: String,
    pub bb_sizes: BBSizes,
    /// `N` in spec §4.F: default size of the MS1 sliding window per cycle.
    pub cycle_window: usize,
    pub no_loss: bool,
    pub is_dia: bool,
    pub nscans: Option<u64>,
    pub data_mode_overrides: Vec<MsLevelRange>,
    pub peak_finder: PeakFinderParams,
    /// Number of peak-picking worker threads (§5); `None` = one per
    /// hardware thread.
    pub worker_threads: Option<usize>,
}

impl ConversionConfig {
    pub fn new(input: impl Into<String>) -> Self {
        let input = input.into();
        let output = format!("{}.archive", input);
        ConversionConfig {
            input,
            output,
            bb_sizes: BBSizes::default(),
            cycle_window: 3,
            no_loss: false,
            is_dia: false,
            nscans: None,
            data_mode_overrides: Vec::new(),
            peak_finder: PeakFinderParams::default(),
            worker_threads: None,
        }
    }

    /// Data mode to use for a given ms-level, honoring overrides in the
    /// order they were supplied (first match wins), falling back to
    /// `Centroid`.
    pub fn data_mode_for(&self, ms_level: i64) -> DataMode {
        self.data_mode_overrides
            .iter()
            .find(|r| r.contains(ms_level))
            .map(|r| r.mode)
            .unwrap_or(DataMode::Centroid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_level() {
        let r = parse_ms_level_range("2", DataMode::Fitted).unwrap();
        assert_eq!(r.min_level, 2);
        assert_eq!(r.max_level, 2);
        assert!(r.contains(2));
        assert!(!r.contains(3));
    }

    #[test]
    fn parses_level_range() {
        let r = parse_ms_level_range("2-5", DataMode::Profile).unwrap();
        assert_eq!(r.min_level, 2);
        assert_eq!(r.max_level, 5);
        assert!(r.contains(4));
        assert!(!r.contains(6));
    }

    #[test]
    fn default_output_path_appends_archive_suffix() {
        let cfg = ConversionConfig::new("run1.raw");
        assert_eq!(cfg.output, "run1.raw.archive");
    }
}
