//! Centroid / Peak (spec §4.B)

use anyhow::{bail, Result};

use crate::model::MIN_HWHM;
use crate::peak::fitter::{fit, MAX_FIT_WINDOW};
use crate::peak::model::PeakSumResidual;

/// `2 * sqrt(2 * ln 2)`, converting a Gaussian sigma to a HWHM (spec §4.D).
const SIGMA_FACTOR: f64 = 2.3548200450309493;

/// A single (m/z, intensity, left-HWHM, right-HWHM) peak summary at a
/// given retention time (spec §3 Centroid).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Centroid {
    pub mz: f64,
    pub intensity: f32,
    pub left_hwhm: f32,
    pub right_hwhm: f32,
    pub rt: f32,
}

/// A contiguous window of raw `(mz, intensity)` samples bracketed by a
/// pair of local minima (or the data boundary), plus its originating
/// spectrum reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Peak {
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
    pub rt: f32,
    pub spectrum_id: i64,
}

impl Peak {
    pub fn new(mz: Vec<f64>, intensity: Vec<f32>, rt: f32, spectrum_id: i64) -> Self {
        Self {
            mz,
            intensity,
            rt,
            spectrum_id,
        }
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// Index of the maximum-intensity sample; fails on an empty window.
    pub fn apex_index(&self) -> Result<usize> {
        if self.intensity.is_empty() {
            bail!("apex_index called on an empty peak window");
        }
        Ok(self
            .intensity
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap())
    }

    /// Centroid per the rules of spec §4.B: three-point parabolic apex
    /// refinement when both flanks are present, degenerate fallbacks for
    /// windows of size 1 or 2.
    pub fn compute_centroid(&self) -> Result<Centroid> {
        let n = self.len();
        if n == 0 {
            bail!("compute_centroid called on an empty peak window");
        }

        let apex = self.apex_index()?;
        let apex_intensity = self.intensity[apex];

        if n == 1 {
            return Ok(Centroid {
                mz: self.mz[0],
                intensity: apex_intensity,
                left_hwhm: MIN_HWHM,
                right_hwhm: MIN_HWHM,
                rt: self.rt,
            });
        }

        if n == 2 {
            let other = if apex == 0 { 1 } else { 0 };
            let hwhm = ((self.mz[apex] - self.mz[other]).abs() as f32).max(MIN_HWHM);
            return Ok(Centroid {
                mz: self.mz[apex],
                intensity: apex_intensity,
                left_hwhm: hwhm,
                right_hwhm: hwhm,
                rt: self.rt,
            });
        }

        let has_left = apex > 0;
        let has_right = apex < n - 1;

        let mz = if has_left && has_right {
            gaussian_centroid_apex(
                self.mz[apex - 1],
                self.intensity[apex - 1],
                self.mz[apex],
                apex_intensity,
                self.mz[apex + 1],
                self.intensity[apex + 1],
            )
            .unwrap_or(self.mz[apex])
        } else {
            self.mz[apex]
        };

        let window_half_width = ((self.mz[n - 1] - self.mz[0]) as f32 / 2.0).max(MIN_HWHM);
        let half_max = apex_intensity / 2.0;

        let left_hwhm = interpolate_half_width_left(&self.mz, &self.intensity, apex, half_max)
            .map(|d| d as f32)
            .filter(|d| *d > 0.0)
            .unwrap_or(window_half_width)
            .max(MIN_HWHM);

        let right_hwhm = interpolate_half_width_right(&self.mz, &self.intensity, apex, half_max)
            .map(|d| d as f32)
            .filter(|d| *d > 0.0)
            .unwrap_or(window_half_width)
            .max(MIN_HWHM);

        Ok(Centroid {
            mz,
            intensity: apex_intensity,
            left_hwhm,
            right_hwhm,
            rt: self.rt,
        })
    }

    /// As `compute_centroid`, but the raw-derived estimate is refined by
    /// the non-linear least-squares solver (§4.D) over this window, one
    /// parameter at a time, per the independent acceptance rules: finite
    /// and positive, relative change under 50%, and (for the HWHMs) under
    /// the 100ppm cap. A parameter that fails any rule keeps its raw
    /// estimate; non-convergence or a singular Jacobian is recoverable
    /// (`FitFailed`, §7) and the whole raw centroid stands unchanged.
    pub fn compute_fitted_centroid(&self) -> Result<Centroid> {
        let raw = self.compute_centroid()?;

        // §4.D: windows of more than 10 parameters (here always 3, one
        // peak) are skipped, and a fit needs at least 3 samples.
        if self.len() > MAX_FIT_WINDOW || self.len() < 3 {
            return Ok(raw);
        }

        let residual = PeakSumResidual::new(vec![raw.mz]);
        let initial = vec![
            raw.intensity as f64,
            2.0 * raw.left_hwhm as f64 / SIGMA_FACTOR,
            2.0 * raw.right_hwhm as f64 / SIGMA_FACTOR,
        ];
        let ys: Vec<f64> = self.intensity.iter().map(|&v| v as f64).collect();

        let fit_result = match fit(&residual, &self.mz, &ys, initial) {
            Ok(r) => r,
            Err(_) => return Ok(raw),
        };

        let accept = |new: f64, old: f64| new.is_finite() && new > 0.0 && (new - old).abs() < 0.5 * old.abs();

        let mut fitted = raw;
        let amplitude = fit_result.params[0];
        if accept(amplitude, raw.intensity as f64) {
            fitted.intensity = amplitude as f32;
        }

        // Spec §4.D's literal 100ppm-cap formula: `mu / (100*mu) / 2`.
        let hwhm_cap = (raw.mz / (100.0 * raw.mz)) / 2.0;

        let left_hwhm = fit_result.params[1] * SIGMA_FACTOR / 2.0;
        if accept(left_hwhm, raw.left_hwhm as f64) && left_hwhm < hwhm_cap {
            fitted.left_hwhm = left_hwhm as f32;
        }

        let right_hwhm = fit_result.params[2] * SIGMA_FACTOR / 2.0;
        if accept(right_hwhm, raw.right_hwhm as f64) && right_hwhm < hwhm_cap {
            fitted.right_hwhm = right_hwhm as f32;
        }

        Ok(fitted)
    }
}

/// Three-point parabolic ("log-Gaussian") apex refinement over
/// `(apex-1, apex, apex+1)`: fit a parabola through the log-intensities
/// and return its vertex abscissa.
fn gaussian_centroid_apex(
    x1: f64,
    y1: f32,
    x2: f64,
    y2: f32,
    x3: f64,
    y3: f32,
) -> Option<f64> {
    let l1 = (y1.max(1e-9) as f64).ln();
    let l2 = (y2.max(1e-9) as f64).ln();
    let l3 = (y3.max(1e-9) as f64).ln();
    parabola_vertex_x(x1, l1, x2, l2, x3, l3)
}

/// Vertex abscissa of the parabola `y = a*x^2 + b*x + c` through three
/// (possibly unequally spaced) points, or `None` if they are collinear /
/// degenerate.
fn parabola_vertex_x(x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> Option<f64> {
    let denom = (x1 - x2) * (x1 - x3) * (x2 - x3);
    if denom.abs() < 1e-300 {
        return None;
    }
    let a = (x3 * (y2 - y1) + x2 * (y1 - y3) + x1 * (y3 - y2)) / denom;
    let b = (x3 * x3 * (y1 - y2) + x2 * x2 * (y3 - y1) + x1 * x1 * (y2 - y3)) / denom;
    if a.abs() < 1e-300 {
        return None;
    }
    Some(-b / (2.0 * a))
}

/// Linear interpolation of the m/z at half-maximum, walking left from the
/// apex. `None` if the left flank never drops below `half_max`.
fn interpolate_half_width_left(
    mz: &[f64],
    intensity: &[f32],
    apex: usize,
    half_max: f32,
) -> Option<f64> {
    for i in (0..apex).rev() {
        if intensity[i] <= half_max {
            let (x0, y0) = (mz[i], intensity[i]);
            let (x1, y1) = (mz[i + 1], intensity[i + 1]);
            if (y1 - y0).abs() < f32::EPSILON {
                return Some(mz[apex] - x0);
            }
            let frac = (half_max - y0) / (y1 - y0);
            let x_half = x0 as f64 + frac as f64 * (x1 - x0);
            return Some(mz[apex] - x_half);
        }
    }
    None
}

/// Linear interpolation of the m/z at half-maximum, walking right from
/// the apex. `None` if the right flank never drops below `half_max`.
fn interpolate_half_width_right(
    mz: &[f64],
    intensity: &[f32],
    apex: usize,
    half_max: f32,
) -> Option<f64> {
    for i in (apex + 1)..mz.len() {
        if intensity[i] <= half_max {
            let (x0, y0) = (mz[i - 1], intensity[i - 1]);
            let (x1, y1) = (mz[i], intensity[i]);
            if (y1 - y0).abs() < f32::EPSILON {
                return Some(x1 - mz[apex]);
            }
            let frac = (half_max - y0) / (y1 - y0);
            let x_half = x0 as f64 + frac as f64 * (x1 - x0);
            return Some(x_half - mz[apex]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_window_uses_platform_minimum_hwhm() {
        let peak = Peak::new(vec![100.2], vec![50.0], 1.0, 1);
        let c = peak.compute_centroid().unwrap();
        assert_eq!(c.mz, 100.2);
        assert_eq!(c.left_hwhm, MIN_HWHM);
        assert_eq!(c.right_hwhm, MIN_HWHM);
    }

    #[test]
    fn two_point_window_uses_apex_and_distance_as_hwhm() {
        let peak = Peak::new(vec![100.2, 100.4], vec![50.0, 10.0], 1.0, 1);
        let c = peak.compute_centroid().unwrap();
        assert_eq!(c.mz, 100.2);
        assert!((c.left_hwhm - 0.2).abs() < 1e-6);
        assert!((c.right_hwhm - 0.2).abs() < 1e-6);
    }

    #[test]
    fn three_peak_profile_scenario_1() {
        // spec §8 scenario 1: (100.1,10),(100.2,50),(100.3,10) -> apex near 100.2
        let peak = Peak::new(
            vec![100.1, 100.2, 100.3],
            vec![10.0, 50.0, 10.0],
            1.0,
            1,
        );
        let c = peak.compute_centroid().unwrap();
        assert!((c.mz - 100.2).abs() < 1e-4);
        assert_eq!(c.intensity, 50.0);
        // Exact linear interpolation between (100.1,10) and the apex
        // (100.2,50) crosses half-max (25) at 100.1375, i.e. 0.0625 from
        // the apex on both (symmetric) flanks.
        assert!((c.left_hwhm - 0.0625).abs() < 1e-6);
        assert!((c.right_hwhm - 0.0625).abs() < 1e-6);
    }

    #[test]
    fn apex_index_fails_on_empty_window() {
        let peak = Peak::new(vec![], vec![], 0.0, 1);
        assert!(peak.apex_index().is_err());
    }
}
