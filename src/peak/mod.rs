//! Peak-picking and centroiding (spec §4 components A-D).

pub mod centroid;
pub mod finder;
pub mod fitter;
pub mod model;

pub use centroid::{Centroid, Peak};
pub use finder::{
    algorithm_for_vendor, find_peaks, pick_and_centroid, ExternalPeakPicker, PeakFinderAlgorithm,
    VendorTag,
};
pub use model::{PeakShape, PeakSumResidual};
