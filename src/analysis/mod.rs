//! I-V curve analysis
//!
//! Figures of merit (Isc, Voc, MPP, fill factor), boundary slopes and a
//! curvature count that flags the steps partial shading leaves on a curve.

pub mod extractor;
pub mod numeric;
pub mod savitzky_golay;

pub use extractor::{CurveFeatures, CurveParameters, ParameterExtractor, FEATURE_NAMES};
pub use savitzky_golay::{SavitzkyGolay, SgError};
