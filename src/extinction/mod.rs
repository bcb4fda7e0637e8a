//! Galactic extinction and photometric zero-point correction.
mod absorption;
mod corrector;
mod dustmap;
mod zeropoint;

pub use absorption::AbsorptionModel;
pub use corrector::{CorrectionSettings, ExtinctionCorrector, ExtinctionError};
pub use dustmap::{DustMap, DustMapError, DustMapPixel, MAX_NSIDE};
pub use zeropoint::{ZeropointError, ZeropointTable};
