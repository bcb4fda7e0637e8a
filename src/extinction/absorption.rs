use crate::photometry::{Band, PerBand};

use serde::{Deserialize, Serialize};

/// Dust absorption per unit reddening, A_band / E(B-V), for each band.
///
/// The defaults are the HSC PDR3 coefficients, the same ones the catalog
/// service uses to derive its `a_{band}` columns from `extinction_bv`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AbsorptionModel {
    coefficients: PerBand<f64>,
}

impl AbsorptionModel {
    pub const HSC: AbsorptionModel = AbsorptionModel {
        coefficients: PerBand {
            g: 3.24,
            r: 2.276,
            i: 1.633,
            z: 1.263,
            y: 1.075,
        },
    };

    pub fn new(coefficients: PerBand<f64>) -> Self {
        AbsorptionModel { coefficients }
    }

    pub fn coefficient(&self, band: Band) -> f64 {
        self.coefficients[band]
    }

    /// Absorption in every band for a reddening `ebv`.
    pub fn absorption(&self, ebv: f64) -> PerBand<f64> {
        self.coefficients.map(|_, coeff| coeff * ebv)
    }
}

impl Default for AbsorptionModel {
    fn default() -> Self {
        AbsorptionModel::HSC
    }
}
