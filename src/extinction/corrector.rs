use crate::conf::ConfigError;
use crate::extinction::{AbsorptionModel, DustMap, ZeropointTable};
use crate::photometry::{PerBand, PhotometricRecord};
use crate::utils::enums::DustExtinction;

use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(thiserror::Error, Debug)]
pub enum ExtinctionError {
    #[error("object {0} has no absorption values for the fixed extinction method")]
    MissingAbsorption(i64),
}

/// Settings that decide how magnitudes are corrected.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionSettings {
    pub method: DustExtinction,
    /// Processing release the caller expects the zero-point table to match.
    pub release: String,
    pub apply_zeropoint: bool,
}

/// Turns raw CModel magnitudes into extinction- and zero-point-corrected
/// magnitudes.
///
/// The lookup tables are shared read-only, so one corrector (or clones of it)
/// can serve every tract worker at once.
#[derive(Debug, Clone)]
pub struct ExtinctionCorrector {
    source: AbsorptionSource,
    absorption: AbsorptionModel,
    zeropoint: Option<Arc<ZeropointTable>>,
}

#[derive(Debug, Clone)]
enum AbsorptionSource {
    Catalog,
    SkyMap(Arc<DustMap>),
}

impl ExtinctionCorrector {
    /// Validate the settings against the loaded tables.
    ///
    /// Fails when the sky-map method has no dust map, or when zero-point
    /// correction is requested without a table or with a table calibrated for
    /// another release. Tables that the settings do not need are dropped.
    pub fn new(
        settings: &CorrectionSettings,
        absorption: AbsorptionModel,
        zeropoint: Option<Arc<ZeropointTable>>,
        dustmap: Option<Arc<DustMap>>,
    ) -> Result<Self, ConfigError> {
        let source = match settings.method {
            DustExtinction::SkyMap => {
                AbsorptionSource::SkyMap(dustmap.ok_or(ConfigError::MissingDustMap)?)
            }
            DustExtinction::Fixed => AbsorptionSource::Catalog,
        };
        let zeropoint = if settings.apply_zeropoint {
            let table = zeropoint.ok_or(ConfigError::MissingZeropointTable)?;
            if table.release() != settings.release {
                return Err(ConfigError::UnsupportedRelease {
                    requested: settings.release.clone(),
                    available: table.release().to_string(),
                });
            }
            Some(table)
        } else {
            None
        };
        Ok(ExtinctionCorrector {
            source,
            absorption,
            zeropoint,
        })
    }

    pub fn method(&self) -> DustExtinction {
        match self.source {
            AbsorptionSource::Catalog => DustExtinction::Fixed,
            AbsorptionSource::SkyMap(_) => DustExtinction::SkyMap,
        }
    }

    pub fn applies_zeropoint(&self) -> bool {
        self.zeropoint.is_some()
    }

    /// Corrected magnitudes for one record. Only the raw magnitudes are read,
    /// so repeated calls give identical results.
    pub fn corrected(&self, record: &PhotometricRecord) -> Result<PerBand<f64>, ExtinctionError> {
        let zeropoint = self
            .zeropoint
            .as_ref()
            .map(|table| table.lookup(record.tract, record.patch));

        let corrected = match &self.source {
            AbsorptionSource::Catalog => {
                let absorption = record
                    .absorption
                    .ok_or(ExtinctionError::MissingAbsorption(record.object_id))?;
                record.cmodel_mag.map(|band, mag| {
                    let offset = zeropoint.map_or(0.0, |zp| zp[band]);
                    mag - absorption[band] - offset
                })
            }
            AbsorptionSource::SkyMap(dustmap) => {
                let reddening = dustmap.reddening(record.ra, record.dec);
                record.cmodel_mag.map(|band, mag| {
                    let coefficient = self.absorption.coefficient(band);
                    let absorption = coefficient * reddening.ebv;
                    // the offsets were measured on magnitudes corrected with
                    // the calibration reddening
                    let offset = zeropoint.map_or(0.0, |zp| {
                        zp[band] + coefficient * (reddening.ebv_calibration - reddening.ebv)
                    });
                    mag - absorption - offset
                })
            }
        };
        Ok(corrected)
    }

    /// Fill in `corrected_mag` for every record of a batch.
    ///
    /// Either every record is corrected or, on error, none is.
    #[instrument(skip_all, fields(method = %self.method(), records = records.len()), err)]
    pub fn apply(&self, records: &mut [PhotometricRecord]) -> Result<(), ExtinctionError> {
        let corrected = records
            .iter()
            .map(|record| self.corrected(record))
            .collect::<Result<Vec<_>, _>>()?;

        let mut uncalibrated = 0usize;
        for (record, mags) in records.iter_mut().zip(corrected) {
            if mags.g.is_nan() && !record.cmodel_mag.g.is_nan() {
                uncalibrated += 1;
            }
            record.corrected_mag = Some(mags);
        }
        if uncalibrated > 0 {
            info!(uncalibrated, "records left without a valid correction");
        }
        debug!("corrected magnitudes");
        Ok(())
    }
}
