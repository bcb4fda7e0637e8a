// Utility for unit and integration tests
pub use crate::conf::TEST_CONFIG_FILE;
use crate::photometry::{Band, Morphology, PerBand, PhotometricRecord};

use flate2::{write::GzEncoder, Compression};
use rand::Rng;
use std::io::Write;
use std::path::Path;

/// Corrected magnitudes of a faint blue emission-line galaxy that passes
/// every cut of the default policy.
pub const ELG_MAGS: PerBand<f64> = PerBand {
    g: 23.6,
    r: 23.5,
    i: 23.2,
    z: 23.0,
    y: 22.9,
};

/// Fixed-method absorption values written next to [`ELG_MAGS`].
pub const ELG_ABSORPTION: PerBand<f64> = PerBand {
    g: 0.05,
    r: 0.04,
    i: 0.03,
    z: 0.02,
    y: 0.02,
};

pub fn elg_record(object_id: i64) -> PhotometricRecord {
    let mut record = PhotometricRecord::new(object_id, 150.1, 2.2, 9813, 42);
    record.cmodel_mag = ELG_MAGS.map(|band, mag| mag + ELG_ABSORPTION[band]);
    record.cmodel_mag_err = PerBand {
        g: 0.04,
        r: 0.05,
        i: 0.06,
        z: 0.07,
        y: 0.1,
    };
    record.absorption = Some(ELG_ABSORPTION);
    record.corrected_mag = Some(ELG_MAGS);
    record.morphology = Morphology {
        cmodel_mag: 23.2,
        cmodel_flag: false,
        psf_mag: 23.6,
        psf_flag: false,
    };
    record.lsb_i_mag = 24.0;
    record
}

pub fn random_point(object_id: i64, input_count: PerBand<u32>) -> PhotometricRecord {
    let mut record = PhotometricRecord::new(object_id, 30.5, -4.25, 9100, 3);
    record.input_count = Some(input_count);
    record
}

/// PDR3 header with fixed-method absorption columns.
pub const ELG_CSV_HEADER: &str = "object_id,i_ra,i_dec,tract,patch,\
g_cmodel_mag,r_cmodel_mag,i_cmodel_mag,z_cmodel_mag,y_cmodel_mag,\
g_cmodel_mag_err,r_cmodel_mag_err,i_cmodel_mag_err,z_cmodel_mag_err,y_cmodel_mag_err,\
g_cmodel_flag,r_cmodel_flag,i_cmodel_flag,z_cmodel_flag,y_cmodel_flag,\
a_g,a_r,a_i,a_z,a_y,\
meas_i_cmodel_mag,meas_i_cmodel_flag,meas_i_psfflux_mag,meas_i_psfflux_flag,\
i_mask_brightstar_halo,i_mask_brightstar_ghost,i_mask_brightstar_blooming,\
deblend_skipped,i_apertureflux_lsb_mag,i_apertureflux_lsb_flag";

/// One PDR3 CSV row per id, each describing [`elg_record`] before correction.
pub fn elg_csv(object_ids: &[i64]) -> String {
    let mut csv = format!("{}\n", ELG_CSV_HEADER);
    for &object_id in object_ids {
        csv.push_str(&elg_csv_row(&elg_record(object_id)));
        csv.push('\n');
    }
    csv
}

/// Serialize a record as a PDR3 fixed-method row.
pub fn elg_csv_row(record: &PhotometricRecord) -> String {
    let join_f64 = |values: &PerBand<f64>| {
        Band::ALL
            .iter()
            .map(|&band| values[band].to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    let join_bool = |values: &PerBand<bool>| {
        Band::ALL
            .iter()
            .map(|&band| values[band].to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    let absorption = record.absorption.unwrap_or(PerBand::splat(f64::NAN));
    let m = record.morphology;
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        record.object_id,
        record.ra,
        record.dec,
        record.tract,
        record.patch,
        join_f64(&record.cmodel_mag),
        join_f64(&record.cmodel_mag_err),
        join_bool(&record.cmodel_flag),
        join_f64(&absorption),
        m.cmodel_mag,
        m.cmodel_flag,
        m.psf_mag,
        m.psf_flag,
        record.mask.halo,
        record.mask.ghost,
        record.mask.blooming,
        record.deblend_skipped,
        record.lsb_i_mag,
        record.lsb_i_flag,
    )
}

/// Write a gzip-compressed zero-point table with the given rows.
pub fn write_zeropoint_table(
    path: &Path,
    rows: &[(i32, i32, PerBand<f64>)],
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    writeln!(encoder, "tract,patch,g_offset,r_offset,i_offset,z_offset,y_offset")?;
    for (tract, patch, offsets) in rows {
        writeln!(
            encoder,
            "{},{},{},{},{},{},{}",
            tract, patch, offsets.g, offsets.r, offsets.i, offsets.z, offsets.y
        )?;
    }
    encoder.finish()?;
    Ok(())
}

/// Produces corrected records with random photometry and flags, for
/// properties that must hold on any batch.
pub struct RecordRandomizer {
    nan_fraction: f64,
    flag_fraction: f64,
}

impl Default for RecordRandomizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordRandomizer {
    pub fn new() -> Self {
        RecordRandomizer {
            nan_fraction: 0.0,
            flag_fraction: 0.0,
        }
    }

    /// Probability that a corrected magnitude is NaN.
    pub fn nan_fraction(mut self, fraction: f64) -> Self {
        self.nan_fraction = fraction;
        self
    }

    /// Probability that each boolean flag is set.
    pub fn flag_fraction(mut self, fraction: f64) -> Self {
        self.flag_fraction = fraction;
        self
    }

    pub fn get(&self, object_id: i64) -> PhotometricRecord {
        let mut rng = rand::rng();
        let mut record = PhotometricRecord::new(
            object_id,
            rng.random_range(0.0..360.0),
            rng.random_range(-90.0..90.0),
            rng.random_range(0..20000),
            rng.random_range(0..81),
        );
        let mut mag = || {
            if rng.random_bool(self.nan_fraction) {
                f64::NAN
            } else {
                rng.random_range(20.0..26.0)
            }
        };
        let corrected = PerBand::from_fn(|_| mag());
        record.cmodel_mag = corrected;
        record.corrected_mag = Some(corrected);
        record.cmodel_mag_err = PerBand::from_fn(|_| rng.random_range(0.0..0.3));
        record.cmodel_flag = PerBand::from_fn(|_| rng.random_bool(self.flag_fraction));
        let cmodel_mag = corrected.i;
        record.morphology = Morphology {
            cmodel_mag,
            cmodel_flag: rng.random_bool(self.flag_fraction),
            psf_mag: cmodel_mag + rng.random_range(-0.5..1.0),
            psf_flag: rng.random_bool(self.flag_fraction),
        };
        record.mask.halo = rng.random_bool(self.flag_fraction);
        record.mask.ghost = rng.random_bool(self.flag_fraction);
        record.mask.blooming = rng.random_bool(self.flag_fraction);
        record.deblend_skipped = rng.random_bool(self.flag_fraction);
        record.lsb_i_mag = rng.random_range(22.0..27.0);
        record.lsb_i_flag = rng.random_bool(self.flag_fraction);
        record
    }

    pub fn batch(&self, n: usize) -> Vec<PhotometricRecord> {
        (0..n as i64).map(|object_id| self.get(object_id)).collect()
    }
}
