use crate::catalog::base::{CatalogAdapter, SchemaColumns};
use crate::utils::enums::SchemaVersion;

pub const PDR3_COLUMNS: SchemaColumns = SchemaColumns {
    object_id: "object_id",
    ra: "i_ra",
    dec: "i_dec",
    tract: "tract",
    patch: "patch",
    mag: "{band}_cmodel_mag",
    mag_err: "{band}_cmodel_mag_err",
    flux_flag: "{band}_cmodel_flag",
    absorption: "a_{band}",
    morph_cmodel_mag: "meas_i_cmodel_mag",
    morph_cmodel_flag: "meas_i_cmodel_flag",
    morph_psf_mag: "meas_i_psfflux_mag",
    morph_psf_flag: "meas_i_psfflux_flag",
    mask_halo: "i_mask_brightstar_halo",
    mask_ghost: "i_mask_brightstar_ghost",
    mask_blooming: "i_mask_brightstar_blooming",
    deblend_skipped: "deblend_skipped",
    lsb_mag: "i_apertureflux_lsb_mag",
    lsb_flag: "i_apertureflux_lsb_flag",
};

/// PDR3 wide forced catalogs. Morphology comes from the `meas` table and
/// positions from the i-band centroid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pdr3Adapter;

impl CatalogAdapter for Pdr3Adapter {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::Pdr3
    }

    fn columns(&self) -> &SchemaColumns {
        &PDR3_COLUMNS
    }
}
