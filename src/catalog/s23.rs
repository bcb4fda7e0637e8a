use crate::catalog::base::{CatalogAdapter, SchemaColumns};
use crate::utils::enums::SchemaVersion;

pub const S23_COLUMNS: SchemaColumns = SchemaColumns {
    object_id: "object_id",
    ra: "ra",
    dec: "dec",
    tract: "tract",
    patch: "patch",
    mag: "{band}_cmodel_mag",
    mag_err: "{band}_cmodel_magerr",
    flux_flag: "{band}_cmodel_flag",
    absorption: "a_{band}",
    morph_cmodel_mag: "i_cmodel_mag",
    morph_cmodel_flag: "i_cmodel_flag",
    morph_psf_mag: "i_psfflux_mag",
    morph_psf_flag: "i_psfflux_flag",
    mask_halo: "i_mask_brightstar_halo",
    mask_ghost: "i_mask_brightstar_ghost",
    mask_blooming: "i_mask_brightstar_blooming",
    deblend_skipped: "deblend_skipped",
    lsb_mag: "i_apertureflux_lsb_mag",
    lsb_flag: "i_apertureflux_lsb_flag",
};

/// S23 tract files, where morphology is measured on the forced photometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct S23Adapter;

impl CatalogAdapter for S23Adapter {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::S23
    }

    fn columns(&self) -> &SchemaColumns {
        &S23_COLUMNS
    }
}
