//! The four selection stages. Each takes a whole batch of corrected records
//! and returns one boolean per record; NaN magnitudes compare false and so
//! never pass a cut.

use crate::photometry::{Band, PhotometricRecord};
use crate::selection::SelectionPolicy;
use crate::utils::enums::MaskCombinator;

pub fn is_masked(record: &PhotometricRecord, combinator: MaskCombinator) -> bool {
    let mask = record.mask;
    combinator.combine(mask.halo, mask.ghost, mask.blooming)
}

pub fn passes_quality(record: &PhotometricRecord, policy: &SelectionPolicy) -> bool {
    let finite = Band::SELECTION
        .iter()
        .all(|&band| record.mag(band).is_finite());
    let unflagged = Band::SELECTION
        .iter()
        .all(|&band| !record.cmodel_flag[band]);
    let mag_g = record.mag(Band::G);
    let precise = record.cmodel_mag_err[Band::G] < policy.g_err_ceiling(mag_g);
    let lsb = record.lsb_i_mag <= policy.lsb_mag_ceiling && !record.lsb_i_flag;
    let sane_colors = record.color(Band::G, Band::R) >= policy.extreme_color_floor
        && record.color(Band::I, Band::Z) >= policy.extreme_color_floor;

    finite && unflagged && precise && !record.deblend_skipped && lsb && sane_colors
}

pub fn is_extended(record: &PhotometricRecord, threshold: f64) -> bool {
    let m = record.morphology;
    m.cmodel_mag - m.psf_mag < threshold && !m.cmodel_flag && !m.psf_flag
}

pub fn in_color_box(
    record: &PhotometricRecord,
    magnitude_cut: f64,
    magnitude_ceiling: f64,
    g_r_cut: f64,
    color_slope: f64,
    color_intercept: f64,
) -> bool {
    let i = record.mag(Band::I);
    let g_r = record.color(Band::G, Band::R);
    let i_z = record.color(Band::I, Band::Z);
    let in_window = magnitude_cut < i && i < magnitude_ceiling;
    let blue_branch = g_r < g_r_cut;
    let red_branch = i_z > color_slope * g_r - color_intercept;
    in_window && (blue_branch || red_branch)
}

/// True for objects under a bright-star mask.
pub fn masking(records: &[PhotometricRecord], combinator: MaskCombinator) -> Vec<bool> {
    records
        .iter()
        .map(|record| is_masked(record, combinator))
        .collect()
}

pub fn quality_cuts(records: &[PhotometricRecord], policy: &SelectionPolicy) -> Vec<bool> {
    records
        .iter()
        .map(|record| passes_quality(record, policy))
        .collect()
}

/// True for resolved sources: the CModel magnitude is brighter than the PSF
/// magnitude by more than `-threshold`.
pub fn star_galaxy(records: &[PhotometricRecord], threshold: f64) -> Vec<bool> {
    records
        .iter()
        .map(|record| is_extended(record, threshold))
        .collect()
}

/// Two-branch emission-line galaxy box in i magnitude and g-r / i-z colors.
pub fn color_cut(
    records: &[PhotometricRecord],
    magnitude_cut: f64,
    magnitude_ceiling: f64,
    g_r_cut: f64,
    color_slope: f64,
    color_intercept: f64,
) -> Vec<bool> {
    records
        .iter()
        .map(|record| {
            in_color_box(
                record,
                magnitude_cut,
                magnitude_ceiling,
                g_r_cut,
                color_slope,
                color_intercept,
            )
        })
        .collect()
}

/// Per-stage results of one selection run, all computed from the same
/// corrected snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionStages {
    pub in_mask: Vec<bool>,
    pub passes_quality: Vec<bool>,
    pub is_extended: Vec<bool>,
    pub in_color_box: Vec<bool>,
}

impl SelectionStages {
    pub fn evaluate(records: &[PhotometricRecord], policy: &SelectionPolicy) -> Self {
        SelectionStages {
            in_mask: masking(records, policy.mask_combinator),
            passes_quality: quality_cuts(records, policy),
            is_extended: star_galaxy(records, policy.star_galaxy_cut),
            in_color_box: color_cut(
                records,
                policy.magnitude_cut,
                policy.magnitude_ceiling,
                policy.g_r_cut,
                policy.color_slope,
                policy.color_intercept,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.in_mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_mask.is_empty()
    }

    /// `!in_mask && passes_quality && is_extended && in_color_box`.
    pub fn combined(&self) -> Vec<bool> {
        (0..self.len())
            .map(|k| {
                !self.in_mask[k]
                    && self.passes_quality[k]
                    && self.is_extended[k]
                    && self.in_color_box[k]
            })
            .collect()
    }
}

pub fn select(records: &[PhotometricRecord], policy: &SelectionPolicy) -> Vec<bool> {
    SelectionStages::evaluate(records, policy).combined()
}

/// Keep random points with full coverage that no bright-star mask touches.
/// Points without coverage counters are dropped.
pub fn select_randoms(records: &[PhotometricRecord], policy: &SelectionPolicy) -> Vec<bool> {
    records
        .iter()
        .map(|record| {
            let covered = record
                .input_count
                .is_some_and(|counts| policy.min_input_count.is_met(&counts));
            covered && !is_masked(record, policy.mask_combinator)
        })
        .collect()
}
