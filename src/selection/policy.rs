use crate::photometry::{Band, PerBand};
use crate::utils::enums::MaskCombinator;

use serde::{Deserialize, Serialize};

/// Minimum number of visits a random point needs in each selection band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MinInputCount {
    pub g: u32,
    pub r: u32,
    pub i: u32,
    pub z: u32,
}

impl Default for MinInputCount {
    fn default() -> Self {
        MinInputCount {
            g: 4,
            r: 4,
            i: 6,
            z: 6,
        }
    }
}

impl MinInputCount {
    /// True when every g/r/i/z count reaches its minimum.
    pub fn is_met(&self, counts: &PerBand<u32>) -> bool {
        counts[Band::G] >= self.g
            && counts[Band::R] >= self.r
            && counts[Band::I] >= self.i
            && counts[Band::Z] >= self.z
    }
}

/// A named, immutable set of selection thresholds.
///
/// Thresholds and the mask combinator changed between processing eras; each
/// era is one value of this type rather than a branch in the filters.
/// Missing keys in a config file take the current defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectionPolicy {
    pub name: String,
    pub star_galaxy_cut: f64,
    /// Bright limit of the i-band window (exclusive).
    pub magnitude_cut: f64,
    /// Faint limit of the i-band window (exclusive).
    pub magnitude_ceiling: f64,
    pub g_r_cut: f64,
    pub color_slope: f64,
    pub color_intercept: f64,
    pub mask_combinator: MaskCombinator,
    pub lsb_mag_ceiling: f64,
    pub extreme_color_floor: f64,
    pub g_err_slope: f64,
    pub g_err_intercept: f64,
    pub min_input_count: MinInputCount,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy {
            name: "pfs-cosmo-2025".to_string(),
            star_galaxy_cut: -0.15,
            magnitude_cut: 22.5,
            magnitude_ceiling: 24.0,
            g_r_cut: 0.15,
            color_slope: 2.0,
            color_intercept: -0.15,
            mask_combinator: MaskCombinator::Any,
            lsb_mag_ceiling: 25.5,
            extreme_color_floor: -1.0,
            g_err_slope: 0.05,
            g_err_intercept: -1.1,
            min_input_count: MinInputCount::default(),
        }
    }
}

impl SelectionPolicy {
    /// g-band error ceiling at a given g magnitude.
    pub fn g_err_ceiling(&self, mag_g: f64) -> f64 {
        self.g_err_slope * mag_g + self.g_err_intercept
    }

    /// Lower edge of the red branch of the color box at a given g-r.
    pub fn red_branch_floor(&self, g_r: f64) -> f64 {
        self.color_slope * g_r - self.color_intercept
    }
}
