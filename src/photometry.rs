use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// HSC broad-band filters, in wavelength order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Band {
    #[serde(rename = "g")]
    G,
    #[serde(rename = "r")]
    R,
    #[serde(rename = "i")]
    I,
    #[serde(rename = "z")]
    Z,
    #[serde(rename = "y")]
    Y,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::G, Band::R, Band::I, Band::Z, Band::Y];

    /// The bands the selection cuts rely on (y is carried but never cut on).
    pub const SELECTION: [Band; 4] = [Band::G, Band::R, Band::I, Band::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::G => "g",
            Band::R => "r",
            Band::I => "i",
            Band::Z => "z",
            Band::Y => "y",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One value per band, indexable by [`Band`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct PerBand<T> {
    pub g: T,
    pub r: T,
    pub i: T,
    pub z: T,
    pub y: T,
}

impl<T: Copy> PerBand<T> {
    pub fn splat(value: T) -> Self {
        PerBand {
            g: value,
            r: value,
            i: value,
            z: value,
            y: value,
        }
    }
}

impl<T> PerBand<T> {
    pub fn from_fn(mut f: impl FnMut(Band) -> T) -> Self {
        PerBand {
            g: f(Band::G),
            r: f(Band::R),
            i: f(Band::I),
            z: f(Band::Z),
            y: f(Band::Y),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Band, &T) -> U) -> PerBand<U> {
        PerBand::from_fn(|band| f(band, &self[band]))
    }

    /// Fallible construction, stopping at the first band that errors.
    pub fn try_from_fn<E>(mut f: impl FnMut(Band) -> Result<T, E>) -> Result<Self, E> {
        Ok(PerBand {
            g: f(Band::G)?,
            r: f(Band::R)?,
            i: f(Band::I)?,
            z: f(Band::Z)?,
            y: f(Band::Y)?,
        })
    }
}

impl<T> Index<Band> for PerBand<T> {
    type Output = T;

    fn index(&self, band: Band) -> &T {
        match band {
            Band::G => &self.g,
            Band::R => &self.r,
            Band::I => &self.i,
            Band::Z => &self.z,
            Band::Y => &self.y,
        }
    }
}

impl<T> IndexMut<Band> for PerBand<T> {
    fn index_mut(&mut self, band: Band) -> &mut T {
        match band {
            Band::G => &mut self.g,
            Band::R => &mut self.r,
            Band::I => &mut self.i,
            Band::Z => &mut self.z,
            Band::Y => &mut self.y,
        }
    }
}

/// Bright-star mask bits from the i-band mask planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BrightStarMask {
    pub halo: bool,
    pub ghost: bool,
    pub blooming: bool,
}

/// i-band measurements used for star-galaxy separation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Morphology {
    pub cmodel_mag: f64,
    pub cmodel_flag: bool,
    pub psf_mag: f64,
    pub psf_flag: bool,
}

impl Default for Morphology {
    fn default() -> Self {
        Morphology {
            cmodel_mag: f64::NAN,
            cmodel_flag: false,
            psf_mag: f64::NAN,
            psf_flag: false,
        }
    }
}

/// Canonical per-object photometry, independent of the catalog schema it was
/// read from.
///
/// `corrected_mag` stays `None` until an
/// [`ExtinctionCorrector`](crate::extinction::ExtinctionCorrector) has run over
/// the record. Filters read a missing correction as NaN, so uncorrected records
/// can never pass a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotometricRecord {
    pub object_id: i64,
    pub ra: f64,
    pub dec: f64,
    pub tract: i32,
    pub patch: i32,
    pub cmodel_mag: PerBand<f64>,
    pub cmodel_mag_err: PerBand<f64>,
    /// Catalog-supplied dust absorption, only present for the fixed method.
    pub absorption: Option<PerBand<f64>>,
    pub corrected_mag: Option<PerBand<f64>>,
    /// Set when the CModel flux in that band is unavailable.
    pub cmodel_flag: PerBand<bool>,
    pub morphology: Morphology,
    pub mask: BrightStarMask,
    /// Number of visits covering the position, random catalogs only.
    pub input_count: Option<PerBand<u32>>,
    pub deblend_skipped: bool,
    pub lsb_i_mag: f64,
    pub lsb_i_flag: bool,
}

impl PhotometricRecord {
    /// An empty record at a position, every measurement missing.
    pub fn new(object_id: i64, ra: f64, dec: f64, tract: i32, patch: i32) -> Self {
        PhotometricRecord {
            object_id,
            ra,
            dec,
            tract,
            patch,
            cmodel_mag: PerBand::splat(f64::NAN),
            cmodel_mag_err: PerBand::splat(f64::NAN),
            absorption: None,
            corrected_mag: None,
            cmodel_flag: PerBand::splat(false),
            morphology: Morphology::default(),
            mask: BrightStarMask::default(),
            input_count: None,
            deblend_skipped: false,
            lsb_i_mag: f64::NAN,
            lsb_i_flag: false,
        }
    }

    /// Corrected magnitude in `band`, NaN when not yet corrected.
    pub fn mag(&self, band: Band) -> f64 {
        self.corrected_mag.map_or(f64::NAN, |mags| mags[band])
    }

    pub fn color(&self, blue: Band, red: Band) -> f64 {
        self.mag(blue) - self.mag(red)
    }

    pub fn is_corrected(&self) -> bool {
        self.corrected_mag.is_some()
    }
}
