use crate::utils::enums::PixelOrdering;
use crate::utils::io::{csv_reader, open_csv};

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument};

#[derive(thiserror::Error, Debug)]
pub enum DustMapError {
    #[error("failed to open dust map")]
    Io(#[from] std::io::Error),
    #[error("failed to parse dust map")]
    Csv(#[from] csv::Error),
    #[error("nside must be a power of 2 no larger than 2^29, got {0}")]
    InvalidNside(u32),
    #[error("pixel {pixel} out of range for nside {nside}")]
    PixelOutOfRange { pixel: u64, nside: u32 },
    #[error("duplicate dust map pixel {0}")]
    DuplicatePixel(u64),
}

/// Largest resolution a HEALPix index can address (depth 29).
pub const MAX_NSIDE: u32 = 1 << 29;

/// The two reddening estimates stored for one sky pixel.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DustMapPixel {
    /// E(B-V) used to correct magnitudes.
    pub ebv: f64,
    /// E(B-V) the zero-point offsets were derived against.
    pub ebv_calibration: f64,
}

impl DustMapPixel {
    pub const MISSING: DustMapPixel = DustMapPixel {
        ebv: f64::NAN,
        ebv_calibration: f64::NAN,
    };
}

#[derive(Debug, Deserialize)]
struct DustMapRow {
    hpix: u64,
    ebv: f64,
    ebv_calibration: f64,
}

/// Reddening values keyed by HEALPix pixel at a fixed resolution.
#[derive(Debug, Clone)]
pub struct DustMap {
    nside: u32,
    ordering: PixelOrdering,
    pixels: HashMap<u64, DustMapPixel>,
}

impl DustMap {
    pub fn new(
        nside: u32,
        ordering: PixelOrdering,
        pixels: impl IntoIterator<Item = (u64, DustMapPixel)>,
    ) -> Result<Self, DustMapError> {
        if nside == 0 || !nside.is_power_of_two() || nside > MAX_NSIDE {
            return Err(DustMapError::InvalidNside(nside));
        }
        let npix = 12 * (nside as u64) * (nside as u64);
        let mut map = HashMap::new();
        for (pixel, value) in pixels {
            if pixel >= npix {
                return Err(DustMapError::PixelOutOfRange { pixel, nside });
            }
            if map.insert(pixel, value).is_some() {
                return Err(DustMapError::DuplicatePixel(pixel));
            }
        }
        Ok(DustMap {
            nside,
            ordering,
            pixels: map,
        })
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display(), nside = nside))]
    pub fn from_path(
        path: impl AsRef<Path>,
        nside: u32,
        ordering: PixelOrdering,
    ) -> Result<Self, DustMapError> {
        let reader = open_csv(path.as_ref())?;
        let map = Self::from_csv(reader, nside, ordering)?;
        info!(pixels = map.len(), "loaded dust map");
        Ok(map)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        nside: u32,
        ordering: PixelOrdering,
    ) -> Result<Self, DustMapError> {
        Self::from_csv(csv_reader(reader), nside, ordering)
    }

    fn from_csv<R: Read>(
        mut reader: csv::Reader<R>,
        nside: u32,
        ordering: PixelOrdering,
    ) -> Result<Self, DustMapError> {
        let rows = reader
            .deserialize::<DustMapRow>()
            .map(|row| {
                row.map(|row| {
                    (
                        row.hpix,
                        DustMapPixel {
                            ebv: row.ebv,
                            ebv_calibration: row.ebv_calibration,
                        },
                    )
                })
            })
            .collect::<Result<Vec<_>, csv::Error>>()?;
        Self::new(nside, ordering, rows)
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    pub fn ordering(&self) -> PixelOrdering {
        self.ordering
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// HEALPix index of a position in degrees, `None` for positions off the
    /// sphere (non-finite or |dec| > 90).
    pub fn pixel_index(&self, ra: f64, dec: f64) -> Option<u64> {
        if !ra.is_finite() || !dec.is_finite() || dec.abs() > 90.0 {
            return None;
        }
        let lon = ra.rem_euclid(360.0).to_radians();
        let lat = dec.to_radians();
        let pixel = match self.ordering {
            PixelOrdering::Nested => {
                // exact depth from a power-of-2 nside
                let depth = self.nside.trailing_zeros() as u8;
                cdshealpix::nested::hash(depth, lon, lat)
            }
            PixelOrdering::Ring => cdshealpix::ring::hash(self.nside, lon, lat),
        };
        Some(pixel)
    }

    pub fn get(&self, pixel: u64) -> Option<&DustMapPixel> {
        self.pixels.get(&pixel)
    }

    /// Reddening at a sky position; [`DustMapPixel::MISSING`] when the
    /// position falls outside the map footprint.
    pub fn reddening(&self, ra: f64, dec: f64) -> DustMapPixel {
        self.pixel_index(ra, dec)
            .and_then(|pixel| self.get(pixel))
            .copied()
            .unwrap_or(DustMapPixel::MISSING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_pixels() -> Vec<(u64, DustMapPixel)> {
        Vec::new()
    }

    #[test]
    fn test_rejects_bad_nside() {
        assert!(matches!(
            DustMap::new(500, PixelOrdering::Ring, no_pixels()),
            Err(DustMapError::InvalidNside(500))
        ));
        assert!(matches!(
            DustMap::new(0, PixelOrdering::Ring, no_pixels()),
            Err(DustMapError::InvalidNside(0))
        ));
        assert!(matches!(
            DustMap::new(1 << 30, PixelOrdering::Nested, no_pixels()),
            Err(DustMapError::InvalidNside(n)) if n == 1 << 30
        ));
        assert!(matches!(
            DustMap::new(1 << 31, PixelOrdering::Ring, no_pixels()),
            Err(DustMapError::InvalidNside(n)) if n == 1 << 31
        ));
        assert!(DustMap::new(MAX_NSIDE, PixelOrdering::Nested, no_pixels()).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_pixel() {
        let pixel = DustMapPixel {
            ebv: 0.1,
            ebv_calibration: 0.1,
        };
        assert!(matches!(
            DustMap::new(1, PixelOrdering::Nested, [(12, pixel)]),
            Err(DustMapError::PixelOutOfRange { pixel: 12, nside: 1 })
        ));
    }

    #[test]
    fn test_reddening_lookup() {
        let probe = DustMap::new(512, PixelOrdering::Ring, no_pixels()).unwrap();
        let pixel = probe.pixel_index(150.1, 2.2).unwrap();
        assert!(pixel < 12 * 512 * 512);

        let csv = format!("hpix,ebv,ebv_calibration\n{},0.021,0.025\n", pixel);
        let map = DustMap::from_reader(csv.as_bytes(), 512, PixelOrdering::Ring).unwrap();
        let value = map.reddening(150.1, 2.2);
        assert_eq!(value.ebv, 0.021);
        assert_eq!(value.ebv_calibration, 0.025);

        // far away from the single stored pixel
        let missing = map.reddening(330.0, -40.0);
        assert!(missing.ebv.is_nan());
        assert!(missing.ebv_calibration.is_nan());
    }

    #[test]
    fn test_off_sphere_positions_have_no_pixel() {
        let map = DustMap::new(64, PixelOrdering::Nested, no_pixels()).unwrap();
        assert!(map.pixel_index(10.0, 91.0).is_none());
        assert!(map.pixel_index(f64::NAN, 0.0).is_none());
        assert_eq!(map.pixel_index(-10.0, 5.0), map.pixel_index(350.0, 5.0));
    }
}
