use crate::photometry::{Band, PerBand};
use crate::utils::io::{csv_reader, open_gzip_csv};

use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(thiserror::Error, Debug)]
pub enum ZeropointError {
    #[error("failed to open zero-point table")]
    Io(#[from] std::io::Error),
    #[error("failed to parse zero-point table")]
    Csv(#[from] csv::Error),
    #[error("duplicate zero-point row for tract {tract}, patch {patch}")]
    DuplicateKey { tract: i32, patch: i32 },
}

/// One row of the stellar-sequence offset table.
#[derive(Debug, Clone, Deserialize)]
struct ZeropointOffsetRow {
    tract: i32,
    patch: i32,
    g_offset: f64,
    r_offset: f64,
    i_offset: f64,
    z_offset: f64,
    y_offset: f64,
}

impl ZeropointOffsetRow {
    fn offsets(&self) -> PerBand<f64> {
        PerBand {
            g: self.g_offset,
            r: self.r_offset,
            i: self.i_offset,
            z: self.z_offset,
            y: self.y_offset,
        }
    }
}

/// Per-(tract, patch) photometric zero-point offsets of one processing
/// release.
///
/// The table is read-only after loading and is meant to be shared between
/// workers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ZeropointTable {
    release: String,
    offsets: HashMap<(i32, i32), PerBand<f64>>,
}

impl ZeropointTable {
    /// Build a table from `(tract, patch, offsets)` triples.
    pub fn new(
        release: &str,
        rows: impl IntoIterator<Item = (i32, i32, PerBand<f64>)>,
    ) -> Result<Self, ZeropointError> {
        let mut offsets = HashMap::new();
        for (tract, patch, row) in rows {
            match offsets.entry((tract, patch)) {
                Entry::Occupied(_) => return Err(ZeropointError::DuplicateKey { tract, patch }),
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            }
        }
        Ok(ZeropointTable {
            release: release.to_string(),
            offsets,
        })
    }

    /// Load a gzip-compressed CSV table.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), release = release))]
    pub fn from_path(path: impl AsRef<Path>, release: &str) -> Result<Self, ZeropointError> {
        let reader = open_gzip_csv(path.as_ref())?;
        let table = Self::from_csv(reader, release)?;
        info!(rows = table.len(), "loaded zero-point table");
        Ok(table)
    }

    /// Load an uncompressed CSV stream.
    pub fn from_reader<R: Read>(reader: R, release: &str) -> Result<Self, ZeropointError> {
        Self::from_csv(csv_reader(reader), release)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>, release: &str) -> Result<Self, ZeropointError> {
        let rows = reader
            .deserialize::<ZeropointOffsetRow>()
            .map(|row| row.map(|row| (row.tract, row.patch, row.offsets())))
            .collect::<Result<Vec<_>, csv::Error>>()?;
        Self::new(release, rows)
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn get(&self, tract: i32, patch: i32) -> Option<&PerBand<f64>> {
        self.offsets.get(&(tract, patch))
    }

    /// Offsets for `(tract, patch)`, NaN in every band when the pair is not
    /// calibrated so the absence propagates into the corrected magnitude.
    pub fn lookup(&self, tract: i32, patch: i32) -> PerBand<f64> {
        self.get(tract, patch)
            .copied()
            .unwrap_or_else(|| PerBand::splat(f64::NAN))
    }

    /// Left join of a batch of `(tract, patch)` keys against the table.
    pub fn lookup_many(&self, keys: &[(i32, i32)]) -> Vec<PerBand<f64>> {
        let joined: Vec<PerBand<f64>> = keys
            .iter()
            .map(|&(tract, patch)| self.lookup(tract, patch))
            .collect();
        let missing = joined.iter().filter(|row| row[Band::G].is_nan()).count();
        if missing > 0 {
            debug!(missing, total = keys.len(), "uncalibrated (tract, patch) pairs");
        }
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
tract,patch,g_offset,r_offset,i_offset,z_offset,y_offset
0,0,0.01,0.02,0.0,-0.01,0.0
9813,42,0.005,-0.003,0.001,0.002,0.004
";

    #[test]
    fn test_lookup_known_pair() {
        let table = ZeropointTable::from_reader(TABLE.as_bytes(), "pdr3").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.release(), "pdr3");
        let offsets = table.lookup(0, 0);
        assert_eq!(offsets.g, 0.01);
        assert_eq!(offsets.z, -0.01);
    }

    #[test]
    fn test_missing_pair_is_nan_not_zero() {
        let table = ZeropointTable::from_reader(TABLE.as_bytes(), "pdr3").unwrap();
        assert!(table.get(1, 1).is_none());
        let offsets = table.lookup(1, 1);
        for band in Band::ALL {
            assert!(offsets[band].is_nan());
        }
        let joined = table.lookup_many(&[(9813, 42), (1, 1)]);
        assert_eq!(joined[0].y, 0.004);
        assert!(joined[1].g.is_nan());
    }

    #[test]
    fn test_duplicate_rows_rejected() {
        let duplicated = format!("{}0,0,0.0,0.0,0.0,0.0,0.0\n", TABLE);
        let result = ZeropointTable::from_reader(duplicated.as_bytes(), "pdr3");
        assert!(matches!(
            result,
            Err(ZeropointError::DuplicateKey { tract: 0, patch: 0 })
        ));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let broken = "tract,patch,g_offset\n0,0,0.1\n";
        assert!(matches!(
            ZeropointTable::from_reader(broken.as_bytes(), "pdr3"),
            Err(ZeropointError::Csv(_))
        ));
    }
}
