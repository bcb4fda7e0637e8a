use crate::photometry::{Band, BrightStarMask, Morphology, PerBand, PhotometricRecord};
use crate::utils::enums::{DustExtinction, SchemaVersion};
use crate::utils::io::{csv_reader, open_csv};

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, instrument};

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("failed to open catalog")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog")]
    Csv(#[from] csv::Error),
    #[error("catalog is missing columns required by schema {version}: {}", columns.join(", "))]
    MissingColumns {
        version: String,
        columns: Vec<String>,
    },
    #[error("invalid value '{value}' in column {column}, row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
}

/// A tract file as read from disk: a header plus untyped cells.
///
/// Cells stay as text until an adapter parses them with the types its schema
/// declares, so 64-bit object ids never round-trip through a float.
#[derive(Debug, Clone, Default)]
pub struct RawCatalog {
    index: HashMap<String, usize>,
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

/// A resolved column: its name and position in the header.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    index: usize,
}

impl RawCatalog {
    pub fn new(headers: Vec<String>, rows: Vec<csv::StringRecord>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        RawCatalog {
            index,
            headers,
            rows,
        }
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let catalog = Self::from_csv(open_csv(path.as_ref())?)?;
        debug!(rows = catalog.len(), columns = catalog.headers.len(), "read catalog");
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SchemaError> {
        Self::from_csv(csv_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, SchemaError> {
        let headers = reader
            .headers()?
            .iter()
            .map(|name| name.to_string())
            .collect();
        let rows = reader.records().collect::<Result<Vec<_>, csv::Error>>()?;
        Ok(Self::new(headers, rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Resolve every requested column, reporting all the missing ones at once.
    pub fn resolve(
        &self,
        version: SchemaVersion,
        names: &[String],
    ) -> Result<Vec<Column>, SchemaError> {
        let mut missing = Vec::new();
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            match self.index.get(name) {
                Some(&index) => columns.push(Column {
                    name: name.clone(),
                    index,
                }),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                version: version.as_str().to_string(),
                columns: missing,
            });
        }
        Ok(columns)
    }

    fn cell(&self, row: usize, column: &Column) -> &str {
        // short rows are rejected by the csv reader, so every row has every column
        self.rows[row].get(column.index).unwrap_or("")
    }

    fn invalid(&self, row: usize, column: &Column) -> SchemaError {
        SchemaError::InvalidValue {
            column: column.name.clone(),
            row,
            value: self.cell(row, column).to_string(),
        }
    }

    /// Float cell; empty cells and `nan` read as NaN.
    pub fn f64(&self, row: usize, column: &Column) -> Result<f64, SchemaError> {
        let cell = self.cell(row, column);
        if cell.is_empty() {
            return Ok(f64::NAN);
        }
        cell.parse::<f64>().map_err(|_| self.invalid(row, column))
    }

    pub fn i64(&self, row: usize, column: &Column) -> Result<i64, SchemaError> {
        self.cell(row, column)
            .parse::<i64>()
            .map_err(|_| self.invalid(row, column))
    }

    pub fn i32(&self, row: usize, column: &Column) -> Result<i32, SchemaError> {
        self.cell(row, column)
            .parse::<i32>()
            .map_err(|_| self.invalid(row, column))
    }

    /// Non-negative count, also accepting integral floats such as `6.0`.
    pub fn u32(&self, row: usize, column: &Column) -> Result<u32, SchemaError> {
        let cell = self.cell(row, column);
        if let Ok(count) = cell.parse::<u32>() {
            return Ok(count);
        }
        match cell.parse::<f64>() {
            Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
                Ok(value as u32)
            }
            _ => Err(self.invalid(row, column)),
        }
    }

    pub fn bool(&self, row: usize, column: &Column) -> Result<bool, SchemaError> {
        match self.cell(row, column) {
            "true" | "True" | "TRUE" | "t" | "T" | "1" => Ok(true),
            "false" | "False" | "FALSE" | "f" | "F" | "0" => Ok(false),
            _ => Err(self.invalid(row, column)),
        }
    }
}

/// Column names of one tract-file schema revision.
///
/// Per-band names are templates where `{band}` is replaced by the band letter.
#[derive(Debug, Clone, Copy)]
pub struct SchemaColumns {
    pub object_id: &'static str,
    pub ra: &'static str,
    pub dec: &'static str,
    pub tract: &'static str,
    pub patch: &'static str,
    pub mag: &'static str,
    pub mag_err: &'static str,
    pub flux_flag: &'static str,
    pub absorption: &'static str,
    pub morph_cmodel_mag: &'static str,
    pub morph_cmodel_flag: &'static str,
    pub morph_psf_mag: &'static str,
    pub morph_psf_flag: &'static str,
    pub mask_halo: &'static str,
    pub mask_ghost: &'static str,
    pub mask_blooming: &'static str,
    pub deblend_skipped: &'static str,
    pub lsb_mag: &'static str,
    pub lsb_flag: &'static str,
}

/// Column names of the random catalogs, shared by every schema revision.
pub mod randoms {
    pub const OBJECT_ID: &str = "object_id";
    pub const RA: &str = "ra";
    pub const DEC: &str = "dec";
    pub const TRACT: &str = "tract";
    pub const PATCH: &str = "patch";
    pub const INPUT_COUNT: &str = "{band}_inputcount_value";
    pub const MASK_HALO: &str = "i_mask_brightstar_halo";
    pub const MASK_GHOST: &str = "i_mask_brightstar_ghost";
    pub const MASK_BLOOMING: &str = "i_mask_brightstar_blooming";
}

pub fn band_column(template: &str, band: Band) -> String {
    template.replace("{band}", band.as_str())
}

fn band_columns(template: &str) -> Vec<String> {
    Band::ALL
        .iter()
        .map(|&band| band_column(template, band))
        .collect()
}

/// Maps one external catalog schema onto [`PhotometricRecord`].
///
/// Implementors only describe their column names; reading is shared. A table
/// missing any required column is rejected as a whole.
pub trait CatalogAdapter: Send + Sync {
    fn version(&self) -> SchemaVersion;

    fn columns(&self) -> &SchemaColumns;

    /// Every column this schema needs for the given extinction method.
    fn required_columns(&self, method: DustExtinction) -> Vec<String> {
        let c = self.columns();
        let mut names: Vec<String> = [c.object_id, c.ra, c.dec, c.tract, c.patch]
            .iter()
            .map(|name| name.to_string())
            .collect();
        names.extend(band_columns(c.mag));
        names.extend(band_columns(c.mag_err));
        names.extend(band_columns(c.flux_flag));
        names.extend(
            [
                c.morph_cmodel_mag,
                c.morph_cmodel_flag,
                c.morph_psf_mag,
                c.morph_psf_flag,
                c.mask_halo,
                c.mask_ghost,
                c.mask_blooming,
                c.deblend_skipped,
                c.lsb_mag,
                c.lsb_flag,
            ]
            .iter()
            .map(|name| name.to_string()),
        );
        if method == DustExtinction::Fixed {
            names.extend(band_columns(c.absorption));
        }
        names
    }

    /// Convert an object catalog into canonical records, uncorrected.
    fn adapt(
        &self,
        table: &RawCatalog,
        method: DustExtinction,
    ) -> Result<Vec<PhotometricRecord>, SchemaError> {
        let names = self.required_columns(method);
        let cols = table.resolve(self.version(), &names)?;
        // same order as required_columns
        let (ids, rest) = cols.split_at(5);
        let (mag, rest) = rest.split_at(5);
        let (mag_err, rest) = rest.split_at(5);
        let (flux_flag, rest) = rest.split_at(5);
        let (scalars, absorption) = rest.split_at(10);

        (0..table.len())
            .map(|row| -> Result<PhotometricRecord, SchemaError> {
                let mut record = PhotometricRecord::new(
                    table.i64(row, &ids[0])?,
                    table.f64(row, &ids[1])?,
                    table.f64(row, &ids[2])?,
                    table.i32(row, &ids[3])?,
                    table.i32(row, &ids[4])?,
                );
                record.cmodel_mag = PerBand::try_from_fn(|b| table.f64(row, &mag[b as usize]))?;
                record.cmodel_mag_err =
                    PerBand::try_from_fn(|b| table.f64(row, &mag_err[b as usize]))?;
                record.cmodel_flag =
                    PerBand::try_from_fn(|b| table.bool(row, &flux_flag[b as usize]))?;
                record.morphology = Morphology {
                    cmodel_mag: table.f64(row, &scalars[0])?,
                    cmodel_flag: table.bool(row, &scalars[1])?,
                    psf_mag: table.f64(row, &scalars[2])?,
                    psf_flag: table.bool(row, &scalars[3])?,
                };
                record.mask = BrightStarMask {
                    halo: table.bool(row, &scalars[4])?,
                    ghost: table.bool(row, &scalars[5])?,
                    blooming: table.bool(row, &scalars[6])?,
                };
                record.deblend_skipped = table.bool(row, &scalars[7])?;
                record.lsb_i_mag = table.f64(row, &scalars[8])?;
                record.lsb_i_flag = table.bool(row, &scalars[9])?;
                if !absorption.is_empty() {
                    record.absorption = Some(PerBand::try_from_fn(|b| {
                        table.f64(row, &absorption[b as usize])
                    })?);
                }
                Ok(record)
            })
            .collect()
    }

    /// Convert a random catalog: positions, coverage counts and mask bits.
    fn adapt_randoms(&self, table: &RawCatalog) -> Result<Vec<PhotometricRecord>, SchemaError> {
        let mut names: Vec<String> = [
            randoms::OBJECT_ID,
            randoms::RA,
            randoms::DEC,
            randoms::TRACT,
            randoms::PATCH,
            randoms::MASK_HALO,
            randoms::MASK_GHOST,
            randoms::MASK_BLOOMING,
        ]
        .iter()
        .map(|name| name.to_string())
        .collect();
        names.extend(band_columns(randoms::INPUT_COUNT));
        let cols = table.resolve(self.version(), &names)?;
        let (fixed, counts) = cols.split_at(8);

        (0..table.len())
            .map(|row| -> Result<PhotometricRecord, SchemaError> {
                let mut record = PhotometricRecord::new(
                    table.i64(row, &fixed[0])?,
                    table.f64(row, &fixed[1])?,
                    table.f64(row, &fixed[2])?,
                    table.i32(row, &fixed[3])?,
                    table.i32(row, &fixed[4])?,
                );
                record.mask = BrightStarMask {
                    halo: table.bool(row, &fixed[5])?,
                    ghost: table.bool(row, &fixed[6])?,
                    blooming: table.bool(row, &fixed[7])?,
                };
                record.input_count =
                    Some(PerBand::try_from_fn(|b| table.u32(row, &counts[b as usize]))?);
                Ok(record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawCatalog {
        RawCatalog::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_typed_cells() {
        let t = table("id,mag,flag,count\n43158176442354198,,True,6.0\n2,nan,0,3\n");
        let cols = t
            .resolve(
                SchemaVersion::Pdr3,
                &["id", "mag", "flag", "count"].map(String::from),
            )
            .unwrap();
        assert_eq!(t.i64(0, &cols[0]).unwrap(), 43158176442354198);
        assert!(t.f64(0, &cols[1]).unwrap().is_nan());
        assert!(t.f64(1, &cols[1]).unwrap().is_nan());
        assert!(t.bool(0, &cols[2]).unwrap());
        assert!(!t.bool(1, &cols[2]).unwrap());
        assert_eq!(t.u32(0, &cols[3]).unwrap(), 6);
        assert_eq!(t.u32(1, &cols[3]).unwrap(), 3);
    }

    #[test]
    fn test_invalid_cell_names_column_and_row() {
        let t = table("flag\nTrue\nmaybe\n");
        let cols = t.resolve(SchemaVersion::Pdr3, &["flag".to_string()]).unwrap();
        match t.bool(1, &cols[0]) {
            Err(SchemaError::InvalidValue { column, row, value }) => {
                assert_eq!(column, "flag");
                assert_eq!(row, 1);
                assert_eq!(value, "maybe");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_resolve_reports_every_missing_column() {
        let t = table("a,b\n1,2\n");
        let names = ["a", "c", "d"].map(String::from);
        match t.resolve(SchemaVersion::S23, &names) {
            Err(SchemaError::MissingColumns { version, columns }) => {
                assert_eq!(version, "s23");
                assert_eq!(columns, vec!["c".to_string(), "d".to_string()]);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_band_column_template() {
        assert_eq!(band_column("{band}_cmodel_mag", Band::Z), "z_cmodel_mag");
        assert_eq!(band_column("a_{band}", Band::G), "a_g");
    }
}
