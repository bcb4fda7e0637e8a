use pfs_target::catalog::{adapter_for, CatalogAdapter, RawCatalog, SchemaError};
use pfs_target::photometry::Band;
use pfs_target::utils::enums::{DustExtinction, SchemaVersion};

const TRACT_FILE: &str = "tests/data/tracts/9813.csv";

#[test]
fn test_read_pdr3_tract_file() {
    let table = RawCatalog::from_path(TRACT_FILE).unwrap();
    assert_eq!(table.len(), 7);
    assert!(table.has_column("meas_i_psfflux_mag"));

    let adapter = adapter_for(SchemaVersion::Pdr3);
    assert_eq!(adapter.version(), SchemaVersion::Pdr3);
    let records = adapter.adapt(&table, DustExtinction::Fixed).unwrap();
    assert_eq!(records.len(), table.len());
    // 64-bit ids survive without going through a float
    assert_eq!(records[0].object_id, 43158176442354101);
    assert!(records[3].cmodel_mag[Band::G].is_nan());
    assert!(records[1].mask.ghost);
    assert!(records.iter().all(|record| !record.is_corrected()));
}

#[test]
fn test_schema_version_mismatch_rejects_table() {
    let table = RawCatalog::from_path(TRACT_FILE).unwrap();
    let adapter = adapter_for(SchemaVersion::S23);
    match adapter.adapt(&table, DustExtinction::Fixed) {
        Err(SchemaError::MissingColumns { version, columns }) => {
            assert_eq!(version, "s23");
            assert!(columns.contains(&"ra".to_string()));
            assert!(columns.contains(&"i_psfflux_mag".to_string()));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_malformed_cell_names_column_and_row() {
    let content = std::fs::read_to_string(TRACT_FILE).unwrap();
    let broken = content.replacen(",False,24.0,False\n", ",maybe,24.0,False\n", 1);
    let table = RawCatalog::from_reader(broken.as_bytes()).unwrap();
    match adapter_for(SchemaVersion::Pdr3).adapt(&table, DustExtinction::Fixed) {
        Err(SchemaError::InvalidValue { column, row, value }) => {
            assert_eq!(column, "deblend_skipped");
            assert_eq!(row, 0);
            assert_eq!(value, "maybe");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_ragged_file_is_rejected() {
    let broken = "object_id,i_ra\n1,2.0,3.0\n";
    assert!(matches!(
        RawCatalog::from_reader(broken.as_bytes()),
        Err(SchemaError::Csv(_))
    ));
}
