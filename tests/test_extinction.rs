use pfs_target::extinction::{
    AbsorptionModel, CorrectionSettings, DustMap, DustMapError, DustMapPixel, ExtinctionCorrector,
    ZeropointError, ZeropointTable,
};
use pfs_target::photometry::{Band, PerBand, PhotometricRecord};
use pfs_target::utils::enums::{DustExtinction, PixelOrdering};
use pfs_target::utils::testing::write_zeropoint_table;
use std::sync::Arc;

const OFFSETS: PerBand<f64> = PerBand {
    g: 0.01,
    r: 0.02,
    i: 0.0,
    z: -0.01,
    y: 0.0,
};

fn raw_record(tract: i32, patch: i32) -> PhotometricRecord {
    let mut record = PhotometricRecord::new(1, 150.1, 2.2, tract, patch);
    record.cmodel_mag = PerBand::splat(23.0);
    record.absorption = Some(PerBand::splat(0.05));
    record
}

#[test]
fn test_gzip_zeropoint_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offsets.csv.gz");
    write_zeropoint_table(&path, &[(0, 0, OFFSETS), (9813, 42, PerBand::splat(0.0))]).unwrap();

    let table = ZeropointTable::from_path(&path, "pdr3").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.lookup(0, 0), OFFSETS);
    assert!(table.lookup(0, 1).g.is_nan());
}

#[test]
fn test_zeropoint_table_from_test_data() {
    let table =
        ZeropointTable::from_path("tests/data/stellar_sequence_offsets.pdr3.csv.gz", "pdr3")
            .unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(9813, 42).unwrap().g, 0.01);
}

#[test]
fn test_missing_files() {
    assert!(matches!(
        ZeropointTable::from_path("tests/data/nope.csv.gz", "pdr3"),
        Err(ZeropointError::Io(_))
    ));
    assert!(matches!(
        DustMap::from_path("tests/data/nope.csv", 512, PixelOrdering::Ring),
        Err(DustMapError::Io(_))
    ));
}

#[test]
fn test_dust_map_from_test_data() {
    let map = DustMap::from_path("tests/data/dust_nside512.csv", 512, PixelOrdering::Ring).unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map.nside(), 512);
}

#[test]
fn test_fixed_with_zeropoint_reference_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offsets.csv.gz");
    write_zeropoint_table(&path, &[(0, 0, OFFSETS)]).unwrap();
    let table = Arc::new(ZeropointTable::from_path(&path, "pdr3").unwrap());

    let corrector = ExtinctionCorrector::new(
        &CorrectionSettings {
            method: DustExtinction::Fixed,
            release: "pdr3".to_string(),
            apply_zeropoint: true,
        },
        AbsorptionModel::HSC,
        Some(table),
        None,
    )
    .unwrap();

    let mut records = vec![raw_record(0, 0), raw_record(0, 7)];
    corrector.apply(&mut records).unwrap();
    assert!((records[0].mag(Band::G) - 22.94).abs() < 1e-9);
    // uncalibrated patch: every band poisoned, batch still processed
    for band in Band::ALL {
        assert!(records[1].mag(band).is_nan());
    }

    let snapshot: Vec<_> = records.iter().map(|r| r.corrected_mag).collect();
    corrector.apply(&mut records).unwrap();
    let again: Vec<_> = records.iter().map(|r| r.corrected_mag).collect();
    assert_eq!(format!("{:?}", snapshot), format!("{:?}", again));
}

#[test]
fn test_sky_map_with_substituted_coefficients() {
    let probe =
        DustMap::new(256, PixelOrdering::Nested, Vec::<(u64, DustMapPixel)>::new()).unwrap();
    let pixel = probe.pixel_index(150.1, 2.2).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dust.csv");
    std::fs::write(&path, format!("hpix,ebv,ebv_calibration\n{},0.1,0.1\n", pixel)).unwrap();
    let dustmap = Arc::new(DustMap::from_path(&path, 256, PixelOrdering::Nested).unwrap());

    let unit = AbsorptionModel::new(PerBand::splat(1.0));
    let corrector = ExtinctionCorrector::new(
        &CorrectionSettings {
            method: DustExtinction::SkyMap,
            release: "pdr3".to_string(),
            apply_zeropoint: false,
        },
        unit,
        None,
        Some(dustmap),
    )
    .unwrap();

    let mut record = raw_record(0, 0);
    // catalog absorption is ignored by the sky-map method
    record.absorption = Some(PerBand::splat(5.0));
    let mags = corrector.corrected(&record).unwrap();
    for band in Band::ALL {
        assert!((mags[band] - 22.9).abs() < 1e-12);
    }
}
