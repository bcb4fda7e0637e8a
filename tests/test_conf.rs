use pfs_target::conf::{self, AppConfig, ConfigError};
use pfs_target::utils::enums::{DustExtinction, MaskCombinator, PixelOrdering, SchemaVersion};
use pfs_target::utils::testing::TEST_CONFIG_FILE;
use std::path::Path;

fn write_config(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_load_raw_config() {
    let config = conf::load_raw_config(Path::new(TEST_CONFIG_FILE)).unwrap();
    let release = config.get_string("selection.release").unwrap();
    assert_eq!(release, "pdr3");
    let nside = config.get_int("dustmap.nside").unwrap();
    assert_eq!(nside, 512);
}

#[test]
fn test_from_test_config() {
    let config = AppConfig::from_test_config().unwrap();
    let selection = &config.selection;
    assert_eq!(selection.dust_extinction, DustExtinction::Fixed);
    assert!(selection.apply_zeropoint);
    assert_eq!(selection.schema, SchemaVersion::Pdr3);
    assert_eq!(selection.policy.name, "pfs-cosmo-test");
    assert_eq!(selection.policy.mask_combinator, MaskCombinator::Any);
    // keys left out of the file keep their defaults
    assert_eq!(selection.policy.lsb_mag_ceiling, 25.5);

    let zeropoint = config.zeropoint.as_ref().unwrap();
    assert!(zeropoint.path.is_absolute() || zeropoint.path.starts_with("tests"));
    assert!(zeropoint.path.exists());
    let dustmap = config.dustmap.as_ref().unwrap();
    assert_eq!(dustmap.ordering, PixelOrdering::Ring);
    assert!(dustmap.path.exists());

    let settings = selection.correction_settings();
    assert_eq!(settings.release, "pdr3");
}

#[test]
fn test_unknown_extinction_method_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "selection:\n  dust_extinction: csfd\n  release: pdr3\n",
    );
    assert!(matches!(
        AppConfig::from_path(&path),
        Err(ConfigError::InvalidConfigError(_))
    ));
}

#[test]
fn test_method_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "selection:\n  dust_extinction: sfd98\n  release: pdr3\n",
    );
    let config = AppConfig::from_path(&path).unwrap();
    assert_eq!(config.selection.dust_extinction, DustExtinction::Fixed);
    assert!(!config.selection.apply_zeropoint);
    assert!(config.zeropoint.is_none());
}

#[test]
fn test_zeropoint_release_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "selection:\n  dust_extinction: fixed\n  release: s23\n  apply_zeropoint: true\n\
zeropoint:\n  path: offsets.csv.gz\n  release: pdr3\n",
    );
    match AppConfig::from_path(&path) {
        Err(ConfigError::UnsupportedRelease {
            requested,
            available,
        }) => {
            assert_eq!(requested, "s23");
            assert_eq!(available, "pdr3");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_missing_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "selection:\n  dust_extinction: fixed\n  release: pdr3\n  apply_zeropoint: true\n",
    );
    assert!(matches!(
        AppConfig::from_path(&path),
        Err(ConfigError::MissingZeropointTable)
    ));

    let path = write_config(
        dir.path(),
        "selection:\n  dust_extinction: desi\n  release: pdr3\n",
    );
    assert!(matches!(
        AppConfig::from_path(&path),
        Err(ConfigError::MissingDustMap)
    ));
}

#[test]
fn test_inverted_magnitude_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "selection:\n  dust_extinction: fixed\n  release: pdr3\n  policy:\n    magnitude_cut: 24.5\n",
    );
    assert!(matches!(
        AppConfig::from_path(&path),
        Err(ConfigError::InvalidValue { key, .. }) if key == "selection.policy.magnitude_cut"
    ));
}

#[test]
fn test_relative_paths_follow_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "selection:\n  dust_extinction: sky_map\n  release: pdr3\n\
dustmap:\n  path: dust.csv\n  nside: 64\n  ordering: nested\n",
    );
    let config = AppConfig::from_path(&path).unwrap();
    let dustmap = config.dustmap.unwrap();
    assert_eq!(dustmap.path, dir.path().join("dust.csv"));
    assert_eq!(dustmap.ordering, PixelOrdering::Nested);
}
