use pfs_target::catalog::{RawCatalog, SchemaError};
use pfs_target::conf::{load_dotenv, AppConfig};
use pfs_target::photometry::{Band, PhotometricRecord};
use pfs_target::selection::{TargetError, TargetSelection, TargetSelector};
use pfs_target::utils::{
    enums::{CatalogKind, DustExtinction},
    io::create_csv,
    o11y::logging::{build_subscriber, log_error},
};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(about = "Select PFS cosmology targets from HSC tract files")]
struct Cli {
    /// Tract file or directory holding tract files (*.csv)
    tracts: PathBuf,

    /// Output target file, or directory to write it into
    dest: PathBuf,

    /// Path to the configuration file
    #[arg(long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Galactic extinction method, overrides the configuration
    #[arg(long, value_enum)]
    dust: Option<DustExtinction>,

    /// Treat the tract files as random catalogs
    #[arg(long)]
    randoms: bool,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

#[derive(thiserror::Error, Debug)]
enum SelectTargetsError {
    #[error("failed to set up the selection")]
    Target(#[from] TargetError),
    #[error("failed to read tract file {path}")]
    ReadTract { path: PathBuf, source: SchemaError },
    #[error("no tract files found in {0}")]
    NoTractFiles(PathBuf),
    #[error("specify an output directory or file name, got {0}")]
    InvalidDestination(PathBuf),
    #[error("failed to write targets")]
    Write(#[from] csv::Error),
    #[error("failed to access file")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct TargetRow {
    #[serde(rename = "OBJID")]
    object_id: i64,
    #[serde(rename = "RA")]
    ra: f64,
    #[serde(rename = "DEC")]
    dec: f64,
    #[serde(rename = "G_MAG")]
    g_mag: f64,
    #[serde(rename = "R_MAG")]
    r_mag: f64,
    #[serde(rename = "I_MAG")]
    i_mag: f64,
    #[serde(rename = "Z_MAG")]
    z_mag: f64,
    #[serde(rename = "Y_MAG")]
    y_mag: f64,
    #[serde(rename = "G_ERR")]
    g_err: f64,
    #[serde(rename = "R_ERR")]
    r_err: f64,
    #[serde(rename = "I_ERR")]
    i_err: f64,
    #[serde(rename = "Z_ERR")]
    z_err: f64,
    #[serde(rename = "Y_ERR")]
    y_err: f64,
    #[serde(rename = "I_MEAS_CMODEL_MAG")]
    i_meas_cmodel_mag: f64,
    #[serde(rename = "I_MEAS_PSF_MAG")]
    i_meas_psf_mag: f64,
}

impl From<&PhotometricRecord> for TargetRow {
    fn from(record: &PhotometricRecord) -> Self {
        let err = &record.cmodel_mag_err;
        TargetRow {
            object_id: record.object_id,
            ra: record.ra,
            dec: record.dec,
            g_mag: record.mag(Band::G),
            r_mag: record.mag(Band::R),
            i_mag: record.mag(Band::I),
            z_mag: record.mag(Band::Z),
            y_mag: record.mag(Band::Y),
            g_err: err[Band::G],
            r_err: err[Band::R],
            i_err: err[Band::I],
            z_err: err[Band::Z],
            y_err: err[Band::Y],
            i_meas_cmodel_mag: record.morphology.cmodel_mag,
            i_meas_psf_mag: record.morphology.psf_mag,
        }
    }
}

#[derive(Serialize)]
struct RandomRow {
    #[serde(rename = "OBJID")]
    object_id: i64,
    #[serde(rename = "RA")]
    ra: f64,
    #[serde(rename = "DEC")]
    dec: f64,
    #[serde(rename = "TRACT")]
    tract: i32,
    #[serde(rename = "PATCH")]
    patch: i32,
}

impl From<&PhotometricRecord> for RandomRow {
    fn from(record: &PhotometricRecord) -> Self {
        RandomRow {
            object_id: record.object_id,
            ra: record.ra,
            dec: record.dec,
            tract: record.tract,
            patch: record.patch,
        }
    }
}

/// Every `*.csv` file at `path`, sorted, or `path` itself when it is a file.
fn collect_tract_files(path: &Path) -> Result<Vec<PathBuf>, SelectTargetsError> {
    let mut files = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|file| file.is_file() && file.extension().is_some_and(|ext| ext == "csv"))
            .collect()
    } else {
        Vec::new()
    };
    if files.is_empty() {
        return Err(SelectTargetsError::NoTractFiles(path.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

fn output_path(
    dest: &Path,
    method: DustExtinction,
    kind: CatalogKind,
) -> Result<PathBuf, SelectTargetsError> {
    if dest.is_dir() {
        let prefix = match kind {
            CatalogKind::Objects => "pfs_target",
            CatalogKind::Randoms => "pfs_random",
        };
        return Ok(dest.join(format!("{}.dust_{}.csv", prefix, method)));
    }
    let parent_exists = match dest.parent() {
        Some(parent) => parent.as_os_str().is_empty() || parent.is_dir(),
        None => false,
    };
    if dest.is_file() || parent_exists {
        Ok(dest.to_path_buf())
    } else {
        Err(SelectTargetsError::InvalidDestination(dest.to_path_buf()))
    }
}

fn write_rows<R: Serialize>(
    path: &Path,
    rows: impl Iterator<Item = R>,
) -> Result<usize, SelectTargetsError> {
    let mut writer = create_csv(path)?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

#[instrument(skip_all, fields(tracts = %args.tracts.display(), randoms = args.randoms), err)]
fn run(args: Cli) -> Result<(), SelectTargetsError> {
    let mut config = AppConfig::from_path(&args.config).map_err(TargetError::from)?;
    if let Some(dust) = args.dust {
        config.selection.dust_extinction = dust;
    }
    let method = config.selection.dust_extinction;
    let kind = match args.randoms {
        true => CatalogKind::Randoms,
        false => CatalogKind::Objects,
    };

    let files = collect_tract_files(&args.tracts)?;
    let fout = output_path(&args.dest, method, kind)?;
    let selector = TargetSelector::from_config(&config)?;
    info!(n_files = files.len(), output = %fout.display(), "selecting targets");

    let progress_bar = match args.quiet {
        true => ProgressBar::hidden(),
        false => ProgressBar::new(files.len() as u64)
            .with_message("Reading tract files")
            .with_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} {msg} {wide_bar} [{elapsed_precise}] {human_pos}/{human_len} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            ),
    };
    let tables = files
        .par_iter()
        .map(|path| {
            let table = RawCatalog::from_path(path).map_err(|source| {
                SelectTargetsError::ReadTract {
                    path: path.clone(),
                    source,
                }
            });
            progress_bar.inc(1);
            table
        })
        .collect::<Result<Vec<_>, _>>()?;
    progress_bar.finish_and_clear();

    let selections = selector.run_partitions(&tables, kind)?;
    let total: usize = selections.iter().map(TargetSelection::len).sum();
    let targets = selections.iter().flat_map(TargetSelection::targets);
    let written = match kind {
        CatalogKind::Objects => write_rows(&fout, targets.map(TargetRow::from))?,
        CatalogKind::Randoms => write_rows(&fout, targets.map(RandomRow::from))?,
    };
    if written == 0 {
        warn!("no object passed the selection");
    }
    info!(total, selected = written, output = %fout.display(), "wrote targets");
    Ok(())
}

fn main() {
    // Load environment variables from .env file before anything else
    load_dotenv();

    let args = Cli::parse();

    match build_subscriber() {
        Ok(subscriber) => {
            if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
                eprintln!("failed to install subscriber: {}", error);
            }
        }
        Err(error) => eprintln!("failed to build subscriber: {}", error),
    }

    if let Err(error) = run(args) {
        log_error(&error, "target selection failed");
        std::process::exit(1);
    }
}
