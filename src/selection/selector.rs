use crate::catalog::{adapter_for, CatalogAdapter, RawCatalog, SchemaError};
use crate::conf::{AppConfig, ConfigError};
use crate::extinction::{
    DustMap, DustMapError, ExtinctionCorrector, ExtinctionError, ZeropointError, ZeropointTable,
};
use crate::photometry::PhotometricRecord;
use crate::selection::{select_randoms, SelectionPolicy, SelectionStages};
use crate::utils::enums::{CatalogKind, DustExtinction};
use crate::utils::o11y::logging::as_error;

use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(thiserror::Error, Debug)]
pub enum TargetError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    #[error("failed to load zero-point table")]
    Zeropoint(#[from] ZeropointError),
    #[error("failed to load dust map")]
    DustMap(#[from] DustMapError),
    #[error("catalog does not match its schema")]
    Schema(#[from] SchemaError),
    #[error("failed to correct magnitudes")]
    Extinction(#[from] ExtinctionError),
}

/// Records of one tract together with their selection mask.
#[derive(Debug, Clone)]
pub struct TargetSelection {
    pub records: Vec<PhotometricRecord>,
    pub selected: Vec<bool>,
}

impl TargetSelection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn n_selected(&self) -> usize {
        self.selected.iter().filter(|&&keep| keep).count()
    }

    pub fn targets(&self) -> impl Iterator<Item = &PhotometricRecord> {
        self.records
            .iter()
            .zip(&self.selected)
            .filter_map(|(record, &keep)| keep.then_some(record))
    }

    pub fn into_targets(self) -> Vec<PhotometricRecord> {
        self.records
            .into_iter()
            .zip(self.selected)
            .filter_map(|(record, keep)| keep.then_some(record))
            .collect()
    }
}

/// Runs tract files through schema adaptation, magnitude correction and
/// the selection cuts.
///
/// Shared lookup tables sit behind `Arc`s inside the corrector, so one
/// selector serves every tract of a run, including from rayon workers.
pub struct TargetSelector {
    adapter: Box<dyn CatalogAdapter>,
    corrector: ExtinctionCorrector,
    policy: SelectionPolicy,
}

impl TargetSelector {
    pub fn new(
        adapter: Box<dyn CatalogAdapter>,
        corrector: ExtinctionCorrector,
        policy: SelectionPolicy,
    ) -> Self {
        TargetSelector {
            adapter,
            corrector,
            policy,
        }
    }

    /// Build a selector from the application config, loading only the
    /// tables the configured method needs.
    #[instrument(skip_all, fields(method = %config.selection.dust_extinction, schema = config.selection.schema.as_str()))]
    pub fn from_config(config: &AppConfig) -> Result<Self, TargetError> {
        config.validate()?;
        let selection = &config.selection;

        let zeropoint = match (&config.zeropoint, selection.apply_zeropoint) {
            (Some(zp), true) => Some(Arc::new(
                ZeropointTable::from_path(&zp.path, &zp.release)
                    .inspect_err(as_error!("failed to load zero-point table"))?,
            )),
            _ => None,
        };
        let dustmap = match (&config.dustmap, selection.dust_extinction) {
            (Some(dm), DustExtinction::SkyMap) => Some(Arc::new(
                DustMap::from_path(&dm.path, dm.nside, dm.ordering)
                    .inspect_err(as_error!("failed to load dust map"))?,
            )),
            _ => None,
        };

        let corrector = ExtinctionCorrector::new(
            &selection.correction_settings(),
            config.absorption,
            zeropoint,
            dustmap,
        )?;
        info!(policy = %selection.policy.name, "target selector ready");
        Ok(Self::new(
            adapter_for(selection.schema),
            corrector,
            selection.policy.clone(),
        ))
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    pub fn corrector(&self) -> &ExtinctionCorrector {
        &self.corrector
    }

    pub fn method(&self) -> DustExtinction {
        self.corrector.method()
    }

    /// Adapt an object catalog and fill in corrected magnitudes. A schema
    /// mismatch rejects the whole table.
    pub fn prepare(&self, table: &RawCatalog) -> Result<Vec<PhotometricRecord>, TargetError> {
        let mut records = self.adapter.adapt(table, self.corrector.method())?;
        self.corrector.apply(&mut records)?;
        Ok(records)
    }

    pub fn prepare_randoms(
        &self,
        table: &RawCatalog,
    ) -> Result<Vec<PhotometricRecord>, TargetError> {
        Ok(self.adapter.adapt_randoms(table)?)
    }

    #[instrument(skip_all, fields(policy = %self.policy.name, records = records.len()))]
    pub fn select(&self, records: &[PhotometricRecord]) -> Vec<bool> {
        let stages = SelectionStages::evaluate(records, &self.policy);
        let selected = stages.combined();
        debug!(
            masked = count(&stages.in_mask),
            quality = count(&stages.passes_quality),
            extended = count(&stages.is_extended),
            color_box = count(&stages.in_color_box),
            "stage counts"
        );
        info!(selected = count(&selected), "selected targets");
        selected
    }

    #[instrument(skip_all, fields(policy = %self.policy.name, records = records.len()))]
    pub fn select_randoms(&self, records: &[PhotometricRecord]) -> Vec<bool> {
        let selected = select_randoms(records, &self.policy);
        info!(selected = count(&selected), "selected random points");
        selected
    }

    pub fn run(&self, table: &RawCatalog) -> Result<TargetSelection, TargetError> {
        let records = self.prepare(table)?;
        let selected = self.select(&records);
        Ok(TargetSelection { records, selected })
    }

    pub fn run_randoms(&self, table: &RawCatalog) -> Result<TargetSelection, TargetError> {
        let records = self.prepare_randoms(table)?;
        let selected = self.select_randoms(&records);
        Ok(TargetSelection { records, selected })
    }

    pub fn run_kind(
        &self,
        table: &RawCatalog,
        kind: CatalogKind,
    ) -> Result<TargetSelection, TargetError> {
        match kind {
            CatalogKind::Objects => self.run(table),
            CatalogKind::Randoms => self.run_randoms(table),
        }
    }

    /// Run independent tracts in parallel. Results keep the input order; the
    /// first failing tract fails the whole call.
    #[instrument(skip_all, fields(tracts = tables.len(), kind = ?kind), err)]
    pub fn run_partitions(
        &self,
        tables: &[RawCatalog],
        kind: CatalogKind,
    ) -> Result<Vec<TargetSelection>, TargetError> {
        let results = tables
            .par_iter()
            .map(|table| self.run_kind(table, kind))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            selected = results.iter().map(TargetSelection::n_selected).sum::<usize>(),
            "processed partitions"
        );
        Ok(results)
    }
}

fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&flag| flag).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Pdr3Adapter, S23Adapter};
    use crate::extinction::{AbsorptionModel, CorrectionSettings};
    use crate::utils::testing::{elg_csv, ELG_CSV_HEADER};

    fn fixed_selector() -> TargetSelector {
        let corrector = ExtinctionCorrector::new(
            &CorrectionSettings {
                method: DustExtinction::Fixed,
                release: "pdr3".to_string(),
                apply_zeropoint: false,
            },
            AbsorptionModel::HSC,
            None,
            None,
        )
        .unwrap();
        TargetSelector::new(Box::new(Pdr3Adapter), corrector, SelectionPolicy::default())
    }

    #[test]
    fn test_run_selects_reference_row() {
        let table = RawCatalog::from_reader(elg_csv(&[1, 2]).as_bytes()).unwrap();
        let selection = fixed_selector().run(&table).unwrap();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.selected, vec![true, true]);
        assert!(selection.records.iter().all(|r| r.is_corrected()));
        let ids: Vec<i64> = selection.targets().map(|r| r.object_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_schema_mismatch_rejects_batch() {
        let table = RawCatalog::from_reader(elg_csv(&[1]).as_bytes()).unwrap();
        let selector = TargetSelector::new(
            Box::new(S23Adapter),
            fixed_selector().corrector,
            SelectionPolicy::default(),
        );
        assert!(matches!(
            selector.run(&table),
            Err(TargetError::Schema(SchemaError::MissingColumns { .. }))
        ));
    }

    #[test]
    fn test_run_partitions_keeps_order() {
        let tables: Vec<RawCatalog> = (0..4)
            .map(|k| RawCatalog::from_reader(elg_csv(&[k * 10, k * 10 + 1]).as_bytes()).unwrap())
            .collect();
        let results = fixed_selector()
            .run_partitions(&tables, CatalogKind::Objects)
            .unwrap();
        assert_eq!(results.len(), 4);
        for (k, result) in results.iter().enumerate() {
            assert_eq!(result.records[0].object_id, k as i64 * 10);
        }
    }

    #[test]
    fn test_empty_table() {
        let table = RawCatalog::from_reader(format!("{}\n", ELG_CSV_HEADER).as_bytes()).unwrap();
        let selection = fixed_selector().run(&table).unwrap();
        assert!(selection.is_empty());
        assert!(selection.into_targets().is_empty());
    }
}
