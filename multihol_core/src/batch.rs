//! Batch migration of the items of one bib record into one holding
//!
//! A run has two phases. [`BatchController::prepare`] reads the target
//! holding, collects every item of the bib record, keeps those that belong
//! on the target shelf and backs them up. [`BatchController::execute`] then
//! moves the candidates one by one. The split lets a caller show the plan
//! and ask for confirmation before anything is changed.

use crate::backup::BackupWriter;
use crate::catalog::{CatalogService, PAGE_SIZE};
use crate::descriptor::HoldingDescriptor;
use crate::error::{Error, Result};
use crate::matching::MatchReport;
use crate::model::Item;
use crate::mover::{MoveConfig, MoveOrchestrator, MoveOutcome};
use crate::update::update_for_move;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything known about a run before the first item is touched
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub bib_id: String,
    pub target_holding_id: String,
    pub descriptor: HoldingDescriptor,
    /// Number of items fetched across all holdings
    pub fetched: usize,
    pub candidates: Vec<Item>,
    pub backup_path: PathBuf,
}

/// Outcome of one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub barcode: String,
    pub source_holding_id: String,
    pub outcome: MoveOutcome,
}

/// Summary of an executed run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub bib_id: String,
    pub target_holding_id: String,
    pub fetched: usize,
    pub backup_path: PathBuf,
    pub results: Vec<ItemResult>,
}

impl BatchReport {
    pub fn candidates(&self) -> usize {
        self.results.len()
    }

    pub fn moved(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.candidates() - self.moved()
    }

    /// Items deleted but not recreated
    pub fn orphaned(&self) -> impl Iterator<Item = &ItemResult> {
        self.results.iter().filter(|r| r.outcome.is_orphaned())
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Runs migrations against a catalog service
pub struct BatchController {
    catalog: Arc<dyn CatalogService>,
    mover: MoveOrchestrator,
    backup: BackupWriter,
}

impl BatchController {
    pub fn new(catalog: Arc<dyn CatalogService>, moves: MoveConfig, backup: BackupWriter) -> Self {
        let mover = MoveOrchestrator::new(Arc::clone(&catalog), moves);
        Self {
            catalog,
            mover,
            backup,
        }
    }

    /// Describe the target holding, collect candidates and back them up
    pub async fn prepare(&self, bib_id: &str, target_holding_id: &str) -> Result<MigrationPlan> {
        let descriptor = self
            .describe_holding(bib_id, target_holding_id)
            .await
            .inspect_err(|e| error!("Aborting migration of {bib_id}: {e}"))?;
        info!("Target holding {target_holding_id}: {descriptor}");

        let items = self
            .fetch_all_items(bib_id)
            .await
            .inspect_err(|e| error!("Aborting migration of {bib_id}: {e}"))?;
        let fetched = items.len();

        let candidates: Vec<Item> = items
            .into_iter()
            .filter(|item| {
                let report = MatchReport::evaluate(item, &descriptor);
                if !report.is_match() {
                    debug!("Skipping item {}: {report:?}", item.barcode());
                }
                report.is_match()
            })
            .collect();
        info!("{} of {fetched} items belong to the target holding", candidates.len());

        let backup_path = self
            .backup
            .write(bib_id, &descriptor, &candidates)
            .await
            .inspect_err(|e| error!("Aborting migration of {bib_id}: {e}"))?;

        Ok(MigrationPlan {
            bib_id: bib_id.to_string(),
            target_holding_id: target_holding_id.to_string(),
            descriptor,
            fetched,
            candidates,
            backup_path,
        })
    }

    /// Move every candidate of `plan`, reporting each outcome to `observer`
    pub async fn execute<F>(&self, plan: MigrationPlan, mut observer: F) -> BatchReport
    where
        F: FnMut(&ItemResult),
    {
        let mut results = Vec::with_capacity(plan.candidates.len());

        for mut item in plan.candidates {
            let source_holding_id = item.holding_id().to_string();
            let holding_call_number = item.call_number().to_string();

            update_for_move(&mut item, &holding_call_number);
            let outcome = self
                .mover
                .move_item(&mut item, &plan.bib_id, &plan.target_holding_id)
                .await;

            if !outcome.is_done() {
                warn!("Item {}: {outcome}", item.barcode());
            }

            let result = ItemResult {
                barcode: item.barcode().to_string(),
                source_holding_id,
                outcome,
            };
            observer(&result);
            results.push(result);
        }

        let report = BatchReport {
            bib_id: plan.bib_id,
            target_holding_id: plan.target_holding_id,
            fetched: plan.fetched,
            backup_path: plan.backup_path,
            results,
        };
        info!(
            "Moved {} of {} items, {} failed",
            report.moved(),
            report.candidates(),
            report.failed()
        );
        report
    }

    /// Prepare and execute without confirmation
    pub async fn run(&self, bib_id: &str, target_holding_id: &str) -> Result<BatchReport> {
        let plan = self.prepare(bib_id, target_holding_id).await?;
        Ok(self.execute(plan, |_| {}).await)
    }

    async fn describe_holding(&self, bib_id: &str, holding_id: &str) -> Result<HoldingDescriptor> {
        let xml = self.catalog.fetch_holding(bib_id, holding_id).await?;
        HoldingDescriptor::from_marcxml(&xml).map_err(|e| Error::descriptor(holding_id, e))
    }

    /// The first page fixes the total; exactly the pages it implies are fetched
    async fn fetch_all_items(&self, bib_id: &str) -> Result<Vec<Item>> {
        let first = self
            .catalog
            .fetch_items(bib_id, 0, PAGE_SIZE)
            .await
            .map_err(|e| Error::fetch(bib_id, 0, e))?;

        let total = first.total_record_count;
        let extra_pages = total.div_ceil(PAGE_SIZE).saturating_sub(1);
        debug!("Bib {bib_id} has {total} items, {extra_pages} more page(s)");

        let mut items = first.items;
        items.reserve(total.saturating_sub(items.len()));

        for page in 1..=extra_pages {
            let offset = page * PAGE_SIZE;
            let next = self
                .catalog
                .fetch_items(bib_id, offset, PAGE_SIZE)
                .await
                .map_err(|e| Error::fetch(bib_id, offset, e))?;
            items.extend(next.items);
        }

        if items.len() != total {
            warn!(
                "Bib {bib_id} reported {total} items but {} were returned",
                items.len()
            );
        }
        Ok(items)
    }
}
