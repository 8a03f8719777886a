//! Relocation of a single item
//!
//! The catalog has no "move item" call, so a move deletes the item from its
//! current holding and creates it again under the target holding. Between
//! the two calls the item exists nowhere; failures after the delete leave
//! an orphan that must be restored from the backup.
//!
//! Known failure codes are retried locally:
//! - a delete blocked by a policy is retried once after the order line has
//!   been removed from the item with a PUT
//! - a create rejected because the barcode index still knows the deleted
//!   item is retried after a pause, up to `max_create_attempts` POSTs
//! - a create rejected because of a stale order line is retried once
//!   without the order line

use crate::catalog::{ApiFailureKind, CatalogError, CatalogService, ErrorCodeMap, HoldingDisposition};
use crate::error::ValidationError;
use crate::model::Item;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Timing and retry settings for moves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveConfig {
    /// Pause between a successful delete and the create
    pub post_delete_delay: Duration,
    /// Pause between two creates rejected for a barcode conflict
    pub create_retry_delay: Duration,
    /// Upper bound on POSTs per item
    pub max_create_attempts: u32,
    pub codes: ErrorCodeMap,
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            post_delete_delay: Duration::from_secs(1),
            create_retry_delay: Duration::from_secs(2),
            max_create_attempts: 5,
            codes: ErrorCodeMap::default(),
        }
    }
}

impl MoveConfig {
    /// Settings without pauses, for tests and dry runs against mocks
    pub fn immediate() -> Self {
        Self {
            post_delete_delay: Duration::ZERO,
            create_retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_create_attempts == 0 {
            return Err(ValidationError::invalid_configuration(
                "max_create_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Why a move failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveFailure {
    PolicyBlocked,
    BarcodeConflict,
    OrderLineInvalid,
    Unexpected,
}

impl fmt::Display for MoveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PolicyBlocked => "blocked by policy",
            Self::BarcodeConflict => "barcode still in use",
            Self::OrderLineInvalid => "invalid order line",
            Self::Unexpected => "unexpected error",
        };
        f.write_str(text)
    }
}

/// Result of one move
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Done,
    Failed {
        reason: MoveFailure,
        /// The item was deleted but not recreated
        source_deleted: bool,
        /// Last remote error, if any
        detail: Option<CatalogError>,
    },
}

impl MoveOutcome {
    fn failed(reason: MoveFailure, source_deleted: bool, detail: CatalogError) -> Self {
        Self::Failed {
            reason,
            source_deleted,
            detail: Some(detail),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Whether the item now exists nowhere in the catalog
    pub fn is_orphaned(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                source_deleted: true,
                ..
            }
        )
    }
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("moved"),
            Self::Failed {
                reason,
                source_deleted,
                detail,
            } => {
                write!(f, "failed: {reason}")?;
                if *source_deleted {
                    f.write_str(" (item deleted, not recreated)")?;
                }
                if let Some(detail) = detail {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
        }
    }
}

/// Drives the delete and create calls of one item move
pub struct MoveOrchestrator {
    catalog: Arc<dyn CatalogService>,
    config: MoveConfig,
}

impl MoveOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogService>, config: MoveConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &MoveConfig {
        &self.config
    }

    /// Move `item` under `target_holding_id` of `target_bib_id`.
    ///
    /// The item is modified only when the order line has to be dropped. A
    /// failed PUT restores the order line in memory.
    pub async fn move_item(
        &self,
        item: &mut Item,
        target_bib_id: &str,
        target_holding_id: &str,
    ) -> MoveOutcome {
        let disposition = HoldingDisposition::for_move(item.holding_id(), target_holding_id);

        if let Err(outcome) = self.delete(item, disposition).await {
            return outcome;
        }

        self.create(item, target_bib_id, target_holding_id).await
    }

    async fn delete(
        &self,
        item: &mut Item,
        disposition: HoldingDisposition,
    ) -> Result<(), MoveOutcome> {
        let mut order_line_stripped = false;

        loop {
            debug!(
                "Deleting item {} (holdings={disposition})",
                item.barcode()
            );

            let error = match self.catalog.delete_item(item, disposition).await {
                Ok(()) => return Ok(()),
                Err(error) => error,
            };

            match self.config.codes.classify(&error) {
                ApiFailureKind::PolicyBlocked if !order_line_stripped && item.has_order_line() => {
                    info!(
                        "Delete of {} blocked, removing order line {}",
                        item.barcode(),
                        item.item_data.po_line
                    );
                    self.strip_order_line(item).await?;
                    order_line_stripped = true;
                }
                ApiFailureKind::PolicyBlocked => {
                    warn!("Delete of {} blocked: {error}", item.barcode());
                    return Err(MoveOutcome::failed(MoveFailure::PolicyBlocked, false, error));
                }
                _ => {
                    warn!("Delete of {} failed: {error}", item.barcode());
                    return Err(MoveOutcome::failed(MoveFailure::Unexpected, false, error));
                }
            }
        }
    }

    async fn strip_order_line(&self, item: &mut Item) -> Result<(), MoveOutcome> {
        let order_line = std::mem::take(&mut item.item_data.po_line);

        match self.catalog.update_item(item).await {
            Ok(_) => Ok(()),
            Err(error) => {
                warn!(
                    "Removing order line from {} failed: {error}",
                    item.barcode()
                );
                item.item_data.po_line = order_line;
                Err(MoveOutcome::failed(
                    MoveFailure::OrderLineInvalid,
                    false,
                    error,
                ))
            }
        }
    }

    async fn create(&self, item: &mut Item, bib_id: &str, holding_id: &str) -> MoveOutcome {
        sleep(self.config.post_delete_delay).await;

        let mut attempts = 0;
        let mut order_line_cleared = false;

        loop {
            attempts += 1;
            debug!(
                "Creating item {} under {holding_id} (attempt {attempts})",
                item.barcode()
            );

            let error = match self.catalog.create_item(bib_id, holding_id, item).await {
                Ok(_) => {
                    info!("Moved item {} to holding {holding_id}", item.barcode());
                    return MoveOutcome::Done;
                }
                Err(error) => error,
            };

            let kind = self.config.codes.classify(&error);
            let exhausted = attempts >= self.config.max_create_attempts;

            match kind {
                ApiFailureKind::BarcodeConflict if !exhausted => {
                    debug!(
                        "Barcode {} not released yet, retrying in {:?}",
                        item.barcode(),
                        self.config.create_retry_delay
                    );
                    sleep(self.config.create_retry_delay).await;
                }
                ApiFailureKind::OrderLineInvalid
                    if !exhausted && !order_line_cleared && item.has_order_line() =>
                {
                    info!(
                        "Order line {} of {} rejected, creating without it",
                        item.item_data.po_line,
                        item.barcode()
                    );
                    item.item_data.po_line.clear();
                    order_line_cleared = true;
                }
                _ => {
                    let reason = match kind {
                        ApiFailureKind::BarcodeConflict => MoveFailure::BarcodeConflict,
                        ApiFailureKind::OrderLineInvalid => MoveFailure::OrderLineInvalid,
                        ApiFailureKind::PolicyBlocked | ApiFailureKind::Other => {
                            MoveFailure::Unexpected
                        }
                    };
                    warn!(
                        "Item {} was deleted but could not be recreated after {attempts} attempt(s): {error}",
                        item.barcode()
                    );
                    return MoveOutcome::failed(reason, true, error);
                }
            }
        }
    }
}
