//! multihol core library
//!
//! Moves the items of a bib record that are spread over several holdings
//! into the one holding whose shelf they actually stand on. Items are
//! matched against the target holding's 852 field, their call number
//! history is preserved in the alternative call number, and each item is
//! relocated by deleting and recreating it through the catalog API.

pub mod backup;
pub mod batch;
pub mod call_number;
pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod ids;
pub mod matching;
pub mod model;
pub mod mover;
pub mod security;
pub mod update;

pub use backup::BackupWriter;
pub use batch::{BatchController, BatchReport, ItemResult, MigrationPlan};
pub use catalog::{
    ApiFailureKind, CatalogConfig, CatalogError, CatalogService, ErrorCodeMap,
    HoldingDisposition, HttpCatalogClient,
};
pub use descriptor::HoldingDescriptor;
pub use error::{Error, Result};
pub use ids::{IdRules, validate_bib_id, validate_holding_id};
pub use matching::{MatchReport, matches};
pub use model::{CodeDesc, Item, ItemPage};
pub use mover::{MoveConfig, MoveFailure, MoveOrchestrator, MoveOutcome};
pub use update::update_for_move;
