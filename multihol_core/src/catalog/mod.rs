//! Catalog service access
//!
//! - `error`: typed remote failures and their classification
//! - `client`: reqwest implementation with rate limiting
//!
//! The batch controller and the move orchestrator only see the
//! [`CatalogService`] trait, so tests drive them with a scripted mock.

pub mod client;
pub mod error;

pub use client::{CatalogConfig, HttpCatalogClient};
pub use error::{ApiFailureKind, CatalogError, ErrorCodeMap};

use crate::model::{Item, ItemPage};
use async_trait::async_trait;
use std::fmt;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Default catalog API root
pub const DEFAULT_BASE_URL: &str = "https://api-eu.hosted.exlibrisgroup.com/almaws/v1";

/// Items per page when listing the items of a bib record
pub const PAGE_SIZE: usize = 100;

/// Holding id that lists the items of all holdings of a bib record
pub const ALL_HOLDINGS: &str = "ALL";

/// What the service does with the source holding once its last item is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingDisposition {
    /// Delete the holding when it becomes empty
    Delete,
    /// Keep the holding even if it becomes empty
    Retain,
}

impl HoldingDisposition {
    /// Query value of the `holdings` parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Retain => "retain",
        }
    }

    /// The target holding must survive while all its items are recreated in it
    pub fn for_move(source_holding_id: &str, target_holding_id: &str) -> Self {
        if source_holding_id == target_holding_id {
            Self::Retain
        } else {
            Self::Delete
        }
    }
}

impl fmt::Display for HoldingDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Operations the migration needs from the remote catalog
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// MARCXML of a holding record
    async fn fetch_holding(&self, bib_id: &str, holding_id: &str) -> Result<String>;

    /// One page of the items of all holdings of `bib_id`
    async fn fetch_items(&self, bib_id: &str, offset: usize, limit: usize) -> Result<ItemPage>;

    /// Delete an item at its link
    async fn delete_item(&self, item: &Item, holdings: HoldingDisposition) -> Result<()>;

    /// Replace an item in place
    async fn update_item(&self, item: &Item) -> Result<Item>;

    /// Create an item under the given holding
    async fn create_item(&self, bib_id: &str, holding_id: &str, item: &Item) -> Result<Item>;
}
