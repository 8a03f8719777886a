//! Test utilities for multihol
//!
//! A scripted in-memory catalog service plus builders for items, holding
//! records and remote errors.

pub mod builders;
pub mod mocks;

pub use builders::{ItemBuilder, errors, holding_marcxml};
pub use mocks::{MockCall, MockCatalogService};
