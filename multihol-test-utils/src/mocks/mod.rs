//! Mock implementations for testing

mod catalog;

pub use catalog::{MockCall, MockCatalogService};
