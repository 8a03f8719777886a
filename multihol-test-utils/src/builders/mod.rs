//! Test data builders

mod item;

pub use item::{ItemBuilder, errors, holding_marcxml};
