//! Command orchestrators
//!
//! Orchestrators sit between the clap layer and the core library services.

pub mod migrate_orchestrator;
