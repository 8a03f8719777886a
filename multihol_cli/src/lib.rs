//! multihol command line interface

pub mod auth;
pub mod config;
pub mod orchestrators;
pub mod paths;
pub mod terminal;
