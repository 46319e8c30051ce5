//! Command implementations for the catalog CLI

pub mod serve;

pub use serve::run_serve;
