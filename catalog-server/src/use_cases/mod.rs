//! Use-case layer between HTTP handlers and repositories

pub mod products;

pub use products::ProductUseCases;
