//! catalog-server: product catalog over HTTP
//!
//! Layered as router → use-case → repository, with one database
//! session per request that commits on success and rolls back on fault.

pub mod db;
pub mod http;
pub mod models;
pub mod use_cases;

pub use db::{DbError, MemorySessionProvider, PgSessionProvider, SessionProvider};
pub use http::{build_router, connect_database, run_server, ApiError, ServerConfig, ServerError};
pub use models::{NewProduct, Product, ProductId, ProductPatch};
pub use use_cases::ProductUseCases;
