//! Database layer - connection pool, sessions, and repositories
//!
//! # Design Principles
//!
//! - One session (transaction) per request, released exactly once
//! - Repositories take their session at construction and never commit
//! - Partial updates merge in a single statement, no read-modify-write

pub mod migrations;
pub mod pool;
pub mod repos;
pub mod session;

pub use migrations::ensure_schema;
pub use pool::{create_pool, create_pool_with_options, PoolSettings};
pub use repos::*;
pub use session::{PgSession, PgSessionProvider, SessionProvider};
