//! Repository abstraction and implementations
//!
//! A repository is constructed around exactly one session and never
//! commits on its own. The caller decides when the unit of work ends
//! through [`UnitOfWork`].

use async_trait::async_trait;

use crate::models::{NewProduct, Product, ProductId, ProductPatch};

pub mod memory;
pub mod products;

pub use memory::{MemoryProductRepo, MemorySessionProvider, MemoryStore};
pub use products::PgProductRepo;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("session already closed")]
    SessionClosed,

    #[error("in-memory store lock poisoned")]
    Poisoned,

    #[error("product id sequence exhausted")]
    IdsExhausted,
}

impl DbError {
    /// Connection could not be obtained (pool exhausted or shut down).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)
        )
    }
}

/// Product storage operations. Absence is `None`/`false`, never an error.
#[async_trait]
pub trait ProductRepository: Send {
    /// Fetch one product by id.
    async fn get(&mut self, id: ProductId) -> Result<Option<Product>, DbError>;

    /// All products, ordered by id.
    async fn list(&mut self) -> Result<Vec<Product>, DbError>;

    /// Insert a product and return it with its generated id.
    async fn create(&mut self, product: NewProduct) -> Result<Product, DbError>;

    /// Merge the present fields of `patch` onto an existing product.
    async fn update(
        &mut self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, DbError>;

    /// Remove a product. Returns whether a row was deleted.
    async fn delete(&mut self, id: ProductId) -> Result<bool, DbError>;
}

/// Transaction control for the session a repository was built with.
///
/// Both methods end the session; any later call returns
/// [`DbError::SessionClosed`].
#[async_trait]
pub trait UnitOfWork: Send {
    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;
}
