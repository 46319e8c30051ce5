//! Per-request database sessions
//!
//! A [`PgSession`] is one transaction on one pooled connection. It is
//! opened when a request starts and ends exactly once: by `commit`, by
//! `rollback`, or by being dropped (which rolls back and returns the
//! connection to the pool). Drop covers panics and cancelled requests.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repos::{DbError, PgProductRepo, ProductRepository, UnitOfWork};

/// Open transaction scoped to one request
pub struct PgSession {
    id: Uuid,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    /// Acquire a connection and begin a transaction.
    ///
    /// Fails with `PoolTimedOut` when no connection frees up within the
    /// pool's acquire timeout.
    pub async fn begin(pool: &PgPool) -> Result<Self, DbError> {
        let tx = pool.begin().await?;
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "session opened");
        Ok(Self { id, tx: Some(tx) })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.tx.is_some()
    }

    /// Connection to run statements on.
    pub fn conn(&mut self) -> Result<&mut PgConnection, DbError> {
        self.tx.as_deref_mut().ok_or(DbError::SessionClosed)
    }

    pub async fn commit(&mut self) -> Result<(), DbError> {
        let tx = self.tx.take().ok_or(DbError::SessionClosed)?;
        tx.commit().await?;
        tracing::debug!(session = %self.id, "session committed");
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<(), DbError> {
        let tx = self.tx.take().ok_or(DbError::SessionClosed)?;
        tx.rollback().await?;
        tracing::debug!(session = %self.id, "session rolled back");
        Ok(())
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        // sqlx rolls the transaction back when it is dropped
        if self.tx.is_some() {
            tracing::debug!(session = %self.id, "session dropped while open, rolling back");
        }
    }
}

/// Source of one repository (and one session) per request.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    type Repo: ProductRepository + UnitOfWork + 'static;

    /// Open a fresh session and wrap it in a repository.
    async fn open(&self) -> Result<Self::Repo, DbError>;

    /// Check that storage is reachable.
    async fn ping(&self) -> Result<(), DbError>;
}

/// Sessions backed by a PostgreSQL pool
#[derive(Clone, Debug)]
pub struct PgSessionProvider {
    pool: PgPool,
}

impl PgSessionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionProvider for PgSessionProvider {
    type Repo = PgProductRepo;

    async fn open(&self) -> Result<PgProductRepo, DbError> {
        let session = PgSession::begin(&self.pool).await?;
        Ok(PgProductRepo::new(session))
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
