//! Product use-cases
//!
//! Each operation consumes the use-case instance, so one instance maps to
//! one request and one unit of work. Writes commit once at the end, reads
//! end their session with a rollback, and any repository error rolls the
//! session back before it is returned.

use crate::db::{DbError, ProductRepository, UnitOfWork};
use crate::models::{NewProduct, Product, ProductId, ProductPatch};

pub struct ProductUseCases<R> {
    repo: R,
}

impl<R> ProductUseCases<R>
where
    R: ProductRepository + UnitOfWork,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn get_product(mut self, id: ProductId) -> Result<Option<Product>, DbError> {
        let result = self.repo.get(id).await;
        self.finish_read(result).await
    }

    pub async fn list_products(mut self) -> Result<Vec<Product>, DbError> {
        let result = self.repo.list().await;
        self.finish_read(result).await
    }

    pub async fn create_product(mut self, product: NewProduct) -> Result<Product, DbError> {
        let result = self.repo.create(product).await;
        let created = self.finish_write(result).await?;
        tracing::info!(id = created.id, "product created");
        Ok(created)
    }

    /// Apply a partial update. An empty patch writes nothing and returns
    /// the current product.
    pub async fn update_product(
        mut self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, DbError> {
        if patch.is_empty() {
            tracing::debug!(id, "empty patch, nothing to update");
            return self.get_product(id).await;
        }

        let result = self.repo.update(id, patch).await;
        let updated = self.finish_write(result).await?;
        if updated.is_some() {
            tracing::info!(id, "product updated");
        }
        Ok(updated)
    }

    pub async fn delete_product(mut self, id: ProductId) -> Result<bool, DbError> {
        let result = self.repo.delete(id).await;
        let deleted = self.finish_write(result).await?;
        if deleted {
            tracing::info!(id, "product deleted");
        }
        Ok(deleted)
    }

    async fn finish_read<T>(&mut self, result: Result<T, DbError>) -> Result<T, DbError> {
        match result {
            Ok(value) => {
                if let Err(err) = self.repo.rollback().await {
                    tracing::warn!(error = %err, "failed to close read session");
                }
                Ok(value)
            }
            Err(err) => Err(self.abort(err).await),
        }
    }

    async fn finish_write<T>(&mut self, result: Result<T, DbError>) -> Result<T, DbError> {
        match result {
            Ok(value) => {
                self.repo.commit().await?;
                Ok(value)
            }
            Err(err) => Err(self.abort(err).await),
        }
    }

    /// Roll back after a fault. The original error wins over a rollback failure.
    async fn abort(&mut self, err: DbError) -> DbError {
        tracing::warn!(error = %err, "operation failed, rolling back session");
        if let Err(rollback_err) = self.repo.rollback().await {
            tracing::error!(error = %rollback_err, "rollback failed");
        }
        err
    }
}
