//! Product repository on PostgreSQL
//!
//! Every operation is a single statement:
//! - update: COALESCE per column, so absent patch fields keep their value
//! - delete: row count decides the result, no prior SELECT

use async_trait::async_trait;

use crate::db::session::PgSession;
use crate::models::{NewProduct, Product, ProductId, ProductPatch};
use super::{DbError, ProductRepository, UnitOfWork};

/// Product repository bound to one session
pub struct PgProductRepo {
    session: PgSession,
}

impl PgProductRepo {
    pub fn new(session: PgSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepo {
    async fn get(&mut self, id: ProductId) -> Result<Option<Product>, DbError> {
        let product: Option<Product> = sqlx::query_as(
            "SELECT id, name, description, price FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.session.conn()?)
        .await?;

        Ok(product)
    }

    async fn list(&mut self) -> Result<Vec<Product>, DbError> {
        let products: Vec<Product> =
            sqlx::query_as("SELECT id, name, description, price FROM products ORDER BY id")
                .fetch_all(self.session.conn()?)
                .await?;

        Ok(products)
    }

    async fn create(&mut self, product: NewProduct) -> Result<Product, DbError> {
        let created: Product = sqlx::query_as(
            r#"
            INSERT INTO products (name, description, price)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, price
            "#,
        )
        .bind(product.name())
        .bind(product.description())
        .bind(product.price())
        .fetch_one(self.session.conn()?)
        .await?;

        tracing::debug!(session = %self.session.id(), id = created.id, "product inserted");
        Ok(created)
    }

    async fn update(
        &mut self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, DbError> {
        let updated: Option<Product> = sqlx::query_as(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price)
            WHERE id = $1
            RETURNING id, name, description, price
            "#,
        )
        .bind(id)
        .bind(patch.name())
        .bind(patch.description())
        .bind(patch.price())
        .fetch_optional(self.session.conn()?)
        .await?;

        Ok(updated)
    }

    async fn delete(&mut self, id: ProductId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.session.conn()?)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UnitOfWork for PgProductRepo {
    async fn commit(&mut self) -> Result<(), DbError> {
        self.session.commit().await
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.session.rollback().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, ensure_schema, PgSessionProvider, SessionProvider};

    // Integration tests - run with DATABASE_URL set
    // cargo test -p catalog-server -- --ignored

    async fn provider() -> PgSessionProvider {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        ensure_schema(&pool).await.expect("schema bootstrap failed");
        PgSessionProvider::new(pool)
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_then_get_round_trip() {
        let provider = provider().await;

        let mut repo = provider.open().await.unwrap();
        let created = repo
            .create(NewProduct::new("Pen", "Blue ink", 150).unwrap())
            .await
            .unwrap();
        repo.commit().await.unwrap();

        let mut repo = provider.open().await.unwrap();
        let fetched = repo.get(created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn partial_update_keeps_other_columns() {
        let provider = provider().await;
        let mut repo = provider.open().await.unwrap();

        let created = repo
            .create(NewProduct::new("Pen", "Blue ink", 150).unwrap())
            .await
            .unwrap();
        let patch = ProductPatch::new(None, None, Some(200)).unwrap();
        let updated = repo.update(created.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.name, "Pen");
        assert_eq!(updated.description, "Blue ink");
        assert_eq!(updated.price, 200);
        repo.rollback().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn missing_rows_are_absent() {
        let provider = provider().await;
        let mut repo = provider.open().await.unwrap();

        assert_eq!(repo.get(-1).await.unwrap(), None);
        assert!(!repo.delete(-1).await.unwrap());
        let patch = ProductPatch::new(Some("x".into()), None, None).unwrap();
        assert_eq!(repo.update(-1, patch).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn rolled_back_insert_is_invisible() {
        let provider = provider().await;

        let mut repo = provider.open().await.unwrap();
        let created = repo
            .create(NewProduct::new("Ghost", "never committed", 1).unwrap())
            .await
            .unwrap();
        repo.rollback().await.unwrap();

        let mut repo = provider.open().await.unwrap();
        assert_eq!(repo.get(created.id).await.unwrap(), None);
    }
}
