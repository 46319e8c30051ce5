//! In-memory product storage with the same session contract as Postgres.
//!
//! Writes are staged per session and only reach the shared table on
//! commit. Ids are handed out from a shared counter and are not reused
//! after a rollback, the same way a database sequence behaves.
//!
//! Updates are replayed against the committed row at commit time. If
//! another session deleted the row first, the update affects nothing,
//! as a Postgres `UPDATE` matching no row would.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::db::session::SessionProvider;
use crate::models::{NewProduct, Product, ProductId, ProductPatch};
use super::{DbError, ProductRepository, UnitOfWork};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<ProductId, Product>,
    last_id: ProductId,
}

/// Shared product table
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<Mutex<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>, DbError> {
        self.table.lock().map_err(|_| DbError::Poisoned)
    }

    /// Number of committed rows.
    pub fn len(&self) -> Result<usize, DbError> {
        Ok(self.lock()?.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool, DbError> {
        Ok(self.len()? == 0)
    }
}

/// A write staged by one session
#[derive(Debug, Clone)]
enum Staged {
    /// Row created in this session; not yet visible to others
    Inserted(Product),
    /// Committed row changed in this session. The patches are replayed
    /// on the committed row at commit time, so a concurrent delete or
    /// update is not overwritten with a stale copy.
    Updated {
        view: Product,
        patches: Vec<ProductPatch>,
    },
    Deleted,
}

impl Staged {
    fn view(&self) -> Option<&Product> {
        match self {
            Self::Inserted(product) | Self::Updated { view: product, .. } => Some(product),
            Self::Deleted => None,
        }
    }
}

/// Product repository over a [`MemoryStore`], bound to one session
pub struct MemoryProductRepo {
    store: MemoryStore,
    pending: BTreeMap<ProductId, Staged>,
    open: bool,
}

impl MemoryProductRepo {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
            open: true,
        }
    }

    fn ensure_open(&self) -> Result<(), DbError> {
        if self.open {
            Ok(())
        } else {
            Err(DbError::SessionClosed)
        }
    }

    /// Current view for this session: staged writes over committed rows.
    fn lookup(&self, id: ProductId) -> Result<Option<Product>, DbError> {
        self.ensure_open()?;
        if let Some(staged) = self.pending.get(&id) {
            return Ok(staged.view().cloned());
        }
        Ok(self.store.lock()?.rows.get(&id).cloned())
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepo {
    async fn get(&mut self, id: ProductId) -> Result<Option<Product>, DbError> {
        self.lookup(id)
    }

    async fn list(&mut self) -> Result<Vec<Product>, DbError> {
        self.ensure_open()?;
        let mut view = self.store.lock()?.rows.clone();
        for (id, staged) in &self.pending {
            match staged.view() {
                Some(product) => {
                    view.insert(*id, product.clone());
                }
                None => {
                    view.remove(id);
                }
            }
        }
        Ok(view.into_values().collect())
    }

    async fn create(&mut self, product: NewProduct) -> Result<Product, DbError> {
        self.ensure_open()?;
        let id = {
            let mut table = self.store.lock()?;
            table.last_id = table
                .last_id
                .checked_add(1)
                .ok_or(DbError::IdsExhausted)?;
            table.last_id
        };
        let created = product.into_product(id);
        self.pending.insert(id, Staged::Inserted(created.clone()));
        Ok(created)
    }

    async fn update(
        &mut self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, DbError> {
        let Some(mut product) = self.lookup(id)? else {
            return Ok(None);
        };
        patch.apply_to(&mut product);

        let staged = match self.pending.remove(&id) {
            Some(Staged::Inserted(_)) => Staged::Inserted(product.clone()),
            Some(Staged::Updated { mut patches, .. }) => {
                patches.push(patch);
                Staged::Updated {
                    view: product.clone(),
                    patches,
                }
            }
            _ => Staged::Updated {
                view: product.clone(),
                patches: vec![patch],
            },
        };
        self.pending.insert(id, staged);
        Ok(Some(product))
    }

    async fn delete(&mut self, id: ProductId) -> Result<bool, DbError> {
        if self.lookup(id)?.is_none() {
            return Ok(false);
        }
        // A row created in this session was never committed; forgetting it is enough.
        if let Some(Staged::Inserted(_)) = self.pending.remove(&id) {
            return Ok(true);
        }
        self.pending.insert(id, Staged::Deleted);
        Ok(true)
    }
}

#[async_trait]
impl UnitOfWork for MemoryProductRepo {
    async fn commit(&mut self) -> Result<(), DbError> {
        self.ensure_open()?;
        let mut table = self.store.lock()?;
        for (id, staged) in std::mem::take(&mut self.pending) {
            match staged {
                Staged::Inserted(product) => {
                    table.rows.insert(id, product);
                }
                Staged::Updated { patches, .. } => match table.rows.get_mut(&id) {
                    Some(row) => patches.iter().for_each(|patch| patch.apply_to(row)),
                    None => {
                        tracing::debug!(product_id = id, "row deleted by another session, update skipped");
                    }
                },
                Staged::Deleted => {
                    table.rows.remove(&id);
                }
            }
        }
        self.open = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.ensure_open()?;
        self.pending.clear();
        self.open = false;
        Ok(())
    }
}

/// Sessions over a shared in-memory table
#[derive(Debug, Clone, Default)]
pub struct MemorySessionProvider {
    store: MemoryStore,
}

impl MemorySessionProvider {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionProvider for MemorySessionProvider {
    type Repo = MemoryProductRepo;

    async fn open(&self) -> Result<MemoryProductRepo, DbError> {
        Ok(MemoryProductRepo::new(self.store.clone()))
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.store.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pen() -> NewProduct {
        NewProduct::new("Pen", "Blue ink", 150).unwrap()
    }

    #[tokio::test]
    async fn uncommitted_writes_visible_only_to_own_session() {
        let store = MemoryStore::new();
        let mut writer = MemoryProductRepo::new(store.clone());
        let mut reader = MemoryProductRepo::new(store.clone());

        let created = writer.create(pen()).await.unwrap();
        assert_eq!(writer.get(created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(reader.get(created.id).await.unwrap(), None);

        writer.commit().await.unwrap();
        assert_eq!(reader.get(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = MemoryStore::new();
        let mut repo = MemoryProductRepo::new(store.clone());
        repo.create(pen()).await.unwrap();
        repo.rollback().await.unwrap();

        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn ids_not_reused_after_rollback() {
        let store = MemoryStore::new();

        let mut first = MemoryProductRepo::new(store.clone());
        let discarded = first.create(pen()).await.unwrap();
        first.rollback().await.unwrap();

        let mut second = MemoryProductRepo::new(store.clone());
        let kept = second.create(pen()).await.unwrap();
        assert!(kept.id > discarded.id);
    }

    #[tokio::test]
    async fn closed_session_rejects_operations() {
        let mut repo = MemoryProductRepo::new(MemoryStore::new());
        repo.commit().await.unwrap();

        assert!(matches!(repo.get(1).await, Err(DbError::SessionClosed)));
        assert!(matches!(repo.commit().await, Err(DbError::SessionClosed)));
        assert!(matches!(repo.rollback().await, Err(DbError::SessionClosed)));
    }

    #[tokio::test]
    async fn list_merges_staged_changes_in_id_order() {
        let store = MemoryStore::new();
        let mut seed = MemoryProductRepo::new(store.clone());
        let a = seed.create(pen()).await.unwrap();
        let b = seed.create(pen()).await.unwrap();
        seed.commit().await.unwrap();

        let mut repo = MemoryProductRepo::new(store);
        assert!(repo.delete(a.id).await.unwrap());
        let c = repo.create(pen()).await.unwrap();

        let ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b.id, c.id]);
    }

    #[tokio::test]
    async fn staged_delete_hides_row_and_is_not_repeatable() {
        let store = MemoryStore::new();
        let mut seed = MemoryProductRepo::new(store.clone());
        let created = seed.create(pen()).await.unwrap();
        seed.commit().await.unwrap();

        let mut repo = MemoryProductRepo::new(store.clone());
        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        let patch = ProductPatch::new(None, None, Some(1)).unwrap();
        assert_eq!(repo.update(created.id, patch).await.unwrap(), None);

        repo.commit().await.unwrap();
        assert!(store.is_empty().unwrap());
    }

    async fn seed(store: &MemoryStore) -> Product {
        let mut repo = MemoryProductRepo::new(store.clone());
        let created = repo.create(pen()).await.unwrap();
        repo.commit().await.unwrap();
        created
    }

    #[tokio::test]
    async fn committed_delete_wins_over_stale_update() {
        let store = MemoryStore::new();
        let created = seed(&store).await;

        let mut deleter = MemoryProductRepo::new(store.clone());
        let mut updater = MemoryProductRepo::new(store.clone());
        assert!(deleter.delete(created.id).await.unwrap());
        let patch = ProductPatch::new(None, None, Some(999)).unwrap();
        assert!(updater.update(created.id, patch).await.unwrap().is_some());

        deleter.commit().await.unwrap();
        updater.commit().await.unwrap();

        let mut reader = MemoryProductRepo::new(store.clone());
        assert_eq!(reader.get(created.id).await.unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn concurrent_updates_to_different_fields_both_apply() {
        let store = MemoryStore::new();
        let created = seed(&store).await;

        let mut renamer = MemoryProductRepo::new(store.clone());
        let mut repricer = MemoryProductRepo::new(store.clone());
        let rename = ProductPatch::new(Some("Marker".into()), None, None).unwrap();
        let reprice = ProductPatch::new(None, None, Some(300)).unwrap();
        renamer.update(created.id, rename).await.unwrap();
        repricer.update(created.id, reprice).await.unwrap();

        renamer.commit().await.unwrap();
        repricer.commit().await.unwrap();

        let mut reader = MemoryProductRepo::new(store);
        let row = reader.get(created.id).await.unwrap().unwrap();
        assert_eq!(row.name, "Marker");
        assert_eq!(row.price, 300);
        assert_eq!(row.description, "Blue ink");
    }

    #[tokio::test]
    async fn update_then_delete_of_own_insert_leaves_nothing() {
        let store = MemoryStore::new();
        let mut repo = MemoryProductRepo::new(store.clone());
        let created = repo.create(pen()).await.unwrap();
        let patch = ProductPatch::new(None, None, Some(1)).unwrap();
        assert_eq!(repo.update(created.id, patch).await.unwrap().unwrap().price, 1);
        assert!(repo.delete(created.id).await.unwrap());
        assert_eq!(repo.get(created.id).await.unwrap(), None);

        repo.commit().await.unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn exhausted_id_counter_is_an_error() {
        let store = MemoryStore::new();
        store.table.lock().unwrap().last_id = ProductId::MAX;

        let mut repo = MemoryProductRepo::new(store.clone());
        assert!(matches!(
            repo.create(pen()).await,
            Err(DbError::IdsExhausted)
        ));
        repo.commit().await.unwrap();
        assert!(store.is_empty().unwrap());
    }
}
