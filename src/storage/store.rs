use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::{NewSale, OwnerId, SaleId, SaleRecord, Snapshot};

use super::Repository;

/// Where sales live. Every operation is scoped to one owner; a store never
/// hands out or deletes another owner's records.
///
/// Implementations bump the counter behind [`RecordStore::changes`] after each
/// successful write so that subscribers re-read the collection.
pub trait RecordStore: Clone + Send + Sync + 'static {
    /// Change notifications. The value is a write counter; only the fact that
    /// it moved matters.
    fn changes(&self) -> watch::Receiver<u64>;

    /// The owner's full collection as it is now.
    fn snapshot(&self, owner: &OwnerId) -> impl Future<Output = Result<Snapshot>> + Send;

    /// Persist a new sale. The store assigns the id and timestamp.
    fn create(&self, owner: &OwnerId, sale: NewSale) -> impl Future<Output = Result<SaleRecord>> + Send;

    /// Persist an already-built record as is (imports).
    fn insert(&self, record: SaleRecord) -> impl Future<Output = Result<()>> + Send;

    /// Remove one of the owner's sales. `Ok(false)` if the owner has no such sale.
    fn delete(&self, owner: &OwnerId, id: SaleId) -> impl Future<Output = Result<bool>> + Send;

    /// Whether a sale with this id exists for any owner.
    fn contains(&self, id: SaleId) -> impl Future<Output = Result<bool>> + Send;

    /// Follow the owner's collection: the current snapshot first, then a fresh
    /// one after every change.
    fn subscribe(&self, owner: &OwnerId) -> Subscription<Self> {
        Subscription {
            store: self.clone(),
            owner: owner.clone(),
            changes: self.changes(),
            delivered_initial: false,
        }
    }
}

/// A live view of one owner's sales.
///
/// Each delivery is a complete snapshot that supersedes the previous one.
/// Changes that land while the consumer is busy are coalesced into a single
/// delivery.
pub struct Subscription<S: RecordStore> {
    store: S,
    owner: OwnerId,
    changes: watch::Receiver<u64>,
    delivered_initial: bool,
}

impl<S: RecordStore> Subscription<S> {
    /// Wait for the next snapshot. The first call returns immediately.
    ///
    /// Returns `None` only if the store's change channel closes. The
    /// subscription keeps its own handle on the store, so with `SqliteStore`
    /// that never happens and the stream ends when the subscription is dropped.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        if self.delivered_initial {
            self.changes.changed().await.ok()?;
        }
        self.delivered_initial = true;

        // Mark the version seen before reading, so a write racing with the
        // read triggers another delivery instead of being lost.
        let version = *self.changes.borrow_and_update();
        debug!(owner = %self.owner, version, "Delivering snapshot");

        Some(self.store.snapshot(&self.owner).await)
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}

/// Local store backed by the SQLite repository. Timestamps come from the
/// local clock.
#[derive(Clone)]
pub struct SqliteStore {
    repo: Repository,
    changes: Arc<watch::Sender<u64>>,
}

impl SqliteStore {
    pub fn new(repo: Repository) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            repo,
            changes: Arc::new(changes),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

impl RecordStore for SqliteStore {
    fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    async fn snapshot(&self, owner: &OwnerId) -> Result<Snapshot> {
        let sales = self.repo.list_sales(owner).await?;
        Ok(Snapshot::from_unordered(sales))
    }

    async fn create(&self, owner: &OwnerId, sale: NewSale) -> Result<SaleRecord> {
        let record = SaleRecord::create(owner.clone(), sale, Utc::now());
        self.repo.save_sale(&record).await?;
        self.notify();
        Ok(record)
    }

    async fn insert(&self, record: SaleRecord) -> Result<()> {
        self.repo.save_sale(&record).await?;
        self.notify();
        Ok(())
    }

    async fn delete(&self, owner: &OwnerId, id: SaleId) -> Result<bool> {
        let deleted = self.repo.delete_sale(owner, id).await?;
        if deleted {
            self.notify();
        }
        Ok(deleted)
    }

    async fn contains(&self, id: SaleId) -> Result<bool> {
        self.repo.sale_exists(id).await
    }
}
