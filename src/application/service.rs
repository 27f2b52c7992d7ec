use chrono::{Datelike, Utc};
use tracing::{debug, info};

use crate::config::LedgerConfig;
use crate::domain::{
    OwnerId, SaleId, SaleInput, SaleRecord, Snapshot, in_month, local_time, summarize,
    validate_sale_input,
};
use crate::storage::{
    Identity, IdentityProvider, LocalIdentity, RecordStore, Repository, SqliteStore, Subscription,
};

use super::{AppError, MonthlyReport};

/// Application service providing the ledger operations.
/// Built once per process; every operation acts on behalf of one identity.
pub struct LedgerService<S: RecordStore = SqliteStore> {
    config: LedgerConfig,
    store: S,
    identity: Option<Identity>,
}

/// Filter for listing sales
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    /// Customer name, phone or HUID fragment
    pub search: Option<String>,
    /// Calendar year; with `month` unset, the whole year
    pub year: Option<i32>,
    /// 1-based month; with `year` unset, the current year
    pub month: Option<u32>,
    pub limit: Option<usize>,
}

impl LedgerService<SqliteStore> {
    /// Create the database if needed and generate this device's identity.
    pub async fn init(config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", config.database);
        let repo = Repository::init(&db_url).await?;

        let identity = LocalIdentity::new(repo.clone(), config.account.clone());
        let device = identity.ensure_device().await?;
        info!(database = %config.database, device = %device, "Ledger initialized");

        Self::open(config, repo, identity).await
    }

    /// Open an existing database.
    pub async fn connect(config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", config.database);
        let repo = Repository::connect(&db_url).await?;
        repo.migrate().await?;

        let identity = LocalIdentity::new(repo.clone(), config.account.clone());
        Self::open(config, repo, identity).await
    }

    async fn open(
        config: LedgerConfig,
        repo: Repository,
        provider: impl IdentityProvider,
    ) -> Result<Self, AppError> {
        let identity = provider.current_identity().await?;
        debug!(owner = ?identity.as_ref().map(|i| i.owner_id.as_str()), "Resolved identity");
        Ok(Self::new(config, SqliteStore::new(repo), identity))
    }
}

impl<S: RecordStore> LedgerService<S> {
    pub fn new(config: LedgerConfig, store: S, identity: Option<Identity>) -> Self {
        Self {
            config,
            store,
            identity,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The acting identity. Without one, nothing in the store is reachable.
    pub fn identity(&self) -> Result<&Identity, AppError> {
        self.identity.as_ref().ok_or(AppError::NotSignedIn)
    }

    fn owner(&self) -> Result<&OwnerId, AppError> {
        Ok(&self.identity()?.owner_id)
    }

    // ========================
    // Sale operations
    // ========================

    /// Validate a sale form and persist it. Nothing is written if validation fails.
    pub async fn record_sale(&self, input: &SaleInput) -> Result<SaleRecord, AppError> {
        let owner = self.owner()?;
        let sale = validate_sale_input(input)?;
        let record = self.store.create(owner, sale).await?;

        info!(id = %record.id, customer = %record.customer_name, "Recorded sale");
        Ok(record)
    }

    /// Delete one of the current owner's sales.
    pub async fn delete_sale(&self, id: SaleId) -> Result<(), AppError> {
        let owner = self.owner()?;
        if !self.store.delete(owner, id).await? {
            return Err(AppError::SaleNotFound(id.to_string()));
        }

        info!(id = %id, "Deleted sale");
        Ok(())
    }

    /// Store an existing record under the current owner, keeping its id,
    /// timestamp and pricing schema.
    pub async fn import_sale(&self, mut record: SaleRecord) -> Result<SaleRecord, AppError> {
        let owner = self.owner()?;
        if self.store.contains(record.id).await? {
            return Err(AppError::SaleAlreadyExists(record.id.to_string()));
        }

        record.owner_id = owner.clone();
        self.store.insert(record.clone()).await?;
        Ok(record)
    }

    pub async fn get_sale(&self, id: SaleId) -> Result<SaleRecord, AppError> {
        self.snapshot()
            .await?
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::SaleNotFound(id.to_string()))
    }

    /// The current owner's sales, newest first.
    pub async fn snapshot(&self) -> Result<Snapshot, AppError> {
        let owner = self.owner()?;
        Ok(self.store.snapshot(owner).await?)
    }

    /// Follow the current owner's sales as they change.
    pub fn subscribe(&self) -> Result<Subscription<S>, AppError> {
        Ok(self.store.subscribe(self.owner()?))
    }

    /// Sales matching a filter, newest first.
    pub async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<SaleRecord>, AppError> {
        let snapshot = self.snapshot().await?;
        let offset = self.config.utc_offset;

        let year = match (filter.year, filter.month) {
            (None, Some(_)) => Some(self.current_year()),
            (year, _) => year,
        };
        if let Some(month) = filter.month {
            if !(1..=12).contains(&month) {
                return Err(AppError::InvalidMonth(month));
            }
        }

        let term = filter.search.as_deref().unwrap_or("");
        let sales = snapshot
            .search(term)
            .into_iter()
            .filter(|sale| {
                let local = local_time(sale.timestamp, &offset);
                year.is_none_or(|y| local.year() == y)
                    && filter.month.is_none_or(|m| local.month() == m)
            })
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(sales)
    }

    /// All sales of one calendar month, ready for export.
    pub async fn monthly_report(&self, year: i32, month: u32) -> Result<MonthlyReport, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::InvalidMonth(month));
        }

        let snapshot = self.snapshot().await?;
        let sales: Vec<SaleRecord> = in_month(snapshot.sales(), year, month, &self.config.utc_offset)
            .into_iter()
            .cloned()
            .collect();

        Ok(MonthlyReport {
            year,
            month,
            summary: summarize(&sales),
            sales,
        })
    }

    /// Years with sales plus the current one, newest first.
    pub async fn available_years(&self) -> Result<Vec<i32>, AppError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.available_years(self.current_year(), &self.config.utc_offset))
    }

    /// Year and month of "now" in the configured offset.
    pub fn current_period(&self) -> (i32, u32) {
        let now = local_time(Utc::now(), &self.config.utc_offset);
        (now.year(), now.month())
    }

    fn current_year(&self) -> i32 {
        self.current_period().0
    }
}
