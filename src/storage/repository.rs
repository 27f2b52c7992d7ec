use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{LegacyPricing, OwnerId, PriceTotals, SaleId, SalePricing, SaleRecord};

use super::MIGRATION_001_INITIAL;

const SALE_COLUMNS: &str = "id, owner_id, customer_name, customer_phone, item_name, huid, notes, \
    item_base_price_cents, gst_amount_cents, discount_amount_cents, total_before_discount_cents, final_price_cents, \
    legacy_weight_grams, legacy_gold_rate_cents, legacy_making_charges_cents, legacy_total_price_cents, \
    timestamp";

/// Repository for persisting and querying sales.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Sale operations
    // ========================

    /// Insert a sale. Current-schema records fill the price columns, legacy
    /// records the legacy ones; the other set stays NULL.
    pub async fn save_sale(&self, sale: &SaleRecord) -> Result<()> {
        debug!(id = %sale.id, owner = %sale.owner_id, legacy = sale.is_legacy(), "Inserting sale");

        let (current, legacy) = match &sale.pricing {
            SalePricing::Current(totals) => (Some(totals), None),
            SalePricing::Legacy(legacy) => (None, Some(legacy)),
        };

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, owner_id, customer_name, customer_phone, item_name, huid, notes,
                item_base_price_cents, gst_amount_cents, discount_amount_cents, total_before_discount_cents, final_price_cents,
                legacy_weight_grams, legacy_gold_rate_cents, legacy_making_charges_cents, legacy_total_price_cents,
                timestamp, recorded_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.owner_id.as_str())
        .bind(&sale.customer_name)
        .bind(&sale.customer_phone)
        .bind(&sale.item_name)
        .bind(&sale.huid)
        .bind(&sale.notes)
        .bind(current.map(|t| t.item_base_price))
        .bind(current.map(|t| t.gst_amount))
        .bind(current.map(|t| t.discount_amount))
        .bind(current.map(|t| t.total_price_before_discount))
        .bind(current.map(|t| t.final_price))
        .bind(legacy.and_then(|l| l.weight_grams))
        .bind(legacy.and_then(|l| l.gold_rate))
        .bind(legacy.and_then(|l| l.making_charges))
        .bind(legacy.and_then(|l| l.total_price))
        .bind(sale.timestamp.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save sale")?;

        Ok(())
    }

    /// All sales of one owner, in no particular order.
    pub async fn list_sales(&self, owner: &OwnerId) -> Result<Vec<SaleRecord>> {
        let query = format!("SELECT {} FROM sales WHERE owner_id = ?", SALE_COLUMNS);
        let rows = sqlx::query(&query)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list sales")?;

        debug!(owner = %owner, count = rows.len(), "Loaded sales");
        // One undecodable row must not hide the rest of the ledger
        Ok(rows
            .iter()
            .filter_map(|row| match Self::row_to_sale(row) {
                Ok(sale) => Some(sale),
                Err(e) => {
                    warn!(owner = %owner, error = %e, "Skipping undecodable sale row");
                    None
                }
            })
            .collect())
    }

    /// Get one of an owner's sales by ID.
    pub async fn get_sale(&self, owner: &OwnerId, id: SaleId) -> Result<Option<SaleRecord>> {
        let query = format!("SELECT {} FROM sales WHERE owner_id = ? AND id = ?", SALE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(owner.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch sale")?;

        row.as_ref().map(Self::row_to_sale).transpose()
    }

    /// Delete one of an owner's sales. Returns false when the owner has no
    /// sale with that ID.
    pub async fn delete_sale(&self, owner: &OwnerId, id: SaleId) -> Result<bool> {
        debug!(id = %id, owner = %owner, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE owner_id = ? AND id = ?")
            .bind(owner.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete sale")?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether any owner already has a sale with this ID.
    pub async fn sale_exists(&self, id: SaleId) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM sales WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to check sale")?;

        Ok(row.get::<i64, _>("count") > 0)
    }

    // ========================
    // Device identity
    // ========================

    /// The device ID, if this database has been initialized.
    pub async fn get_device_id(&self) -> Result<Option<String>> {
        let row = sqlx::query("SELECT device_id FROM device_identity WHERE singleton = 1")
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read device identity")?;

        Ok(row.map(|r| r.get("device_id")))
    }

    /// Return the device ID, generating it on first use.
    pub async fn get_or_create_device_id(&self) -> Result<String> {
        sqlx::query(
            "INSERT OR IGNORE INTO device_identity (singleton, device_id, created_at) VALUES (1, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to create device identity")?;

        self.get_device_id()
            .await?
            .ok_or_else(|| anyhow::anyhow!("Device identity missing after creation"))
    }

    fn row_to_sale(row: &sqlx::sqlite::SqliteRow) -> Result<SaleRecord> {
        let id_str: String = row.get("id");
        let owner_id: String = row.get("owner_id");
        let timestamp_str: String = row.get("timestamp");
        let base_price: Option<i64> = row.get("item_base_price_cents");

        // A row without a base price was written by the old weight/rate schema.
        let pricing = match base_price {
            Some(item_base_price) => {
                let gst_amount: Option<i64> = row.get("gst_amount_cents");
                let discount_amount: Option<i64> = row.get("discount_amount_cents");
                let total: Option<i64> = row.get("total_before_discount_cents");
                let final_price: Option<i64> = row.get("final_price_cents");
                SalePricing::Current(PriceTotals {
                    item_base_price,
                    gst_amount: gst_amount.unwrap_or(0),
                    discount_amount: discount_amount.unwrap_or(0),
                    total_price_before_discount: total.unwrap_or(0),
                    final_price: final_price.unwrap_or(0),
                })
            }
            None => SalePricing::Legacy(LegacyPricing {
                weight_grams: row.get("legacy_weight_grams"),
                gold_rate: row.get("legacy_gold_rate_cents"),
                making_charges: row.get("legacy_making_charges_cents"),
                total_price: row.get("legacy_total_price_cents"),
            }),
        };

        Ok(SaleRecord {
            id: Uuid::parse_str(&id_str).context("Invalid sale ID")?,
            owner_id: OwnerId::new(owner_id),
            customer_name: row.get("customer_name"),
            customer_phone: row.get("customer_phone"),
            item_name: row.get("item_name"),
            huid: row.get("huid"),
            notes: row.get("notes"),
            pricing,
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
        })
    }
}
