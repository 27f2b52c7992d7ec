// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use goldledger::application::LedgerService;
use goldledger::config::{AccountConfig, LedgerConfig};
use goldledger::domain::{ItemKind, LegacyPricing, OwnerId, SalePricing, SaleInput, SaleRecord, compute_totals};
use tempfile::TempDir;
use uuid::Uuid;

fn test_config(temp_dir: &TempDir) -> LedgerConfig {
    let db_path = temp_dir.path().join("test.db");
    LedgerConfig::default().with_database(db_path.to_str().unwrap())
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(test_config(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Helper to open a second service on the same database, signed in as another account
pub async fn service_as(temp_dir: &TempDir, owner_id: &str) -> Result<LedgerService> {
    let config = test_config(temp_dir).with_account(AccountConfig {
        owner_id: owner_id.to_string(),
        display_name: None,
        email: None,
    });
    Ok(LedgerService::connect(config).await?)
}

/// A valid sale form
pub fn sale_input(customer: &str, base_price: &str, gst: &str, discount: &str) -> SaleInput {
    SaleInput {
        customer_name: customer.to_string(),
        customer_phone: "9876543210".to_string(),
        item: ItemKind::GoldRing,
        huid: "ABC1234".to_string(),
        item_base_price: base_price.to_string(),
        gst_amount: gst.to_string(),
        discount_amount: discount.to_string(),
        ..SaleInput::default()
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// A current-schema record with a fixed timestamp, for `import_sale`
pub fn current_record(customer: &str, base_price: i64, timestamp: DateTime<Utc>) -> SaleRecord {
    SaleRecord {
        id: Uuid::new_v4(),
        owner_id: OwnerId::new("unset"),
        customer_name: customer.to_string(),
        customer_phone: None,
        item_name: "Gold Chain".to_string(),
        huid: None,
        notes: None,
        pricing: SalePricing::Current(compute_totals(base_price, 0, 0)),
        timestamp,
    }
}

/// A record written before GST and discount were captured
pub fn legacy_record(customer: &str, total_price: Option<i64>, timestamp: DateTime<Utc>) -> SaleRecord {
    SaleRecord {
        pricing: SalePricing::Legacy(LegacyPricing {
            weight_grams: Some(10.0),
            gold_rate: Some(550_000),
            making_charges: Some(400_000),
            total_price,
        }),
        ..current_record(customer, 0, timestamp)
    }
}
