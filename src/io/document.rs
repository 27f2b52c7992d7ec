use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Cents, LegacyPricing, OwnerId, SalePricing, SaleRecord, cents_from_rupees, compute_totals,
    is_valid_amount, rupees_from_cents,
};

/// A sale as stored by document databases and as written by JSON export.
///
/// Amounts are rupees as JSON numbers. Price fields are kept as raw JSON
/// values because the schema generation is decided by whether
/// `itemBasePrice` holds a number, not merely whether it is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub huid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_base_price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst_amount: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price_before_discount: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_price: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold_rate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub making_charges: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// RFC 3339 text, epoch milliseconds, or a `{seconds, nanoseconds}` object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("customerName is missing")]
    MissingCustomerName,

    #[error("unrecognized timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("{0} is out of range")]
    AmountOutOfRange(&'static str),
}

impl SaleDocument {
    /// Legacy documents are those whose `itemBasePrice` is not a number.
    pub fn is_legacy(&self) -> bool {
        number(&self.item_base_price).is_none()
    }

    /// Decode into a record. Current-schema totals are recomputed from the
    /// base, GST and discount; stored totals are ignored. A missing
    /// timestamp becomes `received_at`.
    pub fn into_record(self, received_at: DateTime<Utc>) -> Result<SaleRecord, DocumentError> {
        let customer_name = self.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(DocumentError::MissingCustomerName);
        }

        let timestamp = match &self.timestamp {
            Some(value) => parse_timestamp(value)?,
            None => received_at,
        };

        let pricing = match number(&self.item_base_price) {
            Some(base) => SalePricing::Current(compute_totals(
                checked_amount("itemBasePrice", Some(base))?.unwrap_or(0),
                amount("gstAmount", &self.gst_amount)?.unwrap_or(0),
                amount("discountAmount", &self.discount_amount)?.unwrap_or(0),
            )),
            None => SalePricing::Legacy(LegacyPricing {
                weight_grams: number(&self.weight),
                gold_rate: amount("goldRate", &self.gold_rate)?,
                making_charges: amount("makingCharges", &self.making_charges)?,
                total_price: amount("totalPrice", &self.total_price)?,
            }),
        };

        let id = self
            .id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(SaleRecord {
            id,
            owner_id: OwnerId::new(self.user_id.unwrap_or_default()),
            customer_name,
            customer_phone: non_empty(self.customer_phone),
            item_name: self.item_name.trim().to_string(),
            huid: non_empty(self.huid),
            notes: non_empty(self.notes),
            pricing,
            timestamp,
        })
    }

    pub fn from_record(record: &SaleRecord) -> Self {
        let mut doc = SaleDocument {
            id: Some(record.id.to_string()),
            customer_name: record.customer_name.clone(),
            customer_phone: record.customer_phone.clone(),
            item_name: record.item_name.clone(),
            huid: record.huid.clone(),
            notes: record.notes.clone(),
            user_id: Some(record.owner_id.to_string()),
            timestamp: Some(Value::String(record.timestamp.to_rfc3339())),
            ..SaleDocument::default()
        };

        match &record.pricing {
            SalePricing::Current(totals) => {
                doc.item_base_price = Some(rupees_value(totals.item_base_price));
                doc.gst_amount = Some(rupees_value(totals.gst_amount));
                doc.discount_amount = Some(rupees_value(totals.discount_amount));
                doc.total_price_before_discount =
                    Some(rupees_value(totals.total_price_before_discount));
                doc.final_price = Some(rupees_value(totals.final_price));
            }
            SalePricing::Legacy(legacy) => {
                doc.weight = legacy.weight_grams.map(Value::from);
                doc.gold_rate = legacy.gold_rate.map(rupees_value);
                doc.making_charges = legacy.making_charges.map(rupees_value);
                doc.total_price = legacy.total_price.map(rupees_value);
            }
        }

        doc
    }
}

fn number(value: &Option<Value>) -> Option<f64> {
    value.as_ref().and_then(Value::as_f64)
}

fn amount(field: &'static str, value: &Option<Value>) -> Result<Option<Cents>, DocumentError> {
    checked_amount(field, number(value))
}

fn checked_amount(field: &'static str, rupees: Option<f64>) -> Result<Option<Cents>, DocumentError> {
    match rupees.map(cents_from_rupees) {
        Some(cents) if !is_valid_amount(cents) => Err(DocumentError::AmountOutOfRange(field)),
        cents => Ok(cents),
    }
}

/// Whole rupees stay integers in JSON.
fn rupees_value(cents: Cents) -> Value {
    if cents % 100 == 0 {
        Value::from(cents / 100)
    } else {
        Value::from(rupees_from_cents(cents))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, DocumentError> {
    let invalid = || DocumentError::InvalidTimestamp(value.to_string());

    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| invalid()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(invalid),
        Value::Object(map) => {
            let field = |names: [&str; 2]| names.iter().find_map(|name| map.get(*name));
            let seconds = field(["seconds", "_seconds"])
                .and_then(Value::as_i64)
                .ok_or_else(invalid)?;
            let nanos = field(["nanoseconds", "_nanoseconds"])
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos as u32)
                .single()
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}
