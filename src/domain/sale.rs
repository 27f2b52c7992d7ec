use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, PriceTotals, compute_totals};

pub type SaleId = Uuid;

/// Opaque identity of whoever owns a record: a signed-in account id or a
/// generated device id. Records are only ever visible to their owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The item types offered at the counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    GoldRing,
    GoldNecklace,
    GoldChain,
    GoldBangles,
    GoldEarrings,
    Pendant,
    SilverItem,
    /// Free-text item; the actual name comes from the custom name field.
    CustomItem,
}

impl ItemKind {
    pub const ALL: [ItemKind; 8] = [
        ItemKind::GoldRing,
        ItemKind::GoldNecklace,
        ItemKind::GoldChain,
        ItemKind::GoldBangles,
        ItemKind::GoldEarrings,
        ItemKind::Pendant,
        ItemKind::SilverItem,
        ItemKind::CustomItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::GoldRing => "Gold Ring",
            ItemKind::GoldNecklace => "Gold Necklace",
            ItemKind::GoldChain => "Gold Chain",
            ItemKind::GoldBangles => "Gold Bangles",
            ItemKind::GoldEarrings => "Gold Earrings",
            ItemKind::Pendant => "Pendant",
            ItemKind::SilverItem => "Silver Item",
            ItemKind::CustomItem => "Custom Item",
        }
    }

    /// Accepts the display name in any case, with spaces, hyphens or underscores
    /// between words ("gold-ring", "Gold Ring", "GOLD_RING").
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        Self::ALL.into_iter().find(|kind| {
            kind.as_str()
                .chars()
                .filter(|c| *c != ' ')
                .collect::<String>()
                .to_lowercase()
                == normalized
        })
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Price fields of a record written before GST and discount were captured.
/// Any of them may be missing on old data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyPricing {
    pub weight_grams: Option<f64>,
    /// Rate per gram
    pub gold_rate: Option<Cents>,
    pub making_charges: Option<Cents>,
    pub total_price: Option<Cents>,
}

impl LegacyPricing {
    /// Metal value: weight × rate, treating missing fields as 0.
    pub fn base_price(&self) -> Cents {
        let weight = self.weight_grams.unwrap_or(0.0);
        let rate = self.gold_rate.unwrap_or(0);
        (weight * rate as f64).round() as Cents
    }
}

/// Which schema generation a record was written with.
/// Decided once when the record is decoded; everything downstream matches on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "lowercase")]
pub enum SalePricing {
    Current(PriceTotals),
    Legacy(LegacyPricing),
}

impl SalePricing {
    pub fn is_legacy(&self) -> bool {
        matches!(self, SalePricing::Legacy(_))
    }
}

/// A completed sale. Immutable once created; it can only be deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: SaleId,
    pub owner_id: OwnerId,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub item_name: String,
    /// Hallmark unique identification number
    pub huid: Option<String>,
    pub notes: Option<String>,
    pub pricing: SalePricing,
    /// Assigned by the store at creation; the only sort and filter key.
    pub timestamp: DateTime<Utc>,
}

impl SaleRecord {
    /// Build a record from validated input. Totals are always recomputed here,
    /// whatever the caller had on screen.
    pub fn create(owner_id: OwnerId, sale: NewSale, timestamp: DateTime<Utc>) -> Self {
        let totals = compute_totals(sale.item_base_price, sale.gst_amount, sale.discount_amount);
        Self {
            id: Uuid::new_v4(),
            owner_id,
            customer_name: sale.customer_name,
            customer_phone: sale.customer_phone,
            item_name: sale.item_name,
            huid: sale.huid,
            notes: sale.notes,
            pricing: SalePricing::Current(totals),
            timestamp,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.pricing.is_legacy()
    }
}

/// Fields of a sale that passed validation, ready to be handed to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub item_name: String,
    pub huid: Option<String>,
    pub notes: Option<String>,
    pub item_base_price: Cents,
    pub gst_amount: Cents,
    pub discount_amount: Cents,
}
