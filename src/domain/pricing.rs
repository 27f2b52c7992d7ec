use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    Cents, ItemKind, MAX_AMOUNT, NewSale, SalePricing, SaleRecord, format_currency, sanitize_amount,
};

/// Stored price fields of a current-schema sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTotals {
    pub item_base_price: Cents,
    pub gst_amount: Cents,
    pub discount_amount: Cents,
    /// item_base_price + gst_amount
    pub total_price_before_discount: Cents,
    /// total_price_before_discount - discount_amount. Not clamped: a discount
    /// larger than the total gives a negative final price.
    pub final_price: Cents,
}

/// Derive the sale totals from the three entered amounts.
/// Amounts beyond [`MAX_AMOUNT`] saturate instead of overflowing.
pub fn compute_totals(base_price: Cents, gst_amount: Cents, discount_amount: Cents) -> PriceTotals {
    let total_price_before_discount = base_price.saturating_add(gst_amount);
    PriceTotals {
        item_base_price: base_price,
        gst_amount,
        discount_amount,
        total_price_before_discount,
        final_price: total_price_before_discount.saturating_sub(discount_amount),
    }
}

/// Same as [`compute_totals`], starting from raw form text.
pub fn compute_totals_from_input(base_price: &str, gst_amount: &str, discount_amount: &str) -> PriceTotals {
    compute_totals(
        sanitize_amount(base_price),
        sanitize_amount(gst_amount),
        sanitize_amount(discount_amount),
    )
}

/// The item name that gets persisted: the custom text for custom items, the
/// catalogue name otherwise.
pub fn resolve_item_name(selection: ItemKind, custom_text: &str) -> String {
    match selection {
        ItemKind::CustomItem => {
            let custom = custom_text.trim();
            if custom.is_empty() {
                ItemKind::CustomItem.as_str().to_string()
            } else {
                custom.to_string()
            }
        }
        other => other.as_str().to_string(),
    }
}

/// Raw sale form, exactly as typed.
#[derive(Debug, Clone, Default)]
pub struct SaleInput {
    pub customer_name: String,
    pub customer_phone: String,
    pub item: ItemKind,
    pub custom_item_name: String,
    pub huid: String,
    pub notes: String,
    pub item_base_price: String,
    pub gst_amount: String,
    pub discount_amount: String,
}

impl SaleInput {
    /// Totals as they would be saved, for showing a live bill summary.
    pub fn preview_totals(&self) -> PriceTotals {
        compute_totals_from_input(&self.item_base_price, &self.gst_amount, &self.discount_amount)
    }

    pub fn resolved_item_name(&self) -> String {
        resolve_item_name(self.item, &self.custom_item_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Customer name is required")]
    MissingCustomerName,

    #[error("Item base price must be greater than zero")]
    MissingBasePrice,

    #[error("Please enter a name for the custom item")]
    MissingCustomItemName,

    #[error("{0} is too large")]
    AmountTooLarge(&'static str),
}

/// Check a sale form and turn it into the fields a store persists.
/// Nothing is written when this fails.
pub fn validate_sale_input(input: &SaleInput) -> Result<NewSale, ValidationError> {
    let customer_name = input.customer_name.trim();
    if customer_name.is_empty() {
        return Err(ValidationError::MissingCustomerName);
    }

    let totals = input.preview_totals();
    if totals.item_base_price == 0 {
        return Err(ValidationError::MissingBasePrice);
    }

    if input.item == ItemKind::CustomItem && input.custom_item_name.trim().is_empty() {
        return Err(ValidationError::MissingCustomItemName);
    }

    for (field, amount) in [
        ("Item base price", totals.item_base_price),
        ("GST amount", totals.gst_amount),
        ("Discount", totals.discount_amount),
    ] {
        if amount > MAX_AMOUNT {
            return Err(ValidationError::AmountTooLarge(field));
        }
    }

    Ok(NewSale {
        customer_name: customer_name.to_string(),
        customer_phone: non_empty(&input.customer_phone),
        item_name: input.resolved_item_name(),
        huid: non_empty(&input.huid),
        notes: non_empty(&input.notes),
        item_base_price: totals.item_base_price,
        gst_amount: totals.gst_amount,
        discount_amount: totals.discount_amount,
    })
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// The price shown for a sale in lists and reports, whatever its schema.
/// Legacy records without a total show as 0.
pub fn display_price(record: &SaleRecord) -> Cents {
    match &record.pricing {
        SalePricing::Current(totals) => totals.final_price,
        SalePricing::Legacy(legacy) => legacy.total_price.unwrap_or(0),
    }
}

/// An amount that older records never captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakdownAmount {
    Amount(Cents),
    NotRecorded,
}

impl BreakdownAmount {
    pub fn amount(&self) -> Option<Cents> {
        match self {
            BreakdownAmount::Amount(cents) => Some(*cents),
            BreakdownAmount::NotRecorded => None,
        }
    }

    /// Currency text, or `placeholder` when the value was never recorded.
    pub fn display(&self, symbol: &str, placeholder: &str) -> String {
        match self {
            BreakdownAmount::Amount(cents) => format_currency(*cents, symbol),
            BreakdownAmount::NotRecorded => placeholder.to_string(),
        }
    }
}

/// Line items of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayBreakdown {
    pub base_price: Cents,
    pub gst: BreakdownAmount,
    pub discount: BreakdownAmount,
    pub total_before_discount: Cents,
}

pub fn display_breakdown(record: &SaleRecord) -> DisplayBreakdown {
    match &record.pricing {
        SalePricing::Current(totals) => DisplayBreakdown {
            base_price: totals.item_base_price,
            gst: BreakdownAmount::Amount(totals.gst_amount),
            discount: BreakdownAmount::Amount(totals.discount_amount),
            total_before_discount: totals.total_price_before_discount,
        },
        SalePricing::Legacy(legacy) => DisplayBreakdown {
            base_price: legacy.base_price(),
            gst: BreakdownAmount::NotRecorded,
            discount: BreakdownAmount::NotRecorded,
            total_before_discount: legacy.total_price.unwrap_or(0),
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{LegacyPricing, OwnerId};

    fn record_with(pricing: SalePricing) -> SaleRecord {
        SaleRecord {
            id: Uuid::new_v4(),
            owner_id: OwnerId::new("owner"),
            customer_name: "Asha".into(),
            customer_phone: None,
            item_name: "Gold Chain".into(),
            huid: None,
            notes: None,
            pricing,
            timestamp: Utc::now(),
        }
    }

    fn valid_input() -> SaleInput {
        SaleInput {
            customer_name: "Rahul Sharma".into(),
            customer_phone: "98765 43210".into(),
            item: ItemKind::GoldNecklace,
            item_base_price: "100000".into(),
            gst_amount: "3000".into(),
            discount_amount: "5000".into(),
            ..SaleInput::default()
        }
    }

    #[test]
    fn test_compute_totals_without_discount() {
        let totals = compute_totals(10_000_000, 300_000, 0);
        assert_eq!(totals.total_price_before_discount, 10_300_000);
        assert_eq!(totals.final_price, 10_300_000);
    }

    #[test]
    fn test_compute_totals_with_discount() {
        let totals = compute_totals(10_000_000, 300_000, 500_000);
        assert_eq!(totals.total_price_before_discount, 10_300_000);
        assert_eq!(totals.final_price, 9_800_000);
    }

    #[test]
    fn test_compute_totals_is_exact() {
        for (base, gst, discount) in [(1, 2, 3), (12_345, 678, 9), (99_999_999, 1, 100_000_000)] {
            let totals = compute_totals(base, gst, discount);
            assert_eq!(totals.final_price, base + gst - discount);
        }
    }

    #[test]
    fn test_compute_totals_from_unparseable_input() {
        let totals = compute_totals_from_input("", "abc", "...");
        assert_eq!(totals, compute_totals(0, 0, 0));
        assert_eq!(totals.total_price_before_discount, 0);
        assert_eq!(totals.final_price, 0);
    }

    #[test]
    fn test_discount_larger_than_total_is_not_clamped() {
        let totals = compute_totals_from_input("1000", "30", "2000");
        assert_eq!(totals.total_price_before_discount, 103_000);
        assert_eq!(totals.final_price, -97_000);
    }

    #[test]
    fn test_compute_totals_saturates_on_huge_input() {
        let totals = compute_totals_from_input("90000000000000000", "90000000000000000", "0");
        assert_eq!(totals.total_price_before_discount, i64::MAX);
        assert_eq!(totals.final_price, i64::MAX);

        let totals = compute_totals(i64::MIN, -1, i64::MAX);
        assert_eq!(totals.final_price, i64::MIN);
    }

    #[test]
    fn test_validate_rejects_oversized_amounts() {
        let input = SaleInput {
            item_base_price: "90000000000000000".into(),
            ..valid_input()
        };
        assert_eq!(
            validate_sale_input(&input),
            Err(ValidationError::AmountTooLarge("Item base price"))
        );

        let input = SaleInput {
            discount_amount: "1000000000000.01".into(),
            ..valid_input()
        };
        assert_eq!(validate_sale_input(&input), Err(ValidationError::AmountTooLarge("Discount")));

        let input = SaleInput {
            gst_amount: "99999999999999999999".into(),
            ..valid_input()
        };
        assert_eq!(validate_sale_input(&input), Err(ValidationError::AmountTooLarge("GST amount")));

        let at_limit = SaleInput {
            item_base_price: "1000000000000".into(),
            ..valid_input()
        };
        assert!(validate_sale_input(&at_limit).is_ok());
    }

    #[test]
    fn test_resolve_item_name() {
        assert_eq!(resolve_item_name(ItemKind::CustomItem, "  Vintage Brooch  "), "Vintage Brooch");
        assert_eq!(resolve_item_name(ItemKind::CustomItem, ""), "Custom Item");
        assert_eq!(resolve_item_name(ItemKind::CustomItem, "   "), "Custom Item");
        assert_eq!(resolve_item_name(ItemKind::GoldRing, "anything"), "Gold Ring");
    }

    #[test]
    fn test_validate_accepts_and_normalizes() {
        let sale = validate_sale_input(&valid_input()).unwrap();
        assert_eq!(sale.customer_name, "Rahul Sharma");
        assert_eq!(sale.customer_phone.as_deref(), Some("98765 43210"));
        assert_eq!(sale.item_name, "Gold Necklace");
        assert_eq!(sale.huid, None);
        assert_eq!(sale.notes, None);
        assert_eq!(sale.item_base_price, 10_000_000);
        assert_eq!(sale.gst_amount, 300_000);
        assert_eq!(sale.discount_amount, 500_000);
    }

    #[test]
    fn test_validate_rejects_missing_customer_name() {
        let input = SaleInput {
            customer_name: "".into(),
            item_base_price: "100".into(),
            ..SaleInput::default()
        };
        assert_eq!(validate_sale_input(&input), Err(ValidationError::MissingCustomerName));

        let blank = SaleInput {
            customer_name: "   ".into(),
            ..valid_input()
        };
        assert_eq!(validate_sale_input(&blank), Err(ValidationError::MissingCustomerName));
    }

    #[test]
    fn test_validate_rejects_zero_or_unparseable_base_price() {
        for base in ["0", "", "abc", "0.00"] {
            let input = SaleInput {
                customer_name: "A".into(),
                item_base_price: base.into(),
                ..SaleInput::default()
            };
            assert_eq!(validate_sale_input(&input), Err(ValidationError::MissingBasePrice));
        }
    }

    #[test]
    fn test_validate_rejects_unnamed_custom_item() {
        let input = SaleInput {
            item: ItemKind::CustomItem,
            custom_item_name: "  ".into(),
            ..valid_input()
        };
        assert_eq!(validate_sale_input(&input), Err(ValidationError::MissingCustomItemName));

        let named = SaleInput {
            item: ItemKind::CustomItem,
            custom_item_name: " Vintage Brooch ".into(),
            ..valid_input()
        };
        assert_eq!(validate_sale_input(&named).unwrap().item_name, "Vintage Brooch");
    }

    #[test]
    fn test_display_price_by_schema() {
        let current = record_with(SalePricing::Current(compute_totals(10_000_000, 300_000, 500_000)));
        assert_eq!(display_price(&current), 9_800_000);

        let legacy = record_with(SalePricing::Legacy(LegacyPricing {
            total_price: Some(5_000_000),
            ..LegacyPricing::default()
        }));
        assert_eq!(display_price(&legacy), 5_000_000);

        let corrupt = record_with(SalePricing::Legacy(LegacyPricing::default()));
        assert_eq!(display_price(&corrupt), 0);
    }

    #[test]
    fn test_display_breakdown_current() {
        let record = record_with(SalePricing::Current(compute_totals(10_000_000, 300_000, 500_000)));
        let breakdown = display_breakdown(&record);

        assert_eq!(breakdown.base_price, 10_000_000);
        assert_eq!(breakdown.gst, BreakdownAmount::Amount(300_000));
        assert_eq!(breakdown.discount, BreakdownAmount::Amount(500_000));
        assert_eq!(breakdown.total_before_discount, 10_300_000);
        assert_eq!(breakdown.gst.display("₹", "N/A"), "₹3,000");
    }

    #[test]
    fn test_display_breakdown_legacy() {
        let record = record_with(SalePricing::Legacy(LegacyPricing {
            weight_grams: Some(10.0),
            gold_rate: Some(550_000),
            making_charges: Some(400_000),
            total_price: Some(5_900_000),
        }));
        let breakdown = display_breakdown(&record);

        assert_eq!(breakdown.base_price, 5_500_000);
        assert_eq!(breakdown.gst, BreakdownAmount::NotRecorded);
        assert_eq!(breakdown.discount.display("₹", "N/A (Not Recorded)"), "N/A (Not Recorded)");
        assert_eq!(breakdown.total_before_discount, 5_900_000);
    }

    #[test]
    fn test_display_breakdown_legacy_with_missing_fields() {
        let record = record_with(SalePricing::Legacy(LegacyPricing {
            weight_grams: None,
            gold_rate: Some(550_000),
            ..LegacyPricing::default()
        }));
        let breakdown = display_breakdown(&record);
        assert_eq!(breakdown.base_price, 0);
        assert_eq!(breakdown.total_before_discount, 0);
    }

    #[test]
    fn test_display_breakdown_is_idempotent() {
        let record = record_with(SalePricing::Legacy(LegacyPricing {
            weight_grams: Some(3.3),
            gold_rate: Some(612_345),
            making_charges: None,
            total_price: Some(2_100_000),
        }));
        assert_eq!(display_breakdown(&record), display_breakdown(&record));
    }
}
