use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, SaleId, SaleRecord, display_price};

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English name of a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTHS.get(month.checked_sub(1)? as usize).copied()
}

/// The full collection of an owner's sales as of one store change,
/// newest first. A newer snapshot replaces an older one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    sales: Vec<SaleRecord>,
}

impl Snapshot {
    /// Order whatever the store delivered: newest timestamp first, ties by id.
    pub fn from_unordered(mut sales: Vec<SaleRecord>) -> Self {
        sales.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Self { sales }
    }

    pub fn sales(&self) -> &[SaleRecord] {
        &self.sales
    }

    pub fn into_sales(self) -> Vec<SaleRecord> {
        self.sales
    }

    pub fn len(&self) -> usize {
        self.sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }

    pub fn get(&self, id: SaleId) -> Option<&SaleRecord> {
        self.sales.iter().find(|s| s.id == id)
    }

    /// Sales matching a search box term.
    pub fn search(&self, term: &str) -> Vec<&SaleRecord> {
        search(&self.sales, term)
    }

    /// Sales made in the given calendar month, as seen from `offset`.
    pub fn in_month(&self, year: i32, month: u32, offset: &FixedOffset) -> Vec<&SaleRecord> {
        in_month(self.sales.iter(), year, month, offset)
    }

    pub fn available_years(&self, current_year: i32, offset: &FixedOffset) -> Vec<i32> {
        available_years(&self.sales, current_year, offset)
    }
}

/// Case-insensitive match on customer name or HUID, plain substring on phone.
/// An empty term matches everything.
pub fn search<'a>(sales: &'a [SaleRecord], term: &str) -> Vec<&'a SaleRecord> {
    if term.is_empty() {
        return sales.iter().collect();
    }
    let lower = term.to_lowercase();

    sales
        .iter()
        .filter(|s| {
            s.customer_name.to_lowercase().contains(&lower)
                || s.customer_phone
                    .as_deref()
                    .is_some_and(|phone| phone.contains(&lower))
                || s.huid
                    .as_deref()
                    .is_some_and(|huid| huid.to_lowercase().contains(&lower))
        })
        .collect()
}

pub fn in_month<'a>(
    sales: impl IntoIterator<Item = &'a SaleRecord>,
    year: i32,
    month: u32,
    offset: &FixedOffset,
) -> Vec<&'a SaleRecord> {
    sales
        .into_iter()
        .filter(|s| {
            let local = local_time(s.timestamp, offset);
            local.year() == year && local.month() == month
        })
        .collect()
}

/// Years that have at least one sale, plus the current year, newest first.
pub fn available_years(sales: &[SaleRecord], current_year: i32, offset: &FixedOffset) -> Vec<i32> {
    let mut years: Vec<i32> = sales
        .iter()
        .map(|s| local_time(s.timestamp, offset).year())
        .chain(std::iter::once(current_year))
        .collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

pub fn local_time(timestamp: DateTime<Utc>, offset: &FixedOffset) -> DateTime<FixedOffset> {
    offset.from_utc_datetime(&timestamp.naive_utc())
}

/// Totals over a list of sales, in display prices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub count: usize,
    pub legacy_count: usize,
    pub total: Cents,
}

pub fn summarize<'a>(sales: impl IntoIterator<Item = &'a SaleRecord>) -> SalesSummary {
    sales
        .into_iter()
        .fold(SalesSummary::default(), |mut summary, sale| {
            summary.count += 1;
            summary.total = summary.total.saturating_add(display_price(sale));
            if sale.is_legacy() {
                summary.legacy_count += 1;
            }
            summary
        })
}
