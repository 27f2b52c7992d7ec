use serde::{Deserialize, Serialize};

use crate::domain::{SaleRecord, SalesSummary, month_name};

/// Sales of one calendar month, newest first, as handed to exporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i32,
    /// 1-based
    pub month: u32,
    pub summary: SalesSummary,
    pub sales: Vec<SaleRecord>,
}

impl MonthlyReport {
    pub fn month_name(&self) -> &'static str {
        month_name(self.month).unwrap_or("Unknown")
    }

    /// "March, 2024"
    pub fn period_label(&self) -> String {
        format!("{}, {}", self.month_name(), self.year)
    }

    /// File stem used for exported reports, e.g. "GoldLedger_Report_March_2024".
    pub fn file_stem(&self, store_name: &str) -> String {
        let store: String = store_name.split_whitespace().collect::<Vec<_>>().join("_");
        format!("{}_Report_{}_{}", store, self.month_name(), self.year)
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }
}
