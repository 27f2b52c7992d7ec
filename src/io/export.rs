use anyhow::Result;
use rust_xlsxwriter::{Format, Workbook};
use std::io::Write;

use crate::config::LedgerConfig;
use crate::domain::{
    SalePricing, SaleRecord, display_breakdown, display_price, format_cents, format_currency,
    local_time, rupees_from_cents,
};
use crate::io::SaleDocument;

/// Column titles of the sales report, in order.
pub const REPORT_HEADERS: [&str; 10] = [
    "Date",
    "Customer Name",
    "Phone",
    "Item Name",
    "HUID",
    "Base Price",
    "GST Amount",
    "Discount",
    "Final Price",
    "Notes",
];

/// Placeholder for amounts older records never captured.
pub const NOT_RECORDED: &str = "N/A";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Worksheet name of the xlsx report.
pub const REPORT_SHEET: &str = "Sales Report";

const REPORT_COLUMN_WIDTHS: [f64; 10] = [12.0, 20.0, 12.0, 15.0, 15.0, 12.0, 10.0, 10.0, 12.0, 30.0];

/// Exporter for writing sales to report and document formats
pub struct Exporter<'a> {
    sales: &'a [SaleRecord],
    config: &'a LedgerConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(sales: &'a [SaleRecord], config: &'a LedgerConfig) -> Self {
        Self { sales, config }
    }

    /// One report row per sale, in the order given.
    pub fn report_rows(&self) -> Vec<[String; 10]> {
        self.sales.iter().map(|sale| self.report_row(sale)).collect()
    }

    fn report_row(&self, sale: &SaleRecord) -> [String; 10] {
        let breakdown = display_breakdown(sale);
        let date = local_time(sale.timestamp, &self.config.utc_offset).format("%d/%m/%Y");
        let amount = |value: Option<i64>| {
            value
                .map(format_cents)
                .unwrap_or_else(|| NOT_RECORDED.to_string())
        };

        [
            date.to_string(),
            sale.customer_name.clone(),
            sale.customer_phone.clone().unwrap_or_default(),
            sale.item_name.clone(),
            sale.huid.clone().unwrap_or_default(),
            format_cents(breakdown.base_price),
            amount(breakdown.gst.amount()),
            amount(breakdown.discount.amount()),
            format_cents(display_price(sale)),
            sale.notes.clone().unwrap_or_default(),
        ]
    }

    /// Export the sales report as CSV, prefixed with a UTF-8 BOM so spreadsheet
    /// applications pick the right encoding.
    pub fn export_csv<W: Write>(&self, mut writer: W) -> Result<usize> {
        writer.write_all(UTF8_BOM)?;
        let csv_writer = csv::Writer::from_writer(writer);
        self.write_report(csv_writer)
    }

    /// Export the sales report as tab-separated rows, for pasting into a spreadsheet.
    pub fn export_tsv<W: Write>(&self, writer: W) -> Result<usize> {
        let csv_writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        self.write_report(csv_writer)
    }

    fn write_report<W: Write>(&self, mut csv_writer: csv::Writer<W>) -> Result<usize> {
        csv_writer.write_record(REPORT_HEADERS)?;

        let mut count = 0;
        for row in self.report_rows() {
            csv_writer.write_record(&row)?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the sales report as an xlsx workbook. Amounts are written as
    /// numbers in rupees; amounts an old record never captured are "N/A".
    pub fn export_xlsx<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(REPORT_SHEET)?;

        for (col, (header, width)) in REPORT_HEADERS.iter().zip(REPORT_COLUMN_WIDTHS).enumerate() {
            let col = col as u16;
            sheet.write_string_with_format(0, col, *header, &bold)?;
            sheet.set_column_width(col, width)?;
        }

        let mut count = 0;
        for (sale, text) in self.sales.iter().zip(self.report_rows()) {
            let row = count as u32 + 1;
            let breakdown = display_breakdown(sale);
            let amounts = [
                Some(breakdown.base_price),
                breakdown.gst.amount(),
                breakdown.discount.amount(),
                Some(display_price(sale)),
            ];

            for col in [0, 1, 2, 3, 4, 9] {
                sheet.write_string(row, col as u16, &text[col])?;
            }
            for (offset, amount) in amounts.into_iter().enumerate() {
                let col = 5 + offset as u16;
                match amount {
                    Some(cents) => sheet.write_number(row, col, rupees_from_cents(cents))?,
                    None => sheet.write_string(row, col, NOT_RECORDED)?,
                };
            }
            count += 1;
        }

        let bytes = workbook.save_to_buffer()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(count)
    }

    /// Export sales as a JSON array of store documents.
    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let documents: Vec<SaleDocument> = self.sales.iter().map(SaleDocument::from_record).collect();

        let json = serde_json::to_string_pretty(&documents)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(documents.len())
    }
}

/// Short text for sharing a sale with the customer.
pub fn share_text(sale: &SaleRecord, currency_symbol: &str) -> String {
    format!(
        "Receipt for {}\nItem: {}\nFinal Price: {}",
        sale.customer_name,
        sale.item_name,
        format_currency(display_price(sale), currency_symbol)
    )
}

/// Full receipt with the price breakdown.
pub fn render_receipt(sale: &SaleRecord, config: &LedgerConfig) -> String {
    let symbol = config.currency_symbol.as_str();
    let breakdown = display_breakdown(sale);
    let timestamp = local_time(sale.timestamp, &config.utc_offset);
    let rule = "-".repeat(40);

    let mut lines = vec![
        config.store_name.clone(),
        "Sales Receipt".to_string(),
        rule.clone(),
        format!("{:<14}{}", "Date:", timestamp.format("%d/%m/%Y %H:%M")),
        format!("{:<14}{}", "Receipt No:", sale.id),
        format!("{:<14}{}", "Customer:", sale.customer_name),
    ];
    if let Some(phone) = &sale.customer_phone {
        lines.push(format!("{:<14}{}", "Phone:", phone));
    }
    let legacy = match &sale.pricing {
        SalePricing::Legacy(legacy) => Some(legacy),
        SalePricing::Current(_) => None,
    };
    match legacy.and_then(|l| l.weight_grams) {
        Some(weight) => lines.push(format!("{:<14}{} ({}g)", "Item:", sale.item_name, weight)),
        None => lines.push(format!("{:<14}{}", "Item:", sale.item_name)),
    }
    if let Some(huid) = &sale.huid {
        lines.push(format!("{:<14}{}", "HUID:", huid));
    }

    lines.push(rule.clone());
    if let Some(legacy) = legacy {
        let metal = if sale.item_name.contains("Silver") { "Silver" } else { "Gold" };
        let amount = |cents: Option<_>| {
            cents.map_or_else(|| "N/A".to_string(), |c| format_currency(c, symbol))
        };
        lines.push(format!(
            "{:<24}{:>16}",
            format!("{} Rate / Gram", metal),
            amount(legacy.gold_rate)
        ));
        lines.push(format!(
            "{:<24}{:>16}",
            "Making Charges",
            amount(legacy.making_charges)
        ));
    }
    lines.push(format!(
        "{:<24}{:>16}",
        "Base Price",
        format_currency(breakdown.base_price, symbol)
    ));
    lines.push(format!(
        "{:<24}{:>16}",
        "GST",
        breakdown.gst.display(symbol, "N/A (Included in Total)")
    ));
    lines.push(format!(
        "{:<24}{:>16}",
        "Total Before Discount",
        format_currency(breakdown.total_before_discount, symbol)
    ));
    lines.push(format!(
        "{:<24}{:>16}",
        "Discount",
        breakdown.discount.display(symbol, "N/A (Not Recorded)")
    ));
    lines.push(rule.clone());
    lines.push(format!(
        "{:<24}{:>16}",
        "Final Price",
        format_currency(display_price(sale), symbol)
    ));

    if let Some(notes) = &sale.notes {
        lines.push(rule);
        lines.push(format!("Notes: {}", notes));
    }

    lines.join("\n")
}
