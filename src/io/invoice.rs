use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::io::{BufWriter, Write};

use crate::config::LedgerConfig;
use crate::domain::{SalePricing, SaleRecord, display_breakdown, display_price, format_currency, local_time};

// The built-in PDF fonts have no rupee sign.
const PDF_SYMBOL: &str = "Rs. ";

const LEFT: f32 = 20.0;
const COLUMNS: [f32; 4] = [20.0, 75.0, 110.0, 160.0];
const LINE: f32 = 7.0;

/// File name of a sale's invoice: `Invoice_<customer>_<millis>.pdf`.
pub fn invoice_file_name(sale: &SaleRecord, generated_at: DateTime<Utc>) -> String {
    let name: Vec<&str> = sale.customer_name.split_whitespace().collect();
    format!("Invoice_{}_{}.pdf", name.join("_"), generated_at.timestamp_millis())
}

/// Price table rows of an invoice as (details, amount).
pub fn invoice_rows(sale: &SaleRecord) -> Vec<(String, String)> {
    let breakdown = display_breakdown(sale);
    let money = |cents| format_currency(cents, PDF_SYMBOL);
    let mut rows = Vec::new();

    if let SalePricing::Legacy(legacy) = &sale.pricing {
        if let Some(weight) = legacy.weight_grams {
            rows.push(("Weight".to_string(), format!("{}g", weight)));
        }
        if let Some(rate) = legacy.gold_rate {
            rows.push(("Rate / Gram".to_string(), money(rate)));
        }
        if let Some(making) = legacy.making_charges {
            rows.push(("Making Charges".to_string(), money(making)));
        }
    }

    rows.push(("Base Price".to_string(), money(breakdown.base_price)));
    if let Some(gst) = breakdown.gst.amount() {
        rows.push(("GST Amount".to_string(), format!("+ {}", money(gst))));
    }
    if let Some(discount) = breakdown.discount.amount() {
        rows.push(("Discount".to_string(), format!("- {}", money(discount))));
    }
    rows.push(("Final Total".to_string(), money(display_price(sale))));
    rows
}

/// Render a one-page A4 invoice for a sale.
pub fn render_invoice_pdf<W: Write>(sale: &SaleRecord, config: &LedgerConfig, writer: W) -> Result<()> {
    let title = format!("{} Invoice", config.store_name);
    let (doc, page, layer) = PdfDocument::new(title.as_str(), Mm(210.0), Mm(297.0), "Invoice");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("Failed to load invoice font: {:?}", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("Failed to load invoice font: {:?}", e))?;
    let layer = doc.get_page(page).get_layer(layer);

    let date = local_time(sale.timestamp, &config.utc_offset).format("%d/%m/%Y");
    let mut y = 270.0;
    text(&layer, &title, 20.0, LEFT, y, &bold);
    y -= 2.0 * LINE;
    text(&layer, &format!("Date: {}", date), 11.0, LEFT, y, &font);
    y -= 2.0 * LINE;
    text(&layer, "Customer Details:", 12.0, LEFT, y, &bold);
    y -= LINE;
    text(&layer, &format!("Name: {}", sale.customer_name), 11.0, LEFT, y, &font);
    y -= LINE;
    let phone = sale.customer_phone.as_deref().unwrap_or("-");
    text(&layer, &format!("Phone: {}", phone), 11.0, LEFT, y, &font);

    y -= 2.0 * LINE;
    for (x, header) in COLUMNS.iter().zip(["Item", "HUID", "Details", "Price (INR)"]) {
        text(&layer, header, 11.0, *x, y, &bold);
    }

    let rows = invoice_rows(sale);
    let last = rows.len() - 1;
    for (i, (details, amount)) in rows.iter().enumerate() {
        y -= LINE;
        if i == 0 {
            text(&layer, &sale.item_name, 10.0, COLUMNS[0], y, &font);
            text(&layer, sale.huid.as_deref().unwrap_or("-"), 10.0, COLUMNS[1], y, &font);
        }
        let face = if i == last { &bold } else { &font };
        text(&layer, details, 10.0, COLUMNS[2], y, face);
        text(&layer, amount, 10.0, COLUMNS[3], y, face);
    }

    if let Some(notes) = &sale.notes {
        y -= 2.0 * LINE;
        text(&layer, &format!("Notes: {}", notes), 10.0, LEFT, y, &font);
    }
    text(&layer, "Thank you for your business!", 10.0, LEFT, 30.0, &font);

    let mut out = BufWriter::new(writer);
    doc.save(&mut out)
        .map_err(|e| anyhow!("Failed to write invoice: {:?}", e))?;
    out.flush()?;
    Ok(())
}

fn text(layer: &PdfLayerReference, value: &str, size: f32, x: f32, y: f32, font: &IndirectFontRef) {
    layer.use_text(value, size, Mm(x), Mm(y), font);
}
