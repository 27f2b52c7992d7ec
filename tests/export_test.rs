mod common;

use anyhow::Result;
use common::{at, current_record, legacy_record, test_service};
use goldledger::domain::{SalePricing, compute_totals};
use goldledger::io::{Exporter, REPORT_HEADERS, SaleDocument, render_invoice_pdf};

#[tokio::test]
async fn test_monthly_csv_report() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let mut sale = current_record("Rahul Sharma", 0, at(2024, 3, 10, 6));
    sale.pricing = SalePricing::Current(compute_totals(10_000_000, 300_000, 500_000));
    sale.customer_phone = Some("9876543210".into());
    sale.huid = Some("ABC1234".into());
    sale.notes = Some("Ring size 12, \"rush\"".into());
    service.import_sale(sale).await?;
    service
        .import_sale(legacy_record("Old Customer", Some(5_900_000), at(2024, 3, 2, 6)))
        .await?;
    service
        .import_sale(current_record("Other Month", 100_000, at(2024, 4, 2, 6)))
        .await?;

    let report = service.monthly_report(2024, 3).await?;
    let mut buf = Vec::new();
    let count = Exporter::new(&report.sales, service.config()).export_csv(&mut buf)?;
    assert_eq!(count, 2);

    assert!(buf.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(buf[3..].to_vec())?;

    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    assert_eq!(headers, REPORT_HEADERS);

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 2);

    assert_eq!(&rows[0][0], "10/03/2024");
    assert_eq!(&rows[0][1], "Rahul Sharma");
    assert_eq!(&rows[0][2], "9876543210");
    assert_eq!(&rows[0][4], "ABC1234");
    assert_eq!(&rows[0][5], "100000.00");
    assert_eq!(&rows[0][6], "3000.00");
    assert_eq!(&rows[0][7], "5000.00");
    assert_eq!(&rows[0][8], "98000.00");
    assert_eq!(&rows[0][9], "Ring size 12, \"rush\"");

    assert_eq!(&rows[1][1], "Old Customer");
    assert_eq!(&rows[1][6], "N/A");
    assert_eq!(&rows[1][7], "N/A");
    assert_eq!(&rows[1][8], "59000.00");

    assert_eq!(report.period_label(), "March, 2024");
    assert_eq!(
        report.file_stem(&service.config().store_name),
        "GoldLedger_Report_March_2024"
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_month_has_nothing_to_export() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .import_sale(current_record("Someone", 100_000, at(2024, 4, 2, 6)))
        .await?;

    let report = service.monthly_report(2024, 3).await?;
    assert!(report.is_empty());
    assert_eq!(
        format!("No sales found for {}.", report.period_label()),
        "No sales found for March, 2024."
    );
    Ok(())
}

#[tokio::test]
async fn test_json_export_reads_back() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let current = service
        .import_sale(current_record("Asha", 123_450, at(2024, 5, 1, 6)))
        .await?;
    let legacy = service
        .import_sale(legacy_record("Old Customer", Some(5_900_000), at(2019, 5, 1, 6)))
        .await?;

    let snapshot = service.snapshot().await?;
    let mut buf = Vec::new();
    let count = Exporter::new(snapshot.sales(), service.config()).export_json(&mut buf)?;
    assert_eq!(count, 2);

    let documents: Vec<SaleDocument> = serde_json::from_slice(&buf)?;
    assert!(!documents[0].is_legacy());
    assert!(documents[1].is_legacy());

    let value: serde_json::Value = serde_json::from_slice(&buf)?;
    assert_eq!(value[0]["customerName"], "Asha");
    assert_eq!(value[0]["itemBasePrice"], 1234.5);
    assert_eq!(value[0]["finalPrice"], 1234.5);
    assert_eq!(value[1]["goldRate"], 5500);
    assert_eq!(value[1]["totalPrice"], 59000);
    assert!(value[1].get("itemBasePrice").is_none());

    let now = chrono::Utc::now();
    let decoded: Vec<_> = documents
        .into_iter()
        .map(|doc| doc.into_record(now))
        .collect::<Result<_, _>>()?;
    assert_eq!(decoded[0].id, current.id);
    assert_eq!(decoded[0].pricing, current.pricing);
    assert_eq!(decoded[1].pricing, legacy.pricing);
    assert_eq!(decoded[1].timestamp, legacy.timestamp);
    Ok(())
}

#[tokio::test]
async fn test_monthly_xlsx_report() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .import_sale(current_record("Rahul Sharma", 10_000_000, at(2024, 3, 10, 6)))
        .await?;
    service
        .import_sale(legacy_record("Old Customer", Some(5_900_000), at(2024, 3, 2, 6)))
        .await?;

    let report = service.monthly_report(2024, 3).await?;
    let mut buf = Vec::new();
    let count = Exporter::new(&report.sales, service.config()).export_xlsx(&mut buf)?;

    assert_eq!(count, 2);
    // xlsx is a zip archive
    assert!(buf.starts_with(b"PK"));
    Ok(())
}

#[tokio::test]
async fn test_invoice_pdf_for_stored_sale() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let sale = service
        .import_sale(legacy_record("Old Customer", Some(5_900_000), at(2019, 5, 1, 6)))
        .await?;

    let mut buf = Vec::new();
    render_invoice_pdf(&service.get_sale(sale.id).await?, service.config(), &mut buf)?;
    assert!(buf.starts_with(b"%PDF"));
    Ok(())
}
