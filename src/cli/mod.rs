use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::application::{LedgerService, SaleFilter};
use crate::config::LedgerConfig;
use crate::domain::{
    ItemKind, SaleInput, display_price, format_currency, local_time, summarize,
};
use crate::io::{
    Exporter, ImportOptions, Importer, invoice_file_name, render_invoice_pdf, render_receipt,
    share_text,
};
use crate::storage::IdentitySource;

/// GoldLedger - Jewelry Sales Ledger
#[derive(Parser)]
#[command(name = "goldledger")]
#[command(about = "Record jewelry sales with GST and discounts, browse history and export monthly reports")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides GOLDLEDGER_DB)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database and this device's identity
    Init,

    /// Show who sales are recorded for
    Whoami,

    /// Record a sale
    Sale {
        /// Customer name
        #[arg(short, long)]
        customer: String,

        /// Customer phone number
        #[arg(short, long)]
        phone: Option<String>,

        /// Item type (e.g. "Gold Ring", "gold-chain", "Custom Item")
        #[arg(short, long, default_value = "Gold Ring")]
        item: String,

        /// Item name when the item type is "Custom Item"
        #[arg(long)]
        custom_item: Option<String>,

        /// Hallmark unique identification number
        #[arg(long)]
        huid: Option<String>,

        /// Base price of the item (e.g. "100000" or "1,00,000")
        #[arg(short = 'b', long)]
        base_price: String,

        /// GST amount
        #[arg(short, long, default_value = "0")]
        gst: String,

        /// Discount amount
        #[arg(long, default_value = "0")]
        discount: String,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Show the bill summary without saving
        #[arg(long)]
        preview: bool,
    },

    /// List recorded sales, newest first
    History {
        /// Search by customer name, phone or HUID
        #[arg(short, long)]
        search: Option<String>,

        /// Month (1-12); defaults to the current year when --year is omitted
        #[arg(short, long)]
        month: Option<u32>,

        /// Year
        #[arg(short, long)]
        year: Option<i32>,

        /// Maximum number of sales to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a receipt for one sale
    Show {
        /// Sale ID
        id: String,

        /// Print only the short text for sharing with the customer
        #[arg(long, conflicts_with = "pdf")]
        copy: bool,

        /// Write a PDF invoice instead of printing the receipt
        #[arg(long)]
        pdf: bool,

        /// Invoice file (defaults to Invoice_<customer>_<millis>.pdf)
        #[arg(short, long, requires = "pdf")]
        output: Option<String>,
    },

    /// Delete a sale
    Delete {
        /// Sale ID
        id: String,
    },

    /// Export a month of sales
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Month (1-12); defaults to the current month
        #[arg(short, long)]
        month: Option<u32>,

        /// Year; defaults to the current year
        #[arg(short, long)]
        year: Option<i32>,

        /// Export every sale instead of a single month
        #[arg(long, conflicts_with_all = ["month", "year"])]
        all: bool,

        /// Output file (omit for stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Write to a file named after the store and period, e.g. GoldLedger_Report_March_2024.csv
        #[arg(long, conflicts_with = "output")]
        save: bool,
    },

    /// Import sales from a JSON document export
    Import {
        /// Input file (omit for stdin)
        #[arg(short, long)]
        input: Option<String>,

        /// Dry run (validate without importing)
        #[arg(long)]
        dry_run: bool,

        /// Skip sales that already exist
        #[arg(long)]
        skip_duplicates: bool,

        /// Validate only (don't import)
        #[arg(long)]
        validate: bool,
    },

    /// List years that have sales
    Years,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Spreadsheet report
    Csv,
    /// Tab-separated rows for pasting into a spreadsheet
    Tsv,
    /// Store documents
    Json,
    /// Excel workbook; always written to a file
    Xlsx,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        let config = LedgerConfig::from_env();
        match &self.database {
            Some(database) => config.with_database(database.clone()),
            None => config,
        }
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();

        match self.command {
            Commands::Init => {
                let database = config.database.clone();
                let service = LedgerService::init(config).await?;
                println!("Database initialized: {}", database);
                println!("Recording sales as: {}", service.identity()?.label());
            }

            Commands::Whoami => {
                let service = connect(config).await?;
                run_whoami_command(&service)?;
            }

            Commands::Sale {
                customer,
                phone,
                item,
                custom_item,
                huid,
                base_price,
                gst,
                discount,
                notes,
                preview,
            } => {
                let item = ItemKind::from_str(&item).with_context(|| {
                    let valid: Vec<&str> = ItemKind::ALL.iter().map(|k| k.as_str()).collect();
                    format!("Unknown item type '{}'. Valid types: {}", item, valid.join(", "))
                })?;

                let input = SaleInput {
                    customer_name: customer,
                    customer_phone: phone.unwrap_or_default(),
                    item,
                    custom_item_name: custom_item.unwrap_or_default(),
                    huid: huid.unwrap_or_default(),
                    notes: notes.unwrap_or_default(),
                    item_base_price: base_price,
                    gst_amount: gst,
                    discount_amount: discount,
                };

                if preview {
                    println!("{}", bill_summary(&config, &input));
                } else {
                    let service = connect(config).await?;
                    let record = service.record_sale(&input).await?;
                    println!(
                        "Recorded sale: {} to {} for {} ({})",
                        record.item_name,
                        record.customer_name,
                        format_currency(display_price(&record), &service.config().currency_symbol),
                        record.id
                    );
                }
            }

            Commands::History {
                search,
                month,
                year,
                limit,
            } => {
                let service = connect(config).await?;
                let filter = SaleFilter {
                    search,
                    year,
                    month,
                    limit,
                };
                run_history_command(&service, filter).await?;
            }

            Commands::Show {
                id,
                copy,
                pdf,
                output,
            } => {
                let service = connect(config).await?;
                let sale_id = parse_sale_id(&id)?;
                let sale = service.get_sale(sale_id).await?;
                let config = service.config();
                if pdf {
                    let path = output.unwrap_or_else(|| invoice_file_name(&sale, chrono::Utc::now()));
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create invoice file: {}", path))?;
                    render_invoice_pdf(&sale, config, file)?;
                    eprintln!("Invoice written to {}", path);
                } else if copy {
                    println!("{}", share_text(&sale, &config.currency_symbol));
                } else {
                    println!("{}", render_receipt(&sale, config));
                }
            }

            Commands::Delete { id } => {
                let service = connect(config).await?;
                let sale_id = parse_sale_id(&id)?;
                service.delete_sale(sale_id).await?;
                println!("Deleted sale: {}", sale_id);
            }

            Commands::Export {
                format,
                month,
                year,
                all,
                output,
                save,
            } => {
                let service = connect(config).await?;
                let period = if all { None } else { Some((year, month)) };
                run_export_command(&service, format, period, output, save).await?;
            }

            Commands::Import {
                input,
                dry_run,
                skip_duplicates,
                validate,
            } => {
                let service = connect(config).await?;
                run_import_command(&service, input.as_deref(), dry_run, skip_duplicates, validate)
                    .await?;
            }

            Commands::Years => {
                let service = connect(config).await?;
                for year in service.available_years().await? {
                    println!("{}", year);
                }
            }
        }

        Ok(())
    }
}

async fn connect(config: LedgerConfig) -> Result<LedgerService> {
    LedgerService::connect(config)
        .await
        .context("Failed to open database. Run 'goldledger init' first")
}

fn run_whoami_command(service: &LedgerService) -> Result<()> {
    let identity = service.identity()?;

    println!("Name:   {}", identity.label());
    println!("Owner:  {}", identity.owner_id);
    if let Some(email) = &identity.email {
        println!("Email:  {}", email);
    }
    println!(
        "Source: {}",
        match identity.source {
            IdentitySource::Account => "signed-in account",
            IdentitySource::Device => "this device",
        }
    );
    Ok(())
}

/// The bill as it would be recorded. Needs no database.
fn bill_summary(config: &LedgerConfig, input: &SaleInput) -> String {
    let symbol = config.currency_symbol.as_str();
    let totals = input.preview_totals();
    let rule = "-".repeat(40);
    let line = |label: &str, cents| format!("{:<24}{:>16}", label, format_currency(cents, symbol));

    [
        format!("Bill Summary ({})", input.resolved_item_name()),
        rule.clone(),
        line("Base Price", totals.item_base_price),
        line("GST", totals.gst_amount),
        line("Total Before Discount", totals.total_price_before_discount),
        line("Discount", totals.discount_amount),
        rule,
        line("Final Price", totals.final_price),
    ]
    .join("\n")
}

async fn run_history_command(service: &LedgerService, filter: SaleFilter) -> Result<()> {
    let sales = service.list_sales(filter).await?;

    if sales.is_empty() {
        println!("No sales found.");
        return Ok(());
    }

    let config = service.config();
    println!(
        "{:<12} {:<20} {:<15} {:<16} {:>14}  ID",
        "DATE", "CUSTOMER", "PHONE", "ITEM", "PRICE"
    );
    println!("{}", "-".repeat(120));

    for sale in &sales {
        let date = local_time(sale.timestamp, &config.utc_offset).format("%d/%m/%Y");
        let price = format_currency(display_price(sale), &config.currency_symbol);
        let marker = if sale.is_legacy() { "*" } else { " " };

        println!(
            "{:<12} {:<20} {:<15} {:<16} {:>14}{} {}",
            date,
            truncate(&sale.customer_name, 20),
            truncate(sale.customer_phone.as_deref().unwrap_or(""), 15),
            truncate(&sale.item_name, 16),
            price,
            marker,
            sale.id
        );
    }

    let summary = summarize(&sales);
    println!("{}", "-".repeat(120));
    println!(
        "{} sale(s), total {}",
        summary.count,
        format_currency(summary.total, &config.currency_symbol)
    );
    if summary.legacy_count > 0 {
        println!("* recorded before GST and discount were tracked");
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    format: ExportFormat,
    period: Option<(Option<i32>, Option<u32>)>,
    output: Option<String>,
    save: bool,
) -> Result<()> {
    use std::fs::File;
    use std::io::{Write, stdout};

    let config = service.config();

    let (sales, stem) = match period {
        Some((year, month)) => {
            let (current_year, current_month) = service.current_period();
            let report = service
                .monthly_report(year.unwrap_or(current_year), month.unwrap_or(current_month))
                .await?;
            if report.is_empty() {
                println!("No sales found for {}.", report.period_label());
                return Ok(());
            }
            let stem = report.file_stem(&config.store_name);
            (report.sales, stem)
        }
        None => {
            let sales = service.snapshot().await?.into_sales();
            if sales.is_empty() {
                println!("No sales found.");
                return Ok(());
            }
            let stem = format!(
                "{}_Sales",
                config.store_name.split_whitespace().collect::<Vec<_>>().join("_")
            );
            (sales, stem)
        }
    };

    let path = match (output, save || format == ExportFormat::Xlsx) {
        (Some(path), _) => Some(path),
        (None, true) => Some(format!("{}.{}", stem, format.extension())),
        (None, false) => None,
    };

    let writer: Box<dyn Write> = match &path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let exporter = Exporter::new(&sales, config);
    let count = match format {
        ExportFormat::Csv => exporter.export_csv(writer)?,
        ExportFormat::Tsv => exporter.export_tsv(writer)?,
        ExportFormat::Json => exporter.export_json(writer)?,
        ExportFormat::Xlsx => exporter.export_xlsx(writer)?,
    };

    if let Some(path) = path {
        eprintln!("Exported {} sales to {}", count, path);
    }
    Ok(())
}

async fn run_import_command(
    service: &LedgerService,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
    validate: bool,
) -> Result<()> {
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
        validate_only: validate,
    };

    let result = importer.import_json(reader, options).await?;

    if validate || dry_run {
        println!("Validation successful");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Document {}: {}{}",
                error.index,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default(),
                error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn parse_sale_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).context("Invalid sale ID format (expected UUID)")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("Asha", 20), "Asha");
        assert_eq!(truncate("Rahul Sharma Jewellers", 10), "Rahul S...");
        assert_eq!(truncate("₹₹₹₹₹₹₹₹", 6), "₹₹₹...");
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "goldledger",
            "sale",
            "--customer",
            "Asha",
            "--item",
            "Custom Item",
            "--custom-item",
            "Vintage Brooch",
            "--base-price",
            "1,00,000",
            "--preview",
        ])
        .unwrap();

        match cli.command {
            Commands::Sale {
                customer,
                custom_item,
                gst,
                preview,
                ..
            } => {
                assert_eq!(customer, "Asha");
                assert_eq!(custom_item.as_deref(), Some("Vintage Brooch"));
                assert_eq!(gst, "0");
                assert!(preview);
            }
            _ => panic!("expected sale command"),
        }
    }

    #[test]
    fn test_bill_summary() {
        let input = SaleInput {
            customer_name: "Asha".into(),
            item: ItemKind::GoldRing,
            item_base_price: "1,00,000".into(),
            gst_amount: "3000".into(),
            discount_amount: "5000".into(),
            ..SaleInput::default()
        };
        let summary = bill_summary(&LedgerConfig::default(), &input);

        assert!(summary.starts_with("Bill Summary (Gold Ring)"));
        assert!(summary.contains("₹1,03,000"));
        assert!(summary.lines().last().unwrap().ends_with("₹98,000"));
    }

    #[tokio::test]
    async fn test_preview_does_not_touch_the_database() {
        let temp = tempfile::TempDir::new().unwrap();
        let database = temp.path().join("missing").join("ledger.db");
        let cli = Cli::try_parse_from([
            "goldledger",
            "--database",
            database.to_str().unwrap(),
            "sale",
            "--customer",
            "Asha",
            "--base-price",
            "100",
            "--preview",
        ])
        .unwrap();

        cli.run().await.unwrap();
        assert!(!database.exists());
    }

    #[test]
    fn test_show_pdf_args() {
        let cli = Cli::try_parse_from(["goldledger", "show", "abc", "--pdf", "-o", "out.pdf"]).unwrap();
        match cli.command {
            Commands::Show { pdf, output, .. } => {
                assert!(pdf);
                assert_eq!(output.as_deref(), Some("out.pdf"));
            }
            _ => panic!("expected show command"),
        }

        assert!(Cli::try_parse_from(["goldledger", "show", "abc", "-o", "out.pdf"]).is_err());
        assert!(Cli::try_parse_from(["goldledger", "show", "abc", "--pdf", "--copy"]).is_err());
    }

    #[test]
    fn test_export_all_conflicts_with_month() {
        let result = Cli::try_parse_from(["goldledger", "export", "--all", "--month", "3"]);
        assert!(result.is_err());
    }
}
