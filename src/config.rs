//! Process-wide settings, built once at startup and passed by reference.
//!
//! Sources, highest priority first:
//! 1. CLI flags (applied by the caller)
//! 2. Environment variables (`GOLDLEDGER_*`)
//! 3. Defaults (this file)

use chrono::{FixedOffset, Offset, Utc};

pub const DEFAULT_DATABASE: &str = "goldledger.db";

/// India Standard Time, UTC+05:30.
const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// SQLite database file path
    pub database: String,

    /// Shop name printed on receipts and reports
    pub store_name: String,

    /// Prefix used when displaying amounts
    pub currency_symbol: String,

    /// Offset used for calendar dates (month filters, receipt dates)
    pub utc_offset: FixedOffset,

    /// Account supplied by an external sign-in. When unset, the device
    /// identity stored in the database is used instead.
    pub account: Option<AccountConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountConfig {
    pub owner_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database: DEFAULT_DATABASE.to_string(),
            store_name: "GoldLedger".to_string(),
            currency_symbol: "₹".to_string(),
            utc_offset: FixedOffset::east_opt(IST_OFFSET_SECONDS).unwrap_or(Utc.fix()),
            account: None,
        }
    }
}

impl LedgerConfig {
    /// Defaults overridden by environment variables.
    ///
    /// - `GOLDLEDGER_DB`: database path
    /// - `GOLDLEDGER_STORE_NAME`: shop name
    /// - `GOLDLEDGER_CURRENCY_SYMBOL`: e.g. "Rs. "
    /// - `GOLDLEDGER_UTC_OFFSET`: e.g. "+05:30", "-04:00"
    /// - `GOLDLEDGER_OWNER`, `GOLDLEDGER_OWNER_NAME`, `GOLDLEDGER_OWNER_EMAIL`: signed-in account
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = LedgerConfig::default();

        if let Some(database) = lookup("GOLDLEDGER_DB") {
            config.database = database;
        }

        if let Some(store_name) = lookup("GOLDLEDGER_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(symbol) = lookup("GOLDLEDGER_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(offset) = lookup("GOLDLEDGER_UTC_OFFSET") {
            match parse_utc_offset(&offset) {
                Some(parsed) => config.utc_offset = parsed,
                None => tracing::warn!(value = %offset, "Ignoring invalid GOLDLEDGER_UTC_OFFSET"),
            }
        }

        if let Some(owner_id) = lookup("GOLDLEDGER_OWNER").filter(|id| !id.trim().is_empty()) {
            config.account = Some(AccountConfig {
                owner_id: owner_id.trim().to_string(),
                display_name: lookup("GOLDLEDGER_OWNER_NAME"),
                email: lookup("GOLDLEDGER_OWNER_EMAIL"),
            });
        }

        config
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_account(mut self, account: AccountConfig) -> Self {
        self.account = Some(account);
        self
    }
}

/// Parse "+HH:MM" / "-HH:MM" / "Z".
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Some(Utc.fix());
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
