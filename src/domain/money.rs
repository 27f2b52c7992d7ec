use thiserror::Error;

/// Money is represented as integer paise to avoid floating-point precision issues.
/// For INR, 1 rupee = 100 paise, so ₹50.00 = 5000.
pub type Cents = i64;

/// Largest amount a single price field may hold: ₹1,00,00,00,00,000 (one lakh crore).
/// Sums of a few such amounts stay far inside `i64`.
pub const MAX_AMOUNT: Cents = 100_000_000_000_000;

/// Format cents as a plain decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Format cents for display with a currency symbol and Indian digit grouping.
/// Paise are only shown when non-zero.
/// Example: 10000000 -> "₹1,00,000", 123450 -> "₹1,234.5", -50000 -> "-₹500"
pub fn format_currency(cents: Cents, symbol: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = group_indian(abs_cents / 100);
    let remainder = abs_cents % 100;

    if remainder == 0 {
        format!("{}{}{}", sign, symbol, units)
    } else {
        let paise = format!("{:02}", remainder);
        format!("{}{}{}.{}", sign, symbol, units, paise.trim_end_matches('0'))
    }
}

/// Group digits the Indian way: the last three, then pairs.
/// Example: 12345678 -> "1,23,45,678"
fn group_indian(units: i64) -> String {
    let digits = units.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    let cents = match parts.as_slice() {
        [units] => to_cents(parse_units(units)?, 0)?,
        [units, decimals] => {
            if units.is_empty() && decimals.is_empty() {
                return Err(ParseCentsError::InvalidFormat);
            }
            let units = if units.is_empty() { 0 } else { parse_units(units)? };

            // Pad or truncate to 2 digits
            let decimal_cents: i64 = match decimals.len() {
                0 => 0,
                1 => parse_units(decimals)? * 10,
                _ => parse_units(&decimals[..2])?,
            };

            to_cents(units, decimal_cents)?
        }
        _ => return Err(ParseCentsError::InvalidFormat),
    };

    Ok(if negative { -cents } else { cents })
}

fn parse_units(digits: &str) -> Result<i64, ParseCentsError> {
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    digits.parse::<i64>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => ParseCentsError::Overflow,
        _ => ParseCentsError::InvalidFormat,
    })
}

fn to_cents(units: i64, decimal_cents: i64) -> Result<Cents, ParseCentsError> {
    units
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(decimal_cents))
        .ok_or(ParseCentsError::Overflow)
}

/// Coerce free-form form input into a non-negative amount.
///
/// Everything except digits and `.` is stripped, the numeric prefix up to a
/// second `.` is kept, and anything left unparseable becomes 0. Digits too
/// long for [`Cents`] saturate.
/// Example: "₹1,00,000" -> 10000000, "12.5.9" -> 1250, "abc" -> 0
pub fn sanitize_amount(input: &str) -> Cents {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let prefix = match cleaned.match_indices('.').nth(1) {
        Some((second_dot, _)) => &cleaned[..second_dot],
        None => cleaned.as_str(),
    };

    match parse_cents(prefix) {
        Ok(cents) => cents,
        Err(ParseCentsError::Overflow) => Cents::MAX,
        Err(_) => 0,
    }
}

/// Convert a rupee amount held as a floating-point number (as found in JSON
/// documents) into cents, rounding to the nearest paisa.
pub fn cents_from_rupees(rupees: f64) -> Cents {
    (rupees * 100.0).round() as Cents
}

/// Whether an amount fits in a price field, either sign.
pub fn is_valid_amount(cents: Cents) -> bool {
    (-MAX_AMOUNT..=MAX_AMOUNT).contains(&cents)
}

/// Convert cents back into rupees for JSON documents.
pub fn rupees_from_cents(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("invalid money format")]
    InvalidFormat,

    #[error("amount is too large")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_format_currency_indian_grouping() {
        assert_eq!(format_currency(0, "₹"), "₹0");
        assert_eq!(format_currency(99900, "₹"), "₹999");
        assert_eq!(format_currency(100000, "₹"), "₹1,000");
        assert_eq!(format_currency(10_000_000, "₹"), "₹1,00,000");
        assert_eq!(format_currency(1_234_567_800, "₹"), "₹1,23,45,678");
        assert_eq!(format_currency(123450, "₹"), "₹1,234.5");
        assert_eq!(format_currency(123405, "₹"), "₹1,234.05");
        assert_eq!(format_currency(-50000, "₹"), "-₹500");
        assert_eq!(format_currency(10_300_000, "Rs. "), "Rs. 1,03,000");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.34"), Ok(1234));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("0.01"), Ok(1));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("3."), Ok(300));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents(".").is_err());
        assert!(parse_cents("+5").is_err());
        assert_eq!(
            parse_cents("99999999999999999999"),
            Err(ParseCentsError::Overflow)
        );
    }

    #[test]
    fn test_sanitize_amount() {
        assert_eq!(sanitize_amount("100000"), 10_000_000);
        assert_eq!(sanitize_amount("₹1,00,000"), 10_000_000);
        assert_eq!(sanitize_amount(" 3000.50 "), 300_050);
        assert_eq!(sanitize_amount("12.5.9"), 1250);
        assert_eq!(sanitize_amount("-500"), 50_000);
        assert_eq!(sanitize_amount(""), 0);
        assert_eq!(sanitize_amount("abc"), 0);
        assert_eq!(sanitize_amount("."), 0);
    }

    #[test]
    fn test_amount_bounds() {
        assert!(is_valid_amount(0));
        assert!(is_valid_amount(MAX_AMOUNT));
        assert!(is_valid_amount(-MAX_AMOUNT));
        assert!(!is_valid_amount(MAX_AMOUNT + 1));
        assert!(!is_valid_amount(sanitize_amount("90000000000000000")));
        assert!(!is_valid_amount(cents_from_rupees(1e300)));
        assert_eq!(sanitize_amount("99999999999999999999"), Cents::MAX);
    }

    #[test]
    fn test_rupee_conversions() {
        assert_eq!(cents_from_rupees(1234.5), 123450);
        assert_eq!(cents_from_rupees(0.1 + 0.2), 30);
        assert_eq!(rupees_from_cents(123450), 1234.5);
    }
}
