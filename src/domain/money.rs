use std::fmt;

/// Money is represented as integer minor units to avoid floating-point precision issues.
/// For IDR-style whole prices the amounts are simply stored x100: Rp 3.000 = 300000.
pub type Cents = i64;

/// Weights are integer grams. 1 kg = 1000 g.
pub type Grams = i64;

pub const GRAMS_PER_KG: Grams = 1000;

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Format grams as kilograms with up to three decimals.
/// Example: 1500 -> "1.5", 2000 -> "2", 125 -> "0.125"
pub fn format_kg(grams: Grams) -> String {
    let sign = if grams < 0 { "-" } else { "" };
    let abs = grams.abs();
    let whole = abs / GRAMS_PER_KG;
    let frac = abs % GRAMS_PER_KG;
    if frac == 0 {
        format!("{}{}", sign, whole)
    } else {
        let digits = format!("{:03}", frac);
        format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseAmountError> {
    parse_fixed(input, 2)
}

/// Parse a kilogram quantity into grams.
/// Example: "2" -> 2000, "1.5" -> 1500, "0.125" -> 125
pub fn parse_kg(input: &str) -> Result<Grams, ParseAmountError> {
    parse_fixed(input, 3)
}

/// Parse a decimal string into an integer scaled by `10^scale`.
/// Extra fractional digits are truncated.
fn parse_fixed(input: &str, scale: u32) -> Result<i64, ParseAmountError> {
    let input = input.trim();
    let (negative, input) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let factor = 10_i64.pow(scale);

    let (units_str, frac_str) = match input.split_once('.') {
        Some((u, f)) => (u, f),
        None => (input, ""),
    };
    if units_str.is_empty() && frac_str.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(units_str) || !all_digits(frac_str) {
        return Err(ParseAmountError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseAmountError::Overflow)?
    };

    let frac_str = &frac_str[..frac_str.len().min(scale as usize)];
    let frac: i64 = if frac_str.is_empty() {
        0
    } else {
        let parsed: i64 = frac_str
            .parse()
            .map_err(|_| ParseAmountError::InvalidFormat)?;
        parsed * 10_i64.pow(scale - frac_str.len() as u32)
    };

    let value = units
        .checked_mul(factor)
        .and_then(|v| v.checked_add(frac))
        .ok_or(ParseAmountError::Overflow)?;
    Ok(if negative { -value } else { value })
}

/// Price a weighed item: `price_per_kg * grams / 1000`, rounded half away from zero.
/// Returns `None` when the subtotal does not fit in [`Cents`].
pub fn item_subtotal(price_per_kg: Cents, weight: Grams) -> Option<Cents> {
    let raw = price_per_kg as i128 * weight as i128;
    let kg = GRAMS_PER_KG as i128;
    let half = kg / 2;
    let rounded = if raw >= 0 {
        (raw + half) / kg
    } else {
        (raw - half) / kg
    };
    Cents::try_from(rounded).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid number format"),
            ParseAmountError::Overflow => write!(f, "number too large"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

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
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_kg("1.x").is_err());
        assert_eq!(
            parse_cents("99999999999999999999"),
            Err(ParseAmountError::Overflow)
        );
    }

    #[test]
    fn test_parse_rejects_stray_signs() {
        assert_eq!(parse_cents("1.-5"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_cents("--5"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_cents("-+5"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_cents("+5"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_kg("1. 5"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_cents("-"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_cents("-.5"), Ok(-50));
    }

    #[test]
    fn test_parse_and_format_kg() {
        assert_eq!(parse_kg("2"), Ok(2000));
        assert_eq!(parse_kg("1.5"), Ok(1500));
        assert_eq!(parse_kg("0.125"), Ok(125));
        assert_eq!(parse_kg("0.1259"), Ok(125));
        assert_eq!(format_kg(2000), "2");
        assert_eq!(format_kg(1500), "1.5");
        assert_eq!(format_kg(125), "0.125");
    }

    #[test]
    fn test_item_subtotal() {
        assert_eq!(item_subtotal(3000, 2000), Some(6000));
        assert_eq!(item_subtotal(1500, 1000), Some(1500));
        assert_eq!(item_subtotal(1500, 500), Some(750));
        // 333 * 0.5 = 166.5 -> 167
        assert_eq!(item_subtotal(333, 500), Some(167));
        assert_eq!(item_subtotal(0, 2500), Some(0));
    }

    #[test]
    fn test_item_subtotal_overflow() {
        assert_eq!(item_subtotal(i64::MAX, 1000), Some(i64::MAX));
        assert_eq!(item_subtotal(i64::MAX / 2, 4000), None);
    }
}
