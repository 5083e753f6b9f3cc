//! Field validators for identifiers and descriptive security data.
//!
//! Every validator is a total predicate: malformed input is simply
//! `false`. Absent values are modelled as `Option::None` by callers and
//! never reach these functions.

const ISIN_LEN: usize = 12;
const FIGI_LEN: usize = 12;
const FIGI_PREFIX: &str = "BBG";
const MAX_TICKER_LEN: usize = 20;
const MAX_SECURITY_NAME_LEN: usize = 255;
const MAX_EXCHANGE_CODE_LEN: usize = 10;

/// Curated subset of ISO 4217 codes accepted for security currencies.
pub const SUPPORTED_CURRENCIES: [&str; 60] = [
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "SEK", "NOK", //
    "DKK", "PLN", "CZK", "HUF", "RUB", "CNY", "HKD", "SGD", "KRW", "INR", //
    "BRL", "MXN", "ZAR", "TRY", "ILS", "THB", "MYR", "IDR", "PHP", "VND", //
    "TWD", "SAR", "AED", "QAR", "KWD", "BHD", "OMR", "JOD", "LBP", "EGP", //
    "MAD", "TND", "DZD", "NGN", "GHS", "KES", "UGX", "TZS", "ZMW", "BWP", //
    "CLP", "COP", "PEN", "ARS", "UYU", "PYG", "BOB", "VES", "GYD", "SRD",
];

/// ISO 6166 shape check: `CC` + 9 uppercase alphanumerics + check digit.
///
/// The check digit itself is not verified.
pub fn is_valid_isin(value: &str) -> bool {
    let bytes = value.as_bytes();
    if !value.is_ascii() || bytes.len() != ISIN_LEN {
        return false;
    }

    bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..11].iter().all(|&b| is_upper_alphanumeric(b))
        && bytes[11].is_ascii_digit()
}

/// `BBG` followed by 9 uppercase alphanumerics.
pub fn is_valid_figi(value: &str) -> bool {
    if !value.is_ascii() || value.len() != FIGI_LEN {
        return false;
    }

    value
        .strip_prefix(FIGI_PREFIX)
        .is_some_and(|rest| rest.bytes().all(is_upper_alphanumeric))
}

/// Three letters from [`SUPPORTED_CURRENCIES`], compared case-insensitively.
pub fn is_valid_currency_code(value: &str) -> bool {
    value.chars().count() == 3
        && SUPPORTED_CURRENCIES
            .iter()
            .any(|code| code.eq_ignore_ascii_case(value))
}

/// Trimmed length 1..=20, letters, digits, `.` and `-` only.
pub fn is_valid_ticker(value: &str) -> bool {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    (1..=MAX_TICKER_LEN).contains(&len)
        && trimmed
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '.' || ch == '-')
}

pub fn is_valid_security_name(value: &str) -> bool {
    let len = value.trim().chars().count();
    (1..=MAX_SECURITY_NAME_LEN).contains(&len)
}

/// Trimmed length 1..=10 and the first two characters are letters.
pub fn is_valid_exchange_code(value: &str) -> bool {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if !(1..=MAX_EXCHANGE_CODE_LEN).contains(&len) {
        return false;
    }

    let mut chars = trimmed.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(first), Some(second)) if first.is_alphabetic() && second.is_alphabetic()
    )
}

fn is_upper_alphanumeric(byte: u8) -> bool {
    byte.is_ascii_digit() || byte.is_ascii_uppercase()
}
