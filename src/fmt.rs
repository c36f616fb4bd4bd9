use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Result, TallyError};
use crate::normalizer::{normalize_amount, OUTPUT_DATE_FORMAT};

/// Format miliunits as a dollar amount with thousands separators: $1,234.56
pub fn money(miliunits: i64) -> String {
    let negative = miliunits < 0;
    let value = Decimal::from_i128_with_scale(i128::from(miliunits.unsigned_abs()), 3)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let cents = format!("{value:.2}");
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Parse a user-entered amount like "12.50" or "-3" into miliunits.
pub fn parse_money(raw: &str) -> Result<i64> {
    normalize_amount(raw)
}

/// Validate a `YYYY-MM-DD` date argument.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), OUTPUT_DATE_FORMAT)
        .map_err(|_| TallyError::InvalidDate(raw.to_string()))
}

pub fn iso_date(raw: &str) -> Result<String> {
    Ok(parse_iso_date(raw)?.format(OUTPUT_DATE_FORMAT).to_string())
}
