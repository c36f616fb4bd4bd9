use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Result, TallyError};
use crate::mapper::{MappedTable, Role, REQUIRED_ROLES};
use crate::models::{NormalizedRecord, RejectedRow};

pub const INPUT_DATE_FORMAT: &str = "%d/%m/%Y";
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const MILIUNIT_SCALE: i64 = 1000;

#[derive(Debug, Default)]
pub struct Normalized {
    pub records: Vec<NormalizedRecord>,
    pub rejected: Vec<RejectedRow>,
}

/// Key each mapped cell by the role of its column.
pub fn project_row(row: &[Option<String>], headers: &[Option<Role>]) -> BTreeMap<String, String> {
    headers
        .iter()
        .zip(row)
        .filter_map(|(role, cell)| match (role, cell) {
            (Some(role), Some(cell)) => Some((role.as_str().to_string(), cell.clone())),
            _ => None,
        })
        .collect()
}

pub fn normalize_amount(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    // rust_decimal reads `_` as a digit separator
    if trimmed.contains('_') {
        return Err(TallyError::InvalidAmount(raw.to_string()));
    }
    let value = Decimal::from_str(trimmed)
        .map_err(|_| TallyError::InvalidAmount(raw.to_string()))?;
    value
        .checked_mul(Decimal::from(MILIUNIT_SCALE))
        .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|v| v.to_i64())
        .ok_or_else(|| TallyError::InvalidAmount(raw.to_string()))
}

/// Only a full four-digit year is accepted; `%Y` alone would read "24" as 0024.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let four_digit_year = trimmed
        .rsplit('/')
        .next()
        .is_some_and(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()));
    if !four_digit_year {
        tracing::warn!("Unparseable date {raw:?}: year must have four digits");
        return None;
    }
    match NaiveDate::parse_from_str(trimmed, INPUT_DATE_FORMAT) {
        Ok(date) => Some(date.format(OUTPUT_DATE_FORMAT).to_string()),
        Err(e) => {
            tracing::warn!("Unparseable date {raw:?}: {e}");
            None
        }
    }
}

pub fn normalize_rows(records: Vec<BTreeMap<String, String>>) -> Normalized {
    let mut out = Normalized::default();

    for (index, mut fields) in records.into_iter().enumerate() {
        let raw_amount = fields.remove(Role::Amount.as_str()).unwrap_or_default();
        let amount = match normalize_amount(&raw_amount) {
            Ok(amount) => amount,
            Err(e) => {
                tracing::warn!("Rejecting row {index}: {e}");
                out.rejected.push(RejectedRow {
                    index,
                    value: raw_amount,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let Some(payee) = fields.remove(Role::Payee.as_str()) else {
            tracing::warn!("Rejecting row {index}: no payee");
            out.rejected.push(RejectedRow {
                index,
                value: String::new(),
                reason: "Missing payee".to_string(),
            });
            continue;
        };
        let date = fields
            .remove(Role::Date.as_str())
            .and_then(|raw| normalize_date(&raw));

        out.records.push(NormalizedRecord {
            amount,
            date,
            payee,
            extra: fields,
        });
    }

    tracing::debug!(
        "Normalized {} rows, rejected {}",
        out.records.len(),
        out.rejected.len()
    );
    out
}

pub fn normalize_table(table: &MappedTable) -> Result<Normalized> {
    let missing: Vec<String> = REQUIRED_ROLES
        .iter()
        .filter(|r| !table.headers.iter().any(|h| h.as_ref() == Some(*r)))
        .map(|r| r.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TallyError::MappingIncomplete(missing));
    }

    let records = table
        .body
        .iter()
        .map(|row| project_row(row, &table.headers))
        .collect();
    Ok(normalize_rows(records))
}
