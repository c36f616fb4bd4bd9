use chrono::{Duration, Local};
use rusqlite::Connection;

use crate::error::{Result, TallyError};
use crate::fmt::parse_iso_date;
use crate::normalizer::OUTPUT_DATE_FORMAT;

pub const DEFAULT_RANGE_DAYS: i64 = 30;
const TOP_CATEGORIES: usize = 3;

// ---------------------------------------------------------------------------
// Date range helper
// ---------------------------------------------------------------------------

/// Resolve optional `--from`/`--to` into an inclusive `YYYY-MM-DD` range.
/// Missing bounds default to the last 30 days ending today.
pub fn date_range(from: Option<&str>, to: Option<&str>) -> Result<(String, String)> {
    let end = match to {
        Some(to) => parse_iso_date(to)?,
        None => Local::now().date_naive(),
    };
    let start = match from {
        Some(from) => parse_iso_date(from)?,
        None => end - Duration::days(DEFAULT_RANGE_DAYS),
    };
    if start > end {
        return Err(TallyError::Other(format!(
            "--from {start} is after --to {end}"
        )));
    }
    Ok((
        start.format(OUTPUT_DATE_FORMAT).to_string(),
        end.format(OUTPUT_DATE_FORMAT).to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub struct CategorySpend {
    pub name: String,
    /// Absolute spend in miliunits.
    pub value: i64,
}

#[derive(Debug, PartialEq)]
pub struct DaySummary {
    pub date: String,
    pub income: i64,
    /// Absolute spend in miliunits.
    pub expenses: i64,
}

#[derive(Debug)]
pub struct Summary {
    pub from: String,
    pub to: String,
    pub income: i64,
    pub expenses: i64,
    pub remaining: i64,
    pub categories: Vec<CategorySpend>,
    pub days: Vec<DaySummary>,
}

pub fn get_summary(
    conn: &Connection,
    from: &str,
    to: &str,
    account_id: Option<i64>,
) -> Result<Summary> {
    let (income, expenses): (i64, i64) = conn.query_row(
        "SELECT \
           COALESCE(SUM(CASE WHEN amount >= 0 THEN amount ELSE 0 END), 0), \
           COALESCE(SUM(CASE WHEN amount < 0 THEN amount ELSE 0 END), 0) \
         FROM transactions \
         WHERE date BETWEEN ?1 AND ?2 AND (?3 IS NULL OR account_id = ?3)",
        rusqlite::params![from, to, account_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT COALESCE(c.name, 'Uncategorized') AS category, SUM(ABS(t.amount)) AS value \
         FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
         WHERE t.amount < 0 AND t.date BETWEEN ?1 AND ?2 AND (?3 IS NULL OR t.account_id = ?3) \
         GROUP BY category ORDER BY value DESC, category ASC",
    )?;
    let spend = stmt
        .query_map(rusqlite::params![from, to, account_id], |row| {
            Ok(CategorySpend {
                name: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT date, \
           SUM(CASE WHEN amount >= 0 THEN amount ELSE 0 END), \
           SUM(CASE WHEN amount < 0 THEN ABS(amount) ELSE 0 END) \
         FROM transactions \
         WHERE date BETWEEN ?1 AND ?2 AND (?3 IS NULL OR account_id = ?3) \
         GROUP BY date ORDER BY date ASC",
    )?;
    let days = stmt
        .query_map(rusqlite::params![from, to, account_id], |row| {
            Ok(DaySummary {
                date: row.get(0)?,
                income: row.get(1)?,
                expenses: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Summary {
        from: from.to_string(),
        to: to.to_string(),
        income,
        expenses,
        remaining: income + expenses,
        categories: fold_top_categories(spend),
        days,
    })
}

/// Keep the biggest spenders and lump the rest into "Other".
fn fold_top_categories(mut spend: Vec<CategorySpend>) -> Vec<CategorySpend> {
    if spend.len() <= TOP_CATEGORIES {
        return spend;
    }
    let rest = spend.split_off(TOP_CATEGORIES);
    spend.push(CategorySpend {
        name: "Other".to_string(),
        value: rest.iter().map(|c| c.value).sum(),
    });
    spend
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::cli::accounts::add_account;
    use crate::cli::categories::add_category;
    use crate::cli::transactions::seed_transactions;
    use crate::db::test_db;
    use crate::models::NormalizedRecord;

    fn rec(payee: &str, amount: i64, date: &str, category: Option<&str>) -> NormalizedRecord {
        let mut extra = BTreeMap::new();
        if let Some(c) = category {
            extra.insert("category".to_string(), c.to_string());
        }
        NormalizedRecord {
            amount,
            date: Some(date.to_string()),
            payee: payee.to_string(),
            extra,
        }
    }

    #[test]
    fn test_date_range_explicit() {
        let (from, to) = date_range(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        assert_eq!(from, "2024-01-01");
        assert_eq!(to, "2024-01-31");
    }

    #[test]
    fn test_date_range_defaults_to_thirty_days() {
        let (from, _) = date_range(None, Some("2024-03-31")).unwrap();
        assert_eq!(from, "2024-03-01");
    }

    #[test]
    fn test_date_range_rejects_bad_input() {
        assert!(date_range(Some("2024-02-01"), Some("2024-01-01")).is_err());
        assert!(matches!(
            date_range(Some("01/02/2024"), None),
            Err(TallyError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_summary_totals() {
        let (_dir, mut conn) = test_db();
        let acct = add_account(&conn, "Checking").unwrap();
        seed_transactions(&mut conn, acct, None, &[
            rec("Salary", 3_000_000, "2024-01-01", None),
            rec("Rent", -1_200_000, "2024-01-02", None),
            rec("Cafe", -4_500, "2024-01-02", None),
            rec("Outside", -9_999_000, "2024-02-15", None),
        ])
        .unwrap();
        let s = get_summary(&conn, "2024-01-01", "2024-01-31", None).unwrap();
        assert_eq!(s.income, 3_000_000);
        assert_eq!(s.expenses, -1_204_500);
        assert_eq!(s.remaining, 1_795_500);
        assert_eq!(
            s.days,
            vec![
                DaySummary { date: "2024-01-01".into(), income: 3_000_000, expenses: 0 },
                DaySummary { date: "2024-01-02".into(), income: 0, expenses: 1_204_500 },
            ]
        );
    }

    #[test]
    fn test_summary_folds_small_categories_into_other() {
        let (_dir, mut conn) = test_db();
        let acct = add_account(&conn, "Checking").unwrap();
        for name in ["Rent", "Food", "Travel", "Books"] {
            add_category(&conn, name).unwrap();
        }
        seed_transactions(&mut conn, acct, None, &[
            rec("a", -900_000, "2024-01-01", Some("Rent")),
            rec("b", -300_000, "2024-01-02", Some("Food")),
            rec("c", -200_000, "2024-01-03", Some("Travel")),
            rec("d", -50_000, "2024-01-04", Some("Books")),
            rec("e", -10_000, "2024-01-05", None),
        ])
        .unwrap();
        let s = get_summary(&conn, "2024-01-01", "2024-01-31", Some(acct)).unwrap();
        let names: Vec<&str> = s.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Rent", "Food", "Travel", "Other"]);
        assert_eq!(s.categories[3].value, 60_000);
    }

    #[test]
    fn test_summary_empty_range() {
        let (_dir, conn) = test_db();
        let s = get_summary(&conn, "2024-01-01", "2024-01-31", None).unwrap();
        assert_eq!(s.income, 0);
        assert_eq!(s.expenses, 0);
        assert!(s.categories.is_empty());
        assert!(s.days.is_empty());
    }
}
