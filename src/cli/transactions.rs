use comfy_table::{Cell, CellAlignment, Table};
use rusqlite::Connection;

use crate::cli::accounts::find_account_id;
use crate::cli::categories::find_category_id;
use crate::db::open_ledger;
use crate::error::{Result, TallyError};
use crate::fmt::{iso_date, money, parse_money};
use crate::models::{NormalizedRecord, Transaction};
use crate::reports::date_range;

pub struct NewTransaction {
    pub account_id: i64,
    pub date: String,
    pub payee: String,
    pub amount: i64,
    pub category_id: Option<i64>,
    pub notes: Option<String>,
}

/// Fields left as `None` keep their stored value. `Some(None)` clears a
/// nullable column.
#[derive(Default)]
pub struct TransactionPatch {
    pub date: Option<String>,
    pub payee: Option<String>,
    pub amount: Option<i64>,
    pub category_id: Option<Option<i64>>,
    pub notes: Option<Option<String>>,
}

pub struct TransactionFilter {
    pub from: String,
    pub to: String,
    pub account_id: Option<i64>,
}

pub struct EditArgs<'a> {
    pub payee: Option<&'a str>,
    pub amount: Option<&'a str>,
    pub date: Option<&'a str>,
    pub category: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub clear_category: bool,
    pub clear_notes: bool,
}

pub struct AddArgs<'a> {
    pub account: &'a str,
    pub payee: &'a str,
    pub amount: &'a str,
    pub date: &'a str,
    pub category: Option<&'a str>,
    pub notes: Option<&'a str>,
}

pub fn add(args: AddArgs) -> Result<()> {
    let conn = open_ledger()?;
    let txn = NewTransaction {
        account_id: find_account_id(&conn, args.account)?,
        date: iso_date(args.date)?,
        payee: args.payee.trim().to_string(),
        amount: parse_money(args.amount)?,
        category_id: resolve_category(&conn, args.category)?,
        notes: args.notes.map(str::to_string),
    };
    let id = add_transaction(&conn, &txn)?;
    println!("Added transaction {id}: {} {}", txn.payee, money(txn.amount));
    Ok(())
}

pub fn list(from: Option<&str>, to: Option<&str>, account: Option<&str>) -> Result<()> {
    let conn = open_ledger()?;
    let (from, to) = date_range(from, to)?;
    let account_id = account.map(|a| find_account_id(&conn, a)).transpose()?;
    let rows = list_transactions(&conn, &TransactionFilter { from: from.clone(), to: to.clone(), account_id })?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Payee", "Amount", "Account", "Category", "Notes"]);
    for t in &rows {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.date),
            Cell::new(&t.payee),
            Cell::new(money(t.amount)).set_alignment(CellAlignment::Right),
            Cell::new(&t.account),
            Cell::new(t.category.as_deref().unwrap_or("")),
            Cell::new(t.notes.as_deref().unwrap_or("")),
        ]);
    }
    println!("Transactions {from} to {to}\n{table}");
    Ok(())
}

pub fn edit(id: i64, args: EditArgs) -> Result<()> {
    let conn = open_ledger()?;
    let category_id = match (args.category, args.clear_category) {
        (_, true) => Some(None),
        (Some(name), false) => Some(resolve_category(&conn, Some(name))?),
        (None, false) => None,
    };
    let notes = match (args.notes, args.clear_notes) {
        (_, true) => Some(None),
        (Some(n), false) => Some(Some(n.to_string())),
        (None, false) => None,
    };
    let patch = TransactionPatch {
        date: args.date.map(iso_date).transpose()?,
        payee: args.payee.map(|p| p.trim().to_string()),
        amount: args.amount.map(parse_money).transpose()?,
        category_id,
        notes,
    };
    update_transaction(&conn, id, &patch)?;
    println!("Updated transaction {id}");
    Ok(())
}

pub fn delete(ids: &[i64]) -> Result<()> {
    let mut conn = open_ledger()?;
    let deleted = delete_transactions(&mut conn, ids)?;
    if deleted.is_empty() {
        return Err(TallyError::NotFound(format!("transactions {ids:?}")));
    }
    println!("Deleted {} transaction(s)", deleted.len());
    Ok(())
}

fn resolve_category(conn: &Connection, name: Option<&str>) -> Result<Option<i64>> {
    match name {
        Some(name) => find_category_id(conn, name)?
            .map(Some)
            .ok_or_else(|| TallyError::UnknownCategory(name.to_string())),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Data layer
// ---------------------------------------------------------------------------

pub fn add_transaction(conn: &Connection, txn: &NewTransaction) -> Result<i64> {
    if txn.payee.is_empty() {
        return Err(TallyError::Other("Payee is required".into()));
    }
    conn.execute(
        "INSERT INTO transactions (amount, payee, notes, date, account_id, category_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![txn.amount, txn.payee, txn.notes, txn.date, txn.account_id, txn.category_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert normalized import records inside the caller's transaction.
/// Nothing is stored until the caller commits.
///
/// The pass-through field `notes` is stored as-is and `category` is looked up
/// by name. Any record without a date fails the call before commit.
pub fn bulk_create_transactions(
    tx: &rusqlite::Transaction,
    account_id: i64,
    import_id: Option<i64>,
    records: &[NormalizedRecord],
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(records.len());
    let mut stmt = tx.prepare(
        "INSERT INTO transactions (amount, payee, notes, date, account_id, category_id, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for rec in records {
        let date = rec
            .date
            .as_deref()
            .ok_or_else(|| TallyError::MissingDate(rec.payee.clone()))?;
        let category_id = match rec.extra.get("category") {
            Some(name) => {
                let id = find_category_id(tx, name)?;
                if id.is_none() {
                    tracing::warn!("Unknown category {name:?} for {:?}, leaving uncategorized", rec.payee);
                }
                id
            }
            None => None,
        };
        for key in rec.extra.keys().filter(|k| *k != "notes" && *k != "category") {
            tracing::debug!("Dropping unmapped field {key:?}");
        }
        stmt.execute(rusqlite::params![
            rec.amount,
            rec.payee,
            rec.extra.get("notes"),
            date,
            account_id,
            category_id,
            import_id,
        ])?;
        ids.push(tx.last_insert_rowid());
    }
    tracing::info!("Inserted {} transactions in account {account_id}", ids.len());
    Ok(ids)
}

/// Commit a batch in its own transaction.
#[cfg(test)]
pub(crate) fn seed_transactions(
    conn: &mut Connection,
    account_id: i64,
    import_id: Option<i64>,
    records: &[NormalizedRecord],
) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let ids = bulk_create_transactions(&tx, account_id, import_id, records)?;
    tx.commit()?;
    Ok(ids)
}

pub fn list_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.payee, t.amount, t.notes, t.account_id, a.name, t.category_id, c.name \
         FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         LEFT JOIN categories c ON t.category_id = c.id \
         WHERE t.date BETWEEN ?1 AND ?2 AND (?3 IS NULL OR t.account_id = ?3) \
         ORDER BY t.date DESC, t.id DESC",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![filter.from, filter.to, filter.account_id], |row| {
            Ok(Transaction {
                id: row.get(0)?,
                date: row.get(1)?,
                payee: row.get(2)?,
                amount: row.get(3)?,
                notes: row.get(4)?,
                account_id: row.get(5)?,
                account: row.get(6)?,
                category_id: row.get(7)?,
                category: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_transaction(conn: &Connection, id: i64, patch: &TransactionPatch) -> Result<()> {
    if matches!(patch.payee.as_deref(), Some("")) {
        return Err(TallyError::Other("Payee is required".into()));
    }
    let changed = conn.execute(
        "UPDATE transactions SET \
         date = COALESCE(?1, date), \
         payee = COALESCE(?2, payee), \
         amount = COALESCE(?3, amount), \
         category_id = CASE WHEN ?4 THEN ?5 ELSE category_id END, \
         notes = CASE WHEN ?6 THEN ?7 ELSE notes END \
         WHERE id = ?8",
        rusqlite::params![
            patch.date,
            patch.payee,
            patch.amount,
            patch.category_id.is_some(),
            patch.category_id.flatten(),
            patch.notes.is_some(),
            patch.notes.as_ref().and_then(|n| n.as_deref()),
            id,
        ],
    )?;
    if changed == 0 {
        return Err(TallyError::NotFound(format!("transaction {id}")));
    }
    Ok(())
}

pub fn delete_transactions(conn: &mut Connection, ids: &[i64]) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let mut deleted = Vec::new();
    {
        let mut stmt = tx.prepare("DELETE FROM transactions WHERE id = ?1")?;
        for &id in ids {
            if stmt.execute([id])? > 0 {
                deleted.push(id);
            }
        }
    }
    tx.commit()?;
    tracing::info!("Deleted transactions {deleted:?}");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::cli::accounts::add_account;
    use crate::cli::categories::add_category;
    use crate::db::test_db;

    fn record(payee: &str, amount: i64, date: Option<&str>) -> NormalizedRecord {
        NormalizedRecord {
            amount,
            date: date.map(str::to_string),
            payee: payee.to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn all(conn: &Connection) -> Vec<Transaction> {
        list_transactions(
            conn,
            &TransactionFilter {
                from: "0000-01-01".into(),
                to: "9999-12-31".into(),
                account_id: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_bulk_create_inserts_all_records() {
        let (_dir, mut conn) = test_db();
        let acct = add_account(&conn, "Checking").unwrap();
        let ids = seed_transactions(
            &mut conn,
            acct,
            None,
            &[
                record("Coffee Shop", -100_500, Some("2024-01-31")),
                record("Salary", 2_000_000, Some("2024-01-25")),
            ],
        )
        .unwrap();
        assert_eq!(ids.len(), 2);
        let rows = all(&conn);
        assert_eq!(rows[0].payee, "Coffee Shop");
        assert_eq!(rows[0].amount, -100_500);
        assert_eq!(rows[0].account, "Checking");
    }

    #[test]
    fn test_bulk_create_rolls_back_on_missing_date() {
        let (_dir, mut conn) = test_db();
        let acct = add_account(&conn, "Checking").unwrap();
        let err = seed_transactions(
            &mut conn,
            acct,
            None,
            &[record("A", 1_000, Some("2024-01-01")), record("B", 2_000, None)],
        )
        .unwrap_err();
        assert!(matches!(err, TallyError::MissingDate(p) if p == "B"));
        assert!(all(&conn).is_empty());
    }

    #[test]
    fn test_bulk_create_maps_notes_and_category() {
        let (_dir, mut conn) = test_db();
        let acct = add_account(&conn, "Checking").unwrap();
        let food = add_category(&conn, "Food").unwrap();
        let mut rec = record("Cafe", -5_000, Some("2024-02-01"));
        rec.extra.insert("notes".into(), "lunch".into());
        rec.extra.insert("category".into(), "Food".into());
        rec.extra.insert("reference".into(), "XYZ".into());
        let mut unknown = record("Bar", -7_000, Some("2024-02-02"));
        unknown.extra.insert("category".into(), "Drinks".into());
        seed_transactions(&mut conn, acct, None, &[rec, unknown]).unwrap();

        let rows = all(&conn);
        let bar = rows.iter().find(|t| t.payee == "Bar").unwrap();
        let cafe = rows.iter().find(|t| t.payee == "Cafe").unwrap();
        assert_eq!(cafe.notes.as_deref(), Some("lunch"));
        assert_eq!(cafe.category_id, Some(food));
        assert_eq!(bar.category_id, None);
    }

    #[test]
    fn test_list_filters_by_range_and_account() {
        let (_dir, mut conn) = test_db();
        let a = add_account(&conn, "A").unwrap();
        let b = add_account(&conn, "B").unwrap();
        seed_transactions(&mut conn, a, None, &[
            record("old", -1_000, Some("2023-12-31")),
            record("new", -2_000, Some("2024-01-15")),
        ])
        .unwrap();
        seed_transactions(&mut conn, b, None, &[record("other", -3_000, Some("2024-01-16"))]).unwrap();

        let filter = TransactionFilter {
            from: "2024-01-01".into(),
            to: "2024-01-31".into(),
            account_id: Some(a),
        };
        let rows = list_transactions(&conn, &filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payee, "new");

        let filter = TransactionFilter { account_id: None, ..filter };
        let payees: Vec<String> = list_transactions(&conn, &filter).unwrap().into_iter().map(|t| t.payee).collect();
        assert_eq!(payees, vec!["other", "new"]);
    }

    #[test]
    fn test_add_and_update_transaction() {
        let (_dir, conn) = test_db();
        let acct = add_account(&conn, "Checking").unwrap();
        let id = add_transaction(&conn, &NewTransaction {
            account_id: acct,
            date: "2024-03-01".into(),
            payee: "Grocer".into(),
            amount: -42_000,
            category_id: None,
            notes: None,
        })
        .unwrap();
        update_transaction(&conn, id, &TransactionPatch {
            amount: Some(-45_500),
            notes: Some(Some("weekly shop".into())),
            ..Default::default()
        })
        .unwrap();
        let t = &all(&conn)[0];
        assert_eq!(t.amount, -45_500);
        assert_eq!(t.payee, "Grocer");
        assert_eq!(t.notes.as_deref(), Some("weekly shop"));
        assert!(matches!(
            update_transaction(&conn, 999, &TransactionPatch::default()),
            Err(TallyError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_can_clear_category_and_notes() {
        let (_dir, conn) = test_db();
        let acct = add_account(&conn, "Checking").unwrap();
        let food = add_category(&conn, "Food").unwrap();
        let id = add_transaction(&conn, &NewTransaction {
            account_id: acct,
            date: "2024-03-01".into(),
            payee: "Grocer".into(),
            amount: -42_000,
            category_id: Some(food),
            notes: Some("weekly".into()),
        })
        .unwrap();

        update_transaction(&conn, id, &TransactionPatch { payee: Some("Market".into()), ..Default::default() }).unwrap();
        let t = &all(&conn)[0];
        assert_eq!(t.category_id, Some(food));
        assert_eq!(t.notes.as_deref(), Some("weekly"));

        update_transaction(&conn, id, &TransactionPatch {
            category_id: Some(None),
            notes: Some(None),
            ..Default::default()
        })
        .unwrap();
        let t = &all(&conn)[0];
        assert_eq!(t.payee, "Market");
        assert_eq!(t.category_id, None);
        assert_eq!(t.notes, None);
    }

    #[test]
    fn test_bulk_delete_transactions() {
        let (_dir, mut conn) = test_db();
        let acct = add_account(&conn, "Checking").unwrap();
        let ids = seed_transactions(&mut conn, acct, None, &[
            record("A", 1, Some("2024-01-01")),
            record("B", 2, Some("2024-01-02")),
            record("C", 3, Some("2024-01-03")),
        ])
        .unwrap();
        let deleted = delete_transactions(&mut conn, &[ids[0], ids[2]]).unwrap();
        assert_eq!(deleted, vec![ids[0], ids[2]]);
        let left: Vec<String> = all(&conn).into_iter().map(|t| t.payee).collect();
        assert_eq!(left, vec!["B"]);
    }
}
