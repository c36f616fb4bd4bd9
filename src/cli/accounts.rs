use comfy_table::{Cell, Table};
use rusqlite::{Connection, OptionalExtension};

use crate::db::open_ledger;
use crate::error::{Result, TallyError};
use crate::models::Account;

pub fn add(name: &str) -> Result<()> {
    let conn = open_ledger()?;
    let id = add_account(&conn, name)?;
    println!("Added account {id}: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_ledger()?;
    let accounts = list_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for acct in accounts {
        table.add_row(vec![Cell::new(acct.id), Cell::new(acct.name)]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn rename(id: i64, new_name: &str) -> Result<()> {
    let conn = open_ledger()?;
    rename_account(&conn, id, new_name)?;
    println!("Renamed account {id} to: {new_name}");
    Ok(())
}

pub fn delete(ids: &[i64]) -> Result<()> {
    let mut conn = open_ledger()?;
    let deleted = delete_accounts(&mut conn, ids)?;
    if deleted.is_empty() {
        return Err(TallyError::NotFound(format!("accounts {ids:?}")));
    }
    println!("Deleted {} account(s)", deleted.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Data layer
// ---------------------------------------------------------------------------

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare("SELECT id, name FROM accounts ORDER BY name ASC")?;
    let accounts = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(accounts)
}

pub fn find_account_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM accounts WHERE name = ?1", [name], |row| row.get(0))
        .optional()?
        .ok_or_else(|| TallyError::UnknownAccount(name.to_string()))
}

pub fn add_account(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TallyError::Other("Name is required".into()));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(TallyError::Duplicate(format!("Account '{name}'")));
    }
    conn.execute("INSERT INTO accounts (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn rename_account(conn: &Connection, id: i64, new_name: &str) -> Result<()> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(TallyError::Other("Name is required".into()));
    }
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE name = ?1 AND id != ?2)",
        rusqlite::params![new_name, id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(TallyError::Duplicate(format!("Account '{new_name}'")));
    }
    let changed = conn.execute(
        "UPDATE accounts SET name = ?1 WHERE id = ?2",
        rusqlite::params![new_name, id],
    )?;
    if changed == 0 {
        return Err(TallyError::NotFound(format!("account {id}")));
    }
    Ok(())
}

/// Delete every listed account that exists; returns the ids actually removed.
pub fn delete_accounts(conn: &mut Connection, ids: &[i64]) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let mut deleted = Vec::new();
    {
        let mut stmt = tx.prepare("DELETE FROM accounts WHERE id = ?1")?;
        for &id in ids {
            if stmt.execute([id])? > 0 {
                deleted.push(id);
            }
        }
    }
    tx.commit()?;
    tracing::info!("Deleted accounts {deleted:?}");
    Ok(deleted)
}
