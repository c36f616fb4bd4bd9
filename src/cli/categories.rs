use comfy_table::{Cell, Table};
use rusqlite::{Connection, OptionalExtension};

use crate::db::open_ledger;
use crate::error::{Result, TallyError};
use crate::models::Category;

pub fn add(name: &str) -> Result<()> {
    let conn = open_ledger()?;
    let id = add_category(&conn, name)?;
    println!("Added category {id}: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_ledger()?;
    let categories = list_categories(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for cat in categories {
        table.add_row(vec![Cell::new(cat.id), Cell::new(cat.name)]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn rename(id: i64, new_name: &str) -> Result<()> {
    let conn = open_ledger()?;
    rename_category(&conn, id, new_name)?;
    println!("Renamed category {id} to: {new_name}");
    Ok(())
}

pub fn delete(ids: &[i64]) -> Result<()> {
    let mut conn = open_ledger()?;
    let deleted = delete_categories(&mut conn, ids)?;
    if deleted.is_empty() {
        return Err(TallyError::NotFound(format!("categories {ids:?}")));
    }
    println!("Deleted {} category(ies)", deleted.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Data layer
// ---------------------------------------------------------------------------

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name ASC")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn find_category_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;
    Ok(id)
}

pub fn add_category(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TallyError::Other("Name is required".into()));
    }
    if find_category_id(conn, name)?.is_some() {
        return Err(TallyError::Duplicate(format!("Category '{name}'")));
    }
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn rename_category(conn: &Connection, id: i64, new_name: &str) -> Result<()> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(TallyError::Other("Name is required".into()));
    }
    if let Some(other) = find_category_id(conn, new_name)? {
        if other != id {
            return Err(TallyError::Duplicate(format!("Category '{new_name}'")));
        }
    }
    let changed = conn.execute(
        "UPDATE categories SET name = ?1 WHERE id = ?2",
        rusqlite::params![new_name, id],
    )?;
    if changed == 0 {
        return Err(TallyError::NotFound(format!("category {id}")));
    }
    Ok(())
}

/// Transactions in a deleted category become uncategorized.
pub fn delete_categories(conn: &mut Connection, ids: &[i64]) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let mut deleted = Vec::new();
    {
        let mut stmt = tx.prepare("DELETE FROM categories WHERE id = ?1")?;
        for &id in ids {
            if stmt.execute([id])? > 0 {
                deleted.push(id);
            }
        }
    }
    tx.commit()?;
    tracing::info!("Deleted categories {deleted:?}");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_add_and_list_categories() {
        let (_dir, conn) = test_db();
        add_category(&conn, "Groceries").unwrap();
        add_category(&conn, "Dining").unwrap();
        let names: Vec<String> = list_categories(&conn).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Dining", "Groceries"]);
    }

    #[test]
    fn test_add_category_rejects_duplicate() {
        let (_dir, conn) = test_db();
        add_category(&conn, "Dining").unwrap();
        assert!(matches!(add_category(&conn, "Dining"), Err(TallyError::Duplicate(_))));
        assert!(add_category(&conn, "").is_err());
    }

    #[test]
    fn test_rename_category_to_own_name_is_allowed() {
        let (_dir, conn) = test_db();
        let id = add_category(&conn, "Dining").unwrap();
        rename_category(&conn, id, "Dining").unwrap();
        rename_category(&conn, id, "Restaurants").unwrap();
        assert_eq!(find_category_id(&conn, "Restaurants").unwrap(), Some(id));
        assert_eq!(find_category_id(&conn, "Dining").unwrap(), None);
    }

    #[test]
    fn test_bulk_delete_categories() {
        let (_dir, mut conn) = test_db();
        let a = add_category(&conn, "A").unwrap();
        let b = add_category(&conn, "B").unwrap();
        assert_eq!(delete_categories(&mut conn, &[b]).unwrap(), vec![b]);
        assert_eq!(list_categories(&conn).unwrap().len(), 1);
        assert_eq!(list_categories(&conn).unwrap()[0].id, a);
    }
}
