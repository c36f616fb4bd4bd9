use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::accounts::find_account_id;
use crate::db::open_ledger;
use crate::error::Result;
use crate::fmt::money;
use crate::reports::{date_range, get_summary};

pub fn run(from: Option<&str>, to: Option<&str>, account: Option<&str>) -> Result<()> {
    let conn = open_ledger()?;
    let (from, to) = date_range(from, to)?;
    let account_id = account.map(|a| find_account_id(&conn, a)).transpose()?;
    let summary = get_summary(&conn, &from, &to, account_id)?;

    println!("Summary {} to {}", summary.from, summary.to);
    let mut totals = Table::new();
    totals.set_header(vec!["Remaining", "Income", "Expenses"]);
    totals.add_row(vec![
        Cell::new(money(summary.remaining)).set_alignment(CellAlignment::Right),
        Cell::new(money(summary.income)).set_alignment(CellAlignment::Right),
        Cell::new(money(summary.expenses)).set_alignment(CellAlignment::Right),
    ]);
    println!("{totals}");

    if !summary.categories.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Spent"]);
        for cat in &summary.categories {
            table.add_row(vec![
                Cell::new(&cat.name),
                Cell::new(money(cat.value)).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("Spending by category\n{table}");
    }

    if !summary.days.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Income", "Expenses"]);
        for day in &summary.days {
            table.add_row(vec![
                Cell::new(&day.date),
                Cell::new(money(day.income)).set_alignment(CellAlignment::Right),
                Cell::new(money(day.expenses)).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("Daily activity\n{table}");
    }

    Ok(())
}
