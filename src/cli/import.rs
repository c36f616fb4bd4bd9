use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::open_ledger;
use crate::error::{Result, TallyError};
use crate::fmt::money;
use crate::importer::{import_file, normalize_file, preview, progress_label, read_table};
use crate::mapper::{parse_assignment, ColumnMapper};
use crate::settings::load_settings;

pub fn run(file: &str, account: Option<&str>, mappings: &[String], dry_run: bool) -> Result<()> {
    let file_path = PathBuf::from(file);

    let mut mapper = ColumnMapper::new();
    for arg in mappings {
        let (column, choice) = parse_assignment(arg)?;
        mapper.assign_role(column, choice);
    }

    if !mapper.required_roles_satisfied() {
        let table = read_table(&file_path)?;
        println!("{}\n{}", format!("Map columns ({})", progress_label(&mapper)).bold(), preview(&table, &mapper));
        println!("Assign roles with --map INDEX=ROLE, e.g. --map 0=date --map 1=amount --map 2=payee");
        return Err(TallyError::MappingIncomplete(
            mapper.missing_roles().iter().map(|r| r.to_string()).collect(),
        ));
    }

    if dry_run {
        let normalized = normalize_file(&file_path, &mapper)?;
        println!("{}", serde_json::to_string_pretty(&normalized.records)?);
        if !normalized.rejected.is_empty() {
            eprintln!("{}", serde_json::to_string_pretty(&normalized.rejected)?);
        }
        return Ok(());
    }

    let settings = load_settings();
    let account = account
        .map(str::to_string)
        .or(settings.default_account)
        .ok_or_else(|| TallyError::Other("No --account given and no default_account configured".into()))?;

    let mut conn = open_ledger()?;
    let result = import_file(&mut conn, &file_path, &account, &mapper)?;

    if result.duplicate_file {
        println!("This file has already been imported into {account} (duplicate checksum).");
        return Ok(());
    }

    println!("{}", format!("{} imported into {account}", result.imported).green());

    if !result.undated.is_empty() {
        println!(
            "{}",
            format!("{} row(s) had an unreadable date (expected DD/MM/YYYY) and were not imported:", result.undated.len()).yellow()
        );
        let mut table = Table::new();
        table.set_header(vec!["Payee", "Amount"]);
        for rec in &result.undated {
            table.add_row(vec![Cell::new(&rec.payee), Cell::new(money(rec.amount))]);
        }
        println!("{table}");
    }

    if !result.rejected.is_empty() {
        println!("{}", format!("{} row(s) rejected:", result.rejected.len()).red());
        let mut table = Table::new();
        table.set_header(vec!["Row", "Value", "Reason"]);
        for rej in &result.rejected {
            table.add_row(vec![Cell::new(rej.index + 1), Cell::new(&rej.value), Cell::new(&rej.reason)]);
        }
        println!("{table}");
    }

    Ok(())
}
